//! Kudu SCM client
//!
//! Talks to the site's `*.scm.azurewebsites.net` host: VFS file operations
//! and the deployments listing the warm-up delay counts.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, IF_MATCH};
use tracing::debug;

use super::arm::{etag_header, RawResponse};
use super::credentials::KuduCredentials;
use super::error::ApiError;
use super::models::Deployment;

const PROVIDER_NAME: &str = "kudu";

/// Source of the remote deployment count, used by the warm-up delay.
///
/// A trait so the delay can be exercised against fakes in tests.
#[async_trait]
pub trait DeploymentSource: Send + Sync {
    async fn deployment_count(&self) -> Result<usize, ApiError>;
}

/// Client for one site's Kudu SCM endpoint
pub struct KuduClient {
    scm_host: String,
    credentials: KuduCredentials,
    client: reqwest::Client,
}

impl KuduClient {
    pub fn new(scm_host: impl Into<String>, credentials: KuduCredentials) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("azup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        Ok(Self {
            scm_host: scm_host.into(),
            credentials,
            client,
        })
    }

    fn vfs_url(&self, path: &str) -> String {
        format!(
            "https://{}/api/vfs/{}",
            self.scm_host,
            path.trim_start_matches('/')
        )
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.credentials.username, self.credentials.password);
        format!("Basic {}", BASE64.encode(credentials.as_bytes()))
    }

    /// GET a file or directory listing from the VFS
    pub async fn vfs_get(&self, path: &str) -> Result<RawResponse, ApiError> {
        let url = self.vfs_url(path);
        debug!("Kudu GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        let etag = etag_header(&response);
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                format!("vfs/{}", path),
                body,
            ));
        }

        Ok(RawResponse {
            status: status.as_u16(),
            etag,
            body,
        })
    }

    /// PUT a file through the VFS, conditionally on the prior etag.
    ///
    /// Returns the new etag reported by Kudu, used for the next write.
    pub async fn vfs_put(
        &self,
        path: &str,
        data: Vec<u8>,
        etag: Option<&str>,
    ) -> Result<Option<String>, ApiError> {
        let url = self.vfs_url(path);
        debug!("Kudu PUT {} (conditional: {})", url, etag.is_some());

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.auth_header())
            .headers(conditional_headers(etag))
            .body(data)
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let etag_conflict = status.as_u16() == 412;
            let body = response.text().await.unwrap_or_default();
            if etag_conflict {
                return Err(ApiError::http(
                    PROVIDER_NAME,
                    412,
                    format!("etag mismatch writing vfs/{}", path),
                ));
            }
            return Err(ApiError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                format!("vfs/{}", path),
                body,
            ));
        }

        Ok(etag_header(&response))
    }

    /// Count entries in the deployments listing
    pub async fn list_deployments(&self) -> Result<Vec<Deployment>, ApiError> {
        let url = format!("https://{}/api/deployments", self.scm_host);
        debug!("Kudu GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                "deployments",
                body,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::http(PROVIDER_NAME, 0, format!("Parse error: {}", e)))
    }
}

#[async_trait]
impl DeploymentSource for KuduClient {
    async fn deployment_count(&self) -> Result<usize, ApiError> {
        Ok(self.list_deployments().await?.len())
    }
}

/// Build conditional headers for a VFS write.
///
/// `If-Match` is sent only when the caller holds a prior etag; a create of a
/// new file sends no conditional header at all.
pub fn conditional_headers(etag: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(etag) = etag {
        if let Ok(value) = HeaderValue::from_str(etag) {
            headers.insert(IF_MATCH, value);
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> KuduClient {
        KuduClient::new(
            "my-site.scm.azurewebsites.net",
            KuduCredentials::new("$my-site", "secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_vfs_url() {
        let client = test_client();
        assert_eq!(
            client.vfs_url("site/wwwroot/host.json"),
            "https://my-site.scm.azurewebsites.net/api/vfs/site/wwwroot/host.json"
        );
        // Leading slashes collapse instead of doubling
        assert_eq!(
            client.vfs_url("/home/data/file.txt"),
            "https://my-site.scm.azurewebsites.net/api/vfs/home/data/file.txt"
        );
    }

    #[test]
    fn test_auth_header_is_basic() {
        let client = test_client();
        let header = client.auth_header();
        assert!(header.starts_with("Basic "));
        // "$my-site:secret" base64-encoded
        assert_eq!(header, "Basic JG15LXNpdGU6c2VjcmV0");
    }

    #[test]
    fn test_conditional_headers_with_etag() {
        let headers = conditional_headers(Some("\"0x8D9F\""));
        assert_eq!(headers.get(IF_MATCH).unwrap(), "\"0x8D9F\"");
    }

    #[test]
    fn test_conditional_headers_without_etag() {
        let headers = conditional_headers(None);
        assert!(headers.get(IF_MATCH).is_none());
        assert!(headers.is_empty());
    }
}
