//! Azure Resource Manager client
//!
//! Covers the management-plane calls the wizard needs: resource groups,
//! subscription policies, App Service plans (ARM "serverfarms"), and the
//! hostruntime VFS endpoint used for function-app file reads.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::credentials::{CredentialError, TokenCredential};
use super::error::ApiError;
use super::models::{
    AppServicePlan, AppServicePlanCreateRequest, ArmList, ResourceGroup,
    ResourceGroupCreateRequest, Subscription,
};

const ARM_API_BASE: &str = "https://management.azure.com";
const RESOURCES_API_VERSION: &str = "2021-04-01";
const SUBSCRIPTIONS_API_VERSION: &str = "2021-01-01";
const WEB_API_VERSION: &str = "2021-02-01";
const HOSTRUNTIME_VFS_API_VERSION: &str = "2018-11-01";
const PROVIDER_NAME: &str = "arm";

/// A raw response from an endpoint whose body is not a typed ARM model
/// (the hostruntime VFS serves file contents and directory listings)
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub body: String,
}

/// Management-plane operations the wizard steps depend on.
///
/// Steps take `&dyn ResourceManagement` so tests can substitute in-memory
/// fakes for the live client.
#[async_trait]
pub trait ResourceManagement: Send + Sync {
    async fn resource_group_exists(&self, name: &str) -> Result<bool, ApiError>;
    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, ApiError>;
    async fn create_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroup, ApiError>;
    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, ApiError>;
    async fn get_subscription(&self) -> Result<Subscription, ApiError>;
    async fn get_app_service_plan(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<AppServicePlan>, ApiError>;
    async fn create_app_service_plan(
        &self,
        resource_group: &str,
        name: &str,
        request: &AppServicePlanCreateRequest,
    ) -> Result<AppServicePlan, ApiError>;
}

/// ARM REST client scoped to one subscription
pub struct ArmClient {
    subscription_id: String,
    credential: Box<dyn TokenCredential>,
    client: reqwest::Client,
    base_url: String,
}

impl ArmClient {
    pub fn new(
        subscription_id: impl Into<String>,
        credential: Box<dyn TokenCredential>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("azup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        Ok(Self {
            subscription_id: subscription_id.into(),
            credential,
            client,
            base_url: ARM_API_BASE.to_string(),
        })
    }

    /// Create a client with a custom base URL (for testing)
    #[cfg(test)]
    pub fn new_with_base_url(
        subscription_id: impl Into<String>,
        credential: Box<dyn TokenCredential>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let mut client = Self::new(subscription_id, credential)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }

    fn resource_group_url(&self, name: &str) -> String {
        format!(
            "{}{}/resourcegroups/{}?api-version={}",
            self.base_url,
            self.subscription_path(),
            name,
            RESOURCES_API_VERSION
        )
    }

    fn serverfarm_url(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}{}/resourceGroups/{}/providers/Microsoft.Web/serverfarms/{}?api-version={}",
            self.base_url,
            self.subscription_path(),
            resource_group,
            name,
            WEB_API_VERSION
        )
    }

    async fn token(&self) -> Result<String, ApiError> {
        self.credential.bearer_token().await.map_err(|e| match e {
            CredentialError::MissingEnv(_) => ApiError::not_configured(PROVIDER_NAME),
            CredentialError::Acquire(message) => ApiError::network(PROVIDER_NAME, message),
        })
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        debug!("ARM {} {}", method, url);
        let token = self.token().await?;

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        request
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))
    }

    /// Issue a request and deserialize a 2xx body, mapping error statuses
    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        resource: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, url, body).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                resource,
                body,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::http(PROVIDER_NAME, 0, format!("Parse error: {}", e)))
    }

    fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(value)
            .map_err(|e| ApiError::http(PROVIDER_NAME, 0, format!("Serialize error: {}", e)))
    }

    /// GET against the site's hostruntime VFS, used for function-app file
    /// reads where Kudu is unavailable.
    ///
    /// `site_id` is the full ARM resource id of the site; `path` is already
    /// normalized by the caller.
    pub async fn hostruntime_vfs_get(
        &self,
        site_id: &str,
        path: &str,
    ) -> Result<RawResponse, ApiError> {
        let url = format!(
            "{}{}/hostruntime/admin/vfs/{}?api-version={}",
            self.base_url,
            site_id,
            path.trim_start_matches('/'),
            HOSTRUNTIME_VFS_API_VERSION
        );

        let response = self.send(Method::GET, &url, None).await?;
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
                format!("hostruntime vfs {}", path),
                body,
            ));
        }

        Ok(RawResponse {
            status: status.as_u16(),
            etag,
            body,
        })
    }
}

/// Extract the etag header from a response, if present
pub(crate) fn etag_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ResourceManagement for ArmClient {
    /// HEAD on the resource group: 204 means it exists, 404 means it doesn't
    async fn resource_group_exists(&self, name: &str) -> Result<bool, ApiError> {
        let url = self.resource_group_url(name);
        let response = self.send(Method::HEAD, &url, None).await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ApiError::from_status(
                PROVIDER_NAME,
                status.as_u16(),
                format!("resourcegroups/{}", name),
                String::new(),
            )),
        }
    }

    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, ApiError> {
        let url = self.resource_group_url(name);
        self.request_json(
            Method::GET,
            &url,
            &format!("resourcegroups/{}", name),
            None,
        )
        .await
    }

    async fn create_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroup, ApiError> {
        let url = self.resource_group_url(name);
        let body = Self::to_body(&ResourceGroupCreateRequest {
            location: location.to_string(),
        })?;
        self.request_json(
            Method::PUT,
            &url,
            &format!("resourcegroups/{}", name),
            Some(body),
        )
        .await
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, ApiError> {
        let url = format!(
            "{}{}/resourcegroups?api-version={}",
            self.base_url,
            self.subscription_path(),
            RESOURCES_API_VERSION
        );
        let list: ArmList<ResourceGroup> = self
            .request_json(Method::GET, &url, "resourcegroups", None)
            .await?;
        Ok(list.value)
    }

    async fn get_subscription(&self) -> Result<Subscription, ApiError> {
        let url = format!(
            "{}{}?api-version={}",
            self.base_url,
            self.subscription_path(),
            SUBSCRIPTIONS_API_VERSION
        );
        self.request_json(
            Method::GET,
            &url,
            &format!("subscriptions/{}", self.subscription_id),
            None,
        )
        .await
    }

    /// GET the plan, treating 404 as "absent" so the step can decide
    /// create-vs-adopt
    async fn get_app_service_plan(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<AppServicePlan>, ApiError> {
        let url = self.serverfarm_url(resource_group, name);
        let result: Result<AppServicePlan, ApiError> = self
            .request_json(
                Method::GET,
                &url,
                &format!("serverfarms/{}", name),
                None,
            )
            .await;
        match result {
            Ok(plan) => Ok(Some(plan)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_app_service_plan(
        &self,
        resource_group: &str,
        name: &str,
        request: &AppServicePlanCreateRequest,
    ) -> Result<AppServicePlan, ApiError> {
        let url = self.serverfarm_url(resource_group, name);
        let body = Self::to_body(request)?;
        self.request_json(
            Method::PUT,
            &url,
            &format!("serverfarms/{}", name),
            Some(body),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::credentials::StaticTokenCredential;

    fn test_client() -> ArmClient {
        ArmClient::new_with_base_url(
            "0000-1111",
            Box::new(StaticTokenCredential::new("tok")),
            "https://arm.test",
        )
        .unwrap()
    }

    #[test]
    fn test_resource_group_url() {
        let client = test_client();
        assert_eq!(
            client.resource_group_url("my-rg"),
            "https://arm.test/subscriptions/0000-1111/resourcegroups/my-rg?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_serverfarm_url() {
        let client = test_client();
        assert_eq!(
            client.serverfarm_url("my-rg", "my-plan"),
            "https://arm.test/subscriptions/0000-1111/resourceGroups/my-rg/providers/Microsoft.Web/serverfarms/my-plan?api-version=2021-02-01"
        );
    }
}
