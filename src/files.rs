//! Remote site file access
//!
//! Kudu VFS doesn't work for Linux consumption function apps and the ARM
//! hostruntime VFS doesn't work for regular web apps, so reads pick a
//! backend per site. Writes always go through Kudu, conditionally on the
//! prior etag.

use std::sync::Arc;
use tracing::debug;

use crate::api::arm::{ArmClient, RawResponse};
use crate::api::error::ApiError;
use crate::api::kudu::KuduClient;
use crate::api::models::{Site, SiteFile, SiteFileMetadata};

const LINUX_HOME: &str = "/home";

/// Which API serves a read for a given site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsBackend {
    /// ARM `hostruntime/admin/vfs` (function apps)
    HostRuntime,
    /// Kudu `/api/vfs` (web apps)
    Kudu,
}

/// Pick the read backend for a site
pub fn vfs_backend(site: &Site) -> VfsBackend {
    if site.is_function_app() {
        VfsBackend::HostRuntime
    } else {
        VfsBackend::Kudu
    }
}

/// Normalize a path for the hostruntime VFS: Linux function-app files live
/// under `/home`, so relative paths get that prefix.
pub fn hostruntime_path(site: &Site, path: &str) -> String {
    if site.is_linux() && !path.starts_with(LINUX_HOME) {
        format!("{}/{}", LINUX_HOME, path.trim_start_matches('/'))
    } else {
        path.to_string()
    }
}

/// Parse a VFS directory listing; non-array bodies yield an empty list
pub fn parse_listing(body: &str) -> Vec<SiteFileMetadata> {
    serde_json::from_str(body).unwrap_or_default()
}

/// File operations against one site
pub struct SiteFilesClient {
    site: Site,
    arm: Arc<ArmClient>,
    kudu: Arc<KuduClient>,
}

impl SiteFilesClient {
    pub fn new(site: Site, arm: Arc<ArmClient>, kudu: Arc<KuduClient>) -> Self {
        Self { site, arm, kudu }
    }

    /// Fetch a file and the etag to use for a later conditional write
    pub async fn get_file(&self, path: &str) -> Result<SiteFile, ApiError> {
        let response = self.fs_response(path).await?;
        Ok(SiteFile {
            data: response.body,
            etag: response.etag,
        })
    }

    /// List a directory; files and subdirectories come back as metadata
    pub async fn list_files(&self, path: &str) -> Result<Vec<SiteFileMetadata>, ApiError> {
        let response = self.fs_response(path).await?;
        Ok(parse_listing(&response.body))
    }

    /// Overwrite or create a file. The etag may be `None` when the file is
    /// being created; when present it is sent as `If-Match` so a concurrent
    /// edit fails instead of being clobbered.
    ///
    /// Returns the new etag when the backend reports one.
    pub async fn put_file(
        &self,
        data: Vec<u8>,
        path: &str,
        etag: Option<&str>,
    ) -> Result<Option<String>, ApiError> {
        self.kudu.vfs_put(path, data, etag).await
    }

    async fn fs_response(&self, path: &str) -> Result<RawResponse, ApiError> {
        match vfs_backend(&self.site) {
            VfsBackend::HostRuntime => {
                let path = hostruntime_path(&self.site, path);
                debug!(site = %self.site.name, %path, "reading through hostruntime vfs");
                self.arm.hostruntime_vfs_get(&self.site.id, &path).await
            }
            VfsBackend::Kudu => {
                debug!(site = %self.site.name, %path, "reading through kudu vfs");
                self.kudu.vfs_get(path).await
            }
        }
    }
}
