//! Wire models for the ARM and Kudu APIs
//!
//! ARM payloads are camelCase with resource-specific fields nested under a
//! `properties` envelope. Only the fields the wizard reads or writes are
//! modeled.

use serde::{Deserialize, Serialize};

/// A resource group within a subscription
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub location: String,
}

/// Request body for PUT resourcegroups/{name}
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupCreateRequest {
    pub location: String,
}

/// Subscription details; only the policies matter to the wizard
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub subscription_policies: Option<SubscriptionPolicies>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPolicies {
    #[serde(default)]
    pub quota_id: Option<String>,
}

/// App Service plan SKU
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkuDescription {
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl SkuDescription {
    /// True for the elastic-premium family ("EP"), which gets a worker ceiling
    pub fn is_elastic_premium(&self) -> bool {
        self.family
            .as_deref()
            .map(|f| f.eq_ignore_ascii_case("ep"))
            .unwrap_or(false)
    }

    /// True for the basic tier, the one the first-deploy delay applies to
    pub fn is_basic_tier(&self) -> bool {
        self.tier
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("basic"))
            .unwrap_or(false)
    }
}

/// An App Service plan (ARM "serverfarm")
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppServicePlan {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sku: Option<SkuDescription>,
    #[serde(default)]
    pub properties: Option<AppServicePlanProperties>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppServicePlanProperties {
    #[serde(default)]
    pub reserved: Option<bool>,
    #[serde(default)]
    pub maximum_elastic_worker_count: Option<u32>,
}

/// Request body for PUT serverfarms/{name}.
///
/// A static, versioned schema: `kubeEnvironmentProfile` is a plain optional
/// field here rather than being injected into a shared mapper at runtime.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppServicePlanCreateRequest {
    pub location: String,
    pub kind: String,
    pub sku: SkuDescription,
    pub properties: PlanCreateProperties,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCreateProperties {
    pub reserved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_elastic_worker_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_environment_profile: Option<KubeEnvironmentProfile>,
    pub per_site_scaling: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KubeEnvironmentProfile {
    pub id: String,
}

/// A custom location binding a plan to an Arc-connected Kubernetes cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLocation {
    pub id: String,
    pub kube_environment_id: String,
}

/// Operating system choice for a site or plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOs {
    Linux,
    Windows,
}

/// What flavor of site is being provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    /// Regular web app
    App,
    /// Function app
    FunctionApp,
}

/// The site a deploy or file operation targets
#[derive(Debug, Clone)]
pub struct Site {
    /// Full ARM resource id, e.g.
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Web/sites/{name}`
    pub id: String,
    pub name: String,
    pub kind: AppKind,
    pub os: SiteOs,
    /// SCM hostname, e.g. `my-site.scm.azurewebsites.net`
    pub scm_host: String,
}

impl Site {
    pub fn is_function_app(&self) -> bool {
        self.kind == AppKind::FunctionApp
    }

    pub fn is_linux(&self) -> bool {
        self.os == SiteOs::Linux
    }
}

/// Metadata for one entry in a VFS directory listing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SiteFileMetadata {
    pub mime: String,
    pub name: String,
    pub path: String,
}

/// A fetched file plus the etag to use for a later conditional write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    pub data: String,
    pub etag: Option<String>,
}

/// One entry from the Kudu deployments listing; only its presence is counted
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
}

/// Wrapper for ARM list responses
#[derive(Debug, Clone, Deserialize)]
pub struct ArmList<T> {
    pub value: Vec<T>,
}
