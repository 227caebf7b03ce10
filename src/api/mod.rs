//! API client modules for the Azure management and Kudu surfaces
//!
//! This module provides:
//! - The ARM client (resource groups, subscriptions, serverfarms, hostruntime VFS)
//! - The Kudu SCM client (VFS files, deployments)
//! - Credential sources and shared error handling

pub mod arm;
pub mod credentials;
pub mod error;
pub mod kudu;
pub mod models;

// Re-export commonly used types
pub use arm::{ArmClient, RawResponse, ResourceManagement};
pub use credentials::{
    CredentialError, EnvTokenCredential, KuduCredentials, StaticTokenCredential, TokenCredential,
};
pub use error::ApiError;
pub use kudu::{DeploymentSource, KuduClient};
pub use models::{
    AppKind, AppServicePlan, AppServicePlanCreateRequest, CustomLocation, Deployment,
    KubeEnvironmentProfile, PlanCreateProperties, ResourceGroup, Site, SiteFile,
    SiteFileMetadata, SiteOs, SkuDescription, Subscription,
};
