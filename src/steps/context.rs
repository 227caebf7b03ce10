//! The wizard context threaded through provisioning steps

use anyhow::{anyhow, Result};

use crate::api::models::{
    AppKind, AppServicePlan, CustomLocation, ResourceGroup, SiteOs, SkuDescription,
};

/// Mutable state shared by the provisioning steps.
///
/// An explicit struct rather than an ambient bag: steps read their
/// prerequisites through `require_*` accessors, which fail fast when an
/// earlier step (or the caller) has not populated the field.
#[derive(Debug, Clone)]
pub struct ProvisionContext {
    pub subscription_id: String,
    pub subscription_display_name: Option<String>,
    pub location: Option<String>,

    pub new_resource_group_name: Option<String>,
    pub resource_group: Option<ResourceGroup>,

    pub new_plan_name: Option<String>,
    pub new_plan_sku: Option<SkuDescription>,
    pub site_os: Option<SiteOs>,
    pub app_kind: Option<AppKind>,
    pub custom_location: Option<CustomLocation>,
    pub plan: Option<AppServicePlan>,

    /// When set, a 403 on resource-group creation propagates unchanged
    /// instead of triggering the adopt-or-pick fallback
    pub suppress_forbidden_fallback: bool,
}

impl ProvisionContext {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            subscription_display_name: None,
            location: None,
            new_resource_group_name: None,
            resource_group: None,
            new_plan_name: None,
            new_plan_sku: None,
            site_os: None,
            app_kind: None,
            custom_location: None,
            plan: None,
            suppress_forbidden_fallback: false,
        }
    }

    /// Name shown to the user for this subscription, falling back to the id
    pub fn subscription_label(&self) -> &str {
        self.subscription_display_name
            .as_deref()
            .unwrap_or(&self.subscription_id)
    }

    pub fn require_location(&self) -> Result<&str> {
        require(self.location.as_deref(), "location")
    }

    pub fn require_new_resource_group_name(&self) -> Result<&str> {
        require(
            self.new_resource_group_name.as_deref(),
            "new_resource_group_name",
        )
    }

    pub fn require_resource_group(&self) -> Result<&ResourceGroup> {
        require(self.resource_group.as_ref(), "resource_group")
    }

    pub fn require_new_plan_name(&self) -> Result<&str> {
        require(self.new_plan_name.as_deref(), "new_plan_name")
    }

    pub fn require_new_plan_sku(&self) -> Result<&SkuDescription> {
        require(self.new_plan_sku.as_ref(), "new_plan_sku")
    }

    pub fn require_site_os(&self) -> Result<SiteOs> {
        require(self.site_os, "site_os")
    }
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("context field \"{}\" is not set", field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_missing_field() {
        let ctx = ProvisionContext::new("0000");
        let err = ctx.require_location().unwrap_err();
        assert!(err.to_string().contains("location"));
    }

    #[test]
    fn test_require_present_field() {
        let mut ctx = ProvisionContext::new("0000");
        ctx.location = Some("westus".to_string());
        assert_eq!(ctx.require_location().unwrap(), "westus");
    }

    #[test]
    fn test_subscription_label_fallback() {
        let mut ctx = ProvisionContext::new("0000-1111");
        assert_eq!(ctx.subscription_label(), "0000-1111");

        ctx.subscription_display_name = Some("Pay-As-You-Go".to_string());
        assert_eq!(ctx.subscription_label(), "Pay-As-You-Go");
    }
}
