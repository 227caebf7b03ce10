//! Resource group ensure-or-create step

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

use super::context::ProvisionContext;
use super::ProvisionStep;
use crate::api::arm::ResourceManagement;
use crate::api::error::ApiError;
use crate::ui::{Cancelled, WizardUi};

/// Sandbox/trial subscriptions carry a sponsored quota id; those accounts
/// usually cannot create resource groups at all
static SPONSORED_QUOTA: Lazy<Regex> =
    Lazy::new(|| Regex::new("(?i)sponsored").expect("valid regex"));

/// Ensures the target resource group exists, creating it when absent.
///
/// On a 403 the step tries two fallbacks: silently adopting the only group
/// of a sandbox subscription, then prompting the user to pick an existing
/// group. Every other error propagates unchanged.
pub struct ResourceGroupCreateStep {
    arm: Arc<dyn ResourceManagement>,
}

impl ResourceGroupCreateStep {
    pub fn new(arm: Arc<dyn ResourceManagement>) -> Self {
        Self { arm }
    }

    async fn ensure(
        &self,
        ctx: &mut ProvisionContext,
        name: &str,
        location: &str,
        ui: &dyn WizardUi,
    ) -> Result<(), ApiError> {
        if self.arm.resource_group_exists(name).await? {
            ui.report(&format!("Using existing resource group \"{}\".", name));
            ctx.resource_group = Some(self.arm.get_resource_group(name).await?);
        } else {
            ui.report(&format!(
                "Creating resource group \"{}\" in location \"{}\"...",
                name, location
            ));
            ctx.resource_group = Some(self.arm.create_resource_group(name, location).await?);
            ui.report(&format!(
                "Successfully created resource group \"{}\".",
                name
            ));
        }
        Ok(())
    }

    /// 403 recovery: adopt the lone group of a sandbox subscription, or let
    /// the user pick an existing one
    async fn forbidden_fallback(
        &self,
        ctx: &mut ProvisionContext,
        ui: &dyn WizardUi,
    ) -> anyhow::Result<()> {
        warn!(
            subscription = %ctx.subscription_id,
            "no permission to create a resource group; falling back to existing groups"
        );

        let subscription = self.arm.get_subscription().await?;
        let quota_id = subscription
            .subscription_policies
            .and_then(|p| p.quota_id)
            .unwrap_or_default();

        let groups = self.arm.list_resource_groups().await?;

        if SPONSORED_QUOTA.is_match(&quota_id) {
            if let [group] = groups.as_slice() {
                ui.report(&format!(
                    "Using existing resource group \"{}\".",
                    group.name
                ));
                ctx.resource_group = Some(group.clone());
                return Ok(());
            }
        }

        let message = format!(
            "You do not have permission to create a resource group in subscription \"{}\".",
            ctx.subscription_label()
        );
        if !ui.warn_modal(&message, "Select Existing").await? {
            return Err(Cancelled.into());
        }

        anyhow::ensure!(
            !groups.is_empty(),
            "subscription \"{}\" has no resource groups to select",
            ctx.subscription_label()
        );

        let names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        let index = ui.pick("Select a resource group:", &names).await?;
        ctx.resource_group = Some(groups[index].clone());
        Ok(())
    }
}

#[async_trait]
impl ProvisionStep for ResourceGroupCreateStep {
    fn name(&self) -> &str {
        "resource-group-create"
    }

    fn priority(&self) -> u32 {
        100
    }

    fn should_run(&self, ctx: &ProvisionContext) -> bool {
        ctx.resource_group.is_none()
    }

    async fn run(&self, ctx: &mut ProvisionContext, ui: &dyn WizardUi) -> anyhow::Result<()> {
        let name = ctx.require_new_resource_group_name()?.to_string();
        let location = ctx.require_location()?.to_string();

        match self.ensure(ctx, &name, &location, ui).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_forbidden() && !ctx.suppress_forbidden_fallback => {
                self.forbidden_fallback(ctx, ui).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{ResourceGroup, Subscription, SubscriptionPolicies};
    use crate::ui::test_support::RecordingUi;
    use std::sync::Mutex;

    /// Fake ARM backend with scripted responses and call recording
    struct FakeArm {
        exists: Result<bool, ApiError>,
        groups: Vec<ResourceGroup>,
        quota_id: Option<String>,
        create_calls: Mutex<Vec<String>>,
    }

    impl FakeArm {
        fn new() -> Self {
            Self {
                exists: Ok(false),
                groups: Vec::new(),
                quota_id: None,
                create_calls: Mutex::new(Vec::new()),
            }
        }

        fn create_count(&self) -> usize {
            self.create_calls.lock().unwrap().len()
        }
    }

    fn group(name: &str) -> ResourceGroup {
        ResourceGroup {
            id: Some(format!("/subscriptions/0/resourceGroups/{name}")),
            name: name.to_string(),
            location: "westus".to_string(),
        }
    }

    #[async_trait]
    impl ResourceManagement for FakeArm {
        async fn resource_group_exists(&self, _name: &str) -> Result<bool, ApiError> {
            self.exists.clone()
        }

        async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, ApiError> {
            Ok(group(name))
        }

        async fn create_resource_group(
            &self,
            name: &str,
            _location: &str,
        ) -> Result<ResourceGroup, ApiError> {
            self.create_calls.lock().unwrap().push(name.to_string());
            Ok(group(name))
        }

        async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, ApiError> {
            Ok(self.groups.clone())
        }

        async fn get_subscription(&self) -> Result<Subscription, ApiError> {
            Ok(Subscription {
                id: "/subscriptions/0000".to_string(),
                display_name: Some("Test Sub".to_string()),
                subscription_policies: Some(SubscriptionPolicies {
                    quota_id: self.quota_id.clone(),
                }),
            })
        }

        async fn get_app_service_plan(
            &self,
            _resource_group: &str,
            _name: &str,
        ) -> Result<Option<crate::api::models::AppServicePlan>, ApiError> {
            unimplemented!("not used by this step")
        }

        async fn create_app_service_plan(
            &self,
            _resource_group: &str,
            _name: &str,
            _request: &crate::api::models::AppServicePlanCreateRequest,
        ) -> Result<crate::api::models::AppServicePlan, ApiError> {
            unimplemented!("not used by this step")
        }
    }

    fn context() -> ProvisionContext {
        let mut ctx = ProvisionContext::new("0000");
        ctx.location = Some("westus".to_string());
        ctx.new_resource_group_name = Some("my-rg".to_string());
        ctx
    }

    #[tokio::test]
    async fn adopts_existing_group_without_creating() {
        let mut arm = FakeArm::new();
        arm.exists = Ok(true);
        let arm = Arc::new(arm);
        let step = ResourceGroupCreateStep::new(arm.clone());

        let mut ctx = context();
        let ui = RecordingUi::new();
        step.run(&mut ctx, &ui).await.unwrap();

        assert_eq!(arm.create_count(), 0);
        assert_eq!(ctx.resource_group.unwrap().name, "my-rg");
        assert!(ui.reported()[0].contains("Using existing resource group"));
    }

    #[tokio::test]
    async fn creates_group_when_absent() {
        let arm = Arc::new(FakeArm::new());
        let step = ResourceGroupCreateStep::new(arm.clone());

        let mut ctx = context();
        let ui = RecordingUi::new();
        step.run(&mut ctx, &ui).await.unwrap();

        assert_eq!(arm.create_count(), 1);
        assert_eq!(ctx.resource_group.unwrap().name, "my-rg");
        assert!(ui
            .reported()
            .iter()
            .any(|m| m.contains("Successfully created resource group")));
    }

    #[tokio::test]
    async fn forbidden_sandbox_with_single_group_adopts_silently() {
        let mut arm = FakeArm::new();
        arm.exists = Err(ApiError::forbidden("arm"));
        arm.quota_id = Some("Sponsored_2016-01-01".to_string());
        arm.groups = vec![group("the-only-rg")];
        let step = ResourceGroupCreateStep::new(Arc::new(arm));

        let mut ctx = context();
        let ui = RecordingUi::new();
        step.run(&mut ctx, &ui).await.unwrap();

        assert_eq!(ctx.resource_group.unwrap().name, "the-only-rg");
        assert_eq!(ui.modal_count(), 0, "sandbox adoption must not prompt");
    }

    #[tokio::test]
    async fn forbidden_non_sandbox_prompts_for_selection() {
        let mut arm = FakeArm::new();
        arm.exists = Err(ApiError::forbidden("arm"));
        arm.quota_id = Some("PayAsYouGo_2014-09-01".to_string());
        arm.groups = vec![group("rg-a"), group("rg-b")];
        let step = ResourceGroupCreateStep::new(Arc::new(arm));

        let mut ctx = context();
        let mut ui = RecordingUi::new();
        ui.pick_index = 1;
        step.run(&mut ctx, &ui).await.unwrap();

        assert_eq!(ui.modal_count(), 1);
        assert_eq!(ctx.resource_group.unwrap().name, "rg-b");
    }

    #[tokio::test]
    async fn forbidden_sandbox_with_multiple_groups_still_prompts() {
        let mut arm = FakeArm::new();
        arm.exists = Err(ApiError::forbidden("arm"));
        arm.quota_id = Some("Sponsored_2016-01-01".to_string());
        arm.groups = vec![group("rg-a"), group("rg-b")];
        let step = ResourceGroupCreateStep::new(Arc::new(arm));

        let mut ctx = context();
        let ui = RecordingUi::new();
        step.run(&mut ctx, &ui).await.unwrap();

        assert_eq!(ui.modal_count(), 1);
        assert_eq!(ctx.resource_group.unwrap().name, "rg-a");
    }

    #[tokio::test]
    async fn forbidden_with_suppression_propagates() {
        let mut arm = FakeArm::new();
        arm.exists = Err(ApiError::forbidden("arm"));
        let step = ResourceGroupCreateStep::new(Arc::new(arm));

        let mut ctx = context();
        ctx.suppress_forbidden_fallback = true;
        let ui = RecordingUi::new();
        let err = step.run(&mut ctx, &ui).await.unwrap_err();

        let api_err = err.downcast::<ApiError>().unwrap();
        assert!(api_err.is_forbidden());
    }

    #[tokio::test]
    async fn other_errors_propagate_unchanged() {
        let mut arm = FakeArm::new();
        arm.exists = Err(ApiError::http("arm", 500, "boom"));
        let step = ResourceGroupCreateStep::new(Arc::new(arm));

        let mut ctx = context();
        let ui = RecordingUi::new();
        let err = step.run(&mut ctx, &ui).await.unwrap_err();

        let api_err = err.downcast::<ApiError>().unwrap();
        assert!(matches!(api_err, ApiError::HttpError { status: 500, .. }));
    }

    #[tokio::test]
    async fn modal_dismissal_cancels() {
        let mut arm = FakeArm::new();
        arm.exists = Err(ApiError::forbidden("arm"));
        arm.groups = vec![group("rg-a")];
        let step = ResourceGroupCreateStep::new(Arc::new(arm));

        let mut ctx = context();
        let mut ui = RecordingUi::new();
        ui.accept_modal = false;
        let err = step.run(&mut ctx, &ui).await.unwrap_err();

        assert!(err.downcast_ref::<Cancelled>().is_some());
    }

    #[test]
    fn should_run_only_without_group() {
        let arm = Arc::new(FakeArm::new());
        let step = ResourceGroupCreateStep::new(arm);

        let mut ctx = context();
        assert!(step.should_run(&ctx));
        ctx.resource_group = Some(group("existing"));
        assert!(!step.should_run(&ctx));
    }
}
