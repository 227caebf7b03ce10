//! App Service plan ensure-or-create step

use async_trait::async_trait;
use std::sync::Arc;

use super::context::ProvisionContext;
use super::ProvisionStep;
use crate::api::arm::ResourceManagement;
use crate::api::models::{
    AppServicePlanCreateRequest, KubeEnvironmentProfile, PlanCreateProperties, SiteOs,
};
use crate::ui::WizardUi;

/// Maximum elastic worker count applied to elastic-premium plans
const ELASTIC_PREMIUM_WORKER_CEILING: u32 = 20;

/// Ensures the target App Service plan exists, creating it when absent.
pub struct AppServicePlanCreateStep {
    arm: Arc<dyn ResourceManagement>,
}

impl AppServicePlanCreateStep {
    pub fn new(arm: Arc<dyn ResourceManagement>) -> Self {
        Self { arm }
    }
}

/// Derive the ARM `kind` string for the plan being created
pub(crate) fn plan_kind(ctx: &ProvisionContext) -> &'static str {
    if ctx.custom_location.is_some() {
        "linux,kubernetes"
    } else if ctx.site_os == Some(SiteOs::Linux) {
        "linux"
    } else {
        "app"
    }
}

/// Build the create request from the wizard context.
///
/// `reserved` must be true for a Linux plan; the worker-count ceiling applies
/// only to the elastic-premium SKU family; the Kubernetes environment profile
/// and per-site scaling are attached only when a custom location is bound.
pub(crate) fn build_plan_request(
    ctx: &ProvisionContext,
) -> anyhow::Result<AppServicePlanCreateRequest> {
    let sku = ctx.require_new_plan_sku()?.clone();
    let location = ctx.require_location()?.to_string();
    let os = ctx.require_site_os()?;

    let maximum_elastic_worker_count = sku
        .is_elastic_premium()
        .then_some(ELASTIC_PREMIUM_WORKER_CEILING);
    let kube_environment_profile = ctx
        .custom_location
        .as_ref()
        .map(|cl| KubeEnvironmentProfile {
            id: cl.kube_environment_id.clone(),
        });

    Ok(AppServicePlanCreateRequest {
        location,
        kind: plan_kind(ctx).to_string(),
        sku,
        properties: PlanCreateProperties {
            reserved: os == SiteOs::Linux,
            maximum_elastic_worker_count,
            kube_environment_profile,
            per_site_scaling: ctx.custom_location.is_some(),
        },
    })
}

#[async_trait]
impl ProvisionStep for AppServicePlanCreateStep {
    fn name(&self) -> &str {
        "app-service-plan-create"
    }

    fn priority(&self) -> u32 {
        120
    }

    fn should_run(&self, ctx: &ProvisionContext) -> bool {
        ctx.plan.is_none()
    }

    async fn run(&self, ctx: &mut ProvisionContext, ui: &dyn WizardUi) -> anyhow::Result<()> {
        let plan_name = ctx.require_new_plan_name()?.to_string();
        let rg_name = ctx.require_resource_group()?.name.clone();

        ui.report(&format!(
            "Ensuring App Service plan \"{}\" exists...",
            plan_name
        ));

        if let Some(existing) = self.arm.get_app_service_plan(&rg_name, &plan_name).await? {
            ctx.plan = Some(existing);
            ui.report(&format!(
                "Successfully found App Service plan \"{}\".",
                plan_name
            ));
        } else {
            ui.report(&format!("Creating App Service plan \"{}\"...", plan_name));
            let request = build_plan_request(ctx)?;
            ctx.plan = Some(
                self.arm
                    .create_app_service_plan(&rg_name, &plan_name, &request)
                    .await?,
            );
            ui.report(&format!(
                "Successfully created App Service plan \"{}\".",
                plan_name
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::api::models::{
        AppServicePlan, CustomLocation, ResourceGroup, SkuDescription, Subscription,
    };
    use crate::ui::test_support::RecordingUi;
    use std::sync::Mutex;

    struct FakeArm {
        existing_plan: Option<AppServicePlan>,
        create_calls: Mutex<Vec<AppServicePlanCreateRequest>>,
    }

    impl FakeArm {
        fn new() -> Self {
            Self {
                existing_plan: None,
                create_calls: Mutex::new(Vec::new()),
            }
        }

        fn create_count(&self) -> usize {
            self.create_calls.lock().unwrap().len()
        }
    }

    fn plan(name: &str) -> AppServicePlan {
        AppServicePlan {
            id: Some(format!("/plans/{name}")),
            name: name.to_string(),
            location: "westus".to_string(),
            kind: Some("app".to_string()),
            sku: None,
            properties: None,
        }
    }

    #[async_trait]
    impl ResourceManagement for FakeArm {
        async fn resource_group_exists(&self, _name: &str) -> Result<bool, ApiError> {
            unimplemented!("not used by this step")
        }

        async fn get_resource_group(&self, _name: &str) -> Result<ResourceGroup, ApiError> {
            unimplemented!("not used by this step")
        }

        async fn create_resource_group(
            &self,
            _name: &str,
            _location: &str,
        ) -> Result<ResourceGroup, ApiError> {
            unimplemented!("not used by this step")
        }

        async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, ApiError> {
            unimplemented!("not used by this step")
        }

        async fn get_subscription(&self) -> Result<Subscription, ApiError> {
            unimplemented!("not used by this step")
        }

        async fn get_app_service_plan(
            &self,
            _resource_group: &str,
            _name: &str,
        ) -> Result<Option<AppServicePlan>, ApiError> {
            Ok(self.existing_plan.clone())
        }

        async fn create_app_service_plan(
            &self,
            _resource_group: &str,
            name: &str,
            request: &AppServicePlanCreateRequest,
        ) -> Result<AppServicePlan, ApiError> {
            self.create_calls.lock().unwrap().push(request.clone());
            Ok(plan(name))
        }
    }

    fn sku(name: &str, tier: &str, family: &str) -> SkuDescription {
        SkuDescription {
            name: name.to_string(),
            tier: Some(tier.to_string()),
            family: Some(family.to_string()),
            size: None,
            capacity: None,
        }
    }

    fn context(os: SiteOs) -> ProvisionContext {
        let mut ctx = ProvisionContext::new("0000");
        ctx.location = Some("westus".to_string());
        ctx.resource_group = Some(ResourceGroup {
            id: None,
            name: "my-rg".to_string(),
            location: "westus".to_string(),
        });
        ctx.new_plan_name = Some("my-plan".to_string());
        ctx.new_plan_sku = Some(sku("B1", "Basic", "B"));
        ctx.site_os = Some(os);
        ctx
    }

    #[tokio::test]
    async fn adopts_existing_plan_without_creating() {
        let mut arm = FakeArm::new();
        arm.existing_plan = Some(plan("my-plan"));
        let arm = Arc::new(arm);
        let step = AppServicePlanCreateStep::new(arm.clone());

        let mut ctx = context(SiteOs::Windows);
        let ui = RecordingUi::new();
        step.run(&mut ctx, &ui).await.unwrap();

        assert_eq!(arm.create_count(), 0);
        assert_eq!(ctx.plan.unwrap().name, "my-plan");
        assert!(ui
            .reported()
            .iter()
            .any(|m| m.contains("Successfully found")));
    }

    #[tokio::test]
    async fn creates_plan_when_absent() {
        let arm = Arc::new(FakeArm::new());
        let step = AppServicePlanCreateStep::new(arm.clone());

        let mut ctx = context(SiteOs::Windows);
        let ui = RecordingUi::new();
        step.run(&mut ctx, &ui).await.unwrap();

        assert_eq!(arm.create_count(), 1);
        assert!(ctx.plan.is_some());
    }

    #[test]
    fn reserved_flag_mirrors_linux() {
        let ctx = context(SiteOs::Linux);
        let request = build_plan_request(&ctx).unwrap();
        assert!(request.properties.reserved);
        assert_eq!(request.kind, "linux");

        let ctx = context(SiteOs::Windows);
        let request = build_plan_request(&ctx).unwrap();
        assert!(!request.properties.reserved);
        assert_eq!(request.kind, "app");
    }

    #[test]
    fn worker_ceiling_only_for_elastic_premium() {
        let mut ctx = context(SiteOs::Linux);
        ctx.new_plan_sku = Some(sku("EP1", "ElasticPremium", "EP"));
        let request = build_plan_request(&ctx).unwrap();
        assert_eq!(request.properties.maximum_elastic_worker_count, Some(20));

        ctx.new_plan_sku = Some(sku("P1v2", "PremiumV2", "Pv2"));
        let request = build_plan_request(&ctx).unwrap();
        assert_eq!(request.properties.maximum_elastic_worker_count, None);
    }

    #[test]
    fn custom_location_attaches_kube_profile() {
        let mut ctx = context(SiteOs::Linux);
        ctx.custom_location = Some(CustomLocation {
            id: "/custom/location/1".to_string(),
            kube_environment_id: "/kube/env/1".to_string(),
        });

        let request = build_plan_request(&ctx).unwrap();
        assert_eq!(request.kind, "linux,kubernetes");
        assert_eq!(
            request.properties.kube_environment_profile.as_ref().unwrap().id,
            "/kube/env/1"
        );
        assert!(request.properties.per_site_scaling);
    }

    #[test]
    fn no_custom_location_omits_kube_profile() {
        let ctx = context(SiteOs::Linux);
        let request = build_plan_request(&ctx).unwrap();
        assert!(request.properties.kube_environment_profile.is_none());
        assert!(!request.properties.per_site_scaling);
    }

    #[tokio::test]
    async fn missing_resource_group_is_an_error() {
        let arm = Arc::new(FakeArm::new());
        let step = AppServicePlanCreateStep::new(arm);

        let mut ctx = context(SiteOs::Linux);
        ctx.resource_group = None;
        let ui = RecordingUi::new();
        let err = step.run(&mut ctx, &ui).await.unwrap_err();
        assert!(err.to_string().contains("resource_group"));
    }
}
