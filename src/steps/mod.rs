//! Wizard steps and the runner that drives them

pub mod app_service_plan;
pub mod context;
pub mod resource_group;

pub use app_service_plan::AppServicePlanCreateStep;
pub use context::ProvisionContext;
pub use resource_group::ResourceGroupCreateStep;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::ui::WizardUi;

/// One unit of the provisioning flow.
///
/// Steps are stateless adapters: they check whether their resource already
/// exists, call the remote API when it doesn't, and record the result on the
/// context for later steps.
#[async_trait]
pub trait ProvisionStep: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Execution order; lower runs first
    fn priority(&self) -> u32;

    /// Whether the step still has work to do given the current context
    fn should_run(&self, ctx: &ProvisionContext) -> bool;

    async fn run(&self, ctx: &mut ProvisionContext, ui: &dyn WizardUi) -> anyhow::Result<()>;
}

/// Runs steps sequentially in priority order
pub struct StepRunner {
    steps: Vec<Box<dyn ProvisionStep>>,
}

impl StepRunner {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn add(mut self, step: Box<dyn ProvisionStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Execute every applicable step. The first error aborts the run.
    pub async fn run(
        &mut self,
        ctx: &mut ProvisionContext,
        ui: &dyn WizardUi,
    ) -> anyhow::Result<()> {
        self.steps.sort_by_key(|s| s.priority());

        for step in &self.steps {
            if !step.should_run(ctx) {
                debug!(step = step.name(), "skipping step, nothing to do");
                continue;
            }
            info!(step = step.name(), "running step");
            step.run(ctx, ui).await?;
        }
        Ok(())
    }
}

impl Default for StepRunner {
    fn default() -> Self {
        Self::new()
    }
}
