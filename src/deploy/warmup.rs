//! First-deploy warm-up delay
//!
//! The first deployment to a Linux web app on a Basic plan can report
//! success before the site is actually serving. The delay below smooths that
//! over by holding the wizard for a few seconds, but only in that exact
//! configuration. It is advisory: it can never fail the deployment.

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::api::kudu::DeploymentSource;
use crate::api::models::{AppServicePlan, Site};

/// How long the warm-up delay holds at most
pub const FIRST_DEPLOY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Block for at most `max_delay`, resolving early unless this is the first
/// deployment to a Linux app on a Basic-tier plan.
///
/// Failures in the deployment-count check are swallowed and treated as
/// "resolve immediately".
pub async fn delay_first_deploy(
    site: &Site,
    plan: Option<&AppServicePlan>,
    deployments: &dyn DeploymentSource,
    max_delay: Duration,
) {
    tokio::select! {
        () = sleep(max_delay) => {
            debug!(site = %site.name, "first-deploy warm-up delay elapsed");
        }
        () = resolve_unless_first_basic_linux_deploy(site, plan, deployments) => {}
    }
}

/// Returns immediately when the delay does not apply; otherwise never
/// resolves, leaving the timer to win the race.
async fn resolve_unless_first_basic_linux_deploy(
    site: &Site,
    plan: Option<&AppServicePlan>,
    deployments: &dyn DeploymentSource,
) {
    if site.is_function_app() {
        return;
    }

    let basic_tier = plan
        .and_then(|p| p.sku.as_ref())
        .map(|sku| sku.is_basic_tier())
        .unwrap_or(false);
    if !basic_tier {
        return;
    }

    if !site.is_linux() {
        return;
    }

    match deployments.deployment_count().await {
        Ok(count) if count > 1 => {
            debug!(site = %site.name, count, "not the first deployment, skipping warm-up delay");
        }
        Ok(_) => {
            // First deploy to a Basic Linux app: let the timer run out
            std::future::pending::<()>().await;
        }
        Err(e) => {
            // An error here is not a deployment failure
            debug!(site = %site.name, error = %e, "deployment count check failed, skipping warm-up delay");
        }
    }
}
