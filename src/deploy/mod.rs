//! Deployment helpers

pub mod warmup;

pub use warmup::{delay_first_deploy, FIRST_DEPLOY_MAX_DELAY};
