//! azup - Provisioning wizard for Azure App Service resources
//!
//! Wizard steps that ensure-or-create resource groups and App Service plans
//! through ARM, a first-deploy warm-up delay, and site file access through
//! Kudu or the ARM hostruntime VFS.

pub mod api;
pub mod config;
pub mod deploy;
pub mod files;
pub mod logging;
pub mod steps;
pub mod ui;
