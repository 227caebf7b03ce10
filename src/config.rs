use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::api::models::{AppKind, CustomLocation, Site, SiteOs, SkuDescription};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub provision: ProvisionConfig,
    #[serde(default)]
    pub site: Option<SiteConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AzureConfig {
    /// Subscription provisioning happens in
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Display name shown in prompts (optional)
    #[serde(default)]
    pub subscription_display_name: Option<String>,
    /// Region for new resources
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Resource group to ensure
    #[serde(default)]
    pub resource_group: Option<String>,
    /// App Service plan to ensure
    #[serde(default)]
    pub plan: Option<String>,
    /// Plan SKU name (default: B1)
    #[serde(default = "default_sku_name")]
    pub sku_name: String,
    /// Plan SKU tier (default: Basic)
    #[serde(default = "default_sku_tier")]
    pub sku_tier: String,
    /// Plan SKU family (default: B)
    #[serde(default = "default_sku_family")]
    pub sku_family: String,
    /// Target OS: "linux" or "windows" (default: linux)
    #[serde(default = "default_os")]
    pub os: String,
    /// Custom-location resource id, for Arc-connected clusters
    #[serde(default)]
    pub custom_location_id: Option<String>,
    /// Kube environment resource id, required with a custom location
    #[serde(default)]
    pub kube_environment_id: Option<String>,
    /// Propagate 403s instead of falling back to existing groups
    #[serde(default)]
    pub suppress_forbidden_fallback: bool,
    /// Ceiling for the first-deploy warm-up delay (default: 10)
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_secs: u64,
}

fn default_sku_name() -> String {
    "B1".to_string()
}

fn default_sku_tier() -> String {
    "Basic".to_string()
}

fn default_sku_family() -> String {
    "B".to_string()
}

fn default_os() -> String {
    "linux".to_string()
}

fn default_warmup_delay() -> u64 {
    10
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            resource_group: None,
            plan: None,
            sku_name: default_sku_name(),
            sku_tier: default_sku_tier(),
            sku_family: default_sku_family(),
            os: default_os(),
            custom_location_id: None,
            kube_environment_id: None,
            suppress_forbidden_fallback: false,
            warmup_delay_secs: default_warmup_delay(),
        }
    }
}

impl ProvisionConfig {
    pub fn sku(&self) -> SkuDescription {
        SkuDescription {
            name: self.sku_name.clone(),
            tier: Some(self.sku_tier.clone()),
            family: Some(self.sku_family.clone()),
            size: None,
            capacity: None,
        }
    }

    pub fn site_os(&self) -> Result<SiteOs> {
        parse_os(&self.os)
    }

    pub fn custom_location(&self) -> Result<Option<CustomLocation>> {
        match (&self.custom_location_id, &self.kube_environment_id) {
            (Some(id), Some(kube)) => Ok(Some(CustomLocation {
                id: id.clone(),
                kube_environment_id: kube.clone(),
            })),
            (None, None) => Ok(None),
            _ => anyhow::bail!(
                "custom_location_id and kube_environment_id must be set together"
            ),
        }
    }
}

/// The site file commands operate on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Full ARM resource id of the site
    pub id: String,
    pub name: String,
    /// "app" or "functionapp"
    #[serde(default = "default_site_kind")]
    pub kind: String,
    /// "linux" or "windows"
    #[serde(default = "default_os")]
    pub os: String,
    /// SCM hostname, e.g. `my-site.scm.azurewebsites.net`
    pub scm_host: String,
}

fn default_site_kind() -> String {
    "app".to_string()
}

impl SiteConfig {
    pub fn to_site(&self) -> Result<Site> {
        let kind = match self.kind.to_lowercase().as_str() {
            "functionapp" => AppKind::FunctionApp,
            "app" => AppKind::App,
            other => anyhow::bail!("unknown site kind \"{}\"", other),
        };
        Ok(Site {
            id: self.id.clone(),
            name: self.name.clone(),
            kind,
            os: parse_os(&self.os)?,
            scm_host: self.scm_host.clone(),
        })
    }
}

fn parse_os(value: &str) -> Result<SiteOs> {
    match value.to_lowercase().as_str() {
        "linux" => Ok(SiteOs::Linux),
        "windows" => Ok(SiteOs::Windows),
        other => anyhow::bail!("unknown os \"{}\" (expected \"linux\" or \"windows\")", other),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (default: info)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write logs to a file under the state directory instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// State directory for logs and saved config
    #[serde(default = "default_state_path")]
    pub state: String,
}

fn default_state_path() -> String {
    ".azup".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_path(),
        }
    }
}

impl Config {
    /// Path to the project config file within the state directory
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".azup/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so azup works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // Project config in .azup/ (primary config location)
        let project_config = Self::project_config_path();
        if project_config.exists() {
            builder = builder.add_source(config::File::from(project_config));
        }

        // User config in ~/.config/azup/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("azup").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with AZUP_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("AZUP")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to .azup/config.toml
    pub fn save(&self) -> Result<()> {
        let config_path = Self::project_config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(&config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    /// Directory log files land in when file logging is enabled
    pub fn logs_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.state).join("logs")
    }
}
