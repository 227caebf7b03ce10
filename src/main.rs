use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use azup::api::{
    ArmClient, EnvTokenCredential, KuduClient, KuduCredentials, ResourceManagement,
};
use azup::config::Config;
use azup::deploy::delay_first_deploy;
use azup::files::SiteFilesClient;
use azup::logging::init_logging;
use azup::steps::{
    AppServicePlanCreateStep, ProvisionContext, ResourceGroupCreateStep, StepRunner,
};
use azup::ui::TerminalUi;

#[derive(Parser)]
#[command(name = "azup")]
#[command(about = "Provisioning wizard for Azure App Service resources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the configured resource group and App Service plan exist
    Provision,
    /// Hold out the first-deploy warm-up window for the configured site
    Warmup,
    /// Read and write files on the configured site
    Files {
        #[command(subcommand)]
        command: FilesCommands,
    },
}

#[derive(Subcommand)]
enum FilesCommands {
    /// Print a remote file to stdout
    Get { path: String },
    /// List a remote directory
    List { path: String },
    /// Upload a local file, conditionally on a prior etag
    Put {
        path: String,
        /// Local file to upload
        #[arg(short, long)]
        source: PathBuf,
        /// Etag from a previous get; omit when creating a new file
        #[arg(long)]
        etag: Option<String>,
    },
}

fn arm_client(config: &Config) -> Result<Arc<ArmClient>> {
    let subscription_id = config
        .azure
        .subscription_id
        .clone()
        .ok_or_else(|| anyhow!("azure.subscription_id is not configured"))?;
    let client = ArmClient::new(subscription_id, Box::new(EnvTokenCredential))?;
    Ok(Arc::new(client))
}

fn kudu_client(config: &Config) -> Result<Arc<KuduClient>> {
    let site = config
        .site
        .as_ref()
        .ok_or_else(|| anyhow!("site is not configured"))?;
    let credentials = KuduCredentials::from_env().context("Kudu credentials missing")?;
    Ok(Arc::new(KuduClient::new(site.scm_host.clone(), credentials)?))
}

fn provision_context(config: &Config) -> Result<ProvisionContext> {
    let subscription_id = config
        .azure
        .subscription_id
        .clone()
        .ok_or_else(|| anyhow!("azure.subscription_id is not configured"))?;

    let mut ctx = ProvisionContext::new(subscription_id);
    ctx.subscription_display_name = config.azure.subscription_display_name.clone();
    ctx.location = config.azure.location.clone();
    ctx.new_resource_group_name = config.provision.resource_group.clone();
    ctx.new_plan_name = config.provision.plan.clone();
    ctx.new_plan_sku = Some(config.provision.sku());
    ctx.site_os = Some(config.provision.site_os()?);
    ctx.custom_location = config.provision.custom_location()?;
    ctx.suppress_forbidden_fallback = config.provision.suppress_forbidden_fallback;
    Ok(ctx)
}

async fn run_provision(config: &Config) -> Result<()> {
    let arm = arm_client(config)?;
    let mut ctx = provision_context(config)?;
    let ui = TerminalUi;

    let mut runner = StepRunner::new()
        .add(Box::new(ResourceGroupCreateStep::new(arm.clone())))
        .add(Box::new(AppServicePlanCreateStep::new(arm)));
    runner.run(&mut ctx, &ui).await?;

    if let Some(group) = &ctx.resource_group {
        println!("resource group: {}", group.name);
    }
    if let Some(plan) = &ctx.plan {
        println!("app service plan: {}", plan.name);
    }
    Ok(())
}

async fn run_warmup(config: &Config) -> Result<()> {
    let site_config = config
        .site
        .as_ref()
        .ok_or_else(|| anyhow!("site is not configured"))?;
    let site = site_config.to_site()?;
    let kudu = kudu_client(config)?;

    // Fetch the plan when both names are configured; the delay treats an
    // unknown plan as "does not apply"
    let plan = match (&config.provision.resource_group, &config.provision.plan) {
        (Some(rg), Some(plan_name)) => {
            let arm = arm_client(config)?;
            arm.get_app_service_plan(rg, plan_name).await?
        }
        _ => None,
    };

    let max_delay = Duration::from_secs(config.provision.warmup_delay_secs);
    delay_first_deploy(&site, plan.as_ref(), kudu.as_ref(), max_delay).await;
    Ok(())
}

async fn run_files(config: &Config, command: FilesCommands) -> Result<()> {
    let site_config = config
        .site
        .as_ref()
        .ok_or_else(|| anyhow!("site is not configured"))?;
    let site = site_config.to_site()?;
    let client = SiteFilesClient::new(site, arm_client(config)?, kudu_client(config)?);

    match command {
        FilesCommands::Get { path } => {
            let file = client.get_file(&path).await?;
            if let Some(etag) = &file.etag {
                eprintln!("etag: {}", etag);
            }
            print!("{}", file.data);
        }
        FilesCommands::List { path } => {
            for entry in client.list_files(&path).await? {
                println!("{}\t{}", entry.mime, entry.name);
            }
        }
        FilesCommands::Put { path, source, etag } => {
            let data = std::fs::read(&source)
                .with_context(|| format!("Failed to read {}", source.display()))?;
            let new_etag = client.put_file(data, &path, etag.as_deref()).await?;
            match new_etag {
                Some(etag) => println!("etag: {}", etag),
                None => println!("uploaded"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let _logging = init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Provision => run_provision(&config).await,
        Commands::Warmup => run_warmup(&config).await,
        Commands::Files { command } => run_files(&config, command).await,
    }
}
