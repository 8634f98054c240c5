/*!

This is the command line interface for standing up a Talos Linux cluster on AWS and tearing it
down again.

!*/

mod down;
mod outputs;
mod plan;
mod select_image;
mod up;

use anyhow::{Context, Result};
use clap::Parser;
use cluster_model::constants::DEFAULT_STATE_FILE;
use cluster_model::{DeploymentConfig, DestructionPolicy};
use log::{info, LevelFilter};
use resource_agent::clients::{DefaultAgentClient, DefaultInfoClient};
use resource_agent::{Agent, BootstrapData, Types};
use std::path::{Path, PathBuf};
use talos_agents::{AwsCloud, Cloud, ClusterCreator, ClusterDestroyer};

/// Stand up a Talos Linux Kubernetes cluster on AWS.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,

    /// A YAML deployment file. Fields it leaves out take their default values.
    #[clap(long = "config", short = 'f')]
    config: Option<PathBuf>,

    /// The file the deployment state is kept in.
    #[clap(long = "state", default_value = DEFAULT_STATE_FILE)]
    state: PathBuf,

    /// Override the deployment name.
    #[clap(long = "name")]
    name: Option<String>,

    /// Override the AWS region.
    #[clap(long = "region")]
    region: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Create the cluster and everything it needs.
    Up(up::Up),
    /// Destroy everything recorded in the state file.
    Down(down::Down),
    /// Print the outputs of a created deployment.
    Outputs(outputs::Outputs),
    /// Print the Talos image that would be used, without creating anything.
    SelectImage(select_image::SelectImage),
    /// Print the subnet and node placement for a list of zones, without creating anything.
    Plan(plan::Plan),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    agent_utils::init_agent_logger(env!("CARGO_CRATE_NAME"), Some(args.log_level));
    if let Err(e) = run(args).await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = deployment_config(&args)?;
    match args.command {
        Command::Up(up) => up.run(config, &args.state).await,
        Command::Down(down) => down.run(config, &args.state).await,
        Command::Outputs(outputs) => outputs.run(config, &args.state).await,
        Command::SelectImage(select_image) => select_image.run(config).await,
        Command::Plan(plan) => plan.run(config),
    }
}

/// The deployment file, if any, with the command line overrides applied.
fn deployment_config(args: &Args) -> Result<DeploymentConfig> {
    let mut config = match &args.config {
        Some(path) => DeploymentConfig::from_path(path)
            .context(format!("Unable to load deployment file '{}'", path.display()))?,
        None => DeploymentConfig::default(),
    };
    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(region) = &args.region {
        config.region = Some(region.clone());
    }
    Ok(config)
}

type DeploymentAgent = Agent<
    DefaultInfoClient,
    DefaultAgentClient,
    ClusterCreator<AwsCloud>,
    ClusterDestroyer<AwsCloud>,
>;

fn bootstrap_data(config: &DeploymentConfig, state: &Path) -> BootstrapData {
    BootstrapData::new(&config.name, state)
}

async fn deployment_agent(
    config: &DeploymentConfig,
    state: &Path,
    policy: DestructionPolicy,
    region: Option<&str>,
) -> Result<DeploymentAgent> {
    let sdk_config =
        agent_utils::aws::aws_config(region, config.assume_role.as_deref(), None).await;
    let cloud = AwsCloud::new(&sdk_config).context("Unable to set up AWS clients")?;
    let account = agent_utils::aws::account_id(&sdk_config)
        .await
        .context("Unable to determine the AWS account")?;
    info!("Using AWS account '{}' in '{}'", account, cloud.region());
    Agent::new(
        Types::default(),
        bootstrap_data(config, state).destruction_policy(policy),
        ClusterCreator::new(cloud.clone()),
        ClusterDestroyer::new(cloud),
    )
    .await
    .context(format!("Unable to open state file '{}'", state.display()))
}
