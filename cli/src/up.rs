use crate::deployment_agent;
use crate::outputs::print_outputs;
use anyhow::{Context, Result};
use clap::Parser;
use cluster_model::{DeploymentConfig, DestructionPolicy};
use log::info;
use resource_agent::provider::Spec;
use std::path::Path;

/// Create a Talos cluster.
#[derive(Debug, Parser)]
pub(crate) struct Up {
    /// Destroy whatever was created if creation fails.
    #[clap(long = "destroy-on-failure")]
    destroy_on_failure: bool,

    /// Print the outputs in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl Up {
    pub(crate) async fn run(self, config: DeploymentConfig, state: &Path) -> Result<()> {
        let policy = if self.destroy_on_failure {
            DestructionPolicy::OnFailure
        } else {
            DestructionPolicy::Never
        };
        let agent = deployment_agent(&config, state, policy, config.region.as_deref()).await?;
        info!(
            "Creating deployment '{}', state is kept in '{}'",
            config.name,
            state.display()
        );
        let outputs = agent
            .create(Spec::new(config))
            .await
            .context("Unable to create the deployment")?;
        print_outputs(&outputs, self.json)
    }
}
