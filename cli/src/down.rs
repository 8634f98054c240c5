use crate::{bootstrap_data, deployment_agent};
use anyhow::{Context, Result};
use clap::Parser;
use cluster_model::{DeploymentConfig, DestructionPolicy};
use resource_agent::clients::{DefaultInfoClient, InfoClient};
use std::path::Path;
use talos_agents::ProductionMemo;

/// Destroy a deployment. Safe to run again after a partial failure.
#[derive(Debug, Parser)]
pub(crate) struct Down {}

impl Down {
    pub(crate) async fn run(self, config: DeploymentConfig, state: &Path) -> Result<()> {
        // The region the resources were created in wins over the current configuration.
        let memo: ProductionMemo = DefaultInfoClient::new(bootstrap_data(&config, state))
            .await
            .context(format!("Unable to open state file '{}'", state.display()))?
            .get_info()
            .await
            .context("Unable to read the deployment state")?;
        let region = if memo.region.is_empty() {
            config.region.clone()
        } else {
            Some(memo.region.clone())
        };
        let agent =
            deployment_agent(&config, state, DestructionPolicy::Never, region.as_deref()).await?;
        agent
            .destroy()
            .await
            .context(format!("Unable to destroy deployment '{}'", config.name))?;
        println!("Deployment '{}' destroyed", config.name);
        Ok(())
    }
}
