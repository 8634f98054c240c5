use crate::bootstrap_data;
use anyhow::{Context, Result};
use clap::Parser;
use cluster_model::{DeploymentConfig, DeploymentOutputs};
use resource_agent::clients::{AgentClient, DefaultAgentClient};
use std::path::Path;

/// Print the outputs recorded by the last successful `up`.
#[derive(Debug, Parser)]
pub(crate) struct Outputs {
    /// Print the outputs in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl Outputs {
    pub(crate) async fn run(self, config: DeploymentConfig, state: &Path) -> Result<()> {
        let outputs: DeploymentOutputs = DefaultAgentClient::new(bootstrap_data(&config, state))
            .await
            .context(format!("Unable to open state file '{}'", state.display()))?
            .get_created_resource()
            .await
            .context("Unable to read the deployment state")?
            .context(format!(
                "No created deployment '{}' is recorded in '{}'",
                config.name,
                state.display()
            ))?;
        print_outputs(&outputs, self.json)
    }
}

pub(crate) fn print_outputs(outputs: &DeploymentOutputs, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(outputs).context("Could not serialize the outputs")?
        );
        return Ok(());
    }
    let exports = outputs.exports();
    let width = exports.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in exports {
        println!("{:width$}  {}", key, value, width = width);
    }
    Ok(())
}
