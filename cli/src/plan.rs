use agent_utils::constants::DEFAULT_REGION;
use anyhow::{Context, Result};
use clap::Parser;
use cluster_model::DeploymentConfig;
use talos_agents::DeploymentPlan;

/// Show where subnets and nodes would go. Nothing is created.
#[derive(Debug, Parser)]
pub(crate) struct Plan {
    /// The availability zones to plan for, in the order AWS would report them.
    #[clap(long = "zones", use_value_delimiter = true, required = true)]
    zones: Vec<String>,

    /// Print the plan in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl Plan {
    pub(crate) fn run(self, config: DeploymentConfig) -> Result<()> {
        let region = config.region.as_deref().unwrap_or(DEFAULT_REGION);
        let plan = DeploymentPlan::build(&config, region, &self.zones)
            .context(format!("Unable to plan deployment '{}'", config.name))?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Could not serialize the plan")?
            );
            return Ok(());
        }
        println!("Network {}", plan.network);
        for (index, subnet) in plan.subnets.iter().enumerate() {
            println!("  subnet {}  {}  {}", index, subnet.cidr, subnet.zone);
        }
        for node in &plan.nodes {
            let zone = plan
                .subnets
                .get(node.subnet_index)
                .map(|subnet| subnet.zone.as_str())
                .unwrap_or_default();
            println!("  {}  subnet {}  {}", node.name(), node.subnet_index, zone);
        }
        Ok(())
    }
}
