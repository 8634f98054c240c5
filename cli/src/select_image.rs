use agent_utils::constants::DEFAULT_REGION;
use anyhow::{Context, Result};
use clap::Parser;
use cluster_model::DeploymentConfig;
use talos_agents::{http_client, ImageCatalog};

/// Resolve the latest Talos release and print its image for the region.
#[derive(Debug, Parser)]
pub(crate) struct SelectImage {}

impl SelectImage {
    pub(crate) async fn run(self, config: DeploymentConfig) -> Result<()> {
        let region = config.region.as_deref().unwrap_or(DEFAULT_REGION);
        let client = http_client(config.http_timeout())?;
        let selected = ImageCatalog::new(client, &config)
            .select(&config.selection_target(region))
            .await
            .context("Unable to select the Talos image")?;
        println!("{} {}", selected.version, selected.image_id);
        Ok(())
    }
}
