/*!

Finding the Talos machine image for a region. The latest release tag is looked up first, then the
release's image manifest is fetched and searched.

!*/

use crate::error::{self, Result};
use cluster_model::{DeploymentConfig, ImageManifestEntry, ReleaseInfo, SelectionTarget};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};

/// Returns the id of the first entry in `manifest` that matches `target`. Later matches are
/// ignored.
pub fn select_image(manifest: &[ImageManifestEntry], target: &SelectionTarget) -> Result<String> {
    manifest
        .iter()
        .find(|entry| entry.matches(target))
        .map(|entry| entry.id.clone())
        .context(error::NoMatchingImageSnafu {
            target: target.clone(),
        })
}

/// The result of a successful image lookup.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedImage {
    pub version: String,
    pub image_id: String,
}

/// Looks up Talos releases and their image manifests over HTTP.
#[derive(Clone, Debug)]
pub struct ImageCatalog {
    client: reqwest::Client,
    config: DeploymentConfig,
}

impl ImageCatalog {
    pub fn new(client: reqwest::Client, config: &DeploymentConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    pub async fn latest_release(&self) -> Result<ReleaseInfo> {
        get_json(&self.client, &self.config.release_url).await
    }

    pub async fn manifest(&self, version: &str) -> Result<Vec<ImageManifestEntry>> {
        get_json(&self.client, &self.config.manifest_url(version)).await
    }

    /// Resolve the latest release and pick its image for `target`.
    pub async fn select(&self, target: &SelectionTarget) -> Result<SelectedImage> {
        let release = self.latest_release().await?;
        info!("Latest Talos release is '{}'", release.tag_name);
        let manifest = self.manifest(&release.tag_name).await?;
        debug!("The image manifest lists {} images", manifest.len());
        let image_id = select_image(&manifest, target)?;
        info!("Selected image '{}' for {}", image_id, target);
        Ok(SelectedImage {
            version: release.tag_name,
            image_id,
        })
    }
}

async fn get_json<T>(client: &reqwest::Client, url: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let body = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .context(error::ManifestUnavailableSnafu { url })?
        .text()
        .await
        .context(error::ManifestUnavailableSnafu { url })?;
    serde_json::from_str(&body).context(error::ManifestParseSnafu { url })
}
