use crate::Configuration;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One published machine image variant, as listed in a release's `cloud-images.json`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ImageManifestEntry {
    pub cloud: String,
    pub region: String,
    pub arch: String,
    pub id: String,
}

impl ImageManifestEntry {
    /// Whether this entry matches `target` on all three dimensions.
    pub fn matches(&self, target: &SelectionTarget) -> bool {
        self.cloud == target.cloud && self.region == target.region && self.arch == target.arch
    }
}

/// The (cloud, region, arch) tuple used to pick an image out of a manifest.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SelectionTarget {
    pub cloud: String,
    pub region: String,
    pub arch: String,
}

impl SelectionTarget {
    pub fn new<S1, S2, S3>(cloud: S1, region: S2, arch: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            cloud: cloud.into(),
            region: region.into(),
            arch: arch.into(),
        }
    }
}

impl Display for SelectionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cloud '{}', region '{}', arch '{}'",
            self.cloud, self.region, self.arch
        )
    }
}

/// The subset of a "latest release" response that we use.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
}

/// Ownership information about the selected image, published as deployment outputs.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub image_id: String,
    pub owner_id: String,
    pub arn: String,
}

impl Configuration for ImageDetails {}

#[cfg(test)]
mod test {
    use super::{ImageManifestEntry, SelectionTarget};

    #[test]
    fn manifest_ignores_unknown_fields() {
        let entries: Vec<ImageManifestEntry> = serde_json::from_str(
            r#"[{"cloud":"aws","version":"v1.8.0","region":"us-east-1","arch":"amd64","id":"ami-111"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].id, "ami-111");
        assert!(entries[0].matches(&SelectionTarget::new("aws", "us-east-1", "amd64")));
        assert!(!entries[0].matches(&SelectionTarget::new("aws", "us-east-1", "arm64")));
    }
}
