use crate::constants::{
    DEFAULT_API_PORT, DEFAULT_CALLER_IP_URL, DEFAULT_CLUSTER_NAME, DEFAULT_CONTROL_PLANE_COUNT,
    DEFAULT_DEPLOYMENT_NAME, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IMAGE_ARCH, DEFAULT_IMAGE_CLOUD,
    DEFAULT_INSTALL_DISK, DEFAULT_INSTANCE_TYPE, DEFAULT_MANIFEST_URL_TEMPLATE,
    DEFAULT_NETWORK_CIDR, DEFAULT_RELEASE_URL, DEFAULT_SUBNET_PREFIX, DEFAULT_TALOSCTL,
    DEFAULT_TIME_SERVER, DEFAULT_WORKER_COUNT, DEFAULT_ZONE_LIMIT, MANIFEST_VERSION_PLACEHOLDER,
    MAX_DEPLOYMENT_NAME_LEN,
};
use crate::error::{self, Result};
use crate::{Configuration, SelectionTarget};
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How node indexes map onto the public subnets.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubnetAssignment {
    /// Node `i` of a role goes into subnet `i`. A role with more nodes than there are subnets is
    /// rejected before anything is created.
    Indexed,
    /// Node `i` of a role goes into subnet `i % subnet_count`.
    RoundRobin,
}

impl Default for SubnetAssignment {
    fn default() -> Self {
        Self::Indexed
    }
}

derive_display_from_serialize!(SubnetAssignment);
derive_fromstr_from_deserialize!(SubnetAssignment);

/// Everything needed to stand up (and later tear down) one Talos cluster on AWS.
///
/// Every field has a default so a deployment file only needs to list what it changes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentConfig {
    /// Used to name and tag every AWS resource of this deployment.
    pub name: String,

    /// The AWS region. When absent the AWS default provider chain decides.
    pub region: Option<String>,

    /// An IAM role to assume for all AWS calls.
    pub assume_role: Option<String>,

    /// The VPC address block.
    pub network_cidr: String,

    /// The prefix length of each public subnet carved out of `network_cidr`.
    pub subnet_prefix: u8,

    /// The maximum number of availability zones (and therefore public subnets) to use.
    pub zone_limit: usize,

    pub control_plane_count: usize,
    pub worker_count: usize,
    pub subnet_assignment: SubnetAssignment,
    pub instance_type: String,

    /// The name passed to `talosctl gen config`.
    pub cluster_name: String,

    /// The Kubernetes API port, used by the load balancer, its listener and its targets.
    pub api_port: u16,

    pub install_disk: String,
    pub time_servers: Vec<String>,

    /// The `talosctl` executable.
    pub talosctl_path: PathBuf,

    /// The directory `talosctl` writes the generated machine configurations into.
    pub work_dir: PathBuf,

    pub image_cloud: String,
    pub image_arch: String,

    /// Where to look up the latest Talos release tag.
    pub release_url: String,

    /// Where to fetch the image manifest from. `{version}` is replaced by the release tag.
    pub manifest_url_template: String,

    /// A plain text endpoint that returns the caller's public IP address.
    pub caller_ip_url: String,

    /// The timeout applied to each outbound HTTP request.
    pub http_timeout_secs: u64,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEPLOYMENT_NAME.to_string(),
            region: None,
            assume_role: None,
            network_cidr: DEFAULT_NETWORK_CIDR.to_string(),
            subnet_prefix: DEFAULT_SUBNET_PREFIX,
            zone_limit: DEFAULT_ZONE_LIMIT,
            control_plane_count: DEFAULT_CONTROL_PLANE_COUNT,
            worker_count: DEFAULT_WORKER_COUNT,
            subnet_assignment: SubnetAssignment::default(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            api_port: DEFAULT_API_PORT,
            install_disk: DEFAULT_INSTALL_DISK.to_string(),
            time_servers: vec![DEFAULT_TIME_SERVER.to_string()],
            talosctl_path: PathBuf::from(DEFAULT_TALOSCTL),
            work_dir: PathBuf::from("."),
            image_cloud: DEFAULT_IMAGE_CLOUD.to_string(),
            image_arch: DEFAULT_IMAGE_ARCH.to_string(),
            release_url: DEFAULT_RELEASE_URL.to_string(),
            manifest_url_template: DEFAULT_MANIFEST_URL_TEMPLATE.to_string(),
            caller_ip_url: DEFAULT_CALLER_IP_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Configuration for DeploymentConfig {}

impl DeploymentConfig {
    /// Read a YAML deployment file. Fields missing from the file take their default values.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(error::DeploymentFileReadSnafu {
            path: path.to_path_buf(),
        })?;
        Ok(
            serde_yaml::from_str(&contents).context(error::DeploymentFileParseSnafu {
                path: path.to_path_buf(),
            })?,
        )
    }

    /// Check the values that can be checked without talking to anyone.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_DEPLOYMENT_NAME_LEN {
            return invalid(format!(
                "name '{}' must be between 1 and {} characters",
                self.name, MAX_DEPLOYMENT_NAME_LEN
            ));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            || self.name.starts_with('-')
            || self.name.ends_with('-')
        {
            return invalid(format!(
                "name '{}' may only contain lowercase letters, digits and inner hyphens",
                self.name
            ));
        }
        if self.zone_limit == 0 {
            return invalid("zoneLimit must be at least 1");
        }
        if self.subnet_prefix > 32 {
            return invalid(format!(
                "subnetPrefix {} is not a valid IPv4 prefix length",
                self.subnet_prefix
            ));
        }
        if self.control_plane_count == 0 {
            return invalid("controlPlaneCount must be at least 1");
        }
        if !self
            .manifest_url_template
            .contains(MANIFEST_VERSION_PLACEHOLDER)
        {
            return invalid(format!(
                "manifestUrlTemplate '{}' does not contain '{}'",
                self.manifest_url_template, MANIFEST_VERSION_PLACEHOLDER
            ));
        }
        if self.http_timeout_secs == 0 {
            return invalid("httpTimeoutSecs must be at least 1");
        }
        Ok(())
    }

    /// The image we are looking for in `region`.
    pub fn selection_target<S: Into<String>>(&self, region: S) -> SelectionTarget {
        SelectionTarget::new(&self.image_cloud, region, &self.image_arch)
    }

    /// The manifest URL for the release `version`.
    pub fn manifest_url(&self, version: &str) -> String {
        self.manifest_url_template
            .replace(MANIFEST_VERSION_PLACEHOLDER, version)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn load_balancer_name(&self) -> String {
        format!("{}-nlb", self.name)
    }

    pub fn target_group_name(&self) -> String {
        format!("{}-tg", self.name)
    }
}

fn invalid<S: Into<String>>(message: S) -> Result<()> {
    Err(error::InvalidConfigurationSnafu {
        message: message.into(),
    }
    .build()
    .into())
}
