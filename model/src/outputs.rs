use crate::{ClusterNode, Configuration, ImageDetails};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a finished deployment publishes to operators and downstream tooling.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentOutputs {
    pub region: String,
    pub vpc_id: String,
    pub public_subnet_ids: Vec<String>,
    pub image: ImageDetails,
    pub nlb_dns_name: String,
    pub control_plane: Vec<ClusterNode>,
    pub workers: Vec<ClusterNode>,
    /// The client configuration `talosctl` wrote next to the machine configurations.
    pub talosconfig: Option<PathBuf>,
}

impl Configuration for DeploymentOutputs {}

impl DeploymentOutputs {
    /// The outputs as ordered key/value pairs, using the well-known export names.
    pub fn exports(&self) -> Vec<(String, String)> {
        let mut exports = vec![
            ("vpcId".to_string(), self.vpc_id.clone()),
            (
                "publicSubnetIds".to_string(),
                self.public_subnet_ids.join(","),
            ),
            ("talosImageId".to_string(), self.image.image_id.clone()),
            ("talosOwnerId".to_string(), self.image.owner_id.clone()),
            ("talosArn".to_string(), self.image.arn.clone()),
            ("nlbDnsName".to_string(), self.nlb_dns_name.clone()),
        ];
        for node in self.control_plane.iter().chain(self.workers.iter()) {
            let prefix = format!("{}{}", node.role.output_prefix(), node.index);
            exports.push((format!("{}Id", prefix), node.instance_id.clone()));
            exports.push((
                format!("{}PublicIp", prefix),
                node.public_ip.clone().unwrap_or_default(),
            ));
            exports.push((
                format!("{}PrivateIp", prefix),
                node.private_ip.clone().unwrap_or_default(),
            ));
        }
        if let Some(talosconfig) = &self.talosconfig {
            exports.push((
                "talosconfig".to_string(),
                talosconfig.display().to_string(),
            ));
        }
        exports
    }
}
