use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// The role a cluster node plays. Each role boots from its own generated machine configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

derive_display_from_serialize!(NodeRole);
derive_fromstr_from_deserialize!(NodeRole);

impl NodeRole {
    /// The prefix used for the `Name` tag of instances in this role, e.g. `talos-cp-0`.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            NodeRole::ControlPlane => "talos-cp",
            NodeRole::Worker => "talos-wkr",
        }
    }

    /// The prefix of this role's keys in the published outputs, e.g. `cpInstance0Id`.
    pub fn output_prefix(&self) -> &'static str {
        match self {
            NodeRole::ControlPlane => "cpInstance",
            NodeRole::Worker => "wkrInstance",
        }
    }

    pub fn node_name(&self, index: usize) -> String {
        format!("{}-{}", self.name_prefix(), index)
    }
}

/// A node that has been launched.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    pub role: NodeRole,
    /// The index of this node within its role.
    pub index: usize,
    pub name: String,
    pub instance_id: String,
    pub subnet_id: String,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

#[test]
fn node_role_strings() {
    use std::str::FromStr;
    assert_eq!(NodeRole::ControlPlane.to_string(), "controlPlane");
    assert_eq!(NodeRole::from_str("worker").unwrap(), NodeRole::Worker);
    assert_eq!(NodeRole::Worker.node_name(1), "talos-wkr-1");
}
