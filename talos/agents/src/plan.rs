/*!

Everything that can be decided before the first resource is created: which zones get a public
subnet, which address block each subnet gets, and which subnet each node lands in. A deployment
that cannot be placed fails here, leaving nothing behind.

!*/

use crate::error::{self, Result};
use crate::network::{plan_subnets, Ipv4Cidr, SubnetPlan};
use cluster_model::{DeploymentConfig, NodeRole, SubnetAssignment};
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};
use std::str::FromStr;

/// Where one node of the deployment goes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSlot {
    pub role: NodeRole,
    /// The index of the node within its role.
    pub index: usize,
    /// The index of the public subnet the node is launched into.
    pub subnet_index: usize,
}

impl NodeSlot {
    pub fn name(&self) -> String {
        self.role.node_name(self.index)
    }
}

/// Assign control plane nodes, then workers, to subnets.
pub fn plan_nodes(
    control_plane_count: usize,
    worker_count: usize,
    subnet_count: usize,
    assignment: SubnetAssignment,
) -> Result<Vec<NodeSlot>> {
    let roles = [
        (NodeRole::ControlPlane, control_plane_count),
        (NodeRole::Worker, worker_count),
    ];
    let mut slots = Vec::new();
    for (role, count) in roles {
        for index in 0..count {
            let subnet_index = match assignment {
                SubnetAssignment::Indexed => index,
                SubnetAssignment::RoundRobin if subnet_count > 0 => index % subnet_count,
                SubnetAssignment::RoundRobin => index,
            };
            ensure!(
                subnet_index < subnet_count,
                error::SubnetIndexOutOfRangeSnafu {
                    role,
                    index,
                    subnet_count,
                }
            );
            slots.push(NodeSlot {
                role,
                index,
                subnet_index,
            });
        }
    }
    Ok(slots)
}

/// The complete placement of a deployment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    pub network: Ipv4Cidr,
    pub subnets: Vec<SubnetPlan>,
    pub nodes: Vec<NodeSlot>,
}

impl DeploymentPlan {
    /// Place the deployment described by `config` onto the availability `zones` of `region`.
    pub fn build(config: &DeploymentConfig, region: &str, zones: &[String]) -> Result<Self> {
        config
            .validate()
            .context(error::InvalidConfigurationSnafu)?;
        let network = Ipv4Cidr::from_str(&config.network_cidr)?;
        ensure!(
            !zones.is_empty(),
            error::NoAvailabilityZonesSnafu { region }
        );
        let subnets = plan_subnets(&network, config.subnet_prefix, config.zone_limit, zones)?;
        let nodes = plan_nodes(
            config.control_plane_count,
            config.worker_count,
            subnets.len(),
            config.subnet_assignment,
        )?;
        Ok(Self {
            network,
            subnets,
            nodes,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{plan_nodes, DeploymentPlan};
    use crate::error::Error;
    use cluster_model::{DeploymentConfig, NodeRole, SubnetAssignment};

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn indexed_places_node_i_in_subnet_i() {
        let slots = plan_nodes(1, 2, 3, SubnetAssignment::Indexed).unwrap();
        let placed: Vec<(NodeRole, usize, usize)> = slots
            .iter()
            .map(|slot| (slot.role, slot.index, slot.subnet_index))
            .collect();
        assert_eq!(
            placed,
            vec![
                (NodeRole::ControlPlane, 0, 0),
                (NodeRole::Worker, 0, 0),
                (NodeRole::Worker, 1, 1),
            ]
        );
        assert_eq!(slots[2].name(), "talos-wkr-1");
    }

    #[test]
    fn indexed_rejects_more_nodes_than_subnets() {
        let error = plan_nodes(1, 3, 2, SubnetAssignment::Indexed).unwrap_err();
        match error {
            Error::SubnetIndexOutOfRange {
                role,
                index,
                subnet_count,
            } => {
                assert_eq!(role, NodeRole::Worker);
                assert_eq!(index, 2);
                assert_eq!(subnet_count, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn huge_worker_count_is_rejected_without_allocating() {
        let error = plan_nodes(1, usize::MAX / 2, 3, SubnetAssignment::Indexed).unwrap_err();
        assert!(matches!(
            error,
            Error::SubnetIndexOutOfRange {
                role: NodeRole::Worker,
                index: 3,
                subnet_count: 3,
            }
        ));
        let error = plan_nodes(usize::MAX, usize::MAX, 3, SubnetAssignment::Indexed).unwrap_err();
        assert!(matches!(
            error,
            Error::SubnetIndexOutOfRange {
                role: NodeRole::ControlPlane,
                ..
            }
        ));
    }

    #[test]
    fn round_robin_wraps() {
        let slots = plan_nodes(1, 5, 2, SubnetAssignment::RoundRobin).unwrap();
        let workers: Vec<usize> = slots
            .iter()
            .filter(|slot| slot.role == NodeRole::Worker)
            .map(|slot| slot.subnet_index)
            .collect();
        assert_eq!(workers, vec![0, 1, 0, 1, 0]);
        assert!(plan_nodes(1, 0, 0, SubnetAssignment::RoundRobin).is_err());
    }

    #[test]
    fn reference_deployment_plan() {
        let config = DeploymentConfig::default();
        let plan = DeploymentPlan::build(
            &config,
            "us-east-1",
            &zones(&["us-east-1a", "us-east-1b", "us-east-1c", "us-east-1d"]),
        )
        .unwrap();
        assert_eq!(plan.subnets.len(), 3);
        assert_eq!(plan.subnets[2].cidr.to_string(), "10.230.2.0/24");
        assert_eq!(plan.nodes.len(), 3);
        let control_plane = plan
            .nodes
            .iter()
            .filter(|slot| slot.role == NodeRole::ControlPlane)
            .count();
        assert_eq!(control_plane, 1);
    }

    #[test]
    fn no_zones_names_the_region() {
        let error = DeploymentPlan::build(&DeploymentConfig::default(), "eu-south-9", &[])
            .unwrap_err();
        assert!(matches!(error, Error::NoAvailabilityZones { ref region } if region == "eu-south-9"));
    }

    #[test]
    fn invalid_configuration_is_rejected_first() {
        let config = DeploymentConfig {
            control_plane_count: 0,
            ..Default::default()
        };
        let error = DeploymentPlan::build(&config, "us-east-1", &zones(&["us-east-1a"]))
            .unwrap_err();
        assert!(matches!(error, Error::InvalidConfiguration { .. }));
    }
}
