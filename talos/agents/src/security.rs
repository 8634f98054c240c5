/*!

The two security groups of a deployment and the rules between them.

!*/

use crate::error::{self, Result};
use crate::network::Ipv4Cidr;
use log::info;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Which of the deployment's security groups a rule belongs to or refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupRef {
    /// Attached to every cluster node.
    Cluster,
    /// Attached to the network load balancer.
    LoadBalancer,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Ingress,
    Egress,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Protocol {
    /// Every protocol and port.
    All,
    /// TCP on a single port.
    Tcp(u16),
}

impl Protocol {
    /// The protocol name EC2 expects.
    pub fn ip_protocol(&self) -> &'static str {
        match self {
            Protocol::All => "-1",
            Protocol::Tcp(_) => "tcp",
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            Protocol::All => None,
            Protocol::Tcp(port) => Some(*port),
        }
    }
}

/// The other side of a rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Peer {
    Cidr(Ipv4Cidr),
    Group(GroupRef),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRule {
    pub name: &'static str,
    pub group: GroupRef,
    pub direction: Direction,
    pub protocol: Protocol,
    pub peer: Peer,
}

/// The ids of the two security groups once they exist.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroups {
    pub cluster: String,
    pub load_balancer: String,
}

impl SecurityGroups {
    pub fn id(&self, group: GroupRef) -> &str {
        match group {
            GroupRef::Cluster => &self.cluster,
            GroupRef::LoadBalancer => &self.load_balancer,
        }
    }
}

/// Every rule of a deployment. None of them depends on another.
pub fn security_rules(caller: Ipv4Addr, network: Ipv4Cidr, api_port: u16) -> Vec<SecurityRule> {
    let anywhere = Peer::Cidr(Ipv4Cidr::ANYWHERE);
    vec![
        SecurityRule {
            name: "allow-cluster-internal",
            group: GroupRef::Cluster,
            direction: Direction::Ingress,
            protocol: Protocol::All,
            peer: Peer::Group(GroupRef::Cluster),
        },
        SecurityRule {
            name: "allow-from-caller",
            group: GroupRef::Cluster,
            direction: Direction::Ingress,
            protocol: Protocol::All,
            peer: Peer::Cidr(Ipv4Cidr::host(caller)),
        },
        SecurityRule {
            name: "allow-all-outbound",
            group: GroupRef::Cluster,
            direction: Direction::Egress,
            protocol: Protocol::All,
            peer: anywhere,
        },
        SecurityRule {
            name: "allow-api-to-load-balancer",
            group: GroupRef::LoadBalancer,
            direction: Direction::Ingress,
            protocol: Protocol::Tcp(api_port),
            peer: anywhere,
        },
        SecurityRule {
            name: "allow-api-to-nodes",
            group: GroupRef::LoadBalancer,
            direction: Direction::Egress,
            protocol: Protocol::Tcp(api_port),
            peer: Peer::Cidr(network),
        },
        SecurityRule {
            name: "allow-load-balancer-to-cluster",
            group: GroupRef::Cluster,
            direction: Direction::Ingress,
            protocol: Protocol::All,
            peer: Peer::Group(GroupRef::LoadBalancer),
        },
    ]
}

/// Ask `url` for the caller's public address.
pub async fn caller_ip(client: &reqwest::Client, url: &str) -> Result<Ipv4Addr> {
    let body = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .context(error::CallerIpUnavailableSnafu { url })?
        .text()
        .await
        .context(error::CallerIpUnavailableSnafu { url })?;
    let body = body.trim();
    let address = Ipv4Addr::from_str(body).context(error::InvalidCallerIpSnafu { url, body })?;
    info!("Caller address is '{}'", address);
    Ok(address)
}

#[test]
fn rules_scope_caller_to_a_single_address() {
    let network = Ipv4Cidr::from_str("10.230.0.0/16").unwrap();
    let rules = security_rules(Ipv4Addr::new(203, 0, 113, 7), network, 6443);
    assert_eq!(rules.len(), 6);
    let caller = rules.iter().find(|r| r.name == "allow-from-caller").unwrap();
    assert_eq!(
        caller.peer,
        Peer::Cidr(Ipv4Cidr::from_str("203.0.113.7/32").unwrap())
    );
    let lb_in = rules
        .iter()
        .find(|r| r.name == "allow-api-to-load-balancer")
        .unwrap();
    assert_eq!(lb_in.protocol.port(), Some(6443));
    assert_eq!(
        lb_in.peer,
        Peer::Cidr(Ipv4Cidr::from_str(cluster_model::constants::ANYWHERE_CIDR).unwrap())
    );
    let lb_out = rules.iter().find(|r| r.name == "allow-api-to-nodes").unwrap();
    assert_eq!(lb_out.peer, Peer::Cidr(network));
    assert_eq!(lb_out.direction, Direction::Egress);
}
