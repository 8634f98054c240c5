/*!

IPv4 address blocks and the partitioning of the VPC block into one public subnet per
availability zone.

!*/

use crate::error::{self, Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::ensure;
use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation. The host bits of the address are always zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

impl Ipv4Cidr {
    /// `0.0.0.0/0`
    pub const ANYWHERE: Ipv4Cidr = Ipv4Cidr {
        network: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self> {
        let cidr = format!("{}/{}", network, prefix);
        ensure!(
            prefix <= 32,
            error::InvalidCidrSnafu {
                cidr,
                reason: "the prefix length must be at most 32",
            }
        );
        ensure!(
            u32::from(network) & !mask(prefix) == 0,
            error::InvalidCidrSnafu {
                cidr,
                reason: "host bits are set",
            }
        );
        Ok(Self { network, prefix })
    }

    /// The `/32` block holding exactly `address`.
    pub fn host(address: Ipv4Addr) -> Self {
        Self {
            network: address,
            prefix: 32,
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// The last address of the block.
    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network) | !mask(self.prefix))
    }

    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix
            && u32::from(other.network) & mask(self.prefix) == u32::from(self.network)
    }

    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The blocks of length `new_prefix` that partition this block, in address order.
    pub fn subnets(&self, new_prefix: u8) -> Result<impl Iterator<Item = Ipv4Cidr>> {
        ensure!(
            new_prefix >= self.prefix && new_prefix <= 32,
            error::PartitionPrefixSnafu {
                network: self.to_string(),
                prefix: new_prefix,
            }
        );
        let count = 1u64 << (new_prefix - self.prefix);
        let step = 1u64 << (32 - new_prefix);
        let base = u64::from(u32::from(self.network));
        Ok((0..count).map(move |i| Ipv4Cidr {
            // Stays within the parent block, which ends at or below u32::MAX.
            network: Ipv4Addr::from((base + i * step) as u32),
            prefix: new_prefix,
        }))
    }
}

impl Display for Ipv4Cidr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidCidr {
            cidr: s.to_string(),
            reason: reason.to_string(),
        };
        let (address, prefix) = s
            .split_once('/')
            .ok_or_else(|| invalid("expected an address and a prefix length"))?;
        let address =
            Ipv4Addr::from_str(address).map_err(|_| invalid("not an IPv4 address"))?;
        let prefix = u8::from_str(prefix).map_err(|_| invalid("not a prefix length"))?;
        Self::new(address, prefix)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4Cidr::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A public subnet that is yet to be created.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetPlan {
    pub zone: String,
    pub cidr: Ipv4Cidr,
}

/// A public subnet that has been created.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSubnet {
    pub subnet_id: String,
    pub zone: String,
    pub cidr: Ipv4Cidr,
}

/// The VPC and everything that makes its subnets public.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTopology {
    pub vpc_id: String,
    pub cidr: Ipv4Cidr,
    pub internet_gateway_id: String,
    pub subnets: Vec<PublicSubnet>,
}

impl NetworkTopology {
    pub fn subnet_ids(&self) -> Vec<String> {
        self.subnets.iter().map(|s| s.subnet_id.clone()).collect()
    }
}

/// Carve `network` into `/prefix` blocks and bind them, in order, to the zones in the order they
/// are given. Yields `min(blocks, zone_limit, zones.len())` subnets.
pub fn plan_subnets(
    network: &Ipv4Cidr,
    prefix: u8,
    zone_limit: usize,
    zones: &[String],
) -> Result<Vec<SubnetPlan>> {
    Ok(network
        .subnets(prefix)?
        .zip(zones.iter())
        .take(zone_limit)
        .map(|(cidr, zone)| SubnetPlan {
            zone: zone.clone(),
            cidr,
        })
        .collect())
}

#[cfg(test)]
mod test {
    use super::{plan_subnets, Ipv4Cidr};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn zones(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("us-east-1{}", (b'a' + i as u8) as char)).collect()
    }

    #[test]
    fn parse_and_display() {
        let cidr = Ipv4Cidr::from_str("10.230.0.0/16").unwrap();
        assert_eq!(cidr.network(), Ipv4Addr::new(10, 230, 0, 0));
        assert_eq!(cidr.prefix(), 16);
        assert_eq!(cidr.broadcast(), Ipv4Addr::new(10, 230, 255, 255));
        assert_eq!(cidr.to_string(), "10.230.0.0/16");
        assert_eq!(Ipv4Cidr::host(Ipv4Addr::new(203, 0, 113, 7)).to_string(), "203.0.113.7/32");
    }

    #[test]
    fn parse_rejects_bad_blocks() {
        for bad in ["10.230.0.0", "10.230.0.0/33", "10.230.1.0/16", "10.230.0/16", "x/8"] {
            assert!(Ipv4Cidr::from_str(bad).is_err(), "{} should not parse", bad);
        }
        assert!(Ipv4Cidr::from_str("0.0.0.0/0").is_ok());
    }

    #[test]
    fn reference_network_yields_three_subnets() {
        let network = Ipv4Cidr::from_str("10.230.0.0/16").unwrap();
        let plan = plan_subnets(&network, 24, 3, &zones(6)).unwrap();
        let cidrs: Vec<String> = plan.iter().map(|p| p.cidr.to_string()).collect();
        assert_eq!(cidrs, vec!["10.230.0.0/24", "10.230.1.0/24", "10.230.2.0/24"]);
        let bound: Vec<&str> = plan.iter().map(|p| p.zone.as_str()).collect();
        assert_eq!(bound, vec!["us-east-1a", "us-east-1b", "us-east-1c"]);
    }

    #[test]
    fn subnet_count_is_the_smallest_bound() {
        let network = Ipv4Cidr::from_str("10.0.0.0/23").unwrap();
        // Two /24 blocks, limit 3, five zones.
        assert_eq!(plan_subnets(&network, 24, 3, &zones(5)).unwrap().len(), 2);
        // 256 blocks, limit 3, two zones.
        let network = Ipv4Cidr::from_str("10.0.0.0/16").unwrap();
        assert_eq!(plan_subnets(&network, 24, 3, &zones(2)).unwrap().len(), 2);
        assert_eq!(plan_subnets(&network, 24, 4, &zones(6)).unwrap().len(), 4);
        assert!(plan_subnets(&network, 24, 3, &[]).unwrap().is_empty());
    }

    #[test]
    fn subnets_are_disjoint_and_inside_the_parent() {
        for (parent, prefix) in [("10.230.0.0/16", 24), ("192.168.0.0/22", 25), ("10.0.0.0/8", 8)] {
            let parent = Ipv4Cidr::from_str(parent).unwrap();
            let subnets: Vec<Ipv4Cidr> = parent.subnets(prefix).unwrap().take(64).collect();
            for (i, a) in subnets.iter().enumerate() {
                assert!(parent.contains(a));
                for b in subnets.iter().skip(i + 1) {
                    assert!(!a.overlaps(b), "{} overlaps {}", a, b);
                }
            }
        }
    }

    #[test]
    fn partition_prefix_must_not_be_shorter() {
        let network = Ipv4Cidr::from_str("10.230.0.0/16").unwrap();
        assert!(network.subnets(15).is_err());
        assert!(network.subnets(33).is_err());
        assert_eq!(network.subnets(32).unwrap().count(), 65536);
    }

    #[test]
    fn serde_uses_cidr_notation() {
        let cidr = Ipv4Cidr::from_str("10.230.2.0/24").unwrap();
        assert_eq!(serde_json::to_string(&cidr).unwrap(), "\"10.230.2.0/24\"");
        let back: Ipv4Cidr = serde_json::from_str("\"10.230.2.0/24\"").unwrap();
        assert_eq!(back, cidr);
        assert!(serde_json::from_str::<Ipv4Cidr>("\"10.230.2.1/24\"").is_err());
    }
}
