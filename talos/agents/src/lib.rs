/*!

This library provides the pieces that stand up a Talos Linux cluster on AWS: selecting the Talos
image from the release manifest, planning and creating the network, the security groups and the
API load balancer, generating machine configurations with `talosctl`, and launching the nodes.

[`ClusterCreator`] and [`ClusterDestroyer`] implement the `resource-agent` provider traits on top
of any [`Cloud`]; [`AwsCloud`] is the real one.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use aws::AwsCloud;
pub use cloud::{Cloud, InstanceAddresses, LaunchRequest, LoadBalancerEndpoint, ResourceTags};
pub use deployment::{ClusterCreator, ClusterDestroyer, ProductionMemo, Step};
pub use error::{Error, Result};
pub use http::http_client;
pub use image::{select_image, ImageCatalog, SelectedImage};
pub use network::{plan_subnets, Ipv4Cidr, NetworkTopology, PublicSubnet, SubnetPlan};
pub use plan::{plan_nodes, DeploymentPlan, NodeSlot};
pub use security::{caller_ip, security_rules, SecurityGroups, SecurityRule};
pub use talosctl::{ConfigGenerator, GeneratedConfigArtifact, GeneratedConfigs};

mod aws;
mod cloud;
mod deployment;
pub mod error;
mod http;
mod image;
pub mod network;
mod plan;
pub mod security;
mod talosctl;
