/*!

This library provides the plain-data model shared by the talos-aws crates: the deployment
configuration, the image manifest records, the node records and the published outputs.

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

pub use configuration::Configuration;
pub use deployment::{DeploymentConfig, SubnetAssignment};
pub use error::{Error, Result};
pub use image::{ImageDetails, ImageManifestEntry, ReleaseInfo, SelectionTarget};
pub use node::{ClusterNode, NodeRole};
pub use outputs::DeploymentOutputs;
pub use resource::{AgentStatus, DestructionPolicy, ResourceAction};

mod configuration;
pub mod constants;
mod deployment;
mod error;
mod image;
mod node;
mod outputs;
mod resource;
