/*!

The `resource-agent` library drives the creation and destruction of a set of cloud resources.
You implement the [`Create`] and [`Destroy`] traits, then hand these to an [`Agent`] object, which
records the lifecycle of the resources in a deployment state file.

!*/

mod agent;
mod bootstrap;
pub mod clients;
pub mod error;
pub mod provider;

pub use agent::{Agent, Types};
pub use bootstrap::BootstrapData;
pub use cluster_model::{Configuration, DestructionPolicy};
