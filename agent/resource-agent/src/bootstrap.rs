/*!

The `bootstrap` module defines the data needed to construct the [`Agent`] and its clients.

!*/

use cluster_model::DestructionPolicy;
use std::path::PathBuf;

/// Data that tells the agent which deployment it is working on and where its state lives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootstrapData {
    /// The unique name of the deployment that we are providing.
    pub deployment_name: String,
    /// The JSON file that holds the deployment's configuration, memo and created resource.
    pub state_path: PathBuf,
    /// What to do with leftover resources when creation fails.
    pub destruction_policy: DestructionPolicy,
}

impl BootstrapData {
    pub fn new<S, P>(deployment_name: S, state_path: P) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            deployment_name: deployment_name.into(),
            state_path: state_path.into(),
            destruction_policy: DestructionPolicy::default(),
        }
    }

    pub fn destruction_policy(mut self, destruction_policy: DestructionPolicy) -> Self {
        self.destruction_policy = destruction_policy;
        self
    }
}
