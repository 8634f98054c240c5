use super::error::ClientResult;
use super::implementation::StateFile;
use crate::provider::{ProviderError, Spec};
use crate::BootstrapData;
use cluster_model::{AgentStatus, Configuration};

/// `AgentClient` allows the [`Agent`] to record the lifecycle of a deployment.
///
/// This is provided as a trait so that mock implementations can be injected into the [`Agent`] for
/// testing purposes. In practice you will use the [`DefaultAgentClient`].
///
#[async_trait::async_trait]
pub trait AgentClient: Sized + Send + Sync {
    /// Create a new `AgentClient`.
    async fn new(data: BootstrapData) -> ClientResult<Self>;

    /// Record the specification that resources are about to be created from.
    async fn send_spec<Config>(&self, spec: &Spec<Config>) -> ClientResult<()>
    where
        Config: Configuration;

    /// Get the recorded specification. `None` if nothing was recorded.
    async fn get_spec<Config>(&self) -> ClientResult<Option<Spec<Config>>>
    where
        Config: Configuration;

    /// Get the resource that was created. `None` if it hasn't been created.
    async fn get_created_resource<Resource>(&self) -> ClientResult<Option<Resource>>
    where
        Resource: Configuration;

    /// Get the last recorded lifecycle status. `None` if nothing has happened yet.
    async fn get_status(&self) -> ClientResult<Option<AgentStatus>>;

    /// Record that the creation of resources is starting.
    async fn send_create_starting(&self) -> ClientResult<()>;

    /// Record that resource creation succeeded along with the resource that was created.
    async fn send_create_succeeded<Resource>(&self, resource: Resource) -> ClientResult<()>
    where
        Resource: Configuration;

    /// Record that the creation of resources failed.
    async fn send_create_failed(&self, error: &ProviderError) -> ClientResult<()>;

    /// Record that the destruction of resources is starting.
    async fn send_destroy_starting(&self) -> ClientResult<()>;

    /// Record that the destruction of resources succeeded.
    async fn send_destroy_succeeded(&self) -> ClientResult<()>;

    /// Record that the destruction of resources failed.
    async fn send_destroy_failed(&self, error: &ProviderError) -> ClientResult<()>;
}

/// Provides the default [`AgentClient`] implementation.
#[derive(Clone, Debug)]
pub struct DefaultAgentClient {
    pub(super) data: BootstrapData,
    pub(super) state: StateFile,
}

impl DefaultAgentClient {
    pub fn data(&self) -> &BootstrapData {
        &self.data
    }
}
