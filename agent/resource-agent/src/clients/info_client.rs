use super::error::ClientResult;
use super::implementation::StateFile;
use crate::BootstrapData;
use cluster_model::Configuration;

/// `InfoClient` allows [`Create`] and [`Destroy`] objects to store arbitrary information in the
/// deployment state file. Store the ID of each resource as soon as it exists. That way, if a
/// failure occurs, `destroy` can retrieve the IDs and remove what was left behind.
///
/// You define a "plain old data" struct to represent the information that you want to store and
/// provide this type for the `Info` type parameter.
///
/// This is provided as a trait so that mock implementations can be injected into the [`Agent`] for
/// testing purposes. In practice you will use the [`DefaultInfoClient`].
///
#[async_trait::async_trait]
pub trait InfoClient: Sized + Send + Sync {
    /// Create a new `InfoClient` object.
    async fn new(data: BootstrapData) -> ClientResult<Self>;

    /// Get the stored information. Returns `Info::default()` when nothing has been stored.
    async fn get_info<Info>(&self) -> ClientResult<Info>
    where
        Info: Configuration;

    /// Send (overwrite) the stored information.
    async fn send_info<Info>(&self, info: Info) -> ClientResult<()>
    where
        Info: Configuration;
}

/// Provides the default [`InfoClient`] implementation.
#[derive(Clone, Debug)]
pub struct DefaultInfoClient {
    pub(super) data: BootstrapData,
    pub(super) state: StateFile,
}

impl DefaultInfoClient {
    pub fn data(&self) -> &BootstrapData {
        &self.data
    }
}
