mod error;

pub use self::error::{AsResources, IntoProviderError, ProviderError, ProviderResult, Resources};
use crate::clients::InfoClient;
use cluster_model::Configuration;
use serde::{Deserialize, Serialize};

/// The user-provided specification of what should be created.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = ""))]
pub struct Spec<C>
where
    C: Configuration,
{
    pub configuration: C,
}

impl<C> Spec<C>
where
    C: Configuration,
{
    pub fn new(configuration: C) -> Self {
        Self { configuration }
    }
}

/// You implement the [`Create`] trait in order to create resources. This type is then injected into
/// the [`Agent`] object which drives the program.
///
/// ## Custom Types
///
/// - `Config` is the information that users must provide in order for you to create resources.
///   For example, the number of instances to launch.
///
/// - `Info` is any data that you want to record in the state file while creating or destroying.
///   Record every resource ID as soon as you have it so that `destroy` can find it if `create`
///   fails halfway.
///
/// - `Resource` is the information you provide back to the user about what you created.
///
#[async_trait::async_trait]
pub trait Create: Sized + Send + Sync {
    type Config: Configuration;
    type Info: Configuration;
    type Resource: Configuration;

    /// Create resources as defined by the `spec`. Use `client` to record progress.
    async fn create<I>(
        &self,
        spec: Spec<Self::Config>,
        client: &I,
    ) -> ProviderResult<Self::Resource>
    where
        I: InfoClient;
}

/// You implement the [`Destroy`] trait in order to destroy resources that a [`Create`]
/// implementation has previously created.
///
/// The `Config`, `Info` and `Resource` types are the same as the ones of the matching [`Create`]
/// implementation.
#[async_trait::async_trait]
pub trait Destroy: Sized + Send + Sync {
    type Config: Configuration;
    type Info: Configuration;
    type Resource: Configuration;

    /// Destroy the resources. If `create` failed, `resource` will be `None` and the resources that
    /// need destroying must be found through the `Info` stored with `client`. `spec` is `None` if
    /// the state file does not hold the configuration the resources were created with.
    async fn destroy<I>(
        &self,
        spec: Option<Spec<Self::Config>>,
        resource: Option<Self::Resource>,
        client: &I,
    ) -> ProviderResult<()>
    where
        I: InfoClient;
}
