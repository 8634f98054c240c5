/*!

The `agent` module defines the `Agent` object which drives the creation and destruction of a
deployment and records each step in the state file.

!*/

use crate::clients::{AgentClient, InfoClient};
use crate::error::{AgentError, AgentResult, ErrorMessage};
use crate::provider::{Create, Destroy, Spec};
use crate::BootstrapData;
use cluster_model::{AgentStatus, DestructionPolicy};
use log::{error, info, warn};
use std::marker::PhantomData;

/// The `Agent` drives the main program of a resource provider. It takes several injected types.
///
/// ## Dependency Injection for Testing
///
/// The `IClient` and `AClient` types are available so that you can inject mock clients and test
/// your code without touching the file system. In practice you will use the [`DefaultInfoClient`]
/// and [`DefaultAgentClient`] which keep their data in the deployment state file.
///
/// ## Your Custom Implementation
///
/// You implement the `Creator` (see [`Create`]) and `Destroyer` (see [`Destroy`]) types to create
/// and destroy resources. Their `Config`, `Info` and `Resource` types must agree.
///
pub struct Agent<IClient, AClient, Creator, Destroyer>
where
    IClient: InfoClient,
    AClient: AgentClient,
    Creator: Create,
    Destroyer: Destroy<Config = Creator::Config, Info = Creator::Info, Resource = Creator::Resource>,
{
    /// This field ensures that we are using all of the generic types in the struct's signature.
    _types: Types<IClient, AClient, Creator, Destroyer>,

    data: BootstrapData,

    /// The client that we will pass to the `Creator` and `Destroyer`.
    info_client: IClient,

    /// The client that the agent will use.
    agent_client: AClient,

    creator: Creator,
    destroyer: Destroyer,
}

/// The `Types` struct makes specifying the client types a bit easier when constructing the
/// `Agent`.
pub struct Types<IClient, AClient, Creator, Destroyer> {
    pub info_client: PhantomData<IClient>,
    pub agent_client: PhantomData<AClient>,
    pub creator: PhantomData<Creator>,
    pub destroyer: PhantomData<Destroyer>,
}

impl<IClient, AClient, Creator, Destroyer> Default for Types<IClient, AClient, Creator, Destroyer> {
    fn default() -> Self {
        Self {
            info_client: PhantomData,
            agent_client: PhantomData,
            creator: PhantomData,
            destroyer: PhantomData,
        }
    }
}

impl<IClient, AClient, Creator, Destroyer> Agent<IClient, AClient, Creator, Destroyer>
where
    IClient: InfoClient,
    AClient: AgentClient,
    Creator: Create,
    Destroyer: Destroy<Config = Creator::Config, Info = Creator::Info, Resource = Creator::Resource>,
{
    /// Create a new `Agent` by providing the bootstrapping data, the client types and the
    /// provider implementations.
    pub async fn new(
        types: Types<IClient, AClient, Creator, Destroyer>,
        data: BootstrapData,
        creator: Creator,
        destroyer: Destroyer,
    ) -> AgentResult<Self> {
        let agent_client = AClient::new(data.clone()).await?;
        let info_client = IClient::new(data.clone()).await?;
        Ok(Self {
            _types: types,
            data,
            info_client,
            agent_client,
            creator,
            destroyer,
        })
    }

    /// The last recorded lifecycle status of the deployment.
    pub async fn status(&self) -> AgentResult<Option<AgentStatus>> {
        Ok(self.agent_client.get_status().await?)
    }

    /// The resource recorded by the last successful creation.
    pub async fn resource(&self) -> AgentResult<Option<Creator::Resource>> {
        Ok(self.agent_client.get_created_resource().await?)
    }

    /// The information the provider recorded while creating or destroying.
    pub async fn info(&self) -> AgentResult<Creator::Info> {
        Ok(self.info_client.get_info().await?)
    }

    /// Create resources. Refuses to run while the state file records live or unfinished
    /// resources. When creation fails and the destruction policy is
    /// [`DestructionPolicy::OnFailure`], whatever the error says remains is destroyed before the
    /// creation error is returned.
    pub async fn create(&self, spec: Spec<Creator::Config>) -> AgentResult<Creator::Resource> {
        match self.agent_client.get_status().await? {
            None | Some(AgentStatus::Destroyed) => {}
            Some(status) => {
                return Err(AgentError::Conflict(ErrorMessage::from(format!(
                    "Deployment '{}' is in state '{}', destroy it before creating it again",
                    self.data.deployment_name, status
                ))))
            }
        }

        self.agent_client.send_spec(&spec).await?;
        self.agent_client.send_create_starting().await?;
        info!("Creating deployment '{}'", self.data.deployment_name);
        match self.creator.create(spec.clone(), &self.info_client).await {
            Ok(resource) => {
                self.agent_client
                    .send_create_succeeded(resource.clone())
                    .await?;
                info!("Created deployment '{}'", self.data.deployment_name);
                Ok(resource)
            }
            Err(e) => {
                if let Err(client_error) = self.agent_client.send_create_failed(&e).await {
                    error!("Unable to record error in the state file: {}", client_error);
                    error!("The error we failed to record is: {}", e);
                }
                if self.data.destruction_policy == DestructionPolicy::OnFailure
                    && e.resources().needs_destroy()
                {
                    warn!("Creation failed, destroying what was left behind: {}", e);
                    if let Err(destroy_error) = self.run_destroy(Some(spec), None).await {
                        error!(
                            "Unable to destroy resources after failed creation: {}",
                            destroy_error
                        );
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Destroy the resources recorded in the state file.
    pub async fn destroy(&self) -> AgentResult<()> {
        let spec = match self.agent_client.get_spec().await {
            Ok(spec) => spec,
            Err(e) => {
                error!("Unable to read the configuration from the state file: {}", e);
                None
            }
        };
        let resource = match self.agent_client.get_created_resource().await {
            Ok(r) => r,
            Err(e) => {
                error!("Unable to read the created resource from the state file: {}", e);
                None
            }
        };
        info!("Destroying deployment '{}'", self.data.deployment_name);
        self.run_destroy(spec, resource).await
    }

    async fn run_destroy(
        &self,
        spec: Option<Spec<Creator::Config>>,
        resource: Option<Creator::Resource>,
    ) -> AgentResult<()> {
        self.agent_client.send_destroy_starting().await?;
        match self
            .destroyer
            .destroy(spec, resource, &self.info_client)
            .await
        {
            Ok(()) => {
                self.agent_client.send_destroy_succeeded().await?;
                info!("Destroyed deployment '{}'", self.data.deployment_name);
                Ok(())
            }
            Err(e) => {
                if let Err(client_error) = self.agent_client.send_destroy_failed(&e).await {
                    error!("Unable to record error in the state file: {}", client_error);
                    error!("The error we failed to record is: {}", e);
                }
                Err(e.into())
            }
        }
    }
}
