use cluster_model::{AgentStatus, Configuration};
use resource_agent::clients::{AgentClient, ClientError, ClientResult};
use resource_agent::provider::{ProviderError, Spec};
use resource_agent::BootstrapData;
use serde_json::Value;
use std::sync::Mutex;

/// An [`AgentClient`] that keeps the lifecycle in memory so that we can test without a state file.
#[derive(Default)]
pub(crate) struct MockAgentClient {
    status: Mutex<Option<AgentStatus>>,
    configuration: Mutex<Value>,
    resource: Mutex<Value>,
}

fn serialization(e: cluster_model::Error) -> ClientError {
    ClientError::Serialization(Some(Box::new(e)))
}

#[async_trait::async_trait]
impl AgentClient for MockAgentClient {
    async fn new(_data: BootstrapData) -> ClientResult<Self> {
        Ok(Self::default())
    }

    async fn send_spec<Config>(&self, spec: &Spec<Config>) -> ClientResult<()>
    where
        Config: Configuration,
    {
        *self.configuration.lock().unwrap() = spec
            .configuration
            .clone()
            .into_value()
            .map_err(serialization)?;
        Ok(())
    }

    async fn get_spec<Config>(&self) -> ClientResult<Option<Spec<Config>>>
    where
        Config: Configuration,
    {
        let value = self.configuration.lock().unwrap().clone();
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(Spec::new(
            Config::from_value(value).map_err(serialization)?,
        )))
    }

    async fn get_created_resource<Resource>(&self) -> ClientResult<Option<Resource>>
    where
        Resource: Configuration,
    {
        let value = self.resource.lock().unwrap().clone();
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(Resource::from_value(value).map_err(serialization)?))
    }

    async fn get_status(&self) -> ClientResult<Option<AgentStatus>> {
        Ok(*self.status.lock().unwrap())
    }

    async fn send_create_starting(&self) -> ClientResult<()> {
        *self.status.lock().unwrap() = Some(AgentStatus::Creating);
        Ok(())
    }

    async fn send_create_succeeded<Resource>(&self, resource: Resource) -> ClientResult<()>
    where
        Resource: Configuration,
    {
        *self.resource.lock().unwrap() = resource.into_value().map_err(serialization)?;
        *self.status.lock().unwrap() = Some(AgentStatus::Created);
        Ok(())
    }

    async fn send_create_failed(&self, _error: &ProviderError) -> ClientResult<()> {
        *self.status.lock().unwrap() = Some(AgentStatus::CreateFailed);
        Ok(())
    }

    async fn send_destroy_starting(&self) -> ClientResult<()> {
        *self.status.lock().unwrap() = Some(AgentStatus::Destroying);
        Ok(())
    }

    async fn send_destroy_succeeded(&self) -> ClientResult<()> {
        *self.resource.lock().unwrap() = Value::Null;
        *self.status.lock().unwrap() = Some(AgentStatus::Destroyed);
        Ok(())
    }

    async fn send_destroy_failed(&self, _error: &ProviderError) -> ClientResult<()> {
        *self.status.lock().unwrap() = Some(AgentStatus::DestroyFailed);
        Ok(())
    }
}
