/*!

Mock implementations of the [`AgentClient`] and [`InfoClient`] plus a pretend instance provider,
so that the [`Agent`] can be exercised without a state file or a cloud account.

!*/

pub(crate) mod agent_client;
pub(crate) mod info_client;

use cluster_model::Configuration;
use resource_agent::clients::InfoClient;
use resource_agent::provider::{
    Create, Destroy, IntoProviderError, ProviderError, ProviderResult, Resources, Spec,
};
use serde::{Deserialize, Serialize};

/// Pretends to launch instances.
pub(crate) struct InstanceCreator {}

/// Pretends to terminate instances.
pub(crate) struct InstanceDestroyer {}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    pub num_instances: u32,
    /// Fail after the first instance was launched.
    pub fail_halfway: bool,
}

impl Configuration for InstanceConfig {}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    pub instance_ids: Vec<String>,
    pub terminated: Vec<String>,
}

impl Configuration for Memo {}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInstances {
    pub instance_ids: Vec<String>,
}

impl Configuration for CreatedInstances {}

#[async_trait::async_trait]
impl Create for InstanceCreator {
    type Config = InstanceConfig;
    type Info = Memo;
    type Resource = CreatedInstances;

    async fn create<I>(&self, spec: Spec<Self::Config>, client: &I) -> ProviderResult<Self::Resource>
    where
        I: InfoClient,
    {
        let mut memo = Memo::default();
        for i in 0..spec.configuration.num_instances {
            memo.instance_ids.push(format!("i-{}", i));
            client
                .send_info(memo.clone())
                .await
                .context(Resources::Remaining, "Unable to record instance")?;
            if spec.configuration.fail_halfway {
                return Err(ProviderError::new_with_context(
                    Resources::Remaining,
                    "Instance launch failed",
                ));
            }
        }
        Ok(CreatedInstances {
            instance_ids: memo.instance_ids,
        })
    }
}

#[async_trait::async_trait]
impl Destroy for InstanceDestroyer {
    type Config = InstanceConfig;
    type Info = Memo;
    type Resource = CreatedInstances;

    async fn destroy<I>(
        &self,
        _spec: Option<Spec<Self::Config>>,
        _resource: Option<Self::Resource>,
        client: &I,
    ) -> ProviderResult<()>
    where
        I: InfoClient,
    {
        let mut memo: Memo = client
            .get_info()
            .await
            .context(Resources::Unknown, "Unable to read memo")?;
        while let Some(instance_id) = memo.instance_ids.pop() {
            memo.terminated.push(instance_id);
            client
                .send_info(memo.clone())
                .await
                .context(Resources::Remaining, "Unable to record termination")?;
        }
        Ok(())
    }
}
