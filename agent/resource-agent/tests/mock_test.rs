pub(crate) mod mock;

use cluster_model::{AgentStatus, DestructionPolicy};
use mock::agent_client::MockAgentClient;
use mock::info_client::MockInfoClient;
use mock::{InstanceConfig, InstanceCreator, InstanceDestroyer};
use resource_agent::error::AgentError;
use resource_agent::provider::{Resources, Spec};
use resource_agent::{Agent, BootstrapData, Types};

type MockAgent = Agent<MockInfoClient, MockAgentClient, InstanceCreator, InstanceDestroyer>;

async fn agent(policy: DestructionPolicy) -> MockAgent {
    Agent::new(
        Types::default(),
        BootstrapData::new("mock-test", "unused.json").destruction_policy(policy),
        InstanceCreator {},
        InstanceDestroyer {},
    )
    .await
    .unwrap()
}

fn spec(num_instances: u32, fail_halfway: bool) -> Spec<InstanceConfig> {
    Spec::new(InstanceConfig {
        num_instances,
        fail_halfway,
    })
}

#[tokio::test]
async fn create_then_destroy() {
    let agent = agent(DestructionPolicy::Never).await;
    let created = agent.create(spec(2, false)).await.unwrap();
    assert_eq!(created.instance_ids, vec!["i-0", "i-1"]);
    assert_eq!(agent.status().await.unwrap(), Some(AgentStatus::Created));
    assert_eq!(agent.resource().await.unwrap(), Some(created));

    agent.destroy().await.unwrap();
    assert_eq!(agent.status().await.unwrap(), Some(AgentStatus::Destroyed));
    assert_eq!(agent.info().await.unwrap().terminated, vec!["i-1", "i-0"]);
    assert!(agent.resource().await.unwrap().is_none());
}

#[tokio::test]
async fn create_refuses_live_deployment() {
    let agent = agent(DestructionPolicy::Never).await;
    agent.create(spec(1, false)).await.unwrap();
    let error = agent.create(spec(1, false)).await.unwrap_err();
    assert!(matches!(error, AgentError::Conflict(_)));
}

#[tokio::test]
async fn failed_create_keeps_resources_by_default() {
    let agent = agent(DestructionPolicy::Never).await;
    let error = agent.create(spec(3, true)).await.unwrap_err();
    assert_eq!(
        error.provider_error().unwrap().resources(),
        Resources::Remaining
    );
    assert_eq!(agent.status().await.unwrap(), Some(AgentStatus::CreateFailed));
    assert_eq!(agent.info().await.unwrap().instance_ids, vec!["i-0"]);

    agent.destroy().await.unwrap();
    assert_eq!(agent.info().await.unwrap().terminated, vec!["i-0"]);
}

#[tokio::test]
async fn failed_create_is_cleaned_up_on_failure_policy() {
    let agent = agent(DestructionPolicy::OnFailure).await;
    assert!(agent.create(spec(3, true)).await.is_err());
    assert_eq!(agent.status().await.unwrap(), Some(AgentStatus::Destroyed));
    let memo = agent.info().await.unwrap();
    assert!(memo.instance_ids.is_empty());
    assert_eq!(memo.terminated, vec!["i-0"]);
}
