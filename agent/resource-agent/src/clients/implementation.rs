use super::error::ClientResult;
use crate::clients::{AgentClient, ClientError, DefaultAgentClient, DefaultInfoClient, InfoClient};
use crate::error::ErrorMessage;
use crate::provider::{ProviderError, Resources, Spec};
use crate::BootstrapData;
use cluster_model::{AgentStatus, Configuration, ResourceAction};
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;

impl From<cluster_model::Error> for ClientError {
    fn from(e: cluster_model::Error) -> Self {
        ClientError::Serialization(Some(Box::new(e)))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(Some(Box::new(e)))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::RequestFailed(Some(Box::new(e)))
    }
}

/// The error recorded when an operation fails.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StateError {
    pub(crate) action: ResourceAction,
    pub(crate) resources: Resources,
    pub(crate) message: String,
}

/// The on-disk layout of the deployment state file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StateDocument {
    pub(crate) deployment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) status: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<StateError>,
    #[serde(default)]
    pub(crate) configuration: Value,
    #[serde(default)]
    pub(crate) info: Value,
    #[serde(default)]
    pub(crate) resource: Value,
}

/// Serializes access to the JSON state file of one deployment. Every `StateFile` of the same path
/// in this process shares one lock. Writes go to a sibling temporary file which is then renamed
/// over the state file.
#[derive(Clone, Debug)]
pub(crate) struct StateFile {
    path: PathBuf,
    deployment: String,
    lock: Arc<Mutex<()>>,
}

impl StateFile {
    pub(crate) async fn open(data: &BootstrapData) -> ClientResult<Self> {
        let path = data.state_path.clone();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ClientError::InitializationFailed(Some(Box::new(e))))?;
        let key = match (tokio::fs::canonicalize(parent).await, path.file_name()) {
            (Ok(dir), Some(file_name)) => dir.join(file_name),
            _ => path.clone(),
        };
        let state = Self {
            path,
            deployment: data.deployment_name.clone(),
            lock: state_lock(key),
        };
        let document = state
            .read_document()
            .await
            .map_err(|e| ClientError::InitializationFailed(Some(Box::new(e))))?;
        if !document.deployment.is_empty() && document.deployment != state.deployment {
            return Err(ClientError::InitializationFailed(Some(Box::new(
                ErrorMessage::from(format!(
                    "State file '{}' belongs to deployment '{}', not '{}'",
                    state.path.display(),
                    document.deployment,
                    state.deployment
                )),
            ))));
        }
        Ok(state)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) async fn read(&self) -> ClientResult<StateDocument> {
        let _guard = self.lock.lock().await;
        self.read_document().await
    }

    /// Read the document, let `f` modify it and write it back.
    pub(crate) async fn update<F>(&self, f: F) -> ClientResult<()>
    where
        F: FnOnce(&mut StateDocument) + Send,
    {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.deployment = self.deployment.clone();
        f(&mut document);
        self.write_document(&document).await
    }

    async fn read_document(&self) -> ClientResult<StateDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StateDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &StateDocument) -> ClientResult<()> {
        let mut tmp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("state"));
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);
        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        trace!("Wrote state file '{}'", self.path.display());
        Ok(())
    }
}

lazy_static::lazy_static! {
    static ref STATE_LOCKS: std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>> =
        std::sync::Mutex::new(HashMap::new());
}

/// The lock of the state file at the canonical `path`.
fn state_lock(path: PathBuf) -> Arc<Mutex<()>> {
    let mut locks = STATE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(path).or_default())
}

fn failure(action: ResourceAction, error: &ProviderError) -> StateError {
    StateError {
        action,
        resources: error.resources(),
        message: error.to_string(),
    }
}

#[async_trait::async_trait]
impl InfoClient for DefaultInfoClient {
    async fn new(data: BootstrapData) -> ClientResult<Self> {
        let state = StateFile::open(&data).await?;
        Ok(Self { data, state })
    }

    async fn get_info<Info>(&self) -> ClientResult<Info>
    where
        Info: Configuration,
    {
        Ok(Info::from_value(self.state.read().await?.info)?)
    }

    async fn send_info<Info>(&self, info: Info) -> ClientResult<()>
    where
        Info: Configuration,
    {
        let value = info.into_value()?;
        self.state.update(move |doc| doc.info = value).await
    }
}

#[async_trait::async_trait]
impl AgentClient for DefaultAgentClient {
    async fn new(data: BootstrapData) -> ClientResult<Self> {
        let state = StateFile::open(&data).await?;
        Ok(Self { data, state })
    }

    async fn send_spec<Config>(&self, spec: &Spec<Config>) -> ClientResult<()>
    where
        Config: Configuration,
    {
        let value = spec.configuration.clone().into_value()?;
        self.state
            .update(move |doc| doc.configuration = value)
            .await
    }

    async fn get_spec<Config>(&self) -> ClientResult<Option<Spec<Config>>>
    where
        Config: Configuration,
    {
        let document = self.state.read().await?;
        if document.configuration.is_null() {
            return Ok(None);
        }
        Ok(Some(Spec::new(Config::from_value(document.configuration)?)))
    }

    async fn get_created_resource<Resource>(&self) -> ClientResult<Option<Resource>>
    where
        Resource: Configuration,
    {
        let document = self.state.read().await?;
        if document.resource.is_null() {
            return Ok(None);
        }
        Ok(Some(Resource::from_value(document.resource)?))
    }

    async fn get_status(&self) -> ClientResult<Option<AgentStatus>> {
        Ok(self.state.read().await?.status)
    }

    async fn send_create_starting(&self) -> ClientResult<()> {
        self.state
            .update(|doc| {
                doc.status = Some(AgentStatus::Creating);
                doc.error = None;
                doc.info = Value::Null;
                doc.resource = Value::Null;
            })
            .await
    }

    async fn send_create_succeeded<Resource>(&self, resource: Resource) -> ClientResult<()>
    where
        Resource: Configuration,
    {
        let value = resource.into_value()?;
        self.state
            .update(move |doc| {
                doc.status = Some(AgentStatus::Created);
                doc.resource = value;
            })
            .await
    }

    async fn send_create_failed(&self, error: &ProviderError) -> ClientResult<()> {
        let error = failure(ResourceAction::Create, error);
        self.state
            .update(move |doc| {
                doc.status = Some(AgentStatus::CreateFailed);
                doc.error = Some(error);
            })
            .await
    }

    async fn send_destroy_starting(&self) -> ClientResult<()> {
        self.state
            .update(|doc| {
                doc.status = Some(AgentStatus::Destroying);
                doc.error = None;
            })
            .await
    }

    async fn send_destroy_succeeded(&self) -> ClientResult<()> {
        self.state
            .update(|doc| {
                doc.status = Some(AgentStatus::Destroyed);
                doc.resource = Value::Null;
            })
            .await
    }

    async fn send_destroy_failed(&self, error: &ProviderError) -> ClientResult<()> {
        let error = failure(ResourceAction::Destroy, error);
        self.state
            .update(move |doc| {
                doc.status = Some(AgentStatus::DestroyFailed);
                doc.error = Some(error);
            })
            .await
    }
}

#[cfg(test)]
mod test {
    use super::StateFile;
    use crate::clients::{AgentClient, DefaultAgentClient, DefaultInfoClient, InfoClient};
    use crate::provider::{ProviderError, Resources, Spec};
    use crate::BootstrapData;
    use cluster_model::{AgentStatus, Configuration, ResourceAction};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Memo {
        vpc_id: Option<String>,
    }

    impl Configuration for Memo {}

    fn data(dir: &tempfile::TempDir, name: &str) -> BootstrapData {
        BootstrapData::new(name, dir.path().join("state").join("talos.state.json"))
    }

    #[tokio::test]
    async fn missing_state_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let info_client = DefaultInfoClient::new(data(&dir, "talos")).await.unwrap();
        assert_eq!(info_client.get_info::<Memo>().await.unwrap(), Memo::default());
        let agent_client = DefaultAgentClient::new(data(&dir, "talos")).await.unwrap();
        assert_eq!(agent_client.get_status().await.unwrap(), None);
        assert!(agent_client
            .get_spec::<Memo>()
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn clients_of_one_state_file_share_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let info_client = DefaultInfoClient::new(data(&dir, "talos")).await.unwrap();
        let agent_client = DefaultAgentClient::new(data(&dir, "talos")).await.unwrap();
        assert!(Arc::ptr_eq(&info_client.state.lock, &agent_client.state.lock));

        let same_file = BootstrapData::new(
            "talos",
            dir.path().join("state").join(".").join("talos.state.json"),
        );
        let other_spelling = DefaultInfoClient::new(same_file).await.unwrap();
        assert!(Arc::ptr_eq(&info_client.state.lock, &other_spelling.state.lock));

        let other_dir = tempfile::tempdir().unwrap();
        let other_file = DefaultInfoClient::new(data(&other_dir, "talos")).await.unwrap();
        assert!(!Arc::ptr_eq(&info_client.state.lock, &other_file.state.lock));
    }

    #[tokio::test]
    async fn info_survives_a_new_client() {
        let dir = tempfile::tempdir().unwrap();
        let memo = Memo {
            vpc_id: Some("vpc-1".into()),
        };
        DefaultInfoClient::new(data(&dir, "talos"))
            .await
            .unwrap()
            .send_info(memo.clone())
            .await
            .unwrap();
        let info_client = DefaultInfoClient::new(data(&dir, "talos")).await.unwrap();
        assert_eq!(info_client.get_info::<Memo>().await.unwrap(), memo);
        assert!(!info_client.state.path().with_file_name("talos.state.json.tmp").exists());
    }

    #[tokio::test]
    async fn lifecycle_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let client = DefaultAgentClient::new(data(&dir, "talos")).await.unwrap();
        client
            .send_spec(&Spec::new(Memo {
                vpc_id: Some("config".into()),
            }))
            .await
            .unwrap();
        client.send_create_starting().await.unwrap();
        let error = ProviderError::new_with_context(Resources::Remaining, "Subnet failed");
        client.send_create_failed(&error).await.unwrap();

        let document = client.state.read().await.unwrap();
        assert_eq!(document.deployment, "talos");
        assert_eq!(document.status, Some(AgentStatus::CreateFailed));
        let recorded = document.error.unwrap();
        assert_eq!(recorded.action, ResourceAction::Create);
        assert_eq!(recorded.resources, Resources::Remaining);
        assert!(recorded.message.contains("Subnet failed"));
        assert_eq!(
            client.get_spec::<Memo>().await.unwrap().unwrap().configuration,
            Memo {
                vpc_id: Some("config".into())
            }
        );

        client.send_destroy_starting().await.unwrap();
        client.send_destroy_succeeded().await.unwrap();
        assert_eq!(client.get_status().await.unwrap(), Some(AgentStatus::Destroyed));
        assert!(client.get_created_resource::<Memo>().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn state_file_of_another_deployment_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::open(&data(&dir, "first")).await.unwrap();
        state.update(|_| {}).await.unwrap();
        assert!(DefaultAgentClient::new(data(&dir, "second")).await.is_err());
    }
}
