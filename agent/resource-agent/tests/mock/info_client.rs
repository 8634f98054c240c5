use cluster_model::Configuration;
use resource_agent::clients::{ClientError, ClientResult, InfoClient};
use resource_agent::BootstrapData;
use serde_json::Value;
use std::sync::Mutex;

/// An [`InfoClient`] that keeps the memo in memory so that we can test without a state file.
pub(crate) struct MockInfoClient {
    info: Mutex<Value>,
}

#[async_trait::async_trait]
impl InfoClient for MockInfoClient {
    async fn new(_data: BootstrapData) -> ClientResult<Self> {
        Ok(Self {
            info: Mutex::new(Value::Null),
        })
    }

    async fn get_info<Info>(&self) -> ClientResult<Info>
    where
        Info: Configuration,
    {
        let value = self.info.lock().unwrap().clone();
        Info::from_value(value).map_err(|e| ClientError::Serialization(Some(Box::new(e))))
    }

    async fn send_info<Info>(&self, info: Info) -> ClientResult<()>
    where
        Info: Configuration,
    {
        let value = info
            .into_value()
            .map_err(|e| ClientError::Serialization(Some(Box::new(e))))?;
        *self.info.lock().unwrap() = value;
        Ok(())
    }
}
