use crate::error::{self, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use snafu::ResultExt;
use std::fmt::Debug;

/// The `Configuration` trait is for "plain old data" structs that are persisted in the deployment
/// state file: the deployment configuration, a provider's memo and the resource it created.
///
/// The state file stores each of these as an untyped JSON value. The traits aggregated here let
/// clients read that data back in a strongly typed way.
pub trait Configuration:
    Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + Sized + 'static
{
    /// Convert the `Configuration` object to a serde `Value`.
    fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self).context(error::ConfigSerializationSnafu)?)
    }

    /// Deserialize the `Configuration` object from a serde `Value`. A `null` value, which is what
    /// the state file holds before anything was recorded, produces `Self::default()`.
    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value).context(error::ConfigDeserializationSnafu)?)
    }
}
