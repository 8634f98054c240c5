use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Error deserializing configuration: {}", source))]
    ConfigDeserialization { source: serde_json::Error },

    #[snafu(display("Error serializing configuration: {}", source))]
    ConfigSerialization { source: serde_json::Error },

    #[snafu(display("Unable to read deployment file '{}': {}", path.display(), source))]
    DeploymentFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse deployment file '{}': {}", path.display(), source))]
    DeploymentFileParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("Invalid deployment configuration: {}", message))]
    InvalidConfiguration { message: String },

    #[snafu(display("Parse error: {}", source))]
    SerdePlain { source: serde_plain::Error },
}
