use aws_smithy_types::retry::ProvideErrorKind;
use cluster_model::{NodeRole, SelectionTarget};
use snafu::Snafu;
use std::path::PathBuf;

type SdkError<E> = aws_sdk_ec2::types::SdkError<E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("AWS {} failed: {}", what, message))]
    Aws {
        what: String,
        message: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[snafu(display(
        "Bootstrap command '{}' could not be started: {}",
        program.display(),
        source
    ))]
    BootstrapCommandSpawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Bootstrap command '{}' failed: {}", program.display(), source))]
    BootstrapCommandFailed {
        program: PathBuf,
        source: agent_utils::Error,
    },

    #[snafu(display("Unable to fetch caller IP from '{}': {}", url, source))]
    CallerIpUnavailable { url: String, source: reqwest::Error },

    #[snafu(display(
        "Generated configuration '{}' is missing or unreadable: {}",
        path.display(),
        source
    ))]
    ConfigArtifactMissing {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to remove generated file '{}': {}", path.display(), source))]
    ConfigCleanup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to serialize the machine configuration patch: {}", source))]
    ConfigPatch { source: serde_json::Error },

    #[snafu(display("Unable to build HTTP client: {}", source))]
    HttpClient { source: reqwest::Error },

    #[snafu(display("Instance '{}' entered state '{}' while starting", instance_id, state))]
    InstanceFailed { instance_id: String, state: String },

    #[snafu(display("Invalid CIDR block '{}': {}", cidr, reason))]
    InvalidCidr { cidr: String, reason: String },

    #[snafu(display("'{}' returned '{}' which is not an IPv4 address: {}", url, body, source))]
    InvalidCallerIp {
        url: String,
        body: String,
        source: std::net::AddrParseError,
    },

    #[snafu(display("{}", source))]
    InvalidConfiguration { source: cluster_model::Error },

    #[snafu(display("Unable to parse the document fetched from '{}': {}", url, source))]
    ManifestParse {
        url: String,
        source: serde_json::Error,
    },

    #[snafu(display("Unable to fetch '{}': {}", url, source))]
    ManifestUnavailable { url: String, source: reqwest::Error },

    #[snafu(display("{} was missing from {}", what, from))]
    Missing { what: String, from: String },

    #[snafu(display("No availability zones are available in region '{}'", region))]
    NoAvailabilityZones { region: String },

    #[snafu(display("No image in the manifest matches {}", target))]
    NoMatchingImage { target: SelectionTarget },

    #[snafu(display("Cannot partition '{}' into /{} subnets", network, prefix))]
    PartitionPrefix { network: String, prefix: u8 },

    #[snafu(display(
        "The {} node with index {} has no subnet, only {} public subnet(s) exist",
        role,
        index,
        subnet_count
    ))]
    SubnetIndexOutOfRange {
        role: NodeRole,
        index: usize,
        subnet_count: usize,
    },

    #[snafu(display("Timed out after {}s waiting for {}", seconds, what))]
    Timeout { what: String, seconds: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error code of a failed AWS call, if the service returned one.
pub(crate) fn error_code<E>(error: &SdkError<E>) -> Option<&str>
where
    E: ProvideErrorKind,
{
    match error {
        SdkError::ServiceError(service_error) => service_error.err().code(),
        _ => None,
    }
}

/// Wraps a failed AWS call into [`Error::Aws`], naming the operation.
pub(crate) fn aws_error<E>(what: &str, error: SdkError<E>) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = match &error {
        SdkError::ServiceError(service_error) => service_error.err().to_string(),
        other => other.to_string(),
    };
    Error::Aws {
        what: what.to_string(),
        message,
        source: Box::new(error),
    }
}
