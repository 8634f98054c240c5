use crate::clients::ClientError;
use crate::provider::ProviderError;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// The error type returned by an [`Agent`]. Display it and exit with a non-zero code.
#[derive(Debug)]
pub enum AgentError {
    Client(ClientError),
    /// The recorded state does not allow the requested operation.
    Conflict(ErrorMessage),
    Provider(ProviderError),
}

/// The result type returned by an [`Agent`] object.
pub type AgentResult<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// The provider error, if that is what this is.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            AgentError::Provider(e) => Some(e),
            AgentError::Client(_) | AgentError::Conflict(_) => None,
        }
    }
}

impl ErrorEnum for AgentError {
    fn variant_name(&self) -> &'static str {
        match self {
            AgentError::Client(_) => "State error",
            AgentError::Conflict(_) => "Conflict",
            AgentError::Provider(_) => "Provider error",
        }
    }

    fn inner(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            AgentError::Client(e) => Some(e as &(dyn Error + Send + Sync + 'static)),
            AgentError::Conflict(e) => Some(e as &(dyn Error + Send + Sync + 'static)),
            AgentError::Provider(e) => Some(e as &(dyn Error + Send + Sync + 'static)),
        }
    }
}

impl Display for AgentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.display(f)
    }
}

impl Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner_as_source()
    }
}

impl From<ClientError> for AgentError {
    fn from(e: ClientError) -> Self {
        Self::Client(e)
    }
}

impl From<ProviderError> for AgentError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

/// Lets a string serve as a `std::error::Error` when there is no underlying error type.
///
/// # Example
///
/// ```
/// # use resource_agent::error::ErrorMessage;
/// let _error: ErrorMessage = "The state file names a different deployment".into();
/// ```
///
#[derive(Debug)]
pub struct ErrorMessage {
    message: String,
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.message, f)
    }
}

impl<S: Into<String>> From<S> for ErrorMessage {
    fn from(s: S) -> Self {
        Self { message: s.into() }
    }
}

impl std::error::Error for ErrorMessage {}

/// Shared `Display` and `source` plumbing for the error enums of this crate.
pub(crate) trait ErrorEnum {
    fn variant_name(&self) -> &'static str;
    fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)>;

    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.inner() {
            None => Display::fmt(self.variant_name(), f),
            Some(inner) => write!(f, "{}: {}", self.variant_name(), inner),
        }
    }

    fn inner_as_source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner().map(|some| some as &(dyn Error + 'static))
    }
}
