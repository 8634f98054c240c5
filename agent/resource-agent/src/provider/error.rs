use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// When a [`Create`] or [`Destroy`] implementation returns an error, it must explicitly state
/// whether or not it has left resources behind in the cloud account.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resources {
    /// Resources were left behind and the provider has lost track of them, so `destroy` cannot
    /// remove them. Try never to return this.
    Orphaned,

    /// Resources were left behind and are recorded, so `destroy` can remove them.
    Remaining,

    /// Something went wrong, but no resources were left behind.
    Clear,

    /// The provider does not know whether or not resources were left behind. Running `destroy` is
    /// the safe choice.
    Unknown,
}

impl Resources {
    pub fn message(&self) -> &'static str {
        match self {
            Resources::Orphaned => "An error left orphaned resources that cannot be destroyed",
            Resources::Remaining => "An error left resources behind that can be destroyed",
            Resources::Clear => "An error occurred but no resources were left behind",
            Resources::Unknown => {
                "An error occurred and it is unknown whether or not resources were left behind"
            }
        }
    }

    /// Whether running `destroy` can help after an error with this verdict.
    pub fn needs_destroy(&self) -> bool {
        matches!(self, Resources::Remaining | Resources::Unknown)
    }
}

impl Display for Resources {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.message(), f)
    }
}

/// Implement this for your `Info` type to describe whether or not resources remain.
///
/// # Example
///
/// ```
/// use resource_agent::provider::{AsResources, Resources};
/// struct Memo {
///     vpc_id: Option<String>,
/// }
/// impl AsResources for Memo {
///     fn as_resources(&self) -> Resources {
///         if self.vpc_id.is_none() {
///             Resources::Clear
///         } else {
///             Resources::Remaining
///         }
///     }
/// }
/// ```
///
pub trait AsResources {
    /// Inspects `&self` and determines if there are resources remaining.
    fn as_resources(&self) -> Resources;
}

impl AsResources for Resources {
    fn as_resources(&self) -> Resources {
        *self
    }
}

impl AsResources for &Resources {
    fn as_resources(&self) -> Resources {
        **self
    }
}

/// The error type returned by [`Create`] and [`Destroy`] implementations.
#[derive(Debug)]
pub struct ProviderError {
    /// Whether or not the error has left resources behind.
    resources: Resources,

    /// A message naming what was being done. Displayed before `inner`.
    context: Option<String>,

    /// The error that caused this error.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

/// The result type returned by [`Create`] and [`Destroy`] operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    pub fn new_with_source_and_context<R, S, E>(resources: R, context: S, source: E) -> Self
    where
        R: AsResources,
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            resources: resources.as_resources(),
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_source<R, E>(resources: R, source: E) -> Self
    where
        R: AsResources,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            resources: resources.as_resources(),
            context: None,
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<R, S>(resources: R, context: S) -> Self
    where
        R: AsResources,
        S: Into<String>,
    {
        Self {
            resources: resources.as_resources(),
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn resources(&self) -> Resources {
        self.resources
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }

    /// Returns the first error of type `E` found in the chain of causes.
    pub fn find<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        let mut next: Option<&(dyn std::error::Error + 'static)> = self
            .inner()
            .map(|inner| inner as &(dyn std::error::Error + 'static));
        while let Some(error) = next {
            if let Some(found) = error.downcast_ref::<E>() {
                return Some(found);
            }
            next = error.source();
        }
        None
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.resources())?;
        if let Some(context) = self.context() {
            write!(f, ", {}", context)?;
        }
        if let Some(inner) = self.inner() {
            write!(f, ": {}", inner)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Converts error types to `ProviderError` using a familiar `context` function.
pub trait IntoProviderError<T> {
    /// Convert `self` into a `ProviderError`.
    fn context<R, S>(self, resources: R, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
        R: AsResources;
}

impl<T, E> IntoProviderError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<R, S>(self, resources: R, message: S) -> ProviderResult<T>
    where
        S: Into<String>,
        R: AsResources,
    {
        self.map_err(|e| ProviderError::new_with_source_and_context(resources, message, e))
    }
}

// `None` is converted into an error.
impl<T> IntoProviderError<T> for std::option::Option<T> {
    fn context<R, S>(self, r: R, m: S) -> Result<T, ProviderError>
    where
        S: Into<String>,
        R: AsResources,
    {
        self.ok_or_else(|| ProviderError::new_with_context(r, m))
    }
}

#[cfg(test)]
mod test {
    use super::{IntoProviderError, ProviderError, Resources};
    use std::fmt::{Display, Formatter};

    #[derive(Debug)]
    struct Root;

    impl Display for Root {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "root cause")
        }
    }

    impl std::error::Error for Root {}

    #[derive(Debug)]
    struct Wrapper(Root);

    impl Display for Wrapper {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "wrapped")
        }
    }

    impl std::error::Error for Wrapper {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn find_walks_the_source_chain() {
        let error = Err::<(), _>(Wrapper(Root))
            .context(Resources::Clear, "Unable to do the thing")
            .unwrap_err();
        assert!(error.find::<Wrapper>().is_some());
        assert!(error.find::<Root>().is_some());
        assert!(error.find::<std::io::Error>().is_none());
    }

    #[test]
    fn display_includes_resources_context_and_source() {
        let error = ProviderError::new_with_source_and_context(
            Resources::Remaining,
            "Unable to create subnet",
            Root,
        );
        assert_eq!(
            error.to_string(),
            "An error left resources behind that can be destroyed, Unable to create subnet: root cause"
        );
    }

    #[test]
    fn none_becomes_error() {
        let error = None::<u8>
            .context(Resources::Unknown, "Missing id")
            .unwrap_err();
        assert_eq!(error.context(), Some("Missing id"));
        assert!(error.resources().needs_destroy());
        assert!(!Resources::Clear.needs_destroy());
    }
}
