use crate::error::{self, Result};
use snafu::ResultExt;
use std::time::Duration;

/// The client used for every outbound HTTP request. Each request, including reading its body,
/// must finish within `timeout`. There are no retries.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        // The GitHub API rejects requests without a user agent.
        .user_agent(concat!("talos-aws/", env!("CARGO_PKG_VERSION")))
        .build()
        .context(error::HttpClientSnafu)
}
