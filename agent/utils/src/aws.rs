use crate::constants::{
    ASSUME_ROLE_SESSION_NAME, DEFAULT_ASSUME_ROLE_SESSION_DURATION, DEFAULT_REGION,
};
use crate::error::{self, Result};
use aws_config::default_provider::credentials::default_provider;
use aws_config::meta::region::RegionProviderChain;
use aws_config::sts::AssumeRoleProvider;
use aws_config::retry::RetryConfig;
use aws_sdk_sts::Region;
use aws_smithy_types::retry::RetryMode;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_types::SdkConfig;
use log::info;
use snafu::{OptionExt, ResultExt};
use std::time::Duration;

/// Set up the config for aws calls. The region is `region` if given, otherwise whatever the
/// default provider chain finds, otherwise `DEFAULT_REGION`. If a role arn is provided, the
/// credentials of the default chain are used to assume it.
pub async fn aws_config(
    region: Option<&str>,
    assume_role: Option<&str>,
    assume_role_session_duration: Option<i32>,
) -> SdkConfig {
    let region = RegionProviderChain::first_try(region.map(|r| Region::new(r.to_string())))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION))
        .region()
        .await
        .unwrap_or_else(|| Region::new(DEFAULT_REGION));
    info!("Using region '{}' for aws calls.", region);

    let config_loader = aws_config::from_env().retry_config(
        RetryConfig::standard()
            .with_retry_mode(RetryMode::Adaptive)
            .with_max_attempts(15),
    );
    let base_provider = SharedCredentialsProvider::new(default_provider().await);

    let config_loader = match assume_role {
        Some(role_arn) => {
            info!("Assuming role '{}'.", role_arn);
            config_loader.credentials_provider(SharedCredentialsProvider::new(
                AssumeRoleProvider::builder(role_arn)
                    .region(region.clone())
                    .session_name(ASSUME_ROLE_SESSION_NAME)
                    .session_length(Duration::from_secs(
                        assume_role_session_duration.unwrap_or(DEFAULT_ASSUME_ROLE_SESSION_DURATION)
                            as u64,
                    ))
                    .build(base_provider),
            ))
        }
        None => config_loader.credentials_provider(base_provider),
    };

    config_loader.region(region).load().await
}

/// The account that `config` resolves to.
pub async fn account_id(config: &SdkConfig) -> Result<String> {
    let identity = aws_sdk_sts::Client::new(config)
        .get_caller_identity()
        .send()
        .await
        .context(error::CallerIdentitySnafu)?;
    identity
        .account()
        .map(|account| account.to_string())
        .context(error::MissingSnafu {
            what: "account",
            from: "caller identity",
        })
}
