//! Startup configuration for the relay.

use relay_dify::{DifyConfig, DifyError};
use relay_slack::{SlackConfig, SlackError};

/// Configuration could not be loaded or is invalid.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Slack configuration: {0}")]
    Slack(#[from] SlackError),

    #[error("Dify configuration: {0}")]
    Dify(#[from] DifyError),
}

/// Everything the relay needs before it may connect anywhere.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub slack: SlackConfig,
    pub dify: DifyConfig,
}

impl RelayConfig {
    /// Load and validate both halves from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let slack = SlackConfig::from_env()?;
        slack.validate()?;

        let dify = DifyConfig::from_env()?;
        dify.validate()?;

        Ok(Self { slack, dify })
    }
}
