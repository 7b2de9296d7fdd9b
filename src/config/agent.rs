//! Agent engine configuration

use std::time::Duration;

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::agent::RemoteEngineConfig;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentConfig {
    /// Base URL of the reasoning-agent service
    #[serde(default)]
    pub base_url: String,

    /// Run timeout in seconds. Streams can be long-lived; this bounds one
    /// whole run, not one chunk.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("AGENT__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidAgentUrl);
        }
        Ok(())
    }

    pub fn engine_config(&self) -> RemoteEngineConfig {
        RemoteEngineConfig::new(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn default_timeout() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_is_invalid() {
        assert!(AgentConfig::default().validate().is_err());
    }

    #[test]
    fn non_http_url_is_invalid() {
        let config = AgentConfig {
            base_url: "ftp://agent".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn engine_config_carries_timeout() {
        let config = AgentConfig {
            base_url: "http://localhost:2024".into(),
            timeout_secs: 120,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.engine_config().timeout, Duration::from_secs(120));
    }
}
