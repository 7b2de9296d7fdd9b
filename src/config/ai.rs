//! AI completion provider configuration

use std::time::Duration;

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::ai::GroqConfig;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AiConfig {
    /// Groq API key
    #[serde(default)]
    pub groq_api_key: String,

    /// Model for auxiliary completions (summaries, follow-ups, greetings)
    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the API base URL
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl AiConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.groq_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("AI__GROQ_API_KEY"));
        }
        Ok(())
    }

    /// Builds the provider config, moving the key behind `Secret`.
    pub fn provider_config(&self) -> GroqConfig {
        let mut config = GroqConfig::new(self.groq_api_key.clone())
            .with_model(self.model.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        config
    }
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_timeout() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_invalid() {
        assert!(AiConfig::default().validate().is_err());
    }

    #[test]
    fn provider_config_carries_overrides() {
        let config = AiConfig {
            groq_api_key: "gsk_test".into(),
            model: "llama-3.1-8b-instant".into(),
            base_url: Some("http://localhost:9999".into()),
            timeout_secs: 15,
        };
        assert!(config.validate().is_ok());

        let provider = config.provider_config();
        assert_eq!(provider.model, "llama-3.1-8b-instant");
        assert_eq!(provider.base_url, "http://localhost:9999");
        assert_eq!(provider.timeout, Duration::from_secs(15));
    }
}
