//! Application configuration
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PROPSIGHT` prefix and
//! nested values use double underscores as separators:
//!
//! - `PROPSIGHT__SERVER__PORT=8080` -> `server.port`
//! - `PROPSIGHT__DATABASE__URL=postgres://...` -> `database.url`

mod agent;
mod ai;
mod database;
mod error;
mod server;

pub use agent::AgentConfig;
pub use ai::AiConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::ServerConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Completion provider (summaries, follow-ups, greetings, explanations)
    #[serde(default)]
    pub ai: AiConfig,

    /// Remote reasoning-agent service
    #[serde(default)]
    pub agent: AgentConfig,
}

impl AppConfig {
    /// Loads configuration from the environment, reading a `.env` file first
    /// when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PROPSIGHT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation across all sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.ai.validate()?;
        self.agent.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize these tests.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var(
            "PROPSIGHT__DATABASE__URL",
            "postgresql://test@localhost/propsight",
        );
        env::set_var("PROPSIGHT__AI__GROQ_API_KEY", "gsk_test");
        env::set_var("PROPSIGHT__AGENT__BASE_URL", "http://localhost:2024");
    }

    fn clear_env() {
        env::remove_var("PROPSIGHT__DATABASE__URL");
        env::remove_var("PROPSIGHT__AI__GROQ_API_KEY");
        env::remove_var("PROPSIGHT__AGENT__BASE_URL");
        env::remove_var("PROPSIGHT__SERVER__PORT");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("load failed");
        assert_eq!(config.database.url, "postgresql://test@localhost/propsight");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_port_overrides_default() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PROPSIGHT__SERVER__PORT", "3000");
        let result = AppConfig::load();
        clear_env();

        assert_eq!(result.unwrap().server.port, 3000);
    }
}
