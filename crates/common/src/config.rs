//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Live session policy.
    #[serde(default)]
    pub session: SessionPolicyConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Tunables for live session handling.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionPolicyConfig {
    /// Starting a session further than this from `scheduled_start` logs a warning.
    #[serde(default = "default_start_warning_window_minutes")]
    pub start_warning_window_minutes: i64,
    /// Maximum number of options on a poll.
    #[serde(default = "default_max_poll_options")]
    pub max_poll_options: usize,
    /// Maximum poll question length in characters.
    #[serde(default = "default_max_poll_question_length")]
    pub max_poll_question_length: usize,
    /// Maximum poll option length in characters.
    #[serde(default = "default_max_poll_option_length")]
    pub max_poll_option_length: usize,
    /// Maximum serialized size of a whiteboard snapshot.
    #[serde(default = "default_max_whiteboard_bytes")]
    pub max_whiteboard_bytes: usize,
}

impl Default for SessionPolicyConfig {
    fn default() -> Self {
        Self {
            start_warning_window_minutes: default_start_warning_window_minutes(),
            max_poll_options: default_max_poll_options(),
            max_poll_question_length: default_max_poll_question_length(),
            max_poll_option_length: default_max_poll_option_length(),
            max_whiteboard_bytes: default_max_whiteboard_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_start_warning_window_minutes() -> i64 {
    15
}

const fn default_max_poll_options() -> usize {
    10
}

const fn default_max_poll_question_length() -> usize {
    500
}

const fn default_max_poll_option_length() -> usize {
    100
}

const fn default_max_whiteboard_bytes() -> usize {
    1024 * 1024
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `LIVECLASS_ENV`)
    /// 4. Environment variables with `LIVECLASS__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("LIVECLASS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LIVECLASS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("LIVECLASS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_policy_defaults() {
        let policy = SessionPolicyConfig::default();
        assert_eq!(policy.start_warning_window_minutes, 15);
        assert_eq!(policy.max_poll_options, 10);
        assert_eq!(policy.max_whiteboard_bytes, 1024 * 1024);
    }

    #[test]
    fn test_deserialize_without_session_section() {
        let raw = config::Config::builder()
            .set_override("server.port", 8080_i64)
            .unwrap()
            .set_override("database.url", "postgres://localhost/liveclass")
            .unwrap()
            .build()
            .unwrap();
        let config: Config = raw.try_deserialize().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 100);
        assert_eq!(config.session.max_poll_options, 10);
    }
}
