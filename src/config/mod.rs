//! Configuration module for the settings backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_FIXTURE_PATH: &str = "./data/fixture.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// JSON file seeding the in-memory collective directory
    pub fixture_path: PathBuf,
    /// Upper bound for every collaborator call
    pub request_timeout: Duration,
    /// Whether the local card tokenizer reports itself ready
    pub tokenizer_enabled: bool,
}

/// Error raised when the environment holds an unusable value.
#[derive(Debug)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid value for {}: {:?}", self.key, self.value)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let raw_bind =
            env::var("SETTINGS_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_bind.parse().map_err(|_| ConfigError {
            key: "SETTINGS_BIND_ADDR",
            value: raw_bind.clone(),
        })?;

        let log_level = env::var("SETTINGS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let fixture_path = env::var("SETTINGS_FIXTURE_PATH")
            .unwrap_or_else(|_| DEFAULT_FIXTURE_PATH.to_string())
            .into();

        let timeout_secs = parse_or_default(
            "SETTINGS_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );
        let tokenizer_enabled = parse_or_default("SETTINGS_TOKENIZER_ENABLED", true);

        Ok(Self {
            bind_addr,
            log_level,
            fixture_path,
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            tokenizer_enabled,
        })
    }
}

/// Read an optional variable, falling back to `default` when it is unset or malformed.
fn parse_or_default<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring malformed {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share process-wide environment variables, so they run in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("SETTINGS_BIND_ADDR");
        env::remove_var("SETTINGS_LOG_LEVEL");
        env::remove_var("SETTINGS_FIXTURE_PATH");
        env::remove_var("SETTINGS_REQUEST_TIMEOUT_SECS");
        env::remove_var("SETTINGS_TOKENIZER_ENABLED");

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.fixture_path, PathBuf::from("./data/fixture.json"));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.tokenizer_enabled);

        env::set_var("SETTINGS_REQUEST_TIMEOUT_SECS", "soon");
        env::set_var("SETTINGS_TOKENIZER_ENABLED", "false");
        let config = Config::from_env().unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.tokenizer_enabled);

        env::set_var("SETTINGS_BIND_ADDR", "not-an-address");
        let err = Config::from_env().unwrap_err();
        assert_eq!(err.key, "SETTINGS_BIND_ADDR");

        env::remove_var("SETTINGS_BIND_ADDR");
        env::remove_var("SETTINGS_REQUEST_TIMEOUT_SECS");
        env::remove_var("SETTINGS_TOKENIZER_ENABLED");
    }
}
