//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHARSHEET_BASE_URL` - Base URL the `/functions/*` endpoints live under
//!
//! ## Optional
//! - `CHARSHEET_API_TOKEN` - Bearer token sent with every request
//! - `CHARSHEET_TIMEOUT_SECS` - Request timeout in seconds (default: 10)
//! - `CHARSHEET_CACHE_DIR` - Local cache directory (default: `.charsheet-cache`)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Remote store and cache configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the functions server
    pub base_url: Url,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Directory for the file-backed local cache
    pub cache_dir: PathBuf,
}

impl ClientConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_token: None,
            timeout: Self::DEFAULT_TIMEOUT,
            cache_dir: PathBuf::from(".charsheet-cache"),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("CHARSHEET_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("CHARSHEET_BASE_URL".to_string()))?;
        let base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CHARSHEET_BASE_URL".to_string(), e.to_string())
        })?;

        let timeout = match lookup("CHARSHEET_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                ConfigError::InvalidEnvVar("CHARSHEET_TIMEOUT_SECS".to_string(), e.to_string())
            })?,
            None => Self::DEFAULT_TIMEOUT,
        };

        let mut config = Self::new(base_url);
        config.api_token = lookup("CHARSHEET_API_TOKEN").map(SecretString::from);
        config.timeout = timeout;
        if let Some(dir) = lookup("CHARSHEET_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_base_url_required() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "CHARSHEET_BASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("CHARSHEET_BASE_URL", "http://localhost:8888")]).unwrap();
        assert_eq!(config.timeout, ClientConfig::DEFAULT_TIMEOUT);
        assert_eq!(config.cache_dir, PathBuf::from(".charsheet-cache"));
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CHARSHEET_BASE_URL", "https://sheets.example.net/.netlify/"),
            ("CHARSHEET_TIMEOUT_SECS", "3"),
            ("CHARSHEET_CACHE_DIR", "/tmp/sheets"),
            ("CHARSHEET_API_TOKEN", "tok_9f8e7d"),
        ])
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/sheets"));
        assert!(!format!("{config:?}").contains("tok_9f8e7d"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("CHARSHEET_BASE_URL", "not a url")]).is_err());
        assert!(
            config_from(&[
                ("CHARSHEET_BASE_URL", "http://localhost"),
                ("CHARSHEET_TIMEOUT_SECS", "ten"),
            ])
            .is_err()
        );
    }
}
