//! Client configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the platform REST API (no trailing slash)
    pub api_url: String,
    /// Transport timeout applied to every request, including token refresh
    pub request_timeout: Duration,
    /// Number of candidates requested per discovery page
    pub discovery_page_size: usize,
    /// Refill fires when fewer than this many candidates remain ahead of the cursor
    pub refill_threshold: usize,
    /// Where to persist the credential pair; in-memory storage when unset
    pub credentials_path: Option<PathBuf>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api".to_string(),
            request_timeout: Duration::from_secs(15),
            discovery_page_size: 20,
            refill_threshold: 3,
            credentials_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_url = env::var("SPARK_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("SPARK_API_URL"))?;

        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "SPARK_API_URL",
                value: api_url,
            });
        }

        Ok(Self {
            api_url,
            request_timeout: Duration::from_secs(parse_or(
                "SPARK_REQUEST_TIMEOUT_SECS",
                15u64,
            )?),
            discovery_page_size: parse_or("SPARK_DISCOVERY_PAGE_SIZE", 20usize)?,
            refill_threshold: parse_or("SPARK_REFILL_THRESHOLD", 3usize)?,
            credentials_path: env::var("SPARK_CREDENTIALS_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Read a numeric variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: value.clone(),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
