//! Client Configuration
//!
//! Resolved once at startup from the environment (or a JSON file) with
//! logged fallbacks, then passed down explicitly.

use std::env;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::polling::PollingConfig;
use crate::validation::ValidatorConfig;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/v1";

pub const ENV_API_BASE_URL: &str = "VITE_API_BASE_URL";
pub const ENV_API_GATEWAY_KEY: &str = "VITE_API_GATEWAY_KEY";
pub const ENV_DEBOUNCE_MS: &str = "QUESTLINE_DEBOUNCE_MS";
pub const ENV_POLL_INTERVAL_SECS: &str = "QUESTLINE_POLL_INTERVAL_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where and how to reach the HTTP collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: String,
    /// Static gateway key sent as `x-api-key`
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn from_env() -> Self {
        let base_url = var(ENV_API_BASE_URL).unwrap_or_else(|| {
            info!("{ENV_API_BASE_URL} not set, using default: {DEFAULT_API_BASE_URL}");
            DEFAULT_API_BASE_URL.to_string()
        });
        let api_key = var(ENV_API_GATEWAY_KEY).filter(|key| !key.is_empty());
        if api_key.is_none() {
            warn!("{ENV_API_GATEWAY_KEY} not set, requests will omit x-api-key");
        }
        Self { base_url, api_key }
    }

    /// Join a relative endpoint onto the base URL. Absolute URLs pass through
    /// unchanged but only get credentials when [`is_own_url`](Self::is_own_url).
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Whether `url` points under the base URL. Credentials are only sent
    /// to such URLs.
    pub fn is_own_url(&self, url: &str) -> bool {
        let base = self.base_url.trim_end_matches('/');
        match url.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with(['/', '?']),
            None => false,
        }
    }
}

/// Everything the client core needs, resolved in one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub validator: ValidatorConfig,
    pub polling: PollingConfig,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut validator = ValidatorConfig::default();
        validator.debounce_ms = try_load(ENV_DEBOUNCE_MS, validator.debounce_ms);

        let mut polling = PollingConfig::default();
        polling.interval_secs = try_load(ENV_POLL_INTERVAL_SECS, polling.interval_secs);

        Self {
            api: ApiConfig::from_env(),
            validator,
            polling,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match var(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
    }
}
