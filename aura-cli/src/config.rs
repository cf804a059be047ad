//! Configuration loading for the AURA CLI.
//!
//! Every field has a default, so running without a config file works against
//! a local API. `AURA_API_URL` overrides the base URL from any source.

use aura_core::ConfigError;
use aura_monitor::ws_endpoint_for;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "AURA_SWARM_CONFIG";
pub const API_URL_ENV: &str = "AURA_API_URL";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CliConfig {
    pub api_base_url: String,
    /// Derived from `api_base_url` when absent.
    pub ws_endpoint: Option<String>,
    pub request_timeout_ms: u64,
    pub classifier_timeout_ms: u64,
    pub task_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub history_capacity: usize,
    pub confidence_threshold: f64,
    pub log_json: bool,
    /// Durable store. Without it, swarm state lives only for one command.
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_endpoint: None,
            request_timeout_ms: 30_000,
            classifier_timeout_ms: 5_000,
            task_timeout_ms: 5_000,
            poll_interval_ms: 5_000,
            history_capacity: 100,
            confidence_threshold: 0.6,
            log_json: false,
            store: None,
        }
    }
}

/// Failure to produce a usable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

impl CliConfig {
    /// Load from `explicit`, else `AURA_SWARM_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigLoadError> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigLoadError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_ENV).filter(|p| !p.trim().is_empty()).map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        if let Some(url) = env(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.api_base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("api_base_url", "must start with http:// or https://"));
        }
        if let Some(ws) = &self.ws_endpoint {
            if ws.trim().is_empty() {
                return Err(invalid("ws_endpoint", "must not be empty when set"));
            }
        }
        for (field, value) in [
            ("request_timeout_ms", self.request_timeout_ms),
            ("classifier_timeout_ms", self.classifier_timeout_ms),
            ("task_timeout_ms", self.task_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be > 0"));
            }
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(invalid("confidence_threshold", "must be within [0, 1]"));
        }
        if let Some(store) = &self.store {
            if store.base_url.trim().is_empty() {
                return Err(invalid("store.base_url", "must not be empty"));
            }
        }
        Ok(())
    }

    pub fn ws_endpoint(&self) -> String {
        self.ws_endpoint
            .clone()
            .unwrap_or_else(|| ws_endpoint_for(&self.api_base_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
