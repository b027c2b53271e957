use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable names read by [`ServiceConfig::apply_env`].
pub mod env_var {
    pub const USER_SERVICE_URL: &str = "M2M_USER_SERVICE_URL";
    pub const CONTENT_SERVICE_URL: &str = "M2M_CONTENT_SERVICE_URL";
    pub const PAGE_SIZE: &str = "M2M_PAGE_SIZE";
    pub const TIMEOUT_SECS: &str = "M2M_TIMEOUT_SECS";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Backend endpoints and client tuning shared by every MemeToMoney client.
///
/// Layered as: defaults, then an optional TOML file, then environment
/// variables, then `--flag=value` arguments. Each layer only overrides the
/// keys it actually sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// User service: auth, profile.
    pub user_service_url: String,

    /// Content service: feeds, engagement, comments.
    pub content_service_url: String,

    /// Items requested per feed page.
    pub page_size: u32,

    /// Look-back window for the trending feed.
    pub trending_hours: u32,

    /// Look-back window for the fresh feed.
    pub fresh_hours: u32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Number of short videos shown in the shorts preview strip.
    pub shorts_preview: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            user_service_url: "http://localhost:8080".to_string(),
            content_service_url: "http://localhost:8081".to_string(),
            page_size: 10,
            trending_hours: 24,
            fresh_hours: 6,
            timeout_secs: 30,
            shorts_preview: 3,
        }
    }
}

impl ServiceConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse configuration from command-line arguments on top of the defaults.
    ///
    /// Supported flags:
    /// - `--user-service=URL`
    /// - `--content-service=URL`
    /// - `--page-size=N`
    /// - `--timeout-secs=N`
    pub fn from_args(args: &[String]) -> Self {
        let mut config = ServiceConfig::default();
        config.apply_args(args);
        config
    }

    /// Override fields from `--flag=value` arguments. Unknown flags and
    /// unparsable numbers are ignored.
    pub fn apply_args(&mut self, args: &[String]) {
        for arg in args {
            if let Some(val) = arg.strip_prefix("--user-service=") {
                self.user_service_url = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--content-service=") {
                self.content_service_url = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--page-size=") {
                if let Ok(n) = val.parse() {
                    self.page_size = n;
                }
            } else if let Some(val) = arg.strip_prefix("--timeout-secs=") {
                if let Ok(n) = val.parse() {
                    self.timeout_secs = n;
                }
            }
        }
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Override fields from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env_var::USER_SERVICE_URL) {
            self.user_service_url = v;
        }
        if let Some(v) = lookup(env_var::CONTENT_SERVICE_URL) {
            self.content_service_url = v;
        }
        if let Some(n) = lookup(env_var::PAGE_SIZE).and_then(|v| v.parse().ok()) {
            self.page_size = n;
        }
        if let Some(n) = lookup(env_var::TIMEOUT_SECS).and_then(|v| v.parse().ok()) {
            self.timeout_secs = n;
        }
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
