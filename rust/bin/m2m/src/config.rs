//! Client-side files under `~/.m2m/`.
//!
//! `config.toml` holds service endpoints and feed tuning; `token.toml`, next
//! to it, holds the session token written by `m2m login`.
//!
//! Settings resolve as file, then `M2M_*` environment, then command-line
//! flags.

use std::path::{Path, PathBuf};

use clap::Args;
use m2m_core::ServiceConfig;

/// Per-invocation overrides of the service settings.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceArgs {
    /// User service base URL.
    #[arg(long, global = true, value_name = "URL")]
    pub user_service: Option<String>,

    /// Content service base URL.
    #[arg(long, global = true, value_name = "URL")]
    pub content_service: Option<String>,

    /// Items per feed page.
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

impl ServiceArgs {
    /// The set flags in `--flag=value` form.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref url) = self.user_service {
            args.push(format!("--user-service={}", url));
        }
        if let Some(ref url) = self.content_service {
            args.push(format!("--content-service={}", url));
        }
        if let Some(n) = self.page_size {
            args.push(format!("--page-size={}", n));
        }
        if let Some(n) = self.timeout_secs {
            args.push(format!("--timeout-secs={}", n));
        }
        args
    }
}

pub fn default_path() -> PathBuf {
    dirs_path().join("config.toml")
}

/// Token file living beside the config file.
pub fn token_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(dirs_path)
        .join("token.toml")
}

pub fn load(config_path: &Path, overrides: &ServiceArgs) -> anyhow::Result<ServiceConfig> {
    load_with(config_path, |key| std::env::var(key).ok(), overrides)
}

fn load_with<F>(config_path: &Path, env: F, overrides: &ServiceArgs) -> anyhow::Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServiceConfig::load(config_path)?;
    config.apply_env_with(env);
    config.apply_args(&overrides.to_args());
    Ok(config)
}

fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".m2m")
}
