pub mod config;
pub mod types;

pub use config::{ConfigError, ServiceConfig};
pub use types::{now_rfc3339, ApiEnvelope, PageParams, PageResponse};
