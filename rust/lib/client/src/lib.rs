//! MemeToMoney HTTP clients.
//!
//! Typed clients for the user and content services. Authentication is
//! handled by pluggable [`TokenSource`] implementations (Go-style
//! `oauth2.TokenSource` pattern); the persisted bearer token lives in a
//! [`TokenStore`].
//!
//! # Usage
//!
//! ```ignore
//! use m2m_client::{AuthApi, FileTokenStore, HttpContentApi, StoredToken};
//!
//! let store = Arc::new(FileTokenStore::new(path));
//! let auth = AuthApi::new(&config, store.clone())?;
//! auth.login("demo@example.com", "secret").await?;
//!
//! let content = HttpContentApi::new(&config, Arc::new(StoredToken::new(store)))?;
//! let page = content.feed(FeedMode::Trending, PageParams::first(10), None).await?;
//! ```

pub mod auth;
pub mod content;
pub mod http;
pub mod model;
pub mod token;
pub mod user;

pub use auth::{AuthApi, Session};
pub use content::{ContentApi, HttpContentApi};
pub use http::ServiceClient;
pub use model::*;
pub use token::{FileTokenStore, MemoryTokenStore, PasswordLogin, StoredToken, TokenStore};
pub use user::UserApi;

// ── Error ───────────────────────────────────────────────────────────

/// Client-side API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// HTTP 2xx, but the envelope reported a failure status.
    #[error("rejected ({status}): {message}")]
    Rejected { status: i32, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("auth: {0}")]
    Auth(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error("token store: {0}")]
    Storage(String),
}

impl ApiError {
    /// HTTP or envelope status, when the server answered at all.
    pub fn status(&self) -> Option<i32> {
        match self {
            ApiError::Server { status, .. } => Some(i32::from(*status)),
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

// ── TokenSource ─────────────────────────────────────────────────────

/// Pluggable token provider. Called before every API request.
///
/// Implementations handle token acquisition and caching.
/// Returns `Ok(None)` to skip the Authorization header (anonymous).
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn token(&self) -> Result<Option<String>, ApiError>;

    /// Called when the server answers 401. Drops any cached credential.
    async fn invalidate(&self) {}
}

/// No authentication: anonymous requests.
pub struct NoAuth;

#[async_trait::async_trait]
impl TokenSource for NoAuth {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(None)
    }
}

/// Static bearer token (already obtained externally).
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        Ok(Some(self.0.clone()))
    }
}
