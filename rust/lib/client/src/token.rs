//! Bearer token persistence and the token sources built on it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{LoginRequest, LoginResponse};
use crate::{ApiError, TokenSource};
use m2m_core::ApiEnvelope;

// ── TokenStore ──────────────────────────────────────────────────────

/// Where the session token survives between runs.
pub trait TokenStore: Send + Sync + 'static {
    fn load(&self) -> Result<Option<String>, ApiError>;
    fn save(&self, token: &str) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

/// Process-local store; forgets everything on exit.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        Ok(self.token.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    refresh_token: String,
}

/// TOML file store, e.g. `~/.m2m/token.toml`.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<TokenFile, ApiError> {
        if !self.path.exists() {
            return Ok(TokenFile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ApiError::Storage(format!("{}: {}", self.path.display(), e)))?;
        toml::from_str(&content).map_err(|e| ApiError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        let file = self.read()?;
        Ok(Some(file.token).filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::Storage(e.to_string()))?;
        }
        let mut file = self.read().unwrap_or_default();
        file.token = token.to_string();
        let content = toml::to_string_pretty(&file).map_err(|e| ApiError::Storage(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| ApiError::Storage(e.to_string()))?;
        debug!("token saved to {}", self.path.display());
        Ok(())
    }

    /// Removes the file, dropping the refresh token along with the token.
    fn clear(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Storage(e.to_string())),
        }
    }
}

// ── Token sources ───────────────────────────────────────────────────

/// Token source reading the persisted session token on every request.
/// A 401 clears the store, which signs the user out.
pub struct StoredToken {
    store: Arc<dyn TokenStore>,
}

impl StoredToken {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl TokenSource for StoredToken {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        self.store.load()
    }

    async fn invalidate(&self) {
        if let Err(e) = self.store.clear() {
            warn!("failed to clear stored token: {}", e);
        }
    }
}

/// Password-based login. Lazily authenticates on first use and caches the
/// token until the server rejects it.
pub struct PasswordLogin {
    http: reqwest::Client,
    base_url: String,
    email_or_mobile: String,
    password: String,
    cached: tokio::sync::RwLock<Option<String>>,
}

impl PasswordLogin {
    pub fn new(
        base_url: impl Into<String>,
        email_or_mobile: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email_or_mobile: email_or_mobile.into(),
            password: password.into(),
            cached: tokio::sync::RwLock::new(None),
        }
    }

    async fn do_login(&self) -> Result<String, ApiError> {
        let url = format!("{}/api/auth/login", self.base_url);
        let resp = self.http.post(&url)
            .json(&LoginRequest {
                email_or_mobile: self.email_or_mobile.clone(),
                password: self.password.clone(),
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("login failed ({}): {}", status, body)));
        }

        let envelope: ApiEnvelope<LoginResponse> = resp.json().await
            .map_err(|e| ApiError::Decode(format!("login response: {}", e)))?;
        match envelope.data {
            Some(lr) if envelope.is_ok_status() && !lr.token.is_empty() => Ok(lr.token),
            _ => Err(ApiError::Auth(format!("login failed ({}): {}", envelope.status, envelope.message))),
        }
    }
}

#[async_trait::async_trait]
impl TokenSource for PasswordLogin {
    async fn token(&self) -> Result<Option<String>, ApiError> {
        // Fast path: read lock, check cache.
        if let Some(ref cached) = *self.cached.read().await {
            return Ok(Some(cached.clone()));
        }

        // Slow path: write lock, re-check, login.
        let mut guard = self.cached.write().await;
        if let Some(ref cached) = *guard {
            return Ok(Some(cached.clone()));
        }

        let fresh = self.do_login().await?;
        *guard = Some(fresh.clone());
        Ok(Some(fresh))
    }

    async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
