//! Shared request plumbing: base URL, bearer auth, envelope decoding.

use std::sync::Arc;
use std::time::Duration;

use m2m_core::ApiEnvelope;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{ApiError, TokenSource};

/// HTTP client bound to one backend service.
#[derive(Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        }
    }

    /// Like [`ServiceClient::new`] with a per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_source(&self) -> &Arc<dyn TokenSource> {
        &self.token_source
    }

    /// Absolute URL for an API path such as `/api/content/feed`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.url(path))
    }

    pub fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.patch(self.url(path))
    }

    /// Build a request with auth header.
    async fn authed(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Send and decode the `{status, message, data}` envelope.
    ///
    /// Non-2xx HTTP statuses become `ApiError::Server`; a 401 also
    /// invalidates the token source.
    pub async fn send_envelope<R: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<ApiEnvelope<R>, ApiError> {
        let req = self.authed(builder).await?;
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            if code == 401 {
                warn!("{} answered 401, dropping token", self.base_url);
                self.token_source.invalidate().await;
            }
            return Err(ApiError::Server { status: code, message: error_message(&body) });
        }
        resp.json::<ApiEnvelope<R>>()
            .await
            .map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }

    /// Send and require a successful envelope with a payload.
    pub async fn call<R: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<R, ApiError> {
        let envelope = self.send_envelope::<R>(builder).await?;
        if !envelope.is_ok_status() {
            return Err(ApiError::Rejected { status: envelope.status, message: envelope.message });
        }
        envelope.data.ok_or_else(|| ApiError::Decode(format!("empty data ({})", envelope.message)))
    }

    /// Send and require a successful envelope status; the payload is ignored.
    pub async fn call_unit(&self, builder: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let envelope = self.send_envelope::<serde_json::Value>(builder).await?;
        if !envelope.is_ok_status() {
            return Err(ApiError::Rejected { status: envelope.status, message: envelope.message });
        }
        debug!("{}: {}", envelope.status, envelope.message);
        Ok(())
    }
}

/// Prefer the envelope's `message` over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
