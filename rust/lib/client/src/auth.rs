//! User service API and the token-based session gate.

use std::sync::Arc;

use m2m_core::ServiceConfig;
use tracing::{info, warn};

use crate::http::ServiceClient;
use crate::model::{LoginRequest, LoginResponse, RegisterRequest, User};
use crate::token::{StoredToken, TokenStore};
use crate::ApiError;

/// A signed-in session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub user: Option<User>,
}

/// Auth and profile calls against the user service.
///
/// Successful logins persist the token in the [`TokenStore`]; every other
/// call authenticates with whatever the store currently holds.
pub struct AuthApi {
    client: ServiceClient,
    store: Arc<dyn TokenStore>,
}

impl AuthApi {
    pub fn new(config: &ServiceConfig, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let client = ServiceClient::with_timeout(
            config.user_service_url.clone(),
            Arc::new(StoredToken::new(store.clone())),
            config.timeout(),
        )?;
        Ok(Self { client, store })
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self.store.load(), Ok(Some(_)))
    }

    /// `POST /api/auth/login`.
    pub async fn login(&self, email_or_mobile: &str, password: &str) -> Result<Session, ApiError> {
        let req = self.client.post("/api/auth/login").json(&LoginRequest {
            email_or_mobile: email_or_mobile.to_string(),
            password: password.to_string(),
        });
        let resp: LoginResponse = self.client.call(req).await.map_err(|e| {
            if e.is_unauthorized() { ApiError::Auth(e.to_string()) } else { e }
        })?;
        if resp.token.is_empty() {
            return Err(ApiError::Auth("login response carried no token".into()));
        }

        self.store.save(&resp.token)?;
        let user_id = if resp.user_id.is_empty() {
            resp.user.as_ref().map(|u| u.id.clone()).unwrap_or_default()
        } else {
            resp.user_id
        };
        info!("signed in as {}", user_id);
        Ok(Session { token: resp.token, user_id, user: resp.user })
    }

    /// `POST /api/auth/register`. Returns the service's confirmation message;
    /// the new account still has to log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<String, ApiError> {
        let req = self.client.post("/api/auth/register").query(request);
        let message: String = self.client.call(req).await?;
        info!("registered {}", request.email);
        Ok(message)
    }

    /// `GET /api/users/me`.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.client.call(self.client.get("/api/users/me")).await
    }

    /// `PATCH /api/users/me` with a partial profile.
    pub async fn update_profile(&self, patch: &serde_json::Value) -> Result<User, ApiError> {
        self.client.call(self.client.patch("/api/users/me").json(patch)).await
    }

    /// `POST /api/token/validate` with the stored token.
    pub async fn validate_token(&self) -> Result<bool, ApiError> {
        let Some(token) = self.store.load()? else {
            return Ok(false);
        };
        let req = self.client
            .post("/api/token/validate")
            .json(&serde_json::json!({ "token": token }));
        match self.client.call_unit(req).await {
            Ok(()) => Ok(true),
            Err(ApiError::Server { .. }) | Err(ApiError::Rejected { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Forget the stored token.
    pub fn logout(&self) -> Result<(), ApiError> {
        info!("signing out");
        self.store.clear()
    }

    /// Session gate run at startup.
    ///
    /// No stored token means signed out. A stored token is checked against
    /// `/api/users/me`; any failure clears it.
    pub async fn restore_session(&self) -> Result<Option<User>, ApiError> {
        if self.store.load()?.is_none() {
            return Ok(None);
        }
        match self.current_user().await {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("stored session rejected: {}", e);
                self.store.clear()?;
                Ok(None)
            }
        }
    }
}
