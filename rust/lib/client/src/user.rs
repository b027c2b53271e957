//! User service profile and follow calls.

use std::sync::Arc;

use m2m_core::ServiceConfig;
use tracing::debug;

use crate::http::ServiceClient;
use crate::model::User;
use crate::{ApiError, TokenSource};

/// Other users' profiles and the follow graph, as seen by the token holder.
pub struct UserApi {
    client: ServiceClient,
}

impl UserApi {
    pub fn new(config: &ServiceConfig, token_source: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let client = ServiceClient::with_timeout(
            config.user_service_url.clone(),
            token_source,
            config.timeout(),
        )?;
        Ok(Self { client })
    }

    /// `GET /api/users/{id}`.
    pub async fn profile(&self, user_id: &str) -> Result<User, ApiError> {
        self.client.call(self.client.get(&format!("/api/users/{}", user_id))).await
    }

    pub async fn follow(&self, user_id: &str) -> Result<(), ApiError> {
        debug!("follow {}", user_id);
        let req = self.client
            .post(&format!("/api/users/{}/follow", user_id))
            .json(&serde_json::json!({}));
        self.client.call_unit(req).await
    }

    pub async fn unfollow(&self, user_id: &str) -> Result<(), ApiError> {
        debug!("unfollow {}", user_id);
        let req = self.client
            .post(&format!("/api/users/{}/unfollow", user_id))
            .json(&serde_json::json!({}));
        self.client.call_unit(req).await
    }

    pub async fn is_following(&self, user_id: &str) -> Result<bool, ApiError> {
        let req = self.client.get(&format!("/api/users/{}/is-following", user_id));
        self.client.call::<bool>(req).await
    }
}
