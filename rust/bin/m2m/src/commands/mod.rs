pub mod auth;
pub mod feed;
pub mod users;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use m2m_client::{AuthApi, FileTokenStore, HttpContentApi, StoredToken, TokenStore, UserApi};
use m2m_core::ServiceConfig;
use m2m_feed::{FeedController, ReconcilePolicy};
use tracing::debug;

use crate::config::{self, ServiceArgs};
use crate::Output;

/// Resolved settings shared by every command.
pub struct Context {
    pub config: ServiceConfig,
    pub tokens: Arc<dyn TokenStore>,
    pub output: Output,
}

impl Context {
    pub fn load(config_path: &Path, overrides: &ServiceArgs, output: Output) -> Result<Self> {
        let config = config::load(config_path, overrides)?;
        let token_path = config::token_path(config_path);
        debug!("config {}, token {}", config_path.display(), token_path.display());
        Ok(Self {
            config,
            tokens: Arc::new(FileTokenStore::new(token_path)),
            output,
        })
    }

    pub fn auth(&self) -> Result<AuthApi> {
        Ok(AuthApi::new(&self.config, self.tokens.clone())?)
    }

    pub fn users(&self) -> Result<UserApi> {
        Ok(UserApi::new(&self.config, Arc::new(StoredToken::new(self.tokens.clone())))?)
    }

    pub fn content(&self) -> Result<HttpContentApi> {
        Ok(HttpContentApi::new(&self.config, Arc::new(StoredToken::new(self.tokens.clone())))?)
    }

    /// Feed controller signed in as the stored session's user, if any.
    pub async fn controller(&self) -> Result<FeedController> {
        let api = self.content()?;
        let controller = FeedController::new(Arc::new(api), &self.config, ReconcilePolicy::default());
        if let Some(user) = self.auth()?.restore_session().await? {
            controller.sign_in(user.caller());
        }
        Ok(controller)
    }

    pub fn json(&self) -> bool {
        self.output == Output::Json
    }
}
