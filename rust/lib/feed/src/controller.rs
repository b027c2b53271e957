use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use m2m_client::{
    Caller, Comment, CommentRequest, Content, ContentApi, FeedMode, UserEngagementStatus,
};
use m2m_core::{PageParams, PageResponse, ServiceConfig};
use tracing::{debug, info, warn};

use crate::engagement::{EngagementReconciler, LikeSettlement, ReconcilePolicy, ShareSettlement};
use crate::error::FeedError;
use crate::paginator::{FeedPaginator, PageOutcome};
use crate::state::{adjust, Counter, EngagementEntry, FeedItem, FeedItems, FeedState, FeedStatus};
use crate::store::{FeedStore, SubscriptionId};

/// Entry point for a feed UI.
///
/// Holds the signed-in identity and routes user actions to the paginator and
/// the engagement reconciler. All state lives in the shared [`FeedStore`].
pub struct FeedController {
    store: Arc<FeedStore>,
    api: Arc<dyn ContentApi>,
    reconciler: Arc<EngagementReconciler>,
    paginator: FeedPaginator,
    caller: RwLock<Option<Caller>>,
}

impl FeedController {
    pub fn new(api: Arc<dyn ContentApi>, config: &ServiceConfig, policy: ReconcilePolicy) -> Self {
        let store = Arc::new(FeedStore::new(FeedMode::default()));
        let reconciler = Arc::new(EngagementReconciler::new(store.clone(), api.clone(), policy));
        let paginator = FeedPaginator::new(store.clone(), api.clone(), reconciler.clone(), config.page_size);
        Self {
            store,
            api,
            reconciler,
            paginator,
            caller: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &Arc<FeedStore> {
        &self.store
    }

    pub fn reconciler(&self) -> &EngagementReconciler {
        &self.reconciler
    }

    pub fn paginator(&self) -> &FeedPaginator {
        &self.paginator
    }

    // ── Identity ────────────────────────────────────────────────────

    pub fn sign_in(&self, caller: Caller) {
        info!("feed viewer is {}", caller.user_id);
        *self.caller.write().unwrap_or_else(PoisonError::into_inner) = Some(caller);
    }

    pub fn sign_out(&self) {
        *self.caller.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn caller(&self) -> Option<Caller> {
        self.caller.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn require_caller(&self) -> Result<Caller, FeedError> {
        self.caller().ok_or(FeedError::NotSignedIn)
    }

    fn viewer_id(&self) -> Option<String> {
        self.caller().map(|c| c.user_id)
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.store.subscribe(pattern, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn status(&self) -> FeedStatus {
        self.store.read(FeedState::status)
    }

    pub fn items(&self) -> Vec<FeedItem> {
        self.store.read(FeedState::feed_items)
    }

    pub fn engagement(&self, content_id: &str) -> Option<EngagementEntry> {
        self.reconciler.entry(content_id)
    }

    pub fn is_liked(&self, content_id: &str) -> bool {
        self.reconciler.is_liked(content_id)
    }

    // ── Pagination ──────────────────────────────────────────────────

    /// Switches mode, clears everything, and loads page 0.
    pub async fn reset_feed(&self, mode: FeedMode) -> Result<PageOutcome, FeedError> {
        self.paginator.reset(mode);
        self.load_next_page().await
    }

    pub async fn load_next_page(&self) -> Result<PageOutcome, FeedError> {
        let viewer = self.viewer_id();
        self.paginator.load_next_page(viewer.as_deref()).await
    }

    pub async fn retry(&self) -> Result<PageOutcome, FeedError> {
        let viewer = self.viewer_id();
        self.paginator.retry(viewer.as_deref()).await
    }

    // ── Engagement ──────────────────────────────────────────────────

    /// Likes or unlikes, based on the current local flag.
    pub async fn toggle_like(&self, content_id: &str) -> Result<LikeSettlement, FeedError> {
        let caller = self.require_caller()?;
        let liked = self.reconciler.is_liked(content_id);
        self.reconciler.toggle_like(content_id, liked, &caller).await
    }

    pub async fn record_share(&self, content_id: &str) -> Result<ShareSettlement, FeedError> {
        let caller = self.require_caller()?;
        self.reconciler.record_share(content_id, &caller).await
    }

    /// Re-fetches the viewer's engagement for every loaded item.
    ///
    /// Signed out or empty feed: nothing to do.
    pub async fn refresh_engagements(&self) -> Result<usize, FeedError> {
        let Some(caller) = self.caller() else {
            return Ok(0);
        };
        let (session, ids) = self.store.read(|state| (state.session, state.item_ids()));
        if ids.is_empty() {
            return Ok(0);
        }
        let as_of = self.store.current_version();
        let snapshot: HashMap<String, UserEngagementStatus> =
            self.api.bulk_engagement_status(&ids, &caller.user_id).await?;

        let written = self.store.update(|state, changes| {
            if state.session != session {
                return 0;
            }
            self.reconciler.merge_into(state, changes, snapshot, as_of)
        });
        debug!("refreshed {} engagement entries", written);
        Ok(written)
    }

    /// Best effort. Bumps the local view count when the server records it.
    pub async fn record_view(&self, content_id: &str) -> Result<bool, FeedError> {
        let viewer = self.viewer_id();
        match self.api.record_view(content_id, viewer.as_deref()).await {
            Ok(()) => {
                self.bump(content_id, Counter::Views);
                Ok(true)
            }
            Err(e) => {
                warn!("view of {} not recorded: {}", content_id, e);
                Ok(false)
            }
        }
    }

    pub async fn comments(&self, content_id: &str, page: PageParams) -> Result<PageResponse<Comment>, FeedError> {
        Ok(self.api.comments(content_id, page).await?)
    }

    pub async fn add_comment(
        &self,
        content_id: &str,
        text: &str,
        parent_comment_id: Option<String>,
    ) -> Result<Comment, FeedError> {
        let caller = self.require_caller()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedError::EmptyComment);
        }
        let request = CommentRequest { text: text.to_string(), parent_comment_id };
        let comment = self.api.add_comment(content_id, &request, &caller).await?;
        self.bump(content_id, Counter::Comments);
        Ok(comment)
    }

    /// Up to `limit` short videos from the first trending page.
    pub async fn shorts_preview(&self, limit: usize) -> Result<Vec<Content>, FeedError> {
        let size = u32::try_from(limit.saturating_mul(2)).unwrap_or(u32::MAX).max(1);
        let viewer = self.viewer_id();
        let page = self
            .api
            .feed(FeedMode::Trending, PageParams::first(size), viewer.as_deref())
            .await?;
        Ok(page.content.content.into_iter().filter(Content::is_short).take(limit).collect())
    }

    fn bump(&self, content_id: &str, counter: Counter) {
        self.store.update(|state, changes| {
            if adjust(&mut state.items, content_id, counter, 1).matched() {
                changes.touch(FeedItems::PATH);
            }
        });
    }
}
