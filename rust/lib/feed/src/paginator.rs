//! Page accumulation for the active feed mode.
//!
//! ```text
//! Idle ──load──▶ Loading ──ok, more──▶ Loaded ──load──▶ Loading …
//!                   │  └──ok, last──▶ Exhausted
//!                   └──error──▶ Errored ──retry──▶ Loading (same page)
//! reset(mode): any phase ──▶ Idle, new session, state cleared
//! ```

use std::sync::Arc;

use m2m_client::{ApiError, ContentApi, FeedMode, FeedResponse};
use m2m_core::PageParams;
use tracing::{debug, info, warn};

use crate::engagement::EngagementReconciler;
use crate::error::FeedError;
use crate::session::{FeedSession, SessionId, Sessions};
use crate::state::{EngagementEntry, FeedItems, FeedPhase, FeedState, FeedStatus};
use crate::store::FeedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Appended { page: u32, count: usize, last: bool },
    /// Already at the end; nothing was requested.
    Exhausted,
    /// The feed was reset while the page was in flight; it was discarded.
    Stale,
}

pub struct FeedPaginator {
    store: Arc<FeedStore>,
    api: Arc<dyn ContentApi>,
    reconciler: Arc<EngagementReconciler>,
    sessions: Sessions,
    page_size: u32,
}

impl FeedPaginator {
    pub fn new(
        store: Arc<FeedStore>,
        api: Arc<dyn ContentApi>,
        reconciler: Arc<EngagementReconciler>,
        page_size: u32,
    ) -> Self {
        let mode = store.read(|state| state.mode);
        Self {
            store,
            api,
            reconciler,
            sessions: Sessions::new(mode),
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn session(&self) -> FeedSession {
        self.sessions.current()
    }

    /// Switches to `mode` and clears items, engagements and cursor.
    ///
    /// Any page still in flight for the old session is cancelled.
    pub fn reset(&self, mode: FeedMode) -> FeedSession {
        let session = self.sessions.rotate(mode, || {
            self.store.update(|state, changes| {
                for content_id in state.engagements.keys() {
                    changes.touch(EngagementEntry::path(content_id));
                }
                let id = state.session.next();
                *state = FeedState::new(mode, id);
                changes.touch(FeedItems::PATH);
                changes.touch(FeedStatus::PATH);
                id
            })
        });
        info!("feed reset to {} ({})", mode, session.id());
        session
    }

    /// Requests the page at the cursor and appends it.
    ///
    /// `Busy` while another load is in flight; a no-op once exhausted.
    pub async fn load_next_page(&self, viewer: Option<&str>) -> Result<PageOutcome, FeedError> {
        let issued = self.store.update(|state, changes| match state.phase {
            FeedPhase::Loading => Err(FeedError::Busy),
            FeedPhase::Exhausted => Ok(None),
            _ => {
                state.phase = FeedPhase::Loading;
                state.error = None;
                changes.touch(FeedStatus::PATH);
                Ok(Some((state.session, state.mode, state.cursor)))
            }
        })?;
        let Some((session, mode, page)) = issued else {
            return Ok(PageOutcome::Exhausted);
        };
        let as_of = self.store.current_version();
        let current = self.sessions.settled();
        if current.id() != session {
            debug!("page {} of {} issued before a reset", page, session);
            return Ok(PageOutcome::Stale);
        }
        let cancel = current.cancel_token().clone();

        debug!("loading {} page {} ({})", mode, page, session);
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("page {} of {} cancelled", page, session);
                return Ok(PageOutcome::Stale);
            }
            result = self.api.feed(mode, PageParams::new(page, self.page_size), viewer) => result,
        };
        self.apply(session, page, as_of, result)
    }

    /// Re-requests the page whose load failed.
    pub async fn retry(&self, viewer: Option<&str>) -> Result<PageOutcome, FeedError> {
        let cursor = self.store.read(|state| state.cursor);
        debug!("retrying page {}", cursor);
        self.load_next_page(viewer).await
    }

    fn apply(
        &self,
        session: SessionId,
        page: u32,
        as_of: u64,
        result: Result<FeedResponse, ApiError>,
    ) -> Result<PageOutcome, FeedError> {
        match result {
            Ok(response) => {
                let outcome = self.store.update(|state, changes| {
                    if state.session != session {
                        return None;
                    }
                    let last = response.is_last();
                    let FeedResponse { content, user_engagements, .. } = response;
                    let count = content.content.len();
                    state.items.extend(content.content);
                    state.cursor = page + 1;
                    state.phase = if last { FeedPhase::Exhausted } else { FeedPhase::Loaded };
                    self.reconciler.merge_into(state, changes, user_engagements, as_of);
                    changes.touch(FeedItems::PATH);
                    changes.touch(FeedStatus::PATH);
                    Some(PageOutcome::Appended { page, count, last })
                });
                match outcome {
                    Some(outcome) => {
                        debug!("{:?}", outcome);
                        Ok(outcome)
                    }
                    None => {
                        debug!("discarding page {} from {}", page, session);
                        Ok(PageOutcome::Stale)
                    }
                }
            }
            Err(e) => {
                let current = self.store.update(|state, changes| {
                    if state.session != session {
                        return false;
                    }
                    state.phase = FeedPhase::Errored;
                    state.error = Some(e.to_string());
                    changes.touch(FeedStatus::PATH);
                    true
                });
                if !current {
                    return Ok(PageOutcome::Stale);
                }
                warn!("page {} failed: {}", page, e);
                Err(FeedError::Api(e))
            }
        }
    }
}
