//! Optimistic like/share with reconciliation against the server.
//!
//! A like toggle is split in two so callers can interleave requests:
//! [`EngagementReconciler::begin_toggle_like`] applies the change locally and
//! returns a [`PendingLike`]; [`EngagementReconciler::settle_like`] applies the
//! server's answer. [`EngagementReconciler::toggle_like`] runs both around the
//! network call.
//!
//! Two policies decide how concurrent writes for one item resolve:
//!
//! - [`ReconcilePolicy::LastWriteWins`]: a failed request restores the flag it
//!   saw before toggling and reverses its own count delta. Snapshot merges
//!   overwrite entries wholesale. Settlements that arrive out of order can leave
//!   the flag reflecting whichever settled last.
//! - [`ReconcilePolicy::Versioned`]: each item tracks the last server-confirmed
//!   flag. Once no request for the item is in flight, the displayed flag and
//!   count converge to it. Snapshots skip items with writes newer than the
//!   snapshot's request.

use std::collections::HashMap;
use std::sync::Arc;

use m2m_client::{
    ApiError, Caller, ContentApi, EngagementAction, EngagementRequest, UserEngagementStatus,
};
use m2m_core::now_rfc3339;
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::session::SessionId;
use crate::state::{adjust, revert, Applied, Counter, EngagementEntry, FeedItems, FeedState, SyncState};
use crate::store::{Changes, FeedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcilePolicy {
    #[default]
    LastWriteWins,
    Versioned,
}

/// A like toggle applied locally and awaiting the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLike {
    pub content_id: String,
    pub session: SessionId,
    pub version: u64,
    pub previous_liked: bool,
    pub liked: bool,
    /// Like-count change this toggle made, reversed exactly on rollback.
    pub applied: Applied,
}

impl PendingLike {
    pub fn action(&self) -> EngagementAction {
        if self.liked { EngagementAction::Like } else { EngagementAction::Unlike }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeSettlement {
    /// The server accepted the toggle.
    Confirmed,
    /// The toggle failed and the local change was undone.
    RolledBack,
    /// The toggle failed; reconciliation waits for newer in-flight toggles.
    Deferred,
    /// The toggle failed but the display already matches the server.
    Superseded,
    /// The feed was reset since the toggle; nothing was applied.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingShare {
    pub content_id: String,
    pub session: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareSettlement {
    Confirmed,
    /// The request failed; the local increment stays.
    Kept,
    Stale,
}

pub struct EngagementReconciler {
    store: Arc<FeedStore>,
    api: Arc<dyn ContentApi>,
    policy: ReconcilePolicy,
}

impl EngagementReconciler {
    pub fn new(store: Arc<FeedStore>, api: Arc<dyn ContentApi>, policy: ReconcilePolicy) -> Self {
        Self { store, api, policy }
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn is_liked(&self, content_id: &str) -> bool {
        self.store.read(|state| state.is_liked(content_id))
    }

    pub fn entry(&self, content_id: &str) -> Option<EngagementEntry> {
        self.store.read(|state| state.engagements.get(content_id).cloned())
    }

    // ── Likes ───────────────────────────────────────────────────────

    /// Flips the like flag and adjusts the count by ±1 on every matching item.
    ///
    /// An unlike at zero leaves the count at zero.
    pub fn begin_toggle_like(
        &self,
        content_id: &str,
        currently_liked: bool,
        user_id: &str,
    ) -> Result<PendingLike, FeedError> {
        self.store.update(|state, changes| {
            if !state.contains_item(content_id) {
                return Err(FeedError::UnknownContent(content_id.to_string()));
            }
            let liked = !currently_liked;
            let version = self.store.next_version();
            let entry = state
                .engagements
                .entry(content_id.to_string())
                .or_insert_with(|| {
                    let mut unknown = EngagementEntry::confirmed(UserEngagementStatus::default(), 0);
                    unknown.confirmed_liked = currently_liked;
                    unknown.baseline_liked = currently_liked;
                    unknown
                });
            if entry.in_flight == 0 {
                entry.baseline_liked = entry.confirmed_liked;
                entry.optimistic = Applied::default();
            }
            entry.status.content_id = content_id.to_string();
            entry.status.user_id = user_id.to_string();
            entry.status.liked = liked;
            entry.status.liked_at = liked.then(now_rfc3339);
            entry.sync = SyncState::Pending;
            entry.version = version;
            entry.in_flight += 1;
            entry.latest_failed = false;

            let delta = if liked { 1 } else { -1 };
            let applied = adjust(&mut state.items, content_id, Counter::Likes, delta);
            entry.optimistic.absorb(&applied);

            let pending = PendingLike {
                content_id: content_id.to_string(),
                session: state.session,
                version,
                previous_liked: currently_liked,
                liked,
                applied,
            };
            changes.touch(EngagementEntry::path(content_id));
            changes.touch(FeedItems::PATH);
            debug!("like {} -> {} (v{})", content_id, liked, version);
            Ok(pending)
        })
    }

    /// Applies the server's answer to a toggle begun earlier.
    pub fn settle_like(
        &self,
        pending: &PendingLike,
        outcome: &Result<(), ApiError>,
    ) -> LikeSettlement {
        let policy = self.policy;
        self.store.update(|state, changes| {
            if state.session != pending.session {
                debug!("dropping like settlement for {} from old session", pending.content_id);
                return LikeSettlement::Stale;
            }
            let id = pending.content_id.as_str();
            let Some(entry) = state.engagements.get_mut(id) else {
                return LikeSettlement::Stale;
            };
            entry.in_flight = entry.in_flight.saturating_sub(1);
            changes.touch(EngagementEntry::path(id));

            match policy {
                ReconcilePolicy::LastWriteWins => match outcome {
                    Ok(()) => {
                        entry.confirmed_liked = pending.liked;
                        if entry.version == pending.version {
                            entry.sync = SyncState::Confirmed;
                        }
                        LikeSettlement::Confirmed
                    }
                    Err(_) => {
                        entry.status.liked = pending.previous_liked;
                        entry.confirmed_liked = pending.previous_liked;
                        entry.sync = SyncState::Failed;
                        revert(&mut state.items, id, Counter::Likes, &pending.applied);
                        changes.touch(FeedItems::PATH);
                        LikeSettlement::RolledBack
                    }
                },
                ReconcilePolicy::Versioned => {
                    if outcome.is_ok() {
                        entry.confirmed_liked = pending.liked;
                    }
                    if entry.version == pending.version {
                        entry.latest_failed = outcome.is_err();
                    }
                    if entry.in_flight > 0 {
                        return if outcome.is_ok() {
                            LikeSettlement::Confirmed
                        } else {
                            LikeSettlement::Deferred
                        };
                    }

                    // Back to the counts the run started from, then apply
                    // the confirmed change, if any.
                    let displayed = entry.status.liked;
                    let target = entry.confirmed_liked;
                    let optimistic = std::mem::take(&mut entry.optimistic);
                    revert(&mut state.items, id, Counter::Likes, &optimistic);
                    if target != entry.baseline_liked {
                        adjust(&mut state.items, id, Counter::Likes, if target { 1 } else { -1 });
                    }
                    entry.baseline_liked = target;
                    entry.status.liked = target;
                    entry.sync = if entry.latest_failed { SyncState::Failed } else { SyncState::Confirmed };
                    changes.touch(FeedItems::PATH);
                    match outcome {
                        Ok(()) => LikeSettlement::Confirmed,
                        Err(_) if displayed != target => LikeSettlement::RolledBack,
                        Err(_) => LikeSettlement::Superseded,
                    }
                }
            }
        })
    }

    /// Optimistic toggle, engage call, settlement.
    pub async fn toggle_like(
        &self,
        content_id: &str,
        currently_liked: bool,
        caller: &Caller,
    ) -> Result<LikeSettlement, FeedError> {
        let pending = self.begin_toggle_like(content_id, currently_liked, &caller.user_id)?;
        let outcome = self
            .api
            .engage(content_id, &EngagementRequest::new(pending.action()), caller)
            .await;
        if let Err(ref e) = outcome {
            warn!("{:?} on {} failed: {}", pending.action(), content_id, e);
        }
        Ok(self.settle_like(&pending, &outcome))
    }

    // ── Shares ──────────────────────────────────────────────────────

    /// Marks the item shared and increments its share count.
    pub fn begin_share(&self, content_id: &str, user_id: &str) -> Result<PendingShare, FeedError> {
        self.store.update(|state, changes| {
            if !state.contains_item(content_id) {
                return Err(FeedError::UnknownContent(content_id.to_string()));
            }
            let entry = state
                .engagements
                .entry(content_id.to_string())
                .or_insert_with(|| EngagementEntry::confirmed(UserEngagementStatus::default(), 0));
            entry.status.content_id = content_id.to_string();
            entry.status.user_id = user_id.to_string();
            entry.status.shared = true;
            entry.status.shared_at = Some(now_rfc3339());

            adjust(&mut state.items, content_id, Counter::Shares, 1);
            changes.touch(EngagementEntry::path(content_id));
            changes.touch(FeedItems::PATH);
            Ok(PendingShare { content_id: content_id.to_string(), session: state.session })
        })
    }

    /// Shares are never rolled back.
    pub fn settle_share(&self, pending: &PendingShare, outcome: &Result<(), ApiError>) -> ShareSettlement {
        if self.store.read(|state| state.session) != pending.session {
            return ShareSettlement::Stale;
        }
        match outcome {
            Ok(()) => ShareSettlement::Confirmed,
            Err(e) => {
                warn!("share of {} not recorded, keeping local count: {}", pending.content_id, e);
                ShareSettlement::Kept
            }
        }
    }

    pub async fn record_share(&self, content_id: &str, caller: &Caller) -> Result<ShareSettlement, FeedError> {
        let pending = self.begin_share(content_id, &caller.user_id)?;
        let outcome = self
            .api
            .engage(content_id, &EngagementRequest::new(EngagementAction::Share), caller)
            .await;
        Ok(self.settle_share(&pending, &outcome))
    }

    // ── Snapshots ───────────────────────────────────────────────────

    /// Merges a server snapshot taken now.
    pub fn merge_snapshot(&self, snapshot: HashMap<String, UserEngagementStatus>) -> usize {
        let as_of = self.store.current_version();
        self.merge_snapshot_as_of(snapshot, as_of)
    }

    /// Merges a snapshot whose request was issued when the store's version
    /// was `as_of`. Returns how many entries were written.
    pub fn merge_snapshot_as_of(
        &self,
        snapshot: HashMap<String, UserEngagementStatus>,
        as_of: u64,
    ) -> usize {
        self.store
            .update(|state, changes| self.merge_into(state, changes, snapshot, as_of))
    }

    pub(crate) fn merge_into(
        &self,
        state: &mut FeedState,
        changes: &mut Changes,
        snapshot: HashMap<String, UserEngagementStatus>,
        as_of: u64,
    ) -> usize {
        let mut written = 0;
        for (id, mut status) in snapshot {
            if self.policy == ReconcilePolicy::Versioned {
                if let Some(local) = state.engagements.get(&id) {
                    if local.in_flight > 0 || local.version > as_of {
                        debug!("snapshot skips {} (v{} > v{})", id, local.version, as_of);
                        continue;
                    }
                }
            }
            if status.content_id.is_empty() {
                status.content_id = id.clone();
            }
            let entry = EngagementEntry::confirmed(status, self.store.next_version());
            changes.touch(EngagementEntry::path(&id));
            state.engagements.insert(id, entry);
            written += 1;
        }
        written
    }
}
