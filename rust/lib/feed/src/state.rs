//! Feed and engagement state, plus the views published to subscribers.

use std::collections::HashMap;

use m2m_client::{Content, FeedMode, UserEngagementStatus};
use serde::Serialize;

use crate::session::SessionId;

/// Pagination lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The server reported the last page.
    Exhausted,
    /// The last fetch failed; `retry` re-requests the same page.
    Errored,
}

/// Where a local engagement stands relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    Confirmed,
    /// Applied locally, request in flight.
    Pending,
    /// The latest request failed and the optimistic change was undone.
    Failed,
}

/// The local copy of one user-engagement record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementEntry {
    pub status: UserEngagementStatus,
    pub sync: SyncState,
    /// Order of the last local write or snapshot merge for this id.
    pub version: u64,
    #[serde(skip)]
    pub(crate) confirmed_liked: bool,
    #[serde(skip)]
    pub(crate) in_flight: u32,
    #[serde(skip)]
    pub(crate) latest_failed: bool,
    /// Flag the in-flight run of toggles started from.
    #[serde(skip)]
    pub(crate) baseline_liked: bool,
    /// Count changes applied by toggles not yet reconciled.
    #[serde(skip)]
    pub(crate) optimistic: Applied,
}

impl EngagementEntry {
    pub fn path(content_id: &str) -> String {
        format!("engagement/{}", content_id)
    }

    /// An entry as the server reported it.
    pub(crate) fn confirmed(status: UserEngagementStatus, version: u64) -> Self {
        Self {
            confirmed_liked: status.liked,
            baseline_liked: status.liked,
            optimistic: Applied::default(),
            status,
            sync: SyncState::Confirmed,
            version,
            in_flight: 0,
            latest_failed: false,
        }
    }

    pub fn liked(&self) -> bool {
        self.status.liked
    }

    pub fn is_pending(&self) -> bool {
        self.sync == SyncState::Pending
    }
}

/// Counter columns the client adjusts locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    Likes,
    Shares,
    Comments,
    Views,
}

/// Everything the feed engine owns, guarded by one lock in [`FeedStore`].
///
/// [`FeedStore`]: crate::FeedStore
#[derive(Debug, Clone)]
pub struct FeedState {
    pub mode: FeedMode,
    pub session: SessionId,
    pub phase: FeedPhase,
    /// Next page index to request.
    pub cursor: u32,
    pub error: Option<String>,
    pub items: Vec<Content>,
    pub engagements: HashMap<String, EngagementEntry>,
}

impl FeedState {
    pub fn new(mode: FeedMode, session: SessionId) -> Self {
        Self {
            mode,
            session,
            phase: FeedPhase::Idle,
            cursor: 0,
            error: None,
            items: Vec::new(),
            engagements: HashMap::new(),
        }
    }

    pub fn contains_item(&self, content_id: &str) -> bool {
        self.items.iter().any(|c| c.id == content_id)
    }

    /// Absent entries read as not liked.
    pub fn is_liked(&self, content_id: &str) -> bool {
        self.engagements.get(content_id).is_some_and(|e| e.status.liked)
    }

    /// Distinct item ids in feed order.
    pub fn item_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.id) {
                ids.push(item.id.clone());
            }
        }
        ids
    }

    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            mode: self.mode,
            phase: self.phase,
            cursor: self.cursor,
            item_count: self.items.len(),
            error: self.error.clone(),
        }
    }

    pub fn feed_items(&self) -> Vec<FeedItem> {
        self.items
            .iter()
            .map(|content| FeedItem {
                content: content.clone(),
                engagement: self.engagements.get(&content.id).cloned(),
            })
            .collect()
    }
}

/// Per-item deltas one [`adjust`] actually applied, in item order.
///
/// Saturation at zero means an applied delta can be smaller than requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied(Vec<i64>);

impl Applied {
    /// Whether any item carried the id.
    pub fn matched(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|d| *d == 0)
    }

    /// Folds `other` in, item by item.
    pub(crate) fn absorb(&mut self, other: &Applied) {
        for (i, d) in other.0.iter().enumerate() {
            match self.0.get_mut(i) {
                Some(acc) => *acc += d,
                None => self.0.push(*d),
            }
        }
    }
}

fn counter_mut(item: &mut Content, counter: Counter) -> &mut u64 {
    match counter {
        Counter::Likes => &mut item.like_count,
        Counter::Shares => &mut item.share_count,
        Counter::Comments => &mut item.comment_count,
        Counter::Views => &mut item.view_count,
    }
}

fn shift(field: &mut u64, delta: i64) -> i64 {
    let before = *field;
    *field = if delta >= 0 {
        before.saturating_add(delta as u64)
    } else {
        before.saturating_sub(delta.unsigned_abs())
    };
    *field as i64 - before as i64
}

/// Applies `delta` to one counter on every item with this id.
///
/// Counts never go below zero; the returned [`Applied`] records what moved.
pub(crate) fn adjust(items: &mut [Content], content_id: &str, counter: Counter, delta: i64) -> Applied {
    Applied(
        items
            .iter_mut()
            .filter(|c| c.id == content_id)
            .map(|item| shift(counter_mut(item, counter), delta))
            .collect(),
    )
}

/// Undoes an earlier [`adjust`] on the same items.
///
/// Items are append-only within a session, so the first matches are the
/// ones `applied` came from.
pub(crate) fn revert(items: &mut [Content], content_id: &str, counter: Counter, applied: &Applied) {
    let matching = items.iter_mut().filter(|c| c.id == content_id);
    for (item, delta) in matching.zip(applied.0.iter()) {
        shift(counter_mut(item, counter), -delta);
    }
}

// ── Published views ────────────────────────────────────────────────

/// Feed status, stored at `feed/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub mode: FeedMode,
    pub phase: FeedPhase,
    pub cursor: u32,
    pub item_count: usize,
    pub error: Option<String>,
}

impl FeedStatus {
    pub const PATH: &'static str = "feed/status";

    pub fn can_load_more(&self) -> bool {
        matches!(self.phase, FeedPhase::Idle | FeedPhase::Loaded)
    }
}

/// Feed items, stored at `feed/items`.
pub struct FeedItems;

impl FeedItems {
    pub const PATH: &'static str = "feed/items";
}

/// One rendered feed row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub content: Content,
    pub engagement: Option<EngagementEntry>,
}

impl FeedItem {
    pub fn liked(&self) -> bool {
        self.engagement.as_ref().is_some_and(|e| e.status.liked)
    }
}
