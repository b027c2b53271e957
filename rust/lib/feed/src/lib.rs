//! Feed state engine for the MemeToMoney client.
//!
//! Rust owns the feed and engagement state; a UI only renders it.
//!
//! - [`FeedPaginator`] accumulates pages for the active feed mode.
//! - [`EngagementReconciler`] applies like/share optimistically and
//!   reconciles with the content service's confirmation.
//! - [`FeedStore`] holds both and notifies path subscribers on change:
//!   `feed/items`, `feed/status`, `engagement/{content_id}`.
//! - [`FeedController`] is the entry point a UI drives.
//!
//! # Example
//!
//! ```ignore
//! let controller = FeedController::new(api, &config, ReconcilePolicy::default());
//! controller.sign_in(user.caller());
//! controller.subscribe("engagement/+", |path| println!("{path} changed"));
//!
//! controller.reset_feed(FeedMode::Trending).await?;
//! controller.toggle_like("c1").await?;
//! controller.load_next_page().await?;
//! ```

pub mod controller;
pub mod engagement;
pub mod error;
pub mod paginator;
pub mod session;
pub mod state;
pub mod store;
mod topic;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::FeedController;
pub use engagement::{
    EngagementReconciler, LikeSettlement, PendingLike, PendingShare, ReconcilePolicy,
    ShareSettlement,
};
pub use error::FeedError;
pub use paginator::{FeedPaginator, PageOutcome};
pub use session::{FeedSession, SessionId};
pub use state::{Applied, EngagementEntry, FeedItem, FeedItems, FeedPhase, FeedState, FeedStatus, SyncState};
pub use store::{ChangeHandler, Changes, FeedStore, SubscriptionId};
