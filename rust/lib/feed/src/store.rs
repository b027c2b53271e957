use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use m2m_client::FeedMode;

use crate::session::SessionId;
use crate::state::FeedState;
use crate::topic::TopicTree;

/// Called with the path that changed.
pub type ChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    handler: ChangeHandler,
}

/// Paths touched during one [`FeedStore::update`].
#[derive(Debug, Default)]
pub struct Changes {
    paths: Vec<String>,
}

impl Changes {
    pub fn touch(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Feed state behind one lock, with path-pattern subscriptions.
///
/// - `read(f)` runs `f` against the current state.
/// - `update(f)` mutates it; every path `f` touches is then delivered to
///   matching subscribers, after the lock is released.
/// - `subscribe(pattern, handler)` takes `+`/`#` wildcards.
pub struct FeedStore {
    state: RwLock<FeedState>,
    handlers: RwLock<TopicTree<HandlerEntry>>,
    next_id: AtomicU64,
    clock: AtomicU64,
}

impl FeedStore {
    pub fn new(mode: FeedMode) -> Self {
        Self {
            state: RwLock::new(FeedState::new(mode, SessionId::default())),
            handlers: RwLock::new(TopicTree::default()),
            next_id: AtomicU64::new(1),
            clock: AtomicU64::new(0),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn snapshot(&self) -> FeedState {
        self.read(FeedState::clone)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut FeedState, &mut Changes) -> R) -> R {
        let mut changes = Changes::default();
        let result = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut state, &mut changes)
        };
        self.notify(&changes);
        result
    }

    /// Next engagement version. Strictly increasing for the store's lifetime.
    pub fn next_version(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Highest version handed out so far.
    pub fn current_version(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = HandlerEntry { id, handler: Arc::new(handler) };
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern, entry);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.retain(&|entry: &HandlerEntry| entry.id != id) > 0
    }

    fn notify(&self, changes: &Changes) {
        for path in changes.paths() {
            let mut matched = Vec::new();
            self.handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .matches(path, &mut matched);
            for entry in matched {
                (entry.handler)(path);
            }
        }
    }
}
