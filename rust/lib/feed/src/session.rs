//! Feed sessions.
//!
//! Each reset opens a new session. Work issued under an older session is
//! cancelled, and anything that still completes is discarded.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use m2m_client::FeedMode;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Handle for one feed session.
#[derive(Debug, Clone)]
pub struct FeedSession {
    id: SessionId,
    mode: FeedMode,
    cancel: CancellationToken,
}

impl FeedSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub(crate) struct Sessions {
    current: Mutex<FeedSession>,
    /// Held from opening a session in the store until it is installed here.
    rotation: Mutex<()>,
}

impl Sessions {
    pub(crate) fn new(mode: FeedMode) -> Self {
        Self {
            current: Mutex::new(FeedSession {
                id: SessionId::default(),
                mode,
                cancel: CancellationToken::new(),
            }),
            rotation: Mutex::new(()),
        }
    }

    pub(crate) fn current(&self) -> FeedSession {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The current session once no rotation is half done.
    pub(crate) fn settled(&self) -> FeedSession {
        let _rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        self.current()
    }

    /// Opens a session with `open` and installs it, cancelling the one it
    /// replaces. Rotations are serialized, so the installed session is always
    /// the last one opened.
    pub(crate) fn rotate(&self, mode: FeedMode, open: impl FnOnce() -> SessionId) -> FeedSession {
        let _rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        let id = open();
        self.begin(id, mode)
    }

    /// Installs session `id`, cancelling the one it replaces.
    fn begin(&self, id: SessionId, mode: FeedMode) -> FeedSession {
        let session = FeedSession { id, mode, cancel: CancellationToken::new() };
        let old = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, session.clone())
        };
        old.cancel.cancel();
        session
    }
}
