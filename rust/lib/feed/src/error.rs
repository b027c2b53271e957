use m2m_client::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Engagement on an id the loaded feed does not contain.
    #[error("content '{0}' is not in the feed")]
    UnknownContent(String),

    #[error("sign in required")]
    NotSignedIn,

    /// A page load is already in flight.
    #[error("feed is already loading")]
    Busy,

    #[error("comment text is empty")]
    EmptyComment,

    #[error(transparent)]
    Api(#[from] ApiError),
}
