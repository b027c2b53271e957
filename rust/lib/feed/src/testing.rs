//! Scripted in-memory content service for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use m2m_client::{
    ApiError, Caller, Comment, CommentRequest, Content, ContentApi, ContentType, EngagementAction,
    EngagementRequest, FeedMode, FeedResponse, UserEngagementStatus,
};
use m2m_core::{PageParams, PageResponse};
use tokio::sync::Semaphore;

pub(crate) fn content(id: &str, likes: u64) -> Content {
    let mut c = Content::new(id, ContentType::Meme);
    c.like_count = likes;
    c
}

pub(crate) fn short(id: &str) -> Content {
    Content::new(id, ContentType::ShortVideo)
}

pub(crate) fn engaged(id: &str, liked: bool) -> UserEngagementStatus {
    UserEngagementStatus {
        content_id: id.to_string(),
        user_id: "u1".to_string(),
        liked,
        ..Default::default()
    }
}

/// A page of `items`; ids listed in `liked` come back in the snapshot.
pub(crate) fn page(items: Vec<Content>, number: u32, last: bool, liked: &[&str]) -> FeedResponse {
    FeedResponse {
        content: PageResponse::of(items, number, last),
        user_engagements: liked
            .iter()
            .map(|id| (id.to_string(), engaged(id, true)))
            .collect(),
        recent_comments: HashMap::new(),
        metadata: Default::default(),
        user_authenticated: !liked.is_empty(),
    }
}

fn server_error(message: &str) -> ApiError {
    ApiError::Server { status: 500, message: message.to_string() }
}

#[derive(Default)]
struct Script {
    pages: HashMap<(FeedMode, u32), VecDeque<Result<FeedResponse, String>>>,
    feed_calls: Vec<(FeedMode, u32, u32)>,
    engagements: Vec<(String, EngagementAction)>,
    statuses: HashMap<String, UserEngagementStatus>,
    views: Vec<String>,
    comments: Vec<Comment>,
}

pub(crate) struct ScriptedApi {
    script: Mutex<Script>,
    fail_engagements: AtomicBool,
    fail_views: AtomicBool,
    gated: AtomicBool,
    gate: Semaphore,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            fail_engagements: AtomicBool::new(false),
            fail_views: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub(crate) fn push_page(&self, mode: FeedMode, number: u32, response: FeedResponse) {
        self.script.lock().unwrap().pages.entry((mode, number)).or_default().push_back(Ok(response));
    }

    pub(crate) fn push_failure(&self, mode: FeedMode, number: u32, message: &str) {
        self.script
            .lock()
            .unwrap()
            .pages
            .entry((mode, number))
            .or_default()
            .push_back(Err(message.to_string()));
    }

    pub(crate) fn set_status(&self, status: UserEngagementStatus) {
        self.script.lock().unwrap().statuses.insert(status.content_id.clone(), status);
    }

    pub(crate) fn fail_engagements(&self, fail: bool) {
        self.fail_engagements.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_views(&self, fail: bool) {
        self.fail_views.store(fail, Ordering::SeqCst);
    }

    /// Feed calls block until [`release_feeds`](Self::release_feeds).
    pub(crate) fn hold_feeds(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release_feeds(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// `(mode, page, size)` for every feed request, in order.
    pub(crate) fn feed_calls(&self) -> Vec<(FeedMode, u32, u32)> {
        self.script.lock().unwrap().feed_calls.clone()
    }

    pub(crate) fn engagements(&self) -> Vec<(String, EngagementAction)> {
        self.script.lock().unwrap().engagements.clone()
    }

    pub(crate) fn views(&self) -> Vec<String> {
        self.script.lock().unwrap().views.clone()
    }
}

#[async_trait::async_trait]
impl ContentApi for ScriptedApi {
    async fn feed(
        &self,
        mode: FeedMode,
        page: PageParams,
        _viewer: Option<&str>,
    ) -> Result<FeedResponse, ApiError> {
        self.script.lock().unwrap().feed_calls.push((mode, page.page, page.size));
        if self.gated.load(Ordering::SeqCst) {
            self.gate.acquire().await.unwrap().forget();
        }
        let next = self
            .script
            .lock()
            .unwrap()
            .pages
            .get_mut(&(mode, page.page))
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(server_error(&message)),
            None => Err(server_error("no page scripted")),
        }
    }

    async fn engage(
        &self,
        content_id: &str,
        request: &EngagementRequest,
        _caller: &Caller,
    ) -> Result<(), ApiError> {
        self.script
            .lock()
            .unwrap()
            .engagements
            .push((content_id.to_string(), request.action));
        if self.fail_engagements.load(Ordering::SeqCst) {
            Err(server_error("engagement rejected"))
        } else {
            Ok(())
        }
    }

    async fn bulk_engagement_status(
        &self,
        content_ids: &[String],
        _user_id: &str,
    ) -> Result<HashMap<String, UserEngagementStatus>, ApiError> {
        let script = self.script.lock().unwrap();
        Ok(content_ids
            .iter()
            .filter_map(|id| script.statuses.get(id).map(|s| (id.clone(), s.clone())))
            .collect())
    }

    async fn content(&self, content_id: &str) -> Result<Content, ApiError> {
        Ok(content(content_id, 0))
    }

    async fn record_view(&self, content_id: &str, _viewer: Option<&str>) -> Result<(), ApiError> {
        self.script.lock().unwrap().views.push(content_id.to_string());
        if self.fail_views.load(Ordering::SeqCst) {
            Err(server_error("view rejected"))
        } else {
            Ok(())
        }
    }

    async fn comments(
        &self,
        content_id: &str,
        page: PageParams,
    ) -> Result<PageResponse<Comment>, ApiError> {
        let items = self
            .script
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|c| c.content_id == content_id)
            .cloned()
            .collect();
        Ok(PageResponse::of(items, page.page, true))
    }

    async fn add_comment(
        &self,
        content_id: &str,
        request: &CommentRequest,
        caller: &Caller,
    ) -> Result<Comment, ApiError> {
        let comment = Comment {
            id: format!("cm{}", self.script.lock().unwrap().comments.len() + 1),
            content_id: content_id.to_string(),
            user_id: caller.user_id.clone(),
            text: request.text.clone(),
            parent_comment_id: request.parent_comment_id.clone(),
            ..Default::default()
        };
        self.script.lock().unwrap().comments.push(comment.clone());
        Ok(comment)
    }
}
