//! Content service API: feeds, engagement, comments, listings and uploads.

use std::collections::HashMap;
use std::sync::Arc;

use m2m_core::{PageParams, PageResponse, ServiceConfig};
use tracing::{debug, info};

use crate::http::ServiceClient;
use crate::model::*;
use crate::{ApiError, TokenSource};

const USER_ID_HEADER: &str = "X-User-Id";
const USER_HANDLE_HEADER: &str = "X-User-Handle";

/// The content service operations the feed layer depends on.
///
/// `HttpContentApi` is the production implementation; tests substitute
/// scripted fakes.
#[async_trait::async_trait]
pub trait ContentApi: Send + Sync + 'static {
    /// One page of a feed. `viewer` selects whose engagement snapshot
    /// comes back with it.
    async fn feed(
        &self,
        mode: FeedMode,
        page: PageParams,
        viewer: Option<&str>,
    ) -> Result<FeedResponse, ApiError>;

    /// `POST /api/content/{id}/engage`. `Ok` only for a success status.
    async fn engage(
        &self,
        content_id: &str,
        request: &EngagementRequest,
        caller: &Caller,
    ) -> Result<(), ApiError>;

    async fn bulk_engagement_status(
        &self,
        content_ids: &[String],
        user_id: &str,
    ) -> Result<HashMap<String, UserEngagementStatus>, ApiError>;

    async fn content(&self, content_id: &str) -> Result<Content, ApiError>;

    async fn record_view(&self, content_id: &str, viewer: Option<&str>) -> Result<(), ApiError>;

    async fn comments(
        &self,
        content_id: &str,
        page: PageParams,
    ) -> Result<PageResponse<Comment>, ApiError>;

    async fn add_comment(
        &self,
        content_id: &str,
        request: &CommentRequest,
        caller: &Caller,
    ) -> Result<Comment, ApiError>;
}

/// reqwest-backed content service client.
pub struct HttpContentApi {
    client: ServiceClient,
    config: ServiceConfig,
}

impl HttpContentApi {
    pub fn new(config: &ServiceConfig, token_source: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let client = ServiceClient::with_timeout(
            config.content_service_url.clone(),
            token_source,
            config.timeout(),
        )?;
        Ok(Self { client, config: config.clone() })
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Items published by `creator_id`.
    pub async fn creator_content(
        &self,
        creator_id: &str,
        page: PageParams,
        viewer: Option<&str>,
    ) -> Result<PageResponse<Content>, ApiError> {
        let path = format!("/api/content/creator/{}", creator_id);
        let req = with_viewer(self.client.get(&path).query(&[("page", page.page), ("size", page.size)]), viewer);
        self.client.call(req).await
    }

    /// Items `user_id` liked, with the viewer's engagement snapshot.
    pub async fn liked_content(
        &self,
        user_id: &str,
        page: PageParams,
        viewer: Option<&str>,
    ) -> Result<FeedResponse, ApiError> {
        let path = format!("/api/content/profile/{}/liked", user_id);
        let req = with_viewer(self.client.get(&path).query(&[("page", page.page), ("size", page.size)]), viewer);
        self.client.call(req).await
    }

    pub async fn search(
        &self,
        query: &SearchQuery,
        page: PageParams,
        viewer: Option<&str>,
    ) -> Result<PageResponse<Content>, ApiError> {
        debug!("search {:?} page={}", query, page.page);
        let req = self.client
            .get("/api/content/search")
            .query(query)
            .query(&[("page", page.page), ("size", page.size)]);
        self.client.call(with_viewer(req, viewer)).await
    }

    /// Free-form suggestion payload; the service does not fix its shape.
    pub async fn search_suggestions(&self) -> Result<serde_json::Value, ApiError> {
        self.client.call(self.client.get("/api/content/search/suggestions")).await
    }

    pub async fn category_stats(&self) -> Result<serde_json::Value, ApiError> {
        self.client.call(self.client.get("/api/content/categories/stats")).await
    }

    /// Reserves a presigned upload slot for one file.
    pub async fn upload_url(
        &self,
        request: &UploadUrlRequest,
        caller: &Caller,
    ) -> Result<UploadUrlResponse, ApiError> {
        let req = with_caller(self.client.get("/api/content/upload-url").query(request), caller);
        self.client.call(req).await
    }

    /// Creates the content record for a file uploaded into `content_id`'s slot.
    pub async fn create_content(
        &self,
        content_id: &str,
        request: &ContentCreationRequest,
        caller: &Caller,
    ) -> Result<Content, ApiError> {
        let req = self.client
            .post("/api/content")
            .query(&[("contentId", content_id)])
            .header(USER_ID_HEADER, &caller.user_id)
            .json(request);
        let content: Content = self.client.call(req).await?;
        info!("created {} ({:?})", content.id, content.status);
        Ok(content)
    }
}

fn with_caller(builder: reqwest::RequestBuilder, caller: &Caller) -> reqwest::RequestBuilder {
    let builder = builder.header(USER_ID_HEADER, &caller.user_id);
    match caller.handle {
        Some(ref handle) => builder.header(USER_HANDLE_HEADER, handle),
        None => builder,
    }
}

fn with_viewer(builder: reqwest::RequestBuilder, viewer: Option<&str>) -> reqwest::RequestBuilder {
    match viewer {
        Some(id) => builder.header(USER_ID_HEADER, id),
        None => builder,
    }
}

#[async_trait::async_trait]
impl ContentApi for HttpContentApi {
    async fn feed(
        &self,
        mode: FeedMode,
        page: PageParams,
        viewer: Option<&str>,
    ) -> Result<FeedResponse, ApiError> {
        debug!("GET {} page={} size={}", mode.path(), page.page, page.size);
        let mut query = vec![("page", page.page), ("size", page.size)];
        if let Some(hours) = mode.window_hours(&self.config) {
            query.push(("hours", hours));
        }
        let req = with_viewer(self.client.get(mode.path()).query(&query), viewer);
        self.client.call(req).await
    }

    async fn engage(
        &self,
        content_id: &str,
        request: &EngagementRequest,
        caller: &Caller,
    ) -> Result<(), ApiError> {
        let path = format!("/api/content/{}/engage", content_id);
        debug!("POST {} action={:?}", path, request.action);
        let req = with_caller(self.client.post(&path).json(request), caller);
        self.client.call_unit(req).await
    }

    async fn bulk_engagement_status(
        &self,
        content_ids: &[String],
        user_id: &str,
    ) -> Result<HashMap<String, UserEngagementStatus>, ApiError> {
        let req = self.client
            .post("/api/content/bulk-engagement-status")
            .json(content_ids)
            .header(USER_ID_HEADER, user_id);
        self.client.call(req).await
    }

    async fn content(&self, content_id: &str) -> Result<Content, ApiError> {
        let req = self.client.get(&format!("/api/content/{}", content_id));
        self.client.call(req).await
    }

    async fn record_view(&self, content_id: &str, viewer: Option<&str>) -> Result<(), ApiError> {
        let path = format!("/api/content/{}/view", content_id);
        let req = with_viewer(self.client.post(&path).json(&serde_json::json!({})), viewer);
        self.client.call_unit(req).await
    }

    async fn comments(
        &self,
        content_id: &str,
        page: PageParams,
    ) -> Result<PageResponse<Comment>, ApiError> {
        let path = format!("/api/content/{}/comments", content_id);
        let req = self.client.get(&path).query(&[("page", page.page), ("size", page.size)]);
        self.client.call(req).await
    }

    async fn add_comment(
        &self,
        content_id: &str,
        request: &CommentRequest,
        caller: &Caller,
    ) -> Result<Comment, ApiError> {
        let path = format!("/api/content/{}/comments", content_id);
        let req = with_caller(self.client.post(&path).json(request), caller);
        self.client.call(req).await
    }
}
