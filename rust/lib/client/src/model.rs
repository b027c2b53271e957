//! Wire types shared by the user and content services.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use m2m_core::{PageResponse, ServiceConfig};
use serde::{Deserialize, Serialize};

// ── Content ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Static image.
    Meme,
    ShortVideo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    Uploading,
    Processing,
    Ready,
    #[default]
    Published,
    Failed,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
    Flagged,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaFile {
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub file_size: u64,
    pub s3_key: String,
    pub cdn_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub format: String,
}

/// A content item as returned by the content service.
///
/// Counters are the only fields the client adjusts locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub creator_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file: Option<MediaFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_file: Option<MediaFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub share_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub moderation_status: ModerationStatus,
    #[serde(default)]
    pub monetization_enabled: bool,
}

impl Content {
    /// Minimal item, mostly for tests and fixtures.
    pub fn new(id: impl Into<String>, kind: ContentType) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: None,
            kind,
            status: ContentStatus::Published,
            creator_id: String::new(),
            creator_handle: String::new(),
            original_file: None,
            processed_file: None,
            thumbnail_url: None,
            tags: Vec::new(),
            hashtags: Vec::new(),
            category: None,
            view_count: 0,
            like_count: 0,
            share_count: 0,
            comment_count: 0,
            created_at: String::new(),
            updated_at: String::new(),
            published_at: None,
            moderation_status: ModerationStatus::Approved,
            monetization_enabled: false,
        }
    }

    /// Best renderable media: processed, then original, then thumbnail.
    pub fn media_url(&self) -> Option<&str> {
        self.processed_file
            .as_ref()
            .or(self.original_file.as_ref())
            .map(|f| f.cdn_url.as_str())
            .filter(|u| !u.is_empty())
            .or(self.thumbnail_url.as_deref())
    }

    /// Title, falling back to the description.
    pub fn caption(&self) -> &str {
        if !self.title.is_empty() {
            return &self.title;
        }
        self.description.as_deref().unwrap_or("")
    }

    pub fn is_short(&self) -> bool {
        self.kind == ContentType::ShortVideo
    }
}

// ── Upload ──────────────────────────────────────────────────────────

/// Query for a presigned upload slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub content_type: String,
    pub file_size: u64,
    #[serde(rename = "type")]
    pub kind: ContentType,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub s3_key: String,
    pub expires_at: String,
    /// Id the content will be created under.
    pub content_id: String,
    pub max_file_size: u64,
    pub supported_formats: Vec<String>,
    pub max_duration_seconds: Option<u32>,
}

/// Metadata for content whose file is already uploaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCreationRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub tags: Vec<String>,
    pub hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub monetization_enabled: bool,
    pub s3_key: String,
    pub original_file_name: String,
    pub content_type: String,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

impl ContentCreationRequest {
    /// Request for the file behind `slot`, monetized by default.
    pub fn for_upload(title: impl Into<String>, upload: &UploadUrlRequest, slot: &UploadUrlResponse) -> Self {
        Self {
            title: title.into(),
            description: None,
            kind: upload.kind,
            tags: Vec::new(),
            hashtags: Vec::new(),
            category: None,
            monetization_enabled: true,
            s3_key: slot.s3_key.clone(),
            original_file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            file_size: upload.file_size,
            duration_seconds: None,
        }
    }
}

// ── Search ──────────────────────────────────────────────────────────

/// Content search filters. Unset filters are left off the query string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtag: Option<String>,
}

impl SearchQuery {
    pub fn text(q: impl Into<String>) -> Self {
        Self { q: Some(q.into()), ..Default::default() }
    }
}

// ── Engagement ──────────────────────────────────────────────────────

/// The signed-in user's engagement with one content item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserEngagementStatus {
    pub content_id: String,
    pub user_id: String,
    pub liked: bool,
    pub shared: bool,
    pub bookmarked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmarked_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementAction {
    View,
    Like,
    Unlike,
    Share,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRequest {
    pub action: EngagementAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl EngagementRequest {
    pub fn new(action: EngagementAction) -> Self {
        Self { action, source: None, watch_duration: None, referrer: None }
    }
}

/// Identity headers attached to engagement calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub handle: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), handle: None }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }
}

// ── Comments ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content_id: String,
    pub user_id: String,
    pub username: String,
    pub user_handle: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
    pub like_count: u64,
    pub is_pinned: bool,
    pub created_at: String,
    pub updated_at: String,
    pub is_deleted: bool,
    pub moderation_status: ModerationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
}

// ── Feeds ───────────────────────────────────────────────────────────

/// Selectable content ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedMode {
    #[default]
    ForYou,
    Trending,
    Fresh,
}

impl FeedMode {
    pub const ALL: [FeedMode; 3] = [FeedMode::ForYou, FeedMode::Trending, FeedMode::Fresh];

    /// Feed endpoint path on the content service.
    pub fn path(self) -> &'static str {
        match self {
            FeedMode::ForYou => "/api/content/feed",
            FeedMode::Trending => "/api/content/feed/trending",
            FeedMode::Fresh => "/api/content/feed/fresh",
        }
    }

    /// Look-back window sent as `hours`; the personalized feed has none.
    pub fn window_hours(self, config: &ServiceConfig) -> Option<u32> {
        match self {
            FeedMode::ForYou => None,
            FeedMode::Trending => Some(config.trending_hours),
            FeedMode::Fresh => Some(config.fresh_hours),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedMode::ForYou => "for-you",
            FeedMode::Trending => "trending",
            FeedMode::Fresh => "fresh",
        }
    }
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "for-you" | "foryou" | "home" => Ok(FeedMode::ForYou),
            "trending" => Ok(FeedMode::Trending),
            "fresh" => Ok(FeedMode::Fresh),
            other => Err(format!("unknown feed mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedMetadata {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub feed_type: String,
    pub timestamp: i64,
    pub total_engaged_content: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_elements: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// One feed page plus the viewer's engagement snapshot for its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub content: PageResponse<Content>,
    #[serde(default)]
    pub user_engagements: HashMap<String, UserEngagementStatus>,
    #[serde(default)]
    pub recent_comments: HashMap<String, Vec<Comment>>,
    #[serde(default)]
    pub metadata: FeedMetadata,
    #[serde(default)]
    pub user_authenticated: bool,
}

impl FeedResponse {
    pub fn items(&self) -> &[Content] {
        &self.content.content
    }

    /// Whether this is the final page of the stream.
    pub fn is_last(&self) -> bool {
        self.content.last
    }
}

// ── Users ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    #[default]
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub follower_count: u64,
    pub following_count: u64,
    pub total_earnings: f64,
    pub weekly_earnings: f64,
    pub coin_balance: f64,
    pub kyc_status: KycStatus,
    pub is_content_creator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl User {
    /// Engagement identity for this user.
    pub fn caller(&self) -> Caller {
        Caller {
            user_id: self.id.clone(),
            handle: self.username.clone().or_else(|| self.creator_handle.clone()),
        }
    }
}

/// Sign-up form. The user service takes it as query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub mobile_number: u64,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_mobile: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user: Option<User>,
}
