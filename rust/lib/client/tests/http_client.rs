//! Client tests against a real in-process axum server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use m2m_client::{
    ApiError, AuthApi, Caller, ContentApi, ContentCreationRequest, ContentStatus, ContentType,
    EngagementAction, EngagementRequest, FeedMode, HttpContentApi, MemoryTokenStore,
    PasswordLogin, RegisterRequest, SearchQuery, StaticToken, StoredToken, TokenSource,
    TokenStore, UploadUrlRequest, UserApi,
};
use m2m_core::{PageParams, ServiceConfig};

const TOKEN: &str = "tok-1";

#[derive(Default)]
struct Recorded {
    engagements: Vec<(String, Value, Option<String>, Option<String>)>,
    feed_queries: Vec<HashMap<String, String>>,
    /// Query strings of the listing, search, upload and register routes.
    queries: HashMap<&'static str, HashMap<String, String>>,
    viewers: HashMap<&'static str, Option<String>>,
    following: Vec<String>,
    created: Vec<(String, Value, Option<String>)>,
}

type Shared = Arc<Mutex<Recorded>>;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn login(Json(body): Json<Value>) -> axum::response::Response {
    if body["password"] == "pw" {
        Json(json!({
            "status": 200, "message": "Login successful",
            "data": {"token": TOKEN, "userId": "u1",
                     "user": {"id": "u1", "name": "Demo", "email": body["emailOrMobile"],
                              "username": "demo", "kycStatus": "VERIFIED"}}
        })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"status": 401, "message": "bad credentials"})))
            .into_response()
    }
}

async fn me(headers: HeaderMap) -> axum::response::Response {
    if bearer(&headers) == Some(TOKEN) {
        Json(json!({"status": 200, "message": "ok",
                    "data": {"id": "u1", "name": "Demo", "email": "d@x", "coinBalance": 12.5}}))
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"status": 401, "message": "expired"}))).into_response()
    }
}

async fn update_me(headers: HeaderMap, Json(patch): Json<Value>) -> axum::response::Response {
    if bearer(&headers) != Some(TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status": 401, "message": "expired"}))).into_response();
    }
    let mut user = json!({"id": "u1", "name": "Demo", "email": "d@x", "bio": ""});
    if let (Some(user), Some(patch)) = (user.as_object_mut(), patch.as_object()) {
        for (k, v) in patch {
            user.insert(k.clone(), v.clone());
        }
    }
    Json(json!({"status": 200, "message": "Profile updated", "data": user})).into_response()
}

async fn validate(Json(body): Json<Value>) -> axum::response::Response {
    match body["token"].as_str() {
        Some(TOKEN) => Json(json!({"status": 200, "message": "valid", "data": {"valid": true}})).into_response(),
        Some("revoked") => Json(json!({"status": 403, "message": "token revoked", "data": null})).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"status": 401, "message": "invalid token"}))).into_response(),
    }
}

async fn register(State(rec): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let taken = q.get("email").map(String::as_str) == Some("taken@example.com");
    rec.lock().unwrap().queries.insert("register", q);
    if taken {
        Json(json!({"status": 409, "message": "email already registered", "data": null}))
    } else {
        Json(json!({"status": 201, "message": "created", "data": "User registered successfully"}))
    }
}

async fn profile(Path(id): Path<String>) -> axum::response::Response {
    if id == "ghost" {
        return (StatusCode::NOT_FOUND, Json(json!({"status": 404, "message": "no such user"}))).into_response();
    }
    Json(json!({"status": 200, "message": "ok",
                "data": {"id": id, "name": "Creator", "followerCount": 7, "isContentCreator": true}}))
        .into_response()
}

async fn follow(State(rec): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    let mut rec = rec.lock().unwrap();
    if !rec.following.contains(&id) {
        rec.following.push(id);
    }
    Json(json!({"status": 200, "message": "followed", "data": null}))
}

async fn unfollow(State(rec): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    rec.lock().unwrap().following.retain(|f| f != &id);
    Json(json!({"status": 200, "message": "unfollowed", "data": null}))
}

async fn is_following(State(rec): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    let following = rec.lock().unwrap().following.contains(&id);
    Json(json!({"status": 200, "message": "ok", "data": following}))
}

fn content_page(ids: &[&str], last: bool) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({"id": id, "type": "MEME", "likeCount": 1})).collect();
    json!({"content": items, "last": last, "number": 0, "totalElements": ids.len()})
}

async fn creator(
    State(rec): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut rec = rec.lock().unwrap();
    rec.queries.insert("creator", q);
    rec.viewers.insert("creator", header(&headers, "x-user-id"));
    let (a, b) = (format!("{}-a", id), format!("{}-b", id));
    Json(json!({"status": 200, "message": "ok", "data": content_page(&[a.as_str(), b.as_str()], true)}))
}

async fn liked(
    State(rec): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut rec = rec.lock().unwrap();
    rec.queries.insert("liked", q);
    rec.viewers.insert("liked", header(&headers, "x-user-id"));
    let item = format!("liked-by-{}", id);
    let page = content_page(&[item.as_str()], false);
    Json(json!({"status": 200, "message": "ok", "data": {
        "content": page,
        "userEngagements": {item.clone(): {"contentId": item, "userId": "u1", "liked": true}},
        "userAuthenticated": true
    }}))
}

async fn search(State(rec): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    rec.lock().unwrap().queries.insert("search", q);
    Json(json!({"status": 200, "message": "ok", "data": content_page(&["hit"], true)}))
}

async fn upload_url(
    State(rec): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let key = format!("uploads/{}", q.get("fileName").cloned().unwrap_or_default());
    let mut rec = rec.lock().unwrap();
    rec.queries.insert("upload-url", q);
    rec.viewers.insert("upload-url", header(&headers, "x-user-handle"));
    Json(json!({"status": 200, "message": "ok", "data": {
        "uploadUrl": "https://bucket.example/put?sig=1", "s3Key": key,
        "expiresAt": "2026-01-01T00:00:00Z", "contentId": "new-1",
        "maxFileSize": 10485760, "supportedFormats": ["jpg", "png"]
    }}))
}

async fn create(
    State(rec): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let id = q.get("contentId").cloned().unwrap_or_default();
    rec.lock().unwrap().created.push((id.clone(), body.clone(), header(&headers, "x-user-id")));
    Json(json!({"status": 201, "message": "created", "data": {
        "id": id, "title": body["title"], "type": body["type"], "status": "PROCESSING"
    }}))
}

async fn trending(
    State(rec): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    rec.lock().unwrap().feed_queries.push(q);
    Json(json!({
        "status": 200, "message": "ok",
        "data": {
            "content": {"content": [{"id": format!("t{}", page), "type": "MEME", "likeCount": 3}],
                        "last": page >= 1, "number": page},
            "userEngagements": {format!("t{}", page): {"contentId": format!("t{}", page),
                                                      "userId": "u1", "liked": true}},
            "userAuthenticated": true
        }
    }))
}

async fn engage(
    State(rec): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.lock().unwrap().engagements.push((
        id.clone(),
        body,
        header(&headers, "x-user-id"),
        header(&headers, "x-user-handle"),
    ));
    if id == "broken" {
        Json(json!({"status": 500, "message": "engagement store down", "data": null}))
    } else {
        Json(json!({"status": 200, "message": "recorded", "data": null}))
    }
}

struct TestServer {
    config: ServiceConfig,
    recorded: Shared,
}

async fn start_test_server() -> TestServer {
    let recorded: Shared = Arc::new(Mutex::new(Recorded::default()));
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/token/validate", post(validate))
        .route("/api/users/me", get(me).patch(update_me))
        .route("/api/users/{id}", get(profile))
        .route("/api/users/{id}/follow", post(follow))
        .route("/api/users/{id}/unfollow", post(unfollow))
        .route("/api/users/{id}/is-following", get(is_following))
        .route("/api/content", post(create))
        .route("/api/content/upload-url", get(upload_url))
        .route("/api/content/search", get(search))
        .route("/api/content/creator/{id}", get(creator))
        .route("/api/content/profile/{id}/liked", get(liked))
        .route("/api/content/feed/trending", get(trending))
        .route("/api/content/{id}/engage", post(engage))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ServiceConfig {
        user_service_url: base_url.clone(),
        content_service_url: base_url,
        ..Default::default()
    };
    TestServer { config, recorded }
}

#[tokio::test]
async fn login_persists_token_and_restores_session() {
    let server = start_test_server().await;
    let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let auth = AuthApi::new(&server.config, store.clone()).unwrap();

    assert!(auth.restore_session().await.unwrap().is_none());

    let session = auth.login("demo@example.com", "pw").await.unwrap();
    assert_eq!(session.user_id, "u1");
    assert_eq!(store.load().unwrap(), Some(TOKEN.to_string()));

    let user = auth.restore_session().await.unwrap().unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.coin_balance, 12.5);

    auth.logout().unwrap();
    assert!(!auth.is_signed_in());
}

#[tokio::test]
async fn bad_password_is_auth_error() {
    let server = start_test_server().await;
    let auth = AuthApi::new(&server.config, Arc::new(MemoryTokenStore::new())).unwrap();
    let err = auth.login("demo@example.com", "nope").await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)), "got {:?}", err);
}

#[tokio::test]
async fn unauthorized_response_clears_stale_token() {
    let server = start_test_server().await;
    let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    store.save("stale").unwrap();
    let auth = AuthApi::new(&server.config, store.clone()).unwrap();

    let err = auth.current_user().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn password_login_caches_token() {
    let server = start_test_server().await;
    let ts = PasswordLogin::new(&server.config.user_service_url, "demo@example.com", "pw");
    assert_eq!(ts.token().await.unwrap(), Some(TOKEN.to_string()));
    assert_eq!(ts.token().await.unwrap(), Some(TOKEN.to_string()));

    let bad = PasswordLogin::new(&server.config.user_service_url, "demo@example.com", "x");
    assert!(matches!(bad.token().await, Err(ApiError::Auth(_))));
}

#[tokio::test]
async fn trending_feed_sends_window_and_decodes_page() {
    let server = start_test_server().await;
    let api = HttpContentApi::new(&server.config, Arc::new(StoredToken::new(Arc::new(MemoryTokenStore::new())))).unwrap();

    let first = api.feed(FeedMode::Trending, PageParams::new(0, 2), Some("u1")).await.unwrap();
    assert_eq!(first.items()[0].id, "t0");
    assert!(!first.is_last());
    assert!(first.user_engagements["t0"].liked);

    let second = api.feed(FeedMode::Trending, PageParams::new(1, 2), None).await.unwrap();
    assert!(second.is_last());

    let rec = server.recorded.lock().unwrap();
    assert_eq!(rec.feed_queries[0]["hours"], "24");
    assert_eq!(rec.feed_queries[0]["size"], "2");
    assert_eq!(rec.feed_queries[1]["page"], "1");
}

#[tokio::test]
async fn engage_posts_action_with_identity_headers() {
    let server = start_test_server().await;
    let api = HttpContentApi::new(&server.config, Arc::new(m2m_client::NoAuth)).unwrap();
    let caller = Caller::new("u1").with_handle("demo");

    api.engage("c1", &EngagementRequest::new(EngagementAction::Like), &caller)
        .await
        .unwrap();

    let err = api
        .engage("broken", &EngagementRequest::new(EngagementAction::Share), &caller)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 500, .. }));

    let rec = server.recorded.lock().unwrap();
    let (id, body, user, handle) = &rec.engagements[0];
    assert_eq!(id, "c1");
    assert_eq!(body, &json!({"action": "LIKE"}));
    assert_eq!(user.as_deref(), Some("u1"));
    assert_eq!(handle.as_deref(), Some("demo"));
    assert_eq!(rec.engagements[1].1, json!({"action": "SHARE"}));
}

#[tokio::test]
async fn update_profile_returns_patched_user() {
    let server = start_test_server().await;
    let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let auth = AuthApi::new(&server.config, store.clone()).unwrap();
    auth.login("demo@example.com", "pw").await.unwrap();

    let user = auth
        .update_profile(&json!({"bio": "memes daily", "displayName": "Demo D"}))
        .await
        .unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.bio.as_deref(), Some("memes daily"));
    assert_eq!(user.display_name.as_deref(), Some("Demo D"));

    auth.logout().unwrap();
    let err = auth.update_profile(&json!({"bio": "x"})).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn validate_token_covers_valid_invalid_and_absent() {
    let server = start_test_server().await;
    let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
    let auth = AuthApi::new(&server.config, store.clone()).unwrap();

    assert!(!auth.validate_token().await.unwrap());

    store.save(TOKEN).unwrap();
    assert!(auth.validate_token().await.unwrap());

    // Envelope rejection: invalid, but the token is left for the caller.
    store.save("revoked").unwrap();
    assert!(!auth.validate_token().await.unwrap());
    assert_eq!(store.load().unwrap(), Some("revoked".to_string()));

    // HTTP 401: invalid, and the stored token is dropped.
    store.save("forged").unwrap();
    assert!(!auth.validate_token().await.unwrap());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn register_sends_form_as_query() {
    let server = start_test_server().await;
    let auth = AuthApi::new(&server.config, Arc::new(MemoryTokenStore::new())).unwrap();
    let mut form = RegisterRequest {
        name: "New".into(),
        email: "new@example.com".into(),
        mobile_number: 5550100,
        password: "pw".into(),
        address: None,
    };

    let message = auth.register(&form).await.unwrap();
    assert_eq!(message, "User registered successfully");
    {
        let rec = server.recorded.lock().unwrap();
        let q = &rec.queries["register"];
        assert_eq!(q["mobileNumber"], "5550100");
        assert_eq!(q["email"], "new@example.com");
        assert!(!q.contains_key("address"));
    }
    assert!(!auth.is_signed_in());

    form.email = "taken@example.com".into();
    let err = auth.register(&form).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 409, .. }), "got {:?}", err);
}

#[tokio::test]
async fn follow_round_trip_and_profile_lookup() {
    let server = start_test_server().await;
    let users = UserApi::new(&server.config, Arc::new(StaticToken::new(TOKEN))).unwrap();

    let creator = users.profile("c9").await.unwrap();
    assert_eq!((creator.id.as_str(), creator.follower_count), ("c9", 7));
    assert!(creator.is_content_creator);
    assert!(matches!(users.profile("ghost").await, Err(ApiError::Server { status: 404, .. })));

    assert!(!users.is_following("c9").await.unwrap());
    users.follow("c9").await.unwrap();
    users.follow("c9").await.unwrap();
    assert!(users.is_following("c9").await.unwrap());
    users.unfollow("c9").await.unwrap();
    assert!(!users.is_following("c9").await.unwrap());
}

#[tokio::test]
async fn creator_and_liked_listings_carry_viewer() {
    let server = start_test_server().await;
    let api = HttpContentApi::new(&server.config, Arc::new(m2m_client::NoAuth)).unwrap();

    let posted = api.creator_content("c9", PageParams::new(2, 5), Some("u1")).await.unwrap();
    let ids: Vec<&str> = posted.content.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c9-a", "c9-b"]);

    let liked = api.liked_content("c9", PageParams::first(10), None).await.unwrap();
    assert_eq!(liked.items()[0].id, "liked-by-c9");
    assert!(liked.user_engagements["liked-by-c9"].liked);

    let rec = server.recorded.lock().unwrap();
    assert_eq!(rec.queries["creator"]["page"], "2");
    assert_eq!(rec.queries["creator"]["size"], "5");
    assert_eq!(rec.viewers["creator"].as_deref(), Some("u1"));
    assert_eq!(rec.viewers["liked"], None);
}

#[tokio::test]
async fn search_sends_only_set_filters() {
    let server = start_test_server().await;
    let api = HttpContentApi::new(&server.config, Arc::new(m2m_client::NoAuth)).unwrap();
    let query = SearchQuery { kind: Some(ContentType::ShortVideo), ..SearchQuery::text("cats") };

    let hits = api.search(&query, PageParams::first(4), None).await.unwrap();
    assert_eq!(hits.content[0].id, "hit");

    let rec = server.recorded.lock().unwrap();
    let q = &rec.queries["search"];
    assert_eq!(q["q"], "cats");
    assert_eq!(q["type"], "SHORT_VIDEO");
    assert_eq!(q["size"], "4");
    assert!(!q.contains_key("category"));
    assert!(!q.contains_key("hashtag"));
}

#[tokio::test]
async fn upload_slot_then_create_content() {
    let server = start_test_server().await;
    let api = HttpContentApi::new(&server.config, Arc::new(StaticToken::new(TOKEN))).unwrap();
    let caller = Caller::new("u1").with_handle("demo");
    let upload = UploadUrlRequest {
        file_name: "cat.png".into(),
        content_type: "image/png".into(),
        file_size: 2048,
        kind: ContentType::Meme,
    };

    let slot = api.upload_url(&upload, &caller).await.unwrap();
    assert_eq!(slot.s3_key, "uploads/cat.png");
    assert_eq!(slot.content_id, "new-1");

    let request = ContentCreationRequest::for_upload("A cat", &upload, &slot);
    let created = api.create_content(&slot.content_id, &request, &caller).await.unwrap();
    assert_eq!(created.id, "new-1");
    assert_eq!(created.title, "A cat");
    assert_eq!(created.status, ContentStatus::Processing);

    let rec = server.recorded.lock().unwrap();
    let q = &rec.queries["upload-url"];
    assert_eq!((q["fileName"].as_str(), q["fileSize"].as_str(), q["type"].as_str()), ("cat.png", "2048", "MEME"));
    assert_eq!(rec.viewers["upload-url"].as_deref(), Some("demo"));
    let (id, body, user) = &rec.created[0];
    assert_eq!(id, "new-1");
    assert_eq!(body["s3Key"], "uploads/cat.png");
    assert_eq!(body["monetizationEnabled"], true);
    assert_eq!(user.as_deref(), Some("u1"));
}
