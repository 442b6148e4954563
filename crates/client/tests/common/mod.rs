//! In-process mock of the portal REST API.
//!
//! Each test gets its own server on an ephemeral port, so tests can run in
//! parallel without sharing state.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use amakuru_client::{AuthContext, PortalApi};
use amakuru_session::SessionStore;

pub const EDITOR_EMAIL: &str = "editor@amakuru.rw";
pub const PASSWORD: &str = "ijambo-banga";
pub const GOOD_TOKEN: &str = "good-token";
/// Deleting this id answers 200 with `success: false`.
pub const LOCKED_ARTICLE: &str = "locked";

/// One request as the mock saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

/// Server-side state, inspectable from tests.
pub struct MockPortal {
    pub articles: Mutex<Vec<Value>>,
    pub requests: Mutex<Vec<SeenRequest>>,
    pub ad_events: Mutex<Vec<(String, String)>>,
    /// Role reported by `/auth/me`.
    pub me_role: Mutex<&'static str>,
    /// When set, `/auth/me` answers with this status instead.
    pub me_failure: Mutex<Option<StatusCode>>,
}

impl Default for MockPortal {
    fn default() -> Self {
        Self {
            articles: Mutex::new(vec![article_json("a1", "Amakuru y'uyu munsi", "published")]),
            requests: Mutex::new(Vec::new()),
            ad_events: Mutex::new(Vec::new()),
            me_role: Mutex::new("EDITOR"),
            me_failure: Mutex::new(None),
        }
    }
}

impl MockPortal {
    pub fn requests_to(&self, path: &str) -> Vec<SeenRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn set_me_role(&self, role: &'static str) {
        *self.me_role.lock().unwrap() = role;
    }

    pub fn fail_me_with(&self, status: StatusCode) {
        *self.me_failure.lock().unwrap() = Some(status);
    }
}

/// Start a mock portal and return its API base URL with the shared state.
pub async fn spawn_mock() -> (String, Arc<MockPortal>) {
    let mock = Arc::new(MockPortal::default());
    let app = router(Arc::clone(&mock));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api"), mock)
}

/// Start a mock and build an API client and auth context over one
/// in-memory store.
pub async fn portal() -> (Arc<PortalApi>, Arc<AuthContext>, Arc<MockPortal>) {
    let (base_url, mock) = spawn_mock().await;
    let store = SessionStore::in_memory();
    let api = Arc::new(PortalApi::new(base_url, store.clone()));
    let auth = Arc::new(AuthContext::new(api.clone(), store));
    (api, auth, mock)
}

/// A JWT whose `exp` is `offset_secs` from now. The signature is irrelevant
/// to the client.
pub fn jwt_expiring_in(offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "sub": "7", "exp": exp }),
        &jsonwebtoken::EncodingKey::from_secret(b"mock-secret"),
    )
    .unwrap()
}

pub fn user_json(role: &str) -> Value {
    json!({
        "_id": 7,
        "username": "mugisha",
        "email": EDITOR_EMAIL,
        "firstName": "Eric",
        "lastName": "Mugisha",
        "role": role,
    })
}

pub fn article_json(id: &str, title: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "slug": title.to_lowercase().replace(' ', "-"),
        "content": "<p>...</p>",
        "language": "rw",
        "status": status,
        "category": { "_id": "c1", "name": "Politiki", "slug": "politiki" },
        "views": 0,
    })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn router(mock: Arc<MockPortal>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/articles", get(list_articles).post(create_article))
        .route(
            "/api/articles/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/api/categories", get(categories))
        .route("/api/users", get(users))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/api/ads/{id}/{event}", post(track_ad))
        .layer(middleware::from_fn_with_state(Arc::clone(&mock), record))
        .with_state(mock)
}

async fn record(State(mock): State<Arc<MockPortal>>, req: Request, next: Next) -> Response {
    let seen = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        SeenRequest {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            authorization: header("authorization"),
            request_id: header("x-request-id"),
        }
    };
    mock.requests.lock().unwrap().push(seen);
    next.run(req).await
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {GOOD_TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "code": "INVALID_TOKEN",
            "message": "Invalid or expired token",
        })),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body.get("email").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if email == Some(EDITOR_EMAIL) && password == Some(PASSWORD) {
        Json(json!({
            "success": true,
            "data": { "token": GOOD_TOKEN, "user": user_json("EDITOR") },
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn me(State(mock): State<Arc<MockPortal>>, headers: HeaderMap) -> Response {
    if let Some(status) = *mock.me_failure.lock().unwrap() {
        return (status, Json(json!({ "message": "Service unavailable" }))).into_response();
    }
    if !authorized(&headers) {
        return unauthorized();
    }
    let role = *mock.me_role.lock().unwrap();
    Json(json!({ "success": true, "data": { "user": user_json(role) } })).into_response()
}

async fn list_articles(State(mock): State<Arc<MockPortal>>) -> Response {
    let articles = mock.articles.lock().unwrap().clone();
    let total = articles.len();
    Json(json!({
        "success": true,
        "data": articles,
        "pagination": { "page": 1, "limit": 10, "total": total, "pages": 1 },
    }))
    .into_response()
}

async fn get_article(State(mock): State<Arc<MockPortal>>, Path(id): Path<String>) -> Response {
    let found = mock
        .articles
        .lock()
        .unwrap()
        .iter()
        .find(|a| a["_id"] == id.as_str())
        .cloned();
    match found {
        Some(article) => Json(json!({ "success": true, "data": article })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Article not found" })),
        )
            .into_response(),
    }
}

async fn create_article(
    State(mock): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let title = body["title"].as_str().unwrap_or_default().to_string();

    let mut articles = mock.articles.lock().unwrap();
    if articles.iter().any(|a| a["title"] == title.as_str()) {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "message": "An article with this title already exists",
                "errors": { "title": "Title must be unique" },
            })),
        )
            .into_response();
    }

    let id = format!("a{}", articles.len() + 1);
    let status = body["status"].as_str().unwrap_or("draft");
    let article = article_json(&id, &title, status);
    articles.push(article.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": article })),
    )
        .into_response()
}

async fn update_article(
    State(mock): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut articles = mock.articles.lock().unwrap();
    let Some(article) = articles.iter_mut().find(|a| a["_id"] == id.as_str()) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "code": "NOT_FOUND" }))).into_response();
    };
    if let (Some(target), Some(fields)) = (article.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(json!({ "success": true, "data": article.clone() })).into_response()
}

async fn delete_article(
    State(mock): State<Arc<MockPortal>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == LOCKED_ARTICLE {
        return Json(json!({ "success": false, "message": "Article is locked" })).into_response();
    }
    mock.articles
        .lock()
        .unwrap()
        .retain(|a| a["_id"] != id.as_str());
    StatusCode::NO_CONTENT.into_response()
}

async fn categories() -> Response {
    Json(json!([
        { "_id": "c1", "name": "Politiki", "slug": "politiki", "articleCount": 1 },
        { "_id": "c2", "name": "Imikino", "slug": "imikino", "articleCount": 0 },
    ]))
    .into_response()
}

async fn users(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "success": false, "error": { "code": "FORBIDDEN", "message": "Admins only" } })),
    )
        .into_response()
}

async fn dashboard_stats(State(mock): State<Arc<MockPortal>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let articles = mock.articles.lock().unwrap().clone();
    let published = articles.iter().filter(|a| a["status"] == "published").count();
    Json(json!({
        "success": true,
        "data": {
            "totalArticles": articles.len(),
            "publishedArticles": published,
            "draftArticles": articles.len() - published,
            "recentArticles": articles,
        },
    }))
    .into_response()
}

async fn track_ad(
    State(mock): State<Arc<MockPortal>>,
    Path((id, event)): Path<(String, String)>,
) -> Response {
    mock.ad_events.lock().unwrap().push((id, event));
    Json(json!({ "success": true })).into_response()
}
