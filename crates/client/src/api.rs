//! REST client for the portal API.
//!
//! Wraps the portal's HTTP endpoints (auth, articles, users, categories,
//! dashboard, ad tracking) using [`reqwest`]. The bearer token is read
//! from the [`SessionStore`] at send time, so a login or logout is picked
//! up by the very next request.

use amakuru_core::content::{
    AdEvent, Article, ArticleFilters, ArticlePatch, ArticlePayload, Category, CategoryFilters,
    DashboardStats, Paginated, UserFilters, UserSummary,
};
use amakuru_core::error::ApiError;
use amakuru_core::principal::Principal;
use amakuru_session::{PersistedSession, SessionStore};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use crate::backend::AuthBackend;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP client for one portal API deployment.
pub struct PortalApi {
    client: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl PortalApi {
    /// Create a client for `base_url` (e.g. `http://host:5000/api`).
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        session: SessionStore,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The store this client reads its bearer token from.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // ---- auth ----

    /// `POST /auth/login`.
    ///
    /// Succeeds only when the server answers 2xx with a token and a user,
    /// and does not set `success: false`.
    pub async fn login(&self, email: &str, password: &str) -> Result<PersistedSession, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let value = self
            .send(Method::POST, "/auth/login", &[], Some(body), None)
            .await?;
        parse_login(value)
    }

    /// `GET /auth/me` with the stored token.
    pub async fn current_user(&self) -> Result<Principal, ApiError> {
        let token = self.session.token();
        self.fetch_current_user(token).await
    }

    async fn fetch_current_user(&self, token: Option<String>) -> Result<Principal, ApiError> {
        let value = self.send(Method::GET, "/auth/me", &[], None, token).await?;
        let user = value
            .get("user")
            .cloned()
            .or_else(|| value.get("data").and_then(|d| d.get("user")).cloned())
            .or_else(|| value.get("data").cloned())
            .unwrap_or(value);
        serde_json::from_value(user).map_err(|e| ApiError::Decode(format!("user: {e}")))
    }

    // ---- articles ----

    /// `GET /articles`.
    pub async fn get_articles(
        &self,
        filters: &ArticleFilters,
    ) -> Result<Paginated<Article>, ApiError> {
        self.request(Method::GET, "/articles", &filters.to_query(), None)
            .await
    }

    /// `GET /articles/{id}`.
    pub async fn get_article(&self, id: &str) -> Result<Article, ApiError> {
        self.request(Method::GET, &format!("/articles/{id}"), &[], None)
            .await
    }

    /// `POST /articles`. The payload is validated before anything is sent.
    pub async fn create_article(&self, payload: &ArticlePayload) -> Result<Article, ApiError> {
        payload.validate()?;
        let body = to_body(payload)?;
        self.request(Method::POST, "/articles", &[], Some(body)).await
    }

    /// `PUT /articles/{id}`.
    pub async fn update_article(&self, id: &str, patch: &ArticlePatch) -> Result<Article, ApiError> {
        let body = to_body(patch)?;
        self.request(Method::PUT, &format!("/articles/{id}"), &[], Some(body))
            .await
    }

    /// `DELETE /articles/{id}`.
    pub async fn delete_article(&self, id: &str) -> Result<(), ApiError> {
        self.command(Method::DELETE, &format!("/articles/{id}")).await
    }

    // ---- supporting reads ----

    /// `GET /users`.
    pub async fn get_users(&self, filters: &UserFilters) -> Result<Paginated<UserSummary>, ApiError> {
        self.request(Method::GET, "/users", &filters.to_query(), None)
            .await
    }

    /// `GET /categories`. Accepts either a bare array or a `{data}` page.
    pub async fn get_categories(&self, filters: &CategoryFilters) -> Result<Vec<Category>, ApiError> {
        let value: Value = self
            .request(Method::GET, "/categories", &filters.to_query(), None)
            .await?;
        let list = match value {
            Value::Object(mut map) => map.remove("data").unwrap_or(Value::Array(Vec::new())),
            other => other,
        };
        serde_json::from_value(list).map_err(|e| ApiError::Decode(format!("categories: {e}")))
    }

    /// `GET /dashboard/stats`.
    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.request(Method::GET, "/dashboard/stats", &[], None).await
    }

    /// `POST /ads/{id}/impression` or `POST /ads/{id}/click`.
    pub async fn track_ad(&self, ad_id: &str, event: AdEvent) -> Result<(), ApiError> {
        let path = format!("/ads/{ad_id}/{}", event.path_segment());
        self.command(Method::POST, &path).await
    }

    // ---- private helpers ----

    /// Send with the stored token and decode the body into `T`.
    ///
    /// A body with `success: false` is an error even on 2xx. A `{data: T}`
    /// envelope is unwrapped; when `data` itself is not a `T` (a page, for
    /// instance) the whole body is decoded instead.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let token = self.session.token();
        let value = self.send(method, path, query, body, token).await?;
        decode_enveloped(ensure_success(value)?)
    }

    /// Send a bodiless request with the stored token, ignoring any payload
    /// in the response. `success: false` is still an error.
    async fn command(&self, method: Method, path: &str) -> Result<(), ApiError> {
        let token = self.session.token();
        let value = self.send(method, path, &[], None, token).await?;
        ensure_success(value)?;
        Ok(())
    }

    /// Send a request and return the raw JSON body of a 2xx response.
    ///
    /// An empty body decodes as `null`.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<Value>,
        token: Option<String>,
    ) -> Result<Value, ApiError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header(REQUEST_ID_HEADER, &request_id);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, path, request_id = %request_id, error = %e, "Portal request failed");
            ApiError::Network(format!("Network error: {e}"))
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("Network error: {e}")))?;

        tracing::debug!(
            %method,
            path,
            request_id = %request_id,
            status = status.as_u16(),
            "Portal request completed",
        );

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl AuthBackend for PortalApi {
    async fn login(&self, identifier: &str, secret: &str) -> Result<PersistedSession, ApiError> {
        PortalApi::login(self, identifier, secret).await
    }

    async fn current_user(&self, token: &str) -> Result<Principal, ApiError> {
        self.fetch_current_user(Some(token.to_string())).await
    }
}

/// Reject a 2xx body that reports `success: false`.
fn ensure_success(value: Value) -> Result<Value, ApiError> {
    if value.get("success").and_then(Value::as_bool) != Some(false) {
        return Ok(value);
    }
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("The server reported a failure")
        .to_string();
    Err(ApiError::Server {
        status: 200,
        message,
    })
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(format!("request body: {e}")))
}

fn decode_enveloped<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    if let Some(data) = value.get("data") {
        if let Ok(decoded) = serde_json::from_value::<T>(data.clone()) {
            return Ok(decoded);
        }
    }
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Interpret a 2xx login body: `{success, token, user}` or the same inside `data`.
fn parse_login(value: Value) -> Result<PersistedSession, ApiError> {
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::Auth(
            message.unwrap_or_else(|| "Invalid credentials".to_string()),
        ));
    }

    let source = match value.get("token") {
        Some(_) => &value,
        None => value.get("data").unwrap_or(&value),
    };

    let token = source
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Decode("login response carried no token".into()))?
        .to_string();
    let user = source
        .get("user")
        .cloned()
        .ok_or_else(|| ApiError::Decode("login response carried no user".into()))?;
    let principal: Principal =
        serde_json::from_value(user).map_err(|e| ApiError::Decode(format!("user: {e}")))?;

    Ok(PersistedSession { token, principal })
}
