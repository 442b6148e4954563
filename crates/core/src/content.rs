//! Portal content shapes returned by the supporting endpoints.
//!
//! Decoding is deliberately forgiving: missing fields take defaults and
//! nested objects that come back as bare ids are dropped instead of failing
//! the whole page.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::{ApiError, FieldError};
use crate::principal::{deserialize_opaque_id, Principal};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Content language. The portal publishes in Kinyarwanda and English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "rw", alias = "RW", alias = "kin")]
    Kinyarwanda,
    #[serde(rename = "en", alias = "EN")]
    English,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Kinyarwanda => "rw",
            Language::English => "en",
        }
    }
}

/// Editorial status of an article. Unknown values decode as `Draft`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Archived => "archived",
        }
    }
}

impl<'de> Deserialize<'de> for ArticleStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str().map(str::to_ascii_lowercase).as_deref() {
            Some("published") => ArticleStatus::Published,
            Some("archived") => ArticleStatus::Archived,
            _ => ArticleStatus::Draft,
        })
    }
}

/// Ad tracking event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdEvent {
    Impression,
    Click,
}

impl AdEvent {
    /// Path segment of the tracking endpoint.
    pub fn path_segment(self) -> &'static str {
        match self {
            AdEvent::Impression => "impression",
            AdEvent::Click => "click",
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id", deserialize_with = "deserialize_opaque_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub article_count: u64,
}

/// A user row as listed in the back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(flatten)]
    pub profile: Principal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub last_login_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Opaque id (`_id` or `id`, string or number).
    #[serde(alias = "_id", deserialize_with = "deserialize_opaque_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// URL segment of the public article page.
    #[serde(default)]
    pub slug: String,
    /// Short teaser shown in listings.
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Body as stored by the editor (HTML). Never rendered here.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub status: ArticleStatus,
    /// `None` when the server sent only an id or nothing usable.
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<Category>,
    /// `None` when the server sent only an id or nothing usable.
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<Principal>,
    /// Cover image URL (`featuredImage` or `image`).
    #[serde(default, alias = "image")]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Public view counter.
    #[serde(default)]
    pub views: u64,
    /// Pinned to the home page.
    #[serde(default)]
    pub is_featured: bool,
    /// Unparseable timestamps decode as `None`.
    #[serde(default, deserialize_with = "lenient")]
    pub published_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based current page (`page` or `currentPage`).
    #[serde(default = "default_page", alias = "currentPage")]
    pub page: u32,
    /// Page size.
    #[serde(default)]
    pub limit: u32,
    /// Total matching items (`total` or `totalItems`).
    #[serde(default, alias = "totalItems")]
    pub total: u64,
    /// Total pages (`pages` or `totalPages`).
    #[serde(default, alias = "totalPages")]
    pub pages: u32,
}

impl Pagination {
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

/// A page of results: `{ data: [...], pagination: {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Back-office dashboard counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_articles: u64,
    pub published_articles: u64,
    pub draft_articles: u64,
    pub total_users: u64,
    pub total_categories: u64,
    pub total_views: u64,
    #[serde(deserialize_with = "lenient_vec")]
    pub recent_articles: Vec<Article>,
}

// ---------------------------------------------------------------------------
// Query filters
// ---------------------------------------------------------------------------

/// Filters for `GET /articles`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub status: Option<ArticleStatus>,
    pub language: Option<Language>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub author: Option<String>,
}

impl ArticleFilters {
    /// Query-string pairs, omitting unset filters.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = paging(self.page, self.limit);
        push(&mut q, "category", self.category.clone());
        push(&mut q, "status", self.status.map(|s| s.as_str().to_string()));
        push(&mut q, "language", self.language.map(|l| l.code().to_string()));
        push(&mut q, "search", non_empty(self.search.as_deref()));
        push(&mut q, "featured", self.featured.map(|f| f.to_string()));
        push(&mut q, "author", self.author.clone());
        q
    }
}

/// Filters for `GET /users`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilters {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<crate::roles::Role>,
    pub search: Option<String>,
}

impl UserFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = paging(self.page, self.limit);
        push(&mut q, "role", self.role.map(|r| r.as_str().to_string()));
        push(&mut q, "search", non_empty(self.search.as_deref()));
        q
    }
}

/// Filters for `GET /categories`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilters {
    pub language: Option<Language>,
    pub with_counts: bool,
}

impl CategoryFilters {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        push(&mut q, "language", self.language.map(|l| l.code().to_string()));
        if self.with_counts {
            q.push(("withCounts", "true".to_string()));
        }
        q
    }
}

fn paging(page: Option<u32>, limit: Option<u32>) -> Vec<(&'static str, String)> {
    let mut q = Vec::new();
    push(&mut q, "page", page.map(|p| p.to_string()));
    push(&mut q, "limit", limit.map(|l| l.to_string()));
    q
}

fn push(q: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<String>) {
    if let Some(v) = value {
        q.push((key, v));
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

// ---------------------------------------------------------------------------
// Write payloads
// ---------------------------------------------------------------------------

/// Body of `POST /articles`. Checked locally before it is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[validate(length(max = 500, message = "Excerpt must be at most 500 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category_id: String,
    pub language: Language,
    pub status: ArticleStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    pub is_featured: bool,
}

/// Body of `PUT /articles/{id}`: only the set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| FieldError {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        let message = fields
            .first()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "The request was invalid".to_string());
        ApiError::Validation { message, fields }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_page() -> u32 {
    1
}

/// Decode `T` if the value has the right shape, otherwise `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode each element that has the right shape, skipping the rest.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
