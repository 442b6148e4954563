//! Error taxonomy for calls to the portal API.
//!
//! The server's error bodies are not uniform, so [`ApiError::from_response`]
//! decodes them defensively: it understands the common shapes and falls
//! back to a status-based kind with a generic message for anything else.

use serde_json::Value;

/// One invalid field reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// A failed portal API call.
///
/// `Display` yields the human-readable message only, which is what the
/// fetch wrappers surface as their `error` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response: connection refused, DNS, TLS, timeout.
    #[error("{0}")]
    Network(String),

    /// The request was rejected as invalid (400/422).
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    /// Bad credentials, or a missing/expired/invalid token (401).
    #[error("{0}")]
    Auth(String),

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Any other non-2xx response.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body did not have the expected shape.
    #[error("{0}")]
    Decode(String),
}

impl ApiError {
    /// Build an error from a non-2xx status and its raw body.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let (message, code, fields) = match parsed.as_ref() {
            Some(v) if v.is_object() => (extract_message(v), extract_code(v), extract_fields(v)),
            Some(Value::String(s)) if !s.trim().is_empty() => (Some(s.clone()), None, Vec::new()),
            _ => (None, None, Vec::new()),
        };

        let kind = code
            .as_deref()
            .and_then(kind_from_code)
            .unwrap_or_else(|| kind_from_status(status, !fields.is_empty()));

        let message = message.unwrap_or_else(|| fallback_message(kind, status));
        match kind {
            Kind::Validation => ApiError::Validation { message, fields },
            Kind::Auth => ApiError::Auth(message),
            Kind::Forbidden => ApiError::Forbidden(message),
            Kind::NotFound => ApiError::NotFound(message),
            Kind::Server => ApiError::Server { status, message },
        }
    }

    /// Whether this error means the session is no longer valid.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    /// Field-level validation errors, if any.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            ApiError::Validation { fields, .. } => fields,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Validation,
    Auth,
    Forbidden,
    NotFound,
    Server,
}

fn kind_from_code(code: &str) -> Option<Kind> {
    match code.to_ascii_uppercase().as_str() {
        "VALIDATION_ERROR" | "BAD_REQUEST" => Some(Kind::Validation),
        "UNAUTHORIZED" | "TOKEN_EXPIRED" | "INVALID_TOKEN" => Some(Kind::Auth),
        "FORBIDDEN" => Some(Kind::Forbidden),
        "NOT_FOUND" => Some(Kind::NotFound),
        _ => None,
    }
}

fn kind_from_status(status: u16, has_fields: bool) -> Kind {
    match status {
        400 | 422 => Kind::Validation,
        401 => Kind::Auth,
        403 => Kind::Forbidden,
        404 => Kind::NotFound,
        _ if has_fields => Kind::Validation,
        _ => Kind::Server,
    }
}

fn fallback_message(kind: Kind, status: u16) -> String {
    match kind {
        Kind::Validation => "The request was invalid".to_string(),
        Kind::Auth => "Authentication required".to_string(),
        Kind::Forbidden => "You do not have permission to perform this action".to_string(),
        Kind::NotFound => "Resource not found".to_string(),
        Kind::Server => format!("Request failed with status {status}"),
    }
}

fn non_blank(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `{message}`, `{error: "..."}` or `{error: {message}}`.
fn extract_message(body: &Value) -> Option<String> {
    non_blank(body.get("message"))
        .or_else(|| non_blank(body.get("error")))
        .or_else(|| body.get("error").and_then(|e| non_blank(e.get("message"))))
        .or_else(|| non_blank(body.get("msg")))
}

/// `{code}` or `{error: {code}}`.
fn extract_code(body: &Value) -> Option<String> {
    non_blank(body.get("code")).or_else(|| body.get("error").and_then(|e| non_blank(e.get("code"))))
}

/// `{errors: [{field|path|param, message|msg}]}` or `{errors: {field: msg | [msg]}}`.
fn extract_fields(body: &Value) -> Vec<FieldError> {
    let Some(errors) = body.get("errors") else {
        return Vec::new();
    };

    match errors {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let field = non_blank(item.get("field"))
                    .or_else(|| non_blank(item.get("path")))
                    .or_else(|| non_blank(item.get("param")))
                    .unwrap_or_default();
                let message =
                    non_blank(item.get("message")).or_else(|| non_blank(item.get("msg")))?;
                Some(FieldError { field, message })
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .flat_map(|(field, value)| {
                let messages: Vec<String> = match value {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(list) => list
                        .iter()
                        .filter_map(|m| m.as_str().map(str::to_string))
                        .collect(),
                    _ => Vec::new(),
                };
                messages.into_iter().map(move |message| FieldError {
                    field: field.clone(),
                    message,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}
