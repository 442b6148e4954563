use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use amakuru_core::guard::DEFAULT_LOGIN_PATH;
use amakuru_session::{FileStorage, SessionStore};

/// Default portal API base URL for local development.
const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set to something unusable.
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// The HTTP client could not be built from the configuration.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the portal REST API, without a trailing slash.
    pub api_url: String,
    /// Overall per-request timeout. `None` leaves the transport default.
    pub request_timeout: Option<Duration>,
    /// File backing the persisted session. `None` keeps it in memory.
    pub session_file: Option<PathBuf>,
    /// Confirm a restored session with the server.
    pub validate_session: bool,
    /// Where unauthenticated visitors are sent.
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
            session_file: None,
            validate_session: true,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Ignoring unreadable .env file");
            }
        }
        Self::from_env()
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                     |
    /// |-------------------------------|-----------------------------|
    /// | `PORTAL_API_URL`              | `http://localhost:5000/api` |
    /// | `PORTAL_REQUEST_TIMEOUT_SECS` | unset                       |
    /// | `PORTAL_SESSION_FILE`         | unset (in-memory)           |
    /// | `PORTAL_VALIDATE_SESSION`     | `true`                      |
    /// | `PORTAL_LOGIN_PATH`           | `/login`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let api_url = get("PORTAL_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "PORTAL_API_URL",
                value: api_url,
                reason: "must start with http:// or https://".into(),
            });
        }

        let request_timeout = match get("PORTAL_REQUEST_TIMEOUT_SECS") {
            None => None,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        var: "PORTAL_REQUEST_TIMEOUT_SECS",
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Some(Duration::from_secs(secs))
            }
        };

        let validate_session = match get("PORTAL_VALIDATE_SESSION") {
            None => defaults.validate_session,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "PORTAL_VALIDATE_SESSION",
                value: raw.clone(),
                reason: "expected true/false".into(),
            })?,
        };

        Ok(Self {
            api_url,
            request_timeout,
            session_file: get("PORTAL_SESSION_FILE").map(PathBuf::from),
            validate_session,
            login_path: get("PORTAL_LOGIN_PATH").unwrap_or(defaults.login_path),
        })
    }

    /// The session store this configuration asks for.
    pub fn session_store(&self) -> SessionStore {
        match &self.session_file {
            Some(path) => SessionStore::new(Arc::new(FileStorage::new(path))),
            None => SessionStore::in_memory(),
        }
    }

    /// A [`reqwest::Client`] honouring the configured timeout.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
