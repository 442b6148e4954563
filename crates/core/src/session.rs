//! Session status and the snapshot published to the screen tree.

use crate::principal::Principal;

/// Lifecycle of the client session.
///
/// `Unknown` at process start, `Restoring` while hydrating from storage,
/// then `Authenticated` or `Anonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unknown,
    Restoring,
    Authenticated,
    Anonymous,
}

/// Immutable view of the session at one point in time.
///
/// The constructors are the only way to build a snapshot, and only
/// [`SessionSnapshot::authenticated`] yields `Authenticated`, so the status
/// is `Authenticated` exactly when both a token and a principal are held.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    status: SessionStatus,
    token: Option<String>,
    principal: Option<Principal>,
    last_error: Option<String>,
}

impl SessionSnapshot {
    /// The process-start snapshot.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn restoring() -> Self {
        Self {
            status: SessionStatus::Restoring,
            ..Self::default()
        }
    }

    pub fn authenticated(token: String, principal: Principal) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            token: Some(token),
            principal: Some(principal),
            last_error: None,
        }
    }

    /// Anonymous session, optionally carrying the reason it ended up here.
    pub fn anonymous(last_error: Option<String>) -> Self {
        Self {
            status: SessionStatus::Anonymous,
            last_error,
            ..Self::default()
        }
    }

    /// Keep the session but record a non-fatal error (e.g. a validation
    /// call that failed for network reasons).
    pub fn with_last_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    /// Where the session is in its lifecycle.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// The bearer token, present only while `Authenticated`.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The principal, or `None` when not authenticated.
    ///
    /// A `None` while [`is_loading`](Self::is_loading) is true does not mean
    /// "logged out".
    pub fn user(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Why the last login or restore did not fully succeed, if it didn't.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `status() == Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// `status() == Restoring`. `Unknown` is not loading: nothing has
    /// started yet.
    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Restoring
    }
}
