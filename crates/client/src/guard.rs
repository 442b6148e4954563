//! Protected routes bound to a live [`AuthContext`].
//!
//! The decision itself lives in [`amakuru_core::guard::evaluate`]; this
//! module feeds it the current session and the storage token, and adds the
//! single session refresh the transitional state allows.

use std::sync::Arc;

use amakuru_core::guard::{evaluate, GuardInput, GuardOutcome, DEFAULT_LOGIN_PATH};
use amakuru_core::principal::Principal;
use amakuru_core::roles::Role;

use crate::auth::AuthContext;

/// What to render for a protected location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<V> {
    /// The protected subtree.
    Content(V),
    /// Loading, refreshing, redirect or access-denied. Never `Granted`.
    Fallback(GuardOutcome),
}

/// A subtree gated behind a minimum role.
#[derive(Clone)]
pub struct ProtectedRoute {
    auth: Arc<AuthContext>,
    required: Role,
    login_path: String,
}

impl ProtectedRoute {
    /// Any authenticated principal passes; redirects go to `/login`.
    pub fn new(auth: Arc<AuthContext>) -> Self {
        Self {
            auth,
            required: Role::User,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn require(mut self, role: Role) -> Self {
        self.required = role;
        self
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn required(&self) -> Role {
        self.required
    }

    /// Evaluate the current session for `location`.
    pub fn check(&self, location: &str) -> GuardOutcome {
        let session = self.auth.snapshot();
        let outcome = evaluate(&GuardInput {
            session: &session,
            has_persisted_token: self.auth.has_persisted_token(),
            required: self.required,
            location,
            login_path: &self.login_path,
        });
        tracing::debug!(
            location,
            required = %self.required,
            outcome = outcome_name(&outcome),
            "Route guard evaluated",
        );
        outcome
    }

    /// Like [`check`](Self::check), but a `RefreshingSession` outcome
    /// triggers one session restore followed by a second evaluation.
    pub async fn resolve(&self, location: &str) -> GuardOutcome {
        match self.check(location) {
            GuardOutcome::RefreshingSession => {
                self.auth.restore().await;
                self.check(location)
            }
            outcome => outcome,
        }
    }

    /// Evaluate and, when access is granted, build the subtree with `subtree`.
    pub fn render<V>(&self, location: &str, subtree: impl FnOnce(&Principal) -> V) -> GuardView<V> {
        match self.check(location) {
            GuardOutcome::Granted(principal) => GuardView::Content(subtree(&principal)),
            other => GuardView::Fallback(other),
        }
    }
}

fn outcome_name(outcome: &GuardOutcome) -> &'static str {
    match outcome {
        GuardOutcome::Loading => "loading",
        GuardOutcome::RefreshingSession => "refreshing",
        GuardOutcome::Redirect(_) => "redirect",
        GuardOutcome::AccessDenied { .. } => "denied",
        GuardOutcome::Granted(_) => "granted",
    }
}
