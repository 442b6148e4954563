//! The auth context: single source of truth for who is logged in.
//!
//! [`AuthContext`] owns the session lifecycle (restore, login, logout),
//! keeps the [`SessionStore`] in sync with memory and publishes a
//! [`SessionSnapshot`] to the rest of the client through a watch channel.
//!
//! None of its operations return errors. `login` answers with a boolean
//! and leaves the reason in [`SessionSnapshot::last_error`].
//!
//! Every transition commits (storage write plus publish) while holding the
//! generation lock, so a result computed against an older generation is
//! never written over a newer login or logout.

use std::sync::{Arc, Mutex, MutexGuard};

use amakuru_core::error::ApiError;
use amakuru_core::principal::Principal;
use amakuru_core::session::SessionSnapshot;
use amakuru_session::token;
use amakuru_session::{PersistedSession, SessionStore};
use tokio::sync::watch;

use crate::backend::AuthBackend;

/// Message recorded when a persisted token has already expired.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Session lifecycle owner. Share it as `Arc<AuthContext>`.
pub struct AuthContext {
    backend: Arc<dyn AuthBackend>,
    store: SessionStore,
    state: watch::Sender<SessionSnapshot>,
    /// Bumped by every login, logout and restore. Results of network calls
    /// are committed only under this lock and only if it has not moved.
    generation: Mutex<u64>,
    validate_on_restore: bool,
}

impl AuthContext {
    /// Create a context in the `Unknown` state. Call [`restore`](Self::restore)
    /// (or [`spawn_restore`](Self::spawn_restore)) to hydrate it.
    pub fn new(backend: Arc<dyn AuthBackend>, store: SessionStore) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::unknown());
        Self {
            backend,
            store,
            state,
            generation: Mutex::new(0),
            validate_on_restore: true,
        }
    }

    /// Whether [`restore`](Self::restore) confirms a persisted session with
    /// the server after trusting it. Default `true`.
    pub fn with_validation(mut self, validate_on_restore: bool) -> Self {
        self.validate_on_restore = validate_on_restore;
        self
    }

    // ---- observation ----

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<Principal> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Whether a token is sitting in persistent storage, whatever the
    /// in-memory status.
    pub fn has_persisted_token(&self) -> bool {
        self.store.has_token()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    // ---- transitions ----

    /// Authenticate with the backend.
    ///
    /// On success the token and principal are persisted together and the
    /// session becomes `Authenticated`. On any failure, including failure
    /// to persist, storage is cleared and the session becomes `Anonymous`
    /// with `last_error` set.
    ///
    /// A logout or another login started while this one is in flight
    /// supersedes it: the result is dropped and `false` is returned.
    pub async fn login(&self, identifier: &str, secret: &str) -> bool {
        let generation = self.bump();
        let result = self.backend.login(identifier, secret).await;
        self.finish_login(generation, identifier, result)
    }

    /// Forget the session, in storage and in memory. Always succeeds.
    pub fn logout(&self) {
        let mut generation = self.lock_generation();
        *generation += 1;

        self.clear_store();
        let was_authenticated = self.is_authenticated();
        self.publish(SessionSnapshot::anonymous(None));
        if was_authenticated {
            tracing::info!("Logged out");
        }
    }

    /// Hydrate the session from storage.
    ///
    /// A persisted session is trusted straight away (`Authenticated`) and,
    /// if validation is enabled, then confirmed with the backend:
    ///
    /// - confirmed: the principal is refreshed and re-persisted;
    /// - rejected with [`ApiError::Auth`]: the session is cleared;
    /// - any other failure: the session is kept and the error recorded.
    ///
    /// Missing, unreadable, half-written or already-expired sessions go
    /// straight to `Anonymous` and are wiped from storage.
    pub async fn restore(&self) {
        let Some((generation, persisted)) = self.begin_restore() else {
            return;
        };
        if !self.validate_on_restore {
            return;
        }

        let result = self.backend.current_user(&persisted.token).await;
        self.finish_restore(generation, persisted, result);
    }

    /// Run [`restore`](Self::restore) in the background.
    pub fn spawn_restore(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.restore().await })
    }

    /// React to an error seen by any API consumer. An [`ApiError::Auth`]
    /// while authenticated means the token died: log out.
    ///
    /// Returns whether the session was ended.
    pub fn handle_api_error(&self, error: &ApiError) -> bool {
        if error.is_auth() && self.is_authenticated() {
            tracing::info!(error = %error, "Token rejected by server, ending session");
            self.logout();
            true
        } else {
            false
        }
    }

    // ---- private helpers ----

    fn finish_login(
        &self,
        generation: u64,
        identifier: &str,
        result: Result<PersistedSession, ApiError>,
    ) -> bool {
        let current = self.lock_generation();
        if *current != generation {
            tracing::debug!(identifier, "Session changed during login, discarding result");
            return false;
        }

        let session = match result {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(identifier, error = %e, "Login failed");
                self.clear_store();
                self.publish(SessionSnapshot::anonymous(Some(e.to_string())));
                return false;
            }
        };

        if let Err(e) = self.store.save(&session) {
            tracing::warn!(error = %e, "Failed to persist session after login");
            self.clear_store();
            self.publish(SessionSnapshot::anonymous(Some(format!(
                "Could not save the session: {e}"
            ))));
            return false;
        }

        tracing::info!(
            user_id = %session.principal.id,
            role = %session.principal.role,
            "Logged in",
        );
        self.publish(SessionSnapshot::authenticated(
            session.token,
            session.principal,
        ));
        true
    }

    /// Bump the generation and publish the optimistic state. Returns the
    /// session to validate, or `None` when restore is already settled.
    fn begin_restore(&self) -> Option<(u64, PersistedSession)> {
        let mut current = self.lock_generation();
        *current += 1;
        let generation = *current;
        self.publish(SessionSnapshot::restoring());

        let persisted = match self.store.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                tracing::debug!("No persisted session");
                self.publish(SessionSnapshot::anonymous(None));
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                self.clear_store();
                self.publish(SessionSnapshot::anonymous(None));
                return None;
            }
        };

        if token::inspect(&persisted.token).is_expired() {
            tracing::info!(user_id = %persisted.principal.id, "Persisted token has expired");
            self.clear_store();
            self.publish(SessionSnapshot::anonymous(Some(
                SESSION_EXPIRED_MESSAGE.to_string(),
            )));
            return None;
        }

        tracing::info!(
            user_id = %persisted.principal.id,
            role = %persisted.principal.role,
            "Restored persisted session",
        );
        self.publish(SessionSnapshot::authenticated(
            persisted.token.clone(),
            persisted.principal.clone(),
        ));
        Some((generation, persisted))
    }

    fn finish_restore(
        &self,
        generation: u64,
        persisted: PersistedSession,
        result: Result<Principal, ApiError>,
    ) {
        let current = self.lock_generation();
        if *current != generation {
            tracing::debug!("Session changed during validation, discarding result");
            return;
        }

        match result {
            Ok(principal) => {
                if principal != persisted.principal {
                    let refreshed = PersistedSession {
                        token: persisted.token.clone(),
                        principal: principal.clone(),
                    };
                    if let Err(e) = self.store.save(&refreshed) {
                        tracing::warn!(error = %e, "Failed to persist refreshed principal");
                    }
                }
                self.publish(SessionSnapshot::authenticated(persisted.token, principal));
            }
            Err(e) if e.is_auth() => {
                tracing::info!(error = %e, "Persisted session rejected by server");
                self.clear_store();
                self.publish(SessionSnapshot::anonymous(Some(e.to_string())));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not validate persisted session, keeping it");
                self.publish(self.snapshot().with_last_error(e.to_string()));
            }
        }
    }

    fn bump(&self) -> u64 {
        let mut current = self.lock_generation();
        *current += 1;
        *current
    }

    /// Poisoning is recovered: the guarded value is a plain counter.
    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.state.send_replace(snapshot);
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
    }
}
