//! The Session Store: the persisted token + principal pair.

use std::sync::Arc;

use amakuru_core::principal::Principal;

use crate::error::StorageError;
use crate::storage::{KeyValueStorage, MemoryStorage};

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key of the JSON-serialized principal.
pub const USER_KEY: &str = "user";

/// A session as it sits in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub token: String,
    pub principal: Principal,
}

/// Reads and writes the session pair on top of any [`KeyValueStorage`].
///
/// Both keys are always written and cleared together. Cheap to clone; all
/// clones share the same storage.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// A store backed by fresh [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// The persisted bearer token, if any.
    ///
    /// Storage errors are logged and read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session token");
                None
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Load the persisted pair.
    ///
    /// `Ok(None)` when nothing is stored. A token without a principal (or
    /// the reverse) is [`StorageError::Incomplete`]; an unparseable
    /// principal is [`StorageError::Corrupt`].
    pub fn load(&self) -> Result<Option<PersistedSession>, StorageError> {
        let token = self.storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let user = self.storage.get(USER_KEY)?.filter(|u| !u.is_empty());

        match (token, user) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(StorageError::Incomplete("token without principal")),
            (None, Some(_)) => Err(StorageError::Incomplete("principal without token")),
            (Some(token), Some(user)) => {
                let principal: Principal = serde_json::from_str(&user)
                    .map_err(|e| StorageError::Corrupt(format!("principal: {e}")))?;
                Ok(Some(PersistedSession { token, principal }))
            }
        }
    }

    /// Persist both halves in one storage write.
    pub fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        let user = serde_json::to_string(&session.principal)
            .map_err(|e| StorageError::Corrupt(format!("principal: {e}")))?;
        self.storage
            .set_all(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user.as_str())])
    }

    /// Remove both halves in one storage write. Idempotent.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove_all(&[TOKEN_KEY, USER_KEY])
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("has_token", &self.has_token())
            .finish()
    }
}
