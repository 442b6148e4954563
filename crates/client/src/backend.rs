//! The network side of authentication, as seen by the auth context.
//!
//! [`PortalApi`](crate::api::PortalApi) is the production implementation;
//! tests substitute scripted fakes.

use amakuru_core::error::ApiError;
use amakuru_core::principal::Principal;
use amakuru_session::PersistedSession;
use async_trait::async_trait;

/// Authentication calls the [`AuthContext`](crate::auth::AuthContext) depends on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for a token and the principal it belongs to.
    async fn login(&self, identifier: &str, secret: &str) -> Result<PersistedSession, ApiError>;

    /// Resolve the principal behind `token`.
    ///
    /// An [`ApiError::Auth`] means the token is no longer valid.
    async fn current_user(&self, token: &str) -> Result<Principal, ApiError>;
}
