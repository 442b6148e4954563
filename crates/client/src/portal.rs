//! One-stop wiring of the client from a [`ClientConfig`].

use std::sync::Arc;

use amakuru_core::roles::Role;

use crate::api::PortalApi;
use crate::auth::AuthContext;
use crate::config::{ClientConfig, ConfigError};
use crate::guard::ProtectedRoute;

/// Shared client state: one API client and one auth context over the same
/// session store. Cloneable; every clone sees the same session.
#[derive(Clone)]
pub struct Portal {
    /// REST client; reads its bearer token from the shared store.
    pub api: Arc<PortalApi>,
    /// Session lifecycle over the same store.
    pub auth: Arc<AuthContext>,
    login_path: String,
}

impl Portal {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let store = config.session_store();
        let api = Arc::new(PortalApi::with_client(
            config.http_client()?,
            config.api_url.clone(),
            store.clone(),
        ));
        let auth = Arc::new(
            AuthContext::new(api.clone(), store).with_validation(config.validate_session),
        );

        tracing::info!(
            api_url = %config.api_url,
            persisted = config.session_file.is_some(),
            "Portal client configured",
        );

        Ok(Self {
            api,
            auth,
            login_path: config.login_path.clone(),
        })
    }

    /// A guard requiring `role`, redirecting to the configured login path.
    pub fn guard(&self, role: Role) -> ProtectedRoute {
        ProtectedRoute::new(self.auth.clone())
            .require(role)
            .login_path(self.login_path.clone())
    }

    /// Start restoring the persisted session in the background.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        self.auth.spawn_restore()
    }
}
