//! Client runtime for the Amakuru news portal.
//!
//! [`api::PortalApi`] talks to the REST backend, [`fetch`] turns async
//! operations into observable request state, [`auth::AuthContext`] owns the
//! session lifecycle, and [`guard::ProtectedRoute`] gates screens by role.
//! [`portal::Portal`] wires them together from a [`config::ClientConfig`].

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod fetch;
pub mod guard;
pub mod portal;

pub use api::PortalApi;
pub use auth::AuthContext;
pub use backend::AuthBackend;
pub use config::{ClientConfig, ConfigError};
pub use fetch::{ApiMutation, ApiResource, FetchOptions, StalePolicy};
pub use guard::{GuardView, ProtectedRoute};
pub use portal::Portal;
