//! Domain types for the Amakuru portal client.
//!
//! This crate has zero internal deps so it can be shared by the session
//! storage layer, the HTTP client and any UI shell built on top of them.

pub mod content;
pub mod error;
pub mod guard;
pub mod principal;
pub mod request;
pub mod roles;
pub mod session;
pub mod types;
