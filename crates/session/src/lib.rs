//! Client-side session persistence.
//!
//! - [`storage`] -- Durable key/value storage backends (memory, JSON file).
//! - [`store::SessionStore`] -- Reads and writes the token + principal pair
//!   as one unit.
//! - [`token`] -- Local inspection of JWT expiry, without verification.

pub mod error;
pub mod storage;
pub mod store;
pub mod token;

pub use error::StorageError;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{PersistedSession, SessionStore, TOKEN_KEY, USER_KEY};
