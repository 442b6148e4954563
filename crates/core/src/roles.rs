//! Portal roles and their rank order.
//!
//! The portal recognises four roles in a strict total order:
//! `USER < AUTHOR < EDITOR < ADMIN`. Authorization checks compare ranks,
//! never names.
//!
//! Role names arriving from the server (or from persisted storage) are
//! parsed leniently: anything unrecognised is treated as [`Role::User`],
//! the lowest privilege, instead of being rejected.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire name of the `User` role.
pub const ROLE_USER: &str = "USER";
/// Wire name of the `Author` role.
pub const ROLE_AUTHOR: &str = "AUTHOR";
/// Wire name of the `Editor` role.
pub const ROLE_EDITOR: &str = "EDITOR";
/// Wire name of the `Admin` role.
pub const ROLE_ADMIN: &str = "ADMIN";

/// A portal role. `Ord` follows [`Role::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Role {
    #[default]
    User,
    Author,
    Editor,
    Admin,
}

impl Role {
    /// All roles, lowest rank first.
    pub const ALL: [Role; 4] = [Role::User, Role::Author, Role::Editor, Role::Admin];

    /// Numeric rank: `User = 0`, `Author = 1`, `Editor = 2`, `Admin = 3`.
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Author => 1,
            Role::Editor => 2,
            Role::Admin => 3,
        }
    }

    /// Parse a role name, case-insensitively.
    ///
    /// Unknown names map to [`Role::User`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            ROLE_USER => Role::User,
            ROLE_AUTHOR => Role::Author,
            ROLE_EDITOR => Role::Editor,
            ROLE_ADMIN => Role::Admin,
            other => {
                tracing::debug!(role = %other, "Unrecognised role name, treating as USER");
                Role::User
            }
        }
    }

    /// Canonical upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => ROLE_USER,
            Role::Author => ROLE_AUTHOR,
            Role::Editor => ROLE_EDITOR,
            Role::Admin => ROLE_ADMIN,
        }
    }

    /// Whether a principal holding `self` may access something that
    /// requires `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accept any JSON value so that `null`, numbers or garbage never
        // fail decoding of the surrounding principal.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(name) => Role::from_name(&name),
            _ => Role::User,
        })
    }
}
