//! The authenticated principal.

use serde::{Deserialize, Deserializer, Serialize};

use crate::roles::Role;

/// The user a session belongs to, as returned by the portal API.
///
/// Decoding is lenient: the server may send the id as a string or a
/// number, and missing profile fields default to empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Opaque identifier (stored as a string whatever the wire type).
    #[serde(alias = "_id", deserialize_with = "deserialize_opaque_id")]
    pub id: String,
    /// Login handle shown in the back office.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Given name (`firstName` on the wire).
    #[serde(default)]
    pub first_name: String,
    /// Family name (`lastName` on the wire).
    #[serde(default)]
    pub last_name: String,
    /// Unknown role names decode as [`Role::User`].
    #[serde(default)]
    pub role: Role,
    /// Absolute URL of the profile picture, if one was uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Principal {
    /// "First Last", or the username when both names are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    /// Shorthand for `self.role.satisfies(required)`.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.satisfies(required)
    }
}

/// Accept a string or an integer id and keep it as an opaque string.
pub(crate) fn deserialize_opaque_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}
