//! Local inspection of a bearer token's expiry.
//!
//! The client cannot verify the server's signature, and does not need to:
//! it only reads the `exp` claim to skip restoring a session that is
//! already dead. Opaque (non-JWT) tokens are reported as
//! [`TokenExpiry::Unknown`] and left to the server to judge.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// What the token says about its own lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiry {
    Valid { expires_at: DateTime<Utc> },
    Expired { expired_at: DateTime<Utc> },
    /// Not a JWT, or a JWT without an `exp` claim.
    Unknown,
}

impl TokenExpiry {
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenExpiry::Expired { .. })
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<i64>,
}

/// Inspect `token` against the current time.
pub fn inspect(token: &str) -> TokenExpiry {
    inspect_at(token, Utc::now())
}

/// Inspect `token` against `now`.
pub fn inspect_at(token: &str, now: DateTime<Utc>) -> TokenExpiry {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = match decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "Token is not a readable JWT");
            return TokenExpiry::Unknown;
        }
    };

    let Some(expires_at) = claims.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single()) else {
        return TokenExpiry::Unknown;
    };

    if expires_at <= now {
        TokenExpiry::Expired {
            expired_at: expires_at,
        }
    } else {
        TokenExpiry::Valid { expires_at }
    }
}
