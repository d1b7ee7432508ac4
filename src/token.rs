//! Decode json web tokens and judge whether a session is still alive.
//!
//! The signature is never checked here: the backend checks it on every
//! protected call. This side only reads claims.

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Name of the response header carrying the token after login.
pub const JWT_TOKEN_HEADER: &str = "Jwt-Token";
/// Prefix of the `Authorization` header value.
pub const TOKEN_PREFIX: &str = "Bearer ";

/// Recipients of a token, either a single value or a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: Option<String>,
    /// Expiration time, in seconds since epoch.
    pub exp: Option<u64>,
    /// Identifies the time at which the JWT was issued.
    pub iat: Option<u64>,
    /// Identifies the organization that issued the JWT.
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Permissions granted to the subject.
    pub authorities: Vec<String>,
}

impl Claims {
    /// Whether the token grants `authority`, e.g. `user:delete`.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    /// Non-empty subject, if any.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().filter(|sub| !sub.is_empty())
    }
}

/// Read claims without verifying the signature.
///
/// Malformed tokens yield `None`, never an error.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(err) => {
            tracing::debug!(error = %err, "cannot decode token");
            None
        },
    }
}

/// Decide session liveness out of a stored token.
#[derive(Clone)]
pub struct TokenValidator {
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    /// Create a new [`TokenValidator`].
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Whether `exp` (seconds) lies strictly after now.
    pub fn is_expired(&self, exp: Option<u64>) -> bool {
        match exp {
            Some(exp) => u128::from(exp) * 1000 <= self.clock.now_millis(),
            None => true,
        }
    }

    /// Decode and check a token.
    ///
    /// Returns the claims only for a non-empty token whose subject is
    /// non-empty and whose expiry is in the future.
    pub fn validate(&self, token: Option<&str>) -> Option<Claims> {
        let token = token.filter(|token| !token.is_empty())?;
        let claims = decode_claims(token)?;

        if claims.subject().is_none() {
            tracing::debug!("token has no subject");
            return None;
        }
        if self.is_expired(claims.exp) {
            tracing::debug!(exp = ?claims.exp, "token is expired");
            return None;
        }

        Some(claims)
    }
}
