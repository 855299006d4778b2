//! Bearer token validation.
//!
//! Access tokens are HS256 JWTs issued by the identity provider. The `sub` claim is
//! the user id every workflow acts on behalf of.

use crate::errors::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Claims read from an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Intended audience
    pub aud: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Validates access tokens against a shared secret and audience.
#[derive(Clone)]
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Creates an authenticator for tokens signed with `secret` for `audience`.
    #[must_use]
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Returns the user id carried by a valid token.
    pub fn authenticate(&self, token: &str) -> Result<String> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|e| {
                debug!(error = %e, "Rejected access token");
                Error::Unauthorized {
                    message: "Invalid or expired token".to_string(),
                }
            })
    }

    /// Reads a `Bearer <token>` authorization header value.
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<String> {
        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Unauthorized {
                message: "Missing bearer token".to_string(),
            })?;
        self.authenticate(token)
    }
}
