//! Bearer-token validation against a shared JWT secret.

use alloy_rpc_types_engine::{JwtError, JwtSecret};
use http::{header::AUTHORIZATION, HeaderMap};

/// Prefix the Engine API spec requires on the `Authorization` header value.
const BEARER_PREFIX: &str = "Bearer ";

/// Errors produced while extracting or validating a request's bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header was present.
    #[error("missing authorization header")]
    MissingAuthorizationHeader,
    /// The header was present but not a well-formed `Bearer <token>` value.
    #[error("invalid authorization header")]
    InvalidAuthorizationHeader,
    /// The token failed JWT validation (bad signature, expired, or `iat` outside the skew window).
    #[error(transparent)]
    InvalidToken(#[from] JwtError),
}

/// Validates the `Authorization` header of incoming Engine API requests against a [`JwtSecret`]
/// shared out of band with the consensus client, per the Engine API authentication scheme.
#[derive(Clone)]
pub struct JwtAuthValidator {
    secret: JwtSecret,
}

impl JwtAuthValidator {
    /// Creates a validator that checks bearer tokens against `secret`.
    pub const fn new(secret: JwtSecret) -> Self {
        Self { secret }
    }

    /// Extracts and validates the bearer token carried by `headers`.
    pub fn validate(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let token = bearer_token(headers)?;
        self.secret.validate(token).map_err(AuthError::InvalidToken)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingAuthorizationHeader)?;
    let value = value.to_str().map_err(|_| AuthError::InvalidAuthorizationHeader)?;
    value.strip_prefix(BEARER_PREFIX).ok_or(AuthError::InvalidAuthorizationHeader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        headers
    }

    #[test]
    fn rejects_missing_header() {
        let validator = JwtAuthValidator::new(JwtSecret::random());
        let err = validator.validate(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::MissingAuthorizationHeader));
    }

    #[test]
    fn rejects_malformed_header() {
        let validator = JwtAuthValidator::new(JwtSecret::random());
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic deadbeef"));
        let err = validator.validate(&headers).unwrap_err();
        assert!(matches!(err, AuthError::InvalidAuthorizationHeader));
    }

    #[test]
    fn rejects_token_signed_by_other_secret() {
        let secret = JwtSecret::random();
        let other = JwtSecret::random();
        let claims = alloy_rpc_types_engine::Claims {
            iat: (std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_secs()) as i64,
            exp: None,
        };
        let token = other.encode(&claims).unwrap();
        let validator = JwtAuthValidator::new(secret);
        let err = validator.validate(&headers_with_bearer(&token)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn accepts_token_signed_by_matching_secret() {
        let secret = JwtSecret::random();
        let claims = alloy_rpc_types_engine::Claims {
            iat: (std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_secs()) as i64,
            exp: None,
        };
        let token = secret.encode(&claims).unwrap();
        let validator = JwtAuthValidator::new(secret);
        validator.validate(&headers_with_bearer(&token)).unwrap();
    }
}
