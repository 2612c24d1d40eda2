// auth/mod.rs - Bearer token verification against the identity provider's JWKS
//
// Every protected route runs the token through `TokenVerifier`:
// header (kid) → signing key from the cached JWKS → signature, expiry, issuer
// → audience rules that depend on whether the token is an ID or access token.

pub mod claims;
pub mod jwks;
pub mod verifier;

pub use claims::{AuthUser, CognitoClaims, TokenUse};
pub use jwks::JwksCache;
pub use verifier::TokenVerifier;

use thiserror::Error;

/// Reasons a bearer token is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No authentication token provided")]
    MissingToken,

    #[error("JWT verification not configured. Set COGNITO_USER_POOL_ID and AWS_REGION")]
    NotConfigured,

    #[error("Token has expired")]
    Expired,

    #[error("Token audience mismatch")]
    AudienceMismatch,

    #[error("Token client_id mismatch")]
    ClientIdMismatch,

    #[error("Token issuer mismatch")]
    IssuerMismatch,

    #[error("{0}")]
    InvalidToken(String),

    #[error("Authentication service unavailable")]
    KeysUnavailable,
}

impl AuthError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AuthError::InvalidToken(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingToken => 401,
            AuthError::NotConfigured => 500,
            AuthError::Expired => 403,
            AuthError::AudienceMismatch
            | AuthError::ClientIdMismatch
            | AuthError::IssuerMismatch
            | AuthError::InvalidToken(_) => 401,
            AuthError::KeysUnavailable => 503,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "unauthorized",
            AuthError::NotConfigured => "configuration_error",
            AuthError::Expired => "token_expired",
            AuthError::AudienceMismatch | AuthError::ClientIdMismatch => "invalid_audience",
            AuthError::IssuerMismatch => "invalid_issuer",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::KeysUnavailable => "service_unavailable",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
            ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
            _ => AuthError::InvalidToken(format!("Invalid token: {}", err)),
        }
    }
}
