use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use std::time::Duration;

use super::{AuthError, AuthUser, JwksCache, TokenUse};
use crate::config::AuthConfig;

enum Mode {
    Jwks {
        keys: JwksCache,
        issuer: Option<String>,
        app_client_id: Option<String>,
        leeway: u64,
    },
    /// Development only: no JWKS available, signatures are not checked.
    Insecure,
    Unconfigured,
}

/// Verifies bearer tokens issued by the identity provider.
pub struct TokenVerifier {
    mode: Mode,
}

impl TokenVerifier {
    pub fn from_config(config: &AuthConfig) -> Self {
        let mode = match config.jwks_url() {
            Some(url) => Mode::Jwks {
                keys: JwksCache::new(url, Duration::from_secs(config.jwks_cache_ttl_secs)),
                issuer: config.issuer(),
                app_client_id: config.app_client_id.clone(),
                leeway: config.leeway_secs,
            },
            None if config.allow_insecure => {
                tracing::warn!("No JWKS configured; JWT verification runs in INSECURE mode");
                Mode::Insecure
            }
            None => {
                tracing::warn!("No JWKS configured; protected routes will refuse every request");
                Mode::Unconfigured
            }
        };

        Self { mode }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.mode, Mode::Unconfigured)
    }

    /// Verify `token` and build the caller it identifies.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let claims = match &self.mode {
            Mode::Jwks {
                keys,
                issuer,
                app_client_id,
                leeway,
            } => {
                verify_signed(
                    token,
                    keys,
                    issuer.as_deref(),
                    app_client_id.as_deref(),
                    *leeway,
                )
                .await?
            }
            Mode::Insecure => {
                tracing::warn!("JWT verification in INSECURE mode - not for production!");
                peek_claims(token).map_err(|e| AuthError::invalid(e.to_string()))?
            }
            Mode::Unconfigured => return Err(AuthError::NotConfigured),
        };

        AuthUser::from_claims(token, claims)
    }
}

async fn verify_signed(
    token: &str,
    keys: &JwksCache,
    issuer: Option<&str>,
    app_client_id: Option<&str>,
    leeway: u64,
) -> Result<Map<String, Value>, AuthError> {
    let header =
        decode_header(token).map_err(|e| AuthError::invalid(format!("Invalid token header: {}", e)))?;

    let kid = header
        .kid
        .ok_or_else(|| AuthError::invalid("Token missing kid in header"))?;

    let key = keys.get_key(&kid).await?;

    let token_use = peek_claims(token)
        .ok()
        .and_then(|claims| TokenUse::from_claims(&claims));

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = leeway;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }

    // Only ID tokens carry `aud`; access tokens identify the app by `client_id`.
    match (&token_use, app_client_id) {
        (Some(TokenUse::Id), Some(client_id)) => validation.set_audience(&[client_id]),
        _ => validation.validate_aud = false,
    }

    let claims = decode::<Map<String, Value>>(token, &key, &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "Token verification failed");
            AuthError::from(e)
        })?
        .claims;

    if let (Some(TokenUse::Access), Some(expected)) = (&token_use, app_client_id) {
        if let Some(actual) = claims.get("client_id").and_then(Value::as_str) {
            if actual != expected {
                return Err(AuthError::ClientIdMismatch);
            }
        }
    }

    if let Some(TokenUse::Other(other)) = &token_use {
        return Err(AuthError::invalid(format!("Invalid token_use: {}", other)));
    }

    Ok(claims)
}

/// Payload without any signature, expiry or audience checks.
fn peek_claims(token: &str) -> Result<Map<String, Value>, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
}
