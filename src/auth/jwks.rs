//! Signing-key cache for the identity provider's JWKS document.
//!
//! Keys are held for a fixed TTL. A `kid` that is not in the cached set
//! forces one refetch, which picks up key rotation without waiting for the
//! TTL to lapse.

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

use super::AuthError;

const FETCH_TIMEOUT_SECONDS: u64 = 5;

struct CachedJwks {
    keys: HashMap<String, Jwk>,
    /// `None` when the TTL is too large to represent: the set never expires.
    expires_at: Option<Instant>,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| at > Instant::now())
    }
}

pub struct JwksCache {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    cache_ttl: Duration,
}

impl JwksCache {
    pub fn new(jwks_url: impl Into<String>, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build JWKS HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url: jwks_url.into(),
            http_client,
            cache: RwLock::new(None),
            cache_ttl,
        }
    }

    /// Decoding key for `kid`, refetching the key set once if it is unknown.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(jwk) = self.lookup(kid).await? {
            return to_decoding_key(&jwk);
        }

        tracing::debug!(kid = %kid, "Key not in cached JWKS, refetching");
        self.clear().await;

        match self.lookup(kid).await? {
            Some(jwk) => to_decoding_key(&jwk),
            None => {
                tracing::warn!(kid = %kid, "Key not found in JWKS after refresh");
                Err(AuthError::invalid("Public key not found for kid"))
            }
        }
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    async fn lookup(&self, kid: &str) -> Result<Option<Jwk>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh() {
                    return Ok(cached.keys.get(kid).cloned());
                }
            }
        }

        self.refresh().await?;

        let cache = self.cache.read().await;
        Ok(cache.as_ref().and_then(|cached| cached.keys.get(kid).cloned()))
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<(), AuthError> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch JWKS");
                AuthError::KeysUnavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "JWKS endpoint returned error");
            return Err(AuthError::KeysUnavailable);
        }

        let set: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS response");
            AuthError::KeysUnavailable
        })?;

        let keys: HashMap<String, Jwk> = set
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
            .collect();

        tracing::info!(key_count = keys.len(), "JWKS cache refreshed");

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            expires_at: Instant::now().checked_add(self.cache_ttl),
        });

        Ok(())
    }
}

fn to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    DecodingKey::from_jwk(jwk).map_err(|e| {
        tracing::error!(error = %e, "Failed to convert JWK");
        AuthError::invalid("Public key not found for kid")
    })
}
