//! Lazy, memoized JWKS cache with a single in-flight fetch.
//!
//! The key set is the only state shared across concurrent requests. It is
//! fetched on first use, memoized per JWKS URI for the store's lifetime, and
//! refreshed at most once per lookup when an unknown key id shows up (key
//! rotation). Concurrent cold-cache lookups funnel through one fetch guard so
//! exactly one network request is made and every caller observes its result.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use tokio::sync::{Mutex, RwLock};

use crate::error::{transport_error, AuthError, Result};

/// JWKS document as served by `/.well-known/jwks.json`.
#[derive(Debug, serde::Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

/// A single JWK entry. Only RSA signing keys are usable here; entries that
/// fail to parse are skipped with a warning.
#[derive(Debug, serde::Deserialize)]
struct JwkKey {
    kid: Option<String>,
    #[allow(dead_code)]
    kty: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

/// Decoded keys for one JWKS URI.
struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
    ttl: Duration,
}

impl CachedKeys {
    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.ttl
    }
}

impl std::fmt::Debug for CachedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedKeys")
            .field("keys_count", &self.keys.len())
            .field("fetched_at", &self.fetched_at)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Public signing-key store, keyed by JWKS URI.
///
/// Read-mostly after first population; the fetch guard is the only write-path
/// synchronization. Shared by cloning the owning provider or wrapping in
/// `Arc`.
#[derive(Debug)]
pub struct KeyStore {
    http_client: reqwest::Client,
    cache: RwLock<HashMap<String, CachedKeys>>,
    fetch_guard: Mutex<()>,
    cache_ttl: Duration,
}

impl KeyStore {
    /// Create a store that fetches through the given client.
    ///
    /// The client's timeout bounds every key fetch; a timed-out fetch fails
    /// the enclosing verification with a retryable error.
    pub fn new(http_client: reqwest::Client, cache_ttl: Duration) -> Self {
        Self {
            http_client,
            cache: RwLock::new(HashMap::new()),
            fetch_guard: Mutex::new(()),
            cache_ttl,
        }
    }

    /// Resolve the decoding key for `kid`, fetching the key set on first use.
    ///
    /// When `kid` is missing from a cached set, one forced re-fetch is
    /// attempted before failing, to pick up rotated keys.
    pub async fn decoding_key(&self, jwks_uri: &str, kid: &str) -> Result<DecodingKey> {
        // Fast path: populated cache, unsynchronized concurrent reads.
        if let Some(key) = self.lookup(jwks_uri, kid).await {
            return Ok(key);
        }

        // Single in-flight fetch: whoever holds the guard fetches, everyone
        // else waits and re-reads the cache the winner populated.
        let _guard = self.fetch_guard.lock().await;
        if let Some(key) = self.lookup(jwks_uri, kid).await {
            return Ok(key);
        }

        self.refresh(jwks_uri).await?;

        self.lookup(jwks_uri, kid).await.ok_or_else(|| {
            AuthError::unauthorized(format!("unknown key id after key-set refresh: {kid}"))
        })
    }

    /// Number of JWKS URIs currently cached.
    pub async fn cached_uris(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn lookup(&self, jwks_uri: &str, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read().await;
        cache
            .get(jwks_uri)
            .filter(|cached| !cached.is_expired())
            .and_then(|cached| cached.keys.get(kid).cloned())
    }

    async fn refresh(&self, jwks_uri: &str) -> Result<()> {
        tracing::debug!(jwks_uri = %jwks_uri, "fetching key set");

        let response = self
            .http_client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| transport_error("key-set fetch failed", &e))?;

        if !response.status().is_success() {
            return Err(AuthError::transient(format!(
                "key-set endpoint returned status {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| AuthError::transient(format!("key-set response is not valid JWKS: {e}")))?;

        let mut keys = HashMap::new();
        for key in jwks.keys {
            let (Some(kid), Some(n), Some(e)) = (key.kid, key.n, key.e) else {
                continue;
            };
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(decoding_key) => {
                    keys.insert(kid, decoding_key);
                },
                Err(err) => {
                    tracing::warn!(kid = %kid, error = %err, "skipping unparseable JWK");
                },
            }
        }

        if keys.is_empty() {
            return Err(AuthError::transient("key set contained no usable keys"));
        }

        tracing::info!(jwks_uri = %jwks_uri, keys_count = keys.len(), "cached key set");

        let mut cache = self.cache.write().await;
        cache.insert(
            jwks_uri.to_string(),
            CachedKeys {
                keys,
                fetched_at: Instant::now(),
                ttl: self.cache_ttl,
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_starts_empty() {
        let client = reqwest::Client::new();
        let store = KeyStore::new(client, Duration::from_secs(3600));
        assert_eq!(store.cache_ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn cached_uris_counts_entries() {
        let store = KeyStore::new(reqwest::Client::new(), Duration::from_secs(3600));
        assert_eq!(store.cached_uris().await, 0);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let store = KeyStore::new(client, Duration::from_secs(3600));

        // Nothing listens on this port.
        let err = store
            .decoding_key("http://127.0.0.1:9/jwks.json", "kid-1")
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {err:?}");
    }
}
