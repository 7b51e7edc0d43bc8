//! JWKS (JSON Web Key Set) fetching and caching
//!
//! The key set is the only shared mutable state in the crate:
//!
//! - **TTL-based caching**: a fetched set is trusted for the configured TTL
//! - **Fetch on miss**: an unknown `kid` triggers a refetch, at most once
//!   per minimum refresh interval so forged key ids cannot flood the issuer
//! - **Single flight**: concurrent callers needing a fetch share one
//!   outbound request
//! - **No lock across I/O**: the state mutex is held only to read or swap
//!   pointers; callers await the shared fetch with no lock held

use crate::error::{ConfigError, JwksError};
use crate::transport::redacted_url;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Timeout for one JWKS request
pub const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum spacing between refetches triggered by unknown key ids
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<JwkSet>, JwksError>>>;

/// JWKS cache entry with metadata
#[derive(Debug, Clone)]
struct CachedJwks {
    jwks: Arc<JwkSet>,
    fetched_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

#[derive(Default)]
struct JwksState {
    cached: Option<CachedJwks>,
    in_flight: Option<SharedFetch>,
}

/// JWKS client for fetching and caching JSON Web Key Sets
///
/// # Example
///
/// ```rust,no_run
/// # use tokenguard::jwt::JwksClient;
/// # use std::time::Duration;
/// # tokio_test::block_on(async {
/// let uri = "https://issuer.example/.well-known/jwks.json".parse()?;
/// let client = JwksClient::new(uri, Duration::from_secs(600))?;
///
/// if let Some(key) = client.find_key(Some("key-2025-01")).await? {
///     println!("found key {:?}", key.common.key_id);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Clone)]
pub struct JwksClient {
    jwks_uri: Url,
    /// `jwks_uri` with any password removed
    log_uri: Arc<str>,
    http_client: reqwest::Client,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    state: Arc<Mutex<JwksState>>,
}

impl fmt::Debug for JwksClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("JwksClient")
            .field("jwks_uri", &self.log_uri)
            .field("cache_ttl", &self.cache_ttl)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field(
                "cached_keys",
                &state.cached.as_ref().map(|c| c.jwks.keys.len()),
            )
            .field("fetch_in_flight", &state.in_flight.is_some())
            .finish()
    }
}

impl JwksClient {
    /// Create a client with its own HTTP connection pool
    ///
    /// # Errors
    ///
    /// [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(jwks_uri: Url, cache_ttl: Duration) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none()) // a redirect target never passed the transport check
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_http_client(jwks_uri, cache_ttl, http_client))
    }

    /// Create a client on an existing HTTP client
    ///
    /// `http_client` should not follow redirects; only the configured
    /// endpoint has passed the transport check.
    pub fn with_http_client(jwks_uri: Url, cache_ttl: Duration, http_client: reqwest::Client) -> Self {
        Self {
            log_uri: redacted_url(&jwks_uri).into(),
            jwks_uri,
            http_client,
            cache_ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            state: Arc::new(Mutex::new(JwksState::default())),
        }
    }

    /// Set the minimum spacing between refetches caused by unknown key ids
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// JWKS endpoint
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Cache lifetime
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Current key set, fetching if the cache is empty or stale
    ///
    /// # Errors
    ///
    /// [`JwksError`] if a needed fetch fails.
    pub async fn get_jwks(&self) -> Result<Arc<JwkSet>, JwksError> {
        if let Some(cached) = self.fresh_cache() {
            debug!(jwks_uri = %self.log_uri, "Using cached JWKS");
            return Ok(cached.jwks);
        }
        self.fetch(None).await
    }

    /// Find the verification key for a token's `kid`
    ///
    /// Without a `kid`, a key is returned only if the set holds exactly one
    /// key. A `kid` missing from a fresh cache causes one refetch, unless
    /// the cache was populated less than the minimum refresh interval ago.
    ///
    /// # Errors
    ///
    /// [`JwksError`] if a needed fetch fails. An unknown `kid` is `Ok(None)`.
    pub async fn find_key(&self, kid: Option<&str>) -> Result<Option<Jwk>, JwksError> {
        let mut seen = None;
        if let Some(cached) = self.fresh_cache() {
            if let Some(jwk) = select_key(&cached.jwks, kid) {
                return Ok(Some(jwk));
            }
            if cached.fetched_at.elapsed() < self.min_refresh_interval {
                debug!(
                    jwks_uri = %self.log_uri,
                    kid = ?kid,
                    "Key id not in recently fetched JWKS; refetch suppressed"
                );
                return Ok(None);
            }
            info!(jwks_uri = %self.log_uri, kid = ?kid, "Key id not in cached JWKS, refetching");
            seen = Some(cached.fetched_at);
        }

        let jwks = self.fetch(seen).await?;
        Ok(select_key(&jwks, kid))
    }

    /// Drop the cached key set
    pub fn clear_cache(&self) {
        self.state.lock().cached = None;
        debug!(jwks_uri = %self.log_uri, "JWKS cache cleared");
    }

    fn fresh_cache(&self) -> Option<CachedJwks> {
        self.state
            .lock()
            .cached
            .as_ref()
            .filter(|c| c.is_fresh(self.cache_ttl))
            .cloned()
    }

    /// Join the in-flight fetch or start one
    ///
    /// `seen` is when the cache the caller rejected was fetched. A fresh set
    /// fetched after that (by a fetch that finished while the caller was
    /// getting here) is returned instead of starting another request.
    async fn fetch(&self, seen: Option<Instant>) -> Result<Arc<JwkSet>, JwksError> {
        let fetch = {
            let mut state = self.state.lock();
            if let Some(cached) = &state.cached {
                let newer = seen.is_none_or(|seen| cached.fetched_at > seen);
                if newer && cached.is_fresh(self.cache_ttl) {
                    return Ok(Arc::clone(&cached.jwks));
                }
            }
            match &state.in_flight {
                Some(fetch) => {
                    debug!(jwks_uri = %self.log_uri, "Joining in-flight JWKS fetch");
                    fetch.clone()
                }
                None => {
                    let fetch = self.start_fetch();
                    state.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };
        fetch.await
    }

    fn start_fetch(&self) -> SharedFetch {
        let http_client = self.http_client.clone();
        let jwks_uri = self.jwks_uri.clone();
        let log_uri = Arc::clone(&self.log_uri);
        let state = Arc::clone(&self.state);

        async move {
            let outcome = fetch_jwks(&http_client, &jwks_uri, &log_uri).await.map(Arc::new);

            let mut state = state.lock();
            state.in_flight = None;
            if let Ok(jwks) = &outcome {
                state.cached = Some(CachedJwks {
                    jwks: Arc::clone(jwks),
                    fetched_at: Instant::now(),
                });
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

async fn fetch_jwks(
    http_client: &reqwest::Client,
    jwks_uri: &Url,
    log_uri: &str,
) -> Result<JwkSet, JwksError> {
    info!(jwks_uri = %log_uri, "Fetching JWKS from endpoint");

    let response = http_client
        .get(jwks_uri.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            error!(jwks_uri = %log_uri, error = %e, "Failed to fetch JWKS");
            JwksError::Fetch(e.to_string())
        })?;

    if !response.status().is_success() {
        error!(
            jwks_uri = %log_uri,
            status = %response.status(),
            "JWKS endpoint returned error status"
        );
        return Err(JwksError::Status(response.status().as_u16()));
    }

    let jwks: JwkSet = response.json().await.map_err(|e| {
        error!(jwks_uri = %log_uri, error = %e, "Failed to parse JWKS JSON");
        JwksError::Parse(e.to_string())
    })?;

    if jwks.keys.is_empty() {
        warn!(jwks_uri = %log_uri, "JWKS endpoint returned an empty key set");
    }
    info!(jwks_uri = %log_uri, key_count = jwks.keys.len(), "Successfully fetched JWKS");

    Ok(jwks)
}

fn select_key(jwks: &JwkSet, kid: Option<&str>) -> Option<Jwk> {
    match kid {
        Some(kid) => jwks.find(kid).cloned(),
        None if jwks.keys.len() == 1 => jwks.keys.first().cloned(),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key_set(kids: &[&str]) -> JwkSet {
        let keys: Vec<_> = kids
            .iter()
            .map(|kid| {
                json!({
                    "kty": "RSA",
                    "kid": kid,
                    "use": "sig",
                    "alg": "RS256",
                    "n": "sHdgVuVv5OsHKAeXAAfhyCVXfvuz4xf2B2Slb_9Th-E",
                    "e": "AQAB",
                })
            })
            .collect();
        serde_json::from_value(json!({ "keys": keys })).unwrap()
    }

    fn client() -> JwksClient {
        JwksClient::new(
            "https://auth.example.com/jwks".parse().unwrap(),
            Duration::from_secs(600),
        )
        .unwrap()
    }

    #[test]
    fn test_jwks_client_creation() {
        let client = client();
        assert_eq!(client.jwks_uri().as_str(), "https://auth.example.com/jwks");
        assert_eq!(client.cache_ttl(), Duration::from_secs(600));
        assert_eq!(client.min_refresh_interval, DEFAULT_MIN_REFRESH_INTERVAL);
    }

    #[test]
    fn test_cached_jwks_freshness() {
        let cached = CachedJwks {
            jwks: Arc::new(key_set(&[])),
            fetched_at: Instant::now(),
        };
        assert!(cached.is_fresh(Duration::from_secs(600)));
        assert!(!cached.is_fresh(Duration::ZERO));
    }

    #[test]
    fn test_select_key_by_kid() {
        let jwks = key_set(&["a", "b"]);
        assert_eq!(select_key(&jwks, Some("b")).unwrap().common.key_id.as_deref(), Some("b"));
        assert!(select_key(&jwks, Some("c")).is_none());
        assert!(select_key(&jwks, None).is_none());
    }

    #[test]
    fn test_select_sole_key_without_kid() {
        let jwks = key_set(&["only"]);
        assert!(select_key(&jwks, None).is_some());
    }

    #[tokio::test]
    async fn test_cached_key_served_without_fetch() {
        let client = client();
        client.state.lock().cached = Some(CachedJwks {
            jwks: Arc::new(key_set(&["k1"])),
            fetched_at: Instant::now(),
        });

        // The endpoint is unreachable; a hit must not touch it
        let key = client.find_key(Some("k1")).await.unwrap();
        assert!(key.is_some());

        // A miss right after a fetch is suppressed rather than refetched
        assert!(client.find_key(Some("k2")).await.unwrap().is_none());
    }

    #[test]
    fn test_clear_cache() {
        let client = client();
        client.state.lock().cached = Some(CachedJwks {
            jwks: Arc::new(key_set(&["k1"])),
            fetched_at: Instant::now(),
        });
        client.clear_cache();
        assert!(client.state.lock().cached.is_none());
    }
}
