//! Signed-token (JWT) verifier configuration

use super::algorithm::{decoding_key_for, is_symmetric, parse_algorithm};
use crate::environment::RuntimeEnvironment;
use crate::error::ConfigError;
use crate::transport::{redacted_url, require_secure_url};
use jsonwebtoken::{Algorithm, DecodingKey};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Algorithm used when none is configured
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::RS256;

/// Default clock skew tolerance
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Largest clock skew tolerance accepted
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(120);

/// Default JWKS cache lifetime
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(600);

/// Shortest JWKS cache lifetime accepted
pub const MIN_JWKS_CACHE_TTL: Duration = Duration::from_secs(1);

/// Longest JWKS cache lifetime accepted
pub const MAX_JWKS_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Where verification keys come from
#[derive(Clone)]
pub enum KeySource {
    /// Public keys fetched from a JWKS endpoint and cached
    Jwks {
        /// Endpoint URL
        uri: Url,
        /// How long a fetched key set is trusted
        cache_ttl: Duration,
    },
    /// A single key supplied at startup
    Static(DecodingKey),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwks { uri, cache_ttl } => f
                .debug_struct("Jwks")
                .field("uri", &redacted_url(uri))
                .field("cache_ttl", cache_ttl)
                .finish(),
            Self::Static(_) => f.write_str("Static([REDACTED])"),
        }
    }
}

/// Validated configuration for [`JwtVerifier`](crate::jwt::JwtVerifier)
///
/// Only obtainable through [`SignedTokenConfig::builder`], which enforces:
///
/// - exactly one key source (JWKS endpoint or static key)
/// - asymmetric algorithms only with a JWKS endpoint
/// - HMAC secret length and shape
/// - secure transport for the JWKS endpoint
/// - clock skew within `0..=120s`, JWKS cache TTL within `1s..=24h`
///
/// # Example
///
/// ```rust
/// use tokenguard::{RuntimeEnvironment, SignedTokenConfig};
///
/// let config = SignedTokenConfig::builder()
///     .jwks_uri("https://issuer.example/.well-known/jwks.json")
///     .issuer("https://issuer.example")
///     .audience("api")
///     .algorithm("RS256")
///     .required_scopes(["read"])
///     .environment(RuntimeEnvironment::production())
///     .build()?;
///
/// assert_eq!(config.required_scopes(), ["read".to_string()]);
///
/// let confused = SignedTokenConfig::builder()
///     .jwks_uri("https://issuer.example/.well-known/jwks.json")
///     .algorithm("HS256")
///     .build();
/// assert!(confused.is_err());
/// # Ok::<(), tokenguard::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SignedTokenConfig {
    key_source: KeySource,
    algorithm: Algorithm,
    issuer: Option<String>,
    audience: Vec<String>,
    clock_skew: Duration,
    required_scopes: Vec<String>,
}

impl SignedTokenConfig {
    /// Start building a configuration
    pub fn builder() -> SignedTokenConfigBuilder {
        SignedTokenConfigBuilder::default()
    }

    /// Key source
    pub fn key_source(&self) -> &KeySource {
        &self.key_source
    }

    /// JWKS endpoint, if keys come from one
    pub fn jwks_uri(&self) -> Option<&Url> {
        match &self.key_source {
            KeySource::Jwks { uri, .. } => Some(uri),
            KeySource::Static(_) => None,
        }
    }

    /// The only algorithm tokens may be signed with
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Required `iss`
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Accepted `aud` values; a token must name at least one
    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    /// Clock skew tolerance for `exp` and `nbf`
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Scopes every token must carry
    pub fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }
}

/// Builder for [`SignedTokenConfig`]
#[derive(Debug, Default)]
pub struct SignedTokenConfigBuilder {
    jwks_uri: Option<String>,
    static_key: Option<SecretString>,
    algorithm: Option<String>,
    issuer: Option<String>,
    audience: Vec<String>,
    clock_skew: Option<Duration>,
    jwks_cache_ttl: Option<Duration>,
    required_scopes: Vec<String>,
    environment: Option<RuntimeEnvironment>,
}

impl SignedTokenConfigBuilder {
    /// Fetch verification keys from this JWKS endpoint
    pub fn jwks_uri(mut self, uri: impl Into<String>) -> Self {
        self.jwks_uri = Some(uri.into());
        self
    }

    /// Verify with this key: an HMAC secret, or a PEM public key
    pub fn static_key(mut self, key: impl Into<String>) -> Self {
        self.static_key = Some(SecretString::new(key.into()));
        self
    }

    /// Signing algorithm name (default `RS256`)
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Required issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Add an accepted audience
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.push(audience.into());
        self
    }

    /// Add several accepted audiences
    pub fn audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience.extend(audiences.into_iter().map(Into::into));
        self
    }

    /// Clock skew tolerance (default 60s, at most 120s)
    pub fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = Some(skew);
        self
    }

    /// JWKS cache lifetime (default 10 minutes)
    pub fn jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = Some(ttl);
        self
    }

    /// Scopes every token must carry
    pub fn required_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Environment to validate against (detected from the process if unset)
    pub fn environment(mut self, environment: RuntimeEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Validate and build
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] describing the first rule the settings violate.
    pub fn build(self) -> Result<SignedTokenConfig, ConfigError> {
        let environment = self.environment.unwrap_or_else(RuntimeEnvironment::detect);

        let algorithm = match self.algorithm.as_deref() {
            Some(name) => parse_algorithm(name)?,
            None => DEFAULT_ALGORITHM,
        };

        let jwks_uri = self.jwks_uri.filter(|uri| !uri.trim().is_empty());
        let static_key = self
            .static_key
            .filter(|key| !key.expose_secret().trim().is_empty());

        let key_source = match (jwks_uri, static_key) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingKeySources),
            (None, None) => return Err(ConfigError::MissingKeySource),
            (Some(uri), None) => {
                if is_symmetric(algorithm) {
                    return Err(ConfigError::SymmetricAlgorithmWithJwks(format!(
                        "{algorithm:?}"
                    )));
                }
                let uri = require_secure_url("jwks_uri", &uri, &environment)?;
                let cache_ttl = self.jwks_cache_ttl.unwrap_or(DEFAULT_JWKS_CACHE_TTL);
                if !(MIN_JWKS_CACHE_TTL..=MAX_JWKS_CACHE_TTL).contains(&cache_ttl) {
                    return Err(ConfigError::DurationOutOfRange {
                        setting: "jwks_cache_ttl",
                        actual: cache_ttl,
                        min: MIN_JWKS_CACHE_TTL,
                        max: MAX_JWKS_CACHE_TTL,
                    });
                }
                KeySource::Jwks { uri, cache_ttl }
            }
            (None, Some(key)) => {
                KeySource::Static(decoding_key_for(algorithm, key.expose_secret().as_bytes())?)
            }
        };

        let clock_skew = self.clock_skew.unwrap_or(DEFAULT_CLOCK_SKEW);
        if clock_skew > MAX_CLOCK_SKEW {
            return Err(ConfigError::ClockSkewOutOfRange {
                actual: clock_skew,
                max: MAX_CLOCK_SKEW,
            });
        }

        let issuer = self
            .issuer
            .map(|iss| iss.trim().to_string())
            .filter(|iss| !iss.is_empty());
        let audience: Vec<String> = self
            .audience
            .iter()
            .map(|aud| aud.trim().to_string())
            .filter(|aud| !aud.is_empty())
            .collect();

        if issuer.is_none() {
            warn!("Signed-token verifier configured without an issuer check");
        }
        if audience.is_empty() {
            warn!("Signed-token verifier configured without an audience check");
        }

        Ok(SignedTokenConfig {
            key_source,
            algorithm,
            issuer,
            audience,
            clock_skew,
            required_scopes: clean_scopes(self.required_scopes),
        })
    }
}

pub(crate) fn clean_scopes(scopes: Vec<String>) -> Vec<String> {
    scopes
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JWKS: &str = "https://issuer.example/jwks";
    const SECRET: &str = "kF9vQ2xR7mZpL4wT8nY1bC6hJ3sD0aGeUiOqVtXyWzEr5u2MkN8jP7fB4cH9gA1s";

    fn dev() -> SignedTokenConfigBuilder {
        SignedTokenConfig::builder().environment(RuntimeEnvironment::development())
    }

    #[test]
    fn test_defaults() {
        let config = dev().jwks_uri(JWKS).build().unwrap();
        assert_eq!(config.algorithm(), Algorithm::RS256);
        assert_eq!(config.clock_skew(), DEFAULT_CLOCK_SKEW);
        assert!(matches!(
            config.key_source(),
            KeySource::Jwks { cache_ttl, .. } if *cache_ttl == DEFAULT_JWKS_CACHE_TTL
        ));
        assert!(config.required_scopes().is_empty());
    }

    #[test]
    fn test_key_source_exclusivity() {
        assert_eq!(dev().build().unwrap_err(), ConfigError::MissingKeySource);
        assert_eq!(
            dev().jwks_uri(JWKS).static_key(SECRET).build().unwrap_err(),
            ConfigError::ConflictingKeySources
        );
        assert_eq!(
            dev().jwks_uri("  ").static_key("").build().unwrap_err(),
            ConfigError::MissingKeySource
        );
    }

    #[test]
    fn test_hmac_with_jwks_rejected() {
        for alg in ["HS256", "HS384", "HS512", "hs256"] {
            assert!(matches!(
                dev().jwks_uri(JWKS).algorithm(alg).build(),
                Err(ConfigError::SymmetricAlgorithmWithJwks(_))
            ));
        }
    }

    #[test]
    fn test_asymmetric_with_jwks_accepted() {
        for alg in ["RS256", "RS384", "RS512", "PS256", "ES256", "ES384", "EdDSA"] {
            assert!(dev().jwks_uri(JWKS).algorithm(alg).build().is_ok(), "{alg}");
        }
    }

    #[test]
    fn test_static_hmac_key() {
        let config = dev().static_key(SECRET).algorithm("HS512").build().unwrap();
        assert!(config.jwks_uri().is_none());
        assert!(matches!(config.key_source(), KeySource::Static(_)));

        assert!(matches!(
            dev().static_key("too-short").algorithm("HS256").build(),
            Err(ConfigError::WeakKeyLength { .. })
        ));
    }

    #[test]
    fn test_clock_skew_bounds() {
        assert!(dev().jwks_uri(JWKS).clock_skew(Duration::ZERO).build().is_ok());
        assert!(dev().jwks_uri(JWKS).clock_skew(MAX_CLOCK_SKEW).build().is_ok());
        assert!(matches!(
            dev().jwks_uri(JWKS).clock_skew(Duration::from_secs(121)).build(),
            Err(ConfigError::ClockSkewOutOfRange { .. })
        ));
    }

    #[test]
    fn test_cache_ttl_bounds() {
        assert!(matches!(
            dev().jwks_uri(JWKS).jwks_cache_ttl(Duration::ZERO).build(),
            Err(ConfigError::DurationOutOfRange { setting: "jwks_cache_ttl", .. })
        ));
    }

    #[test]
    fn test_jwks_transport_security() {
        assert!(dev().jwks_uri("http://localhost:8080/jwks").build().is_ok());
        assert!(matches!(
            SignedTokenConfig::builder()
                .jwks_uri("http://localhost:8080/jwks")
                .environment(RuntimeEnvironment::production())
                .build(),
            Err(ConfigError::InsecureTransport { .. })
        ));
        assert!(matches!(
            dev().jwks_uri("http://issuer.example/jwks").build(),
            Err(ConfigError::InsecureTransport { .. })
        ));
    }

    #[test]
    fn test_blank_issuer_audience_and_scopes_are_dropped() {
        let config = dev()
            .jwks_uri(JWKS)
            .issuer("  ")
            .audiences(["api", " ", "admin "])
            .required_scopes(["read", ""])
            .build()
            .unwrap();
        assert!(config.issuer().is_none());
        assert_eq!(config.audience(), ["api".to_string(), "admin".to_string()]);
        assert_eq!(config.required_scopes(), ["read".to_string()]);
    }

    #[test]
    fn test_debug_redacts_static_key() {
        let config = dev().static_key(SECRET).algorithm("HS512").build().unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("REDACTED"));
    }
}
