//! Signed-token (JWT) verification
//!
//! Validation order for every token:
//!
//! 1. Header decodes and names exactly the configured algorithm
//! 2. Verification key resolves (static key, or JWKS lookup by `kid`)
//! 3. Signature, `exp`, `nbf`, `aud` and `iss` check out under the
//!    configured clock skew
//! 4. Claims fold into [`TokenClaims`]
//! 5. Required scopes are present (403 otherwise)
//!
//! Steps 1-4 fail as 401 `invalid_token`; a JWKS fetch failure is a 500.

use super::jwks::JwksClient;
use crate::claims::TokenClaims;
use crate::config::{KeySource, SignedTokenConfig};
use crate::error::ConfigError;
use crate::result::ValidationResult;
use crate::verifier::{Failure, TokenVerifier, admit};
use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::jwk::{Jwk, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

enum KeyResolver {
    Jwks(Arc<JwksClient>),
    Static(DecodingKey),
}

/// Verifier for self-contained signed tokens
///
/// # Example
///
/// ```rust,no_run
/// # use tokenguard::{JwtVerifier, SignedTokenConfig, TokenVerifier};
/// # tokio_test::block_on(async {
/// let config = SignedTokenConfig::builder()
///     .jwks_uri("https://issuer.example/.well-known/jwks.json")
///     .issuer("https://issuer.example")
///     .audience("https://api.example")
///     .build()?;
/// let verifier = JwtVerifier::new(config)?;
///
/// let result = verifier.authenticate(Some("Bearer eyJ0eXAi...")).await;
/// if let Some(claims) = result.claims() {
///     println!("authenticated {}", claims.identity());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
pub struct JwtVerifier {
    config: SignedTokenConfig,
    keys: KeyResolver,
    validation: Validation,
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: &dyn fmt::Debug = match &self.keys {
            KeyResolver::Jwks(client) => client,
            KeyResolver::Static(_) => &"[REDACTED]",
        };
        f.debug_struct("JwtVerifier")
            .field("algorithm", &self.config.algorithm())
            .field("issuer", &self.config.issuer())
            .field("audience", &self.config.audience())
            .field("clock_skew", &self.config.clock_skew())
            .field("required_scopes", &self.config.required_scopes())
            .field("keys", keys)
            .finish()
    }
}

impl JwtVerifier {
    /// Create a verifier, with a dedicated JWKS client when keys come from one
    ///
    /// # Errors
    ///
    /// [`ConfigError::HttpClient`] if the JWKS HTTP client cannot be built.
    pub fn new(config: SignedTokenConfig) -> Result<Self, ConfigError> {
        let keys = match config.key_source() {
            KeySource::Jwks { uri, cache_ttl } => {
                KeyResolver::Jwks(Arc::new(JwksClient::new(uri.clone(), *cache_ttl)?))
            }
            KeySource::Static(key) => KeyResolver::Static(key.clone()),
        };
        Ok(Self::from_parts(config, keys))
    }

    /// Create a verifier that resolves keys through an existing JWKS client
    ///
    /// Lets several verifiers share one key cache.
    ///
    /// # Errors
    ///
    /// [`ConfigError::JwksClientMismatch`] unless `config` takes its keys
    /// from the same JWKS endpoint the client fetches.
    pub fn with_jwks_client(
        config: SignedTokenConfig,
        client: Arc<JwksClient>,
    ) -> Result<Self, ConfigError> {
        match config.key_source() {
            KeySource::Jwks { uri, .. } if uri == client.jwks_uri() => {}
            KeySource::Jwks { uri, .. } => {
                return Err(ConfigError::JwksClientMismatch(format!(
                    "client fetches {}, configuration names {uri}",
                    client.jwks_uri()
                )));
            }
            KeySource::Static(_) => {
                return Err(ConfigError::JwksClientMismatch(
                    "configuration uses a static key".to_string(),
                ));
            }
        }
        Ok(Self::from_parts(config, KeyResolver::Jwks(client)))
    }

    fn from_parts(config: SignedTokenConfig, keys: KeyResolver) -> Self {
        let validation = build_validation(&config);
        Self {
            config,
            keys,
            validation,
        }
    }

    /// Verifier configuration
    pub fn config(&self) -> &SignedTokenConfig {
        &self.config
    }

    async fn verify_signed(&self, token: &str) -> Result<TokenClaims, Failure> {
        let header = decode_header(token)
            .map_err(|e| Failure::credential(format!("malformed token header: {e}")))?;

        let expected = self.config.algorithm();
        if header.alg != expected {
            return Err(Failure::credential(format!(
                "algorithm {:?} does not match configured {expected:?}",
                header.alg
            )));
        }

        let key = self.resolve_key(header.kid.as_deref(), expected).await?;

        let data = decode::<Map<String, Value>>(token, &key, &self.validation)
            .map_err(|e| Failure::credential(describe_decode_error(e.kind())))?;

        TokenClaims::from_claim_map(data.claims).map_err(|e| Failure::credential(e.to_string()))
    }

    async fn resolve_key(&self, kid: Option<&str>, algorithm: Algorithm) -> Result<DecodingKey, Failure> {
        let client = match &self.keys {
            KeyResolver::Static(key) => return Ok(key.clone()),
            KeyResolver::Jwks(client) => client,
        };

        let jwk = client
            .find_key(kid)
            .await
            .map_err(|e| Failure::system(format!("signing keys unavailable: {e}")))?
            .ok_or_else(|| match kid {
                Some(kid) => Failure::credential(format!("key id `{kid}` not in JWKS")),
                None => Failure::credential("token has no key id and JWKS holds several keys"),
            })?;

        if let Some(reason) = unusable_jwk(&jwk, algorithm) {
            return Err(Failure::credential(reason));
        }

        DecodingKey::from_jwk(&jwk)
            .map_err(|e| Failure::system(format!("JWK cannot be used as a decoding key: {e}")))
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    fn name(&self) -> &'static str {
        "jwt"
    }

    fn required_scopes(&self) -> &[String] {
        self.config.required_scopes()
    }

    async fn verify(&self, token: &str) -> ValidationResult {
        match self.verify_signed(token).await {
            Ok(claims) => admit(self.name(), token, claims, self.required_scopes()),
            Err(failure) => failure.into_result(self.name(), token),
        }
    }
}

fn build_validation(config: &SignedTokenConfig) -> Validation {
    let mut validation = Validation::new(config.algorithm());
    validation.leeway = config.clock_skew().as_secs();
    validation.validate_exp = true;
    validation.validate_nbf = true;

    // An absent `exp` means the token does not expire
    let mut required: Vec<&str> = Vec::new();

    if config.audience().is_empty() {
        validation.validate_aud = false;
    } else {
        validation.set_audience(config.audience());
        required.push("aud");
    }
    if let Some(issuer) = config.issuer() {
        validation.set_issuer(&[issuer]);
        required.push("iss");
    }
    validation.set_required_spec_claims(&required);

    debug!(
        algorithm = ?config.algorithm(),
        leeway = validation.leeway,
        required_claims = ?required,
        "JWT validation rules prepared"
    );
    validation
}

/// Reason a JWK must not verify tokens of `algorithm`, if any
fn unusable_jwk(jwk: &Jwk, algorithm: Algorithm) -> Option<String> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Some("JWK is marked for encryption, not signatures".to_string());
    }
    match &jwk.common.key_algorithm {
        Some(key_alg) if format!("{key_alg:?}") != format!("{algorithm:?}") => Some(format!(
            "JWK algorithm {key_alg:?} does not match configured {algorithm:?}"
        )),
        _ => None,
    }
}

fn describe_decode_error(kind: &JwtErrorKind) -> String {
    match kind {
        JwtErrorKind::ExpiredSignature => "token expired".to_string(),
        JwtErrorKind::ImmatureSignature => "token not yet valid".to_string(),
        JwtErrorKind::InvalidAudience => "audience mismatch".to_string(),
        JwtErrorKind::InvalidIssuer => "issuer mismatch".to_string(),
        JwtErrorKind::InvalidSignature => "signature mismatch".to_string(),
        JwtErrorKind::InvalidAlgorithm => "algorithm not usable with verification key".to_string(),
        JwtErrorKind::MissingRequiredClaim(claim) => format!("required claim `{claim}` missing"),
        other => format!("token decode failed: {other:?}"),
    }
}
