//! Verifier selection from environment variables
//!
//! | Variable | Meaning |
//! |---|---|
//! | `AUTH_PROVIDER` | `jwt` or `introspection`; unset disables authentication |
//! | `AUTH_JWKS_URI` | JWKS endpoint (exclusive with `AUTH_JWT_KEY`) |
//! | `AUTH_JWT_KEY` | HMAC secret or PEM public key |
//! | `AUTH_JWT_ISSUER` | required issuer |
//! | `AUTH_JWT_AUDIENCE` | accepted audiences, comma-separated |
//! | `AUTH_JWT_ALGORITHM` | signing algorithm (default `RS256`) |
//! | `AUTH_JWT_CLOCK_SKEW` | clock skew tolerance in seconds (default 60) |
//! | `AUTH_JWKS_CACHE_TTL` | JWKS cache lifetime in seconds (default 600) |
//! | `AUTH_INTROSPECTION_URL` | introspection endpoint |
//! | `AUTH_INTROSPECTION_CLIENT_ID` | client id for the endpoint |
//! | `AUTH_INTROSPECTION_CLIENT_SECRET` | client secret for the endpoint |
//! | `AUTH_INTROSPECTION_TIMEOUT` | per-call timeout in seconds (default 10) |
//! | `AUTH_INTROSPECTION_AUTH_METHOD` | `basic` (default) or `post` |
//! | `AUTH_REQUIRED_SCOPES` | required scopes, comma-separated |
//!
//! Static tokens cannot be selected here; they are constructed in-process.

use super::introspection::{ClientAuthMethod, IntrospectionConfig};
use super::jwt::SignedTokenConfig;
use crate::bearer::parse_scope_list;
use crate::environment::RuntimeEnvironment;
use crate::error::ConfigError;
use crate::introspection::IntrospectionVerifier;
use crate::jwt::JwtVerifier;
use crate::verifier::TokenVerifier;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A verifier configuration selected by the process environment
#[derive(Debug, Clone)]
pub enum AuthSettings {
    /// Signed tokens verified locally
    Jwt(SignedTokenConfig),
    /// Opaque tokens verified by the issuing authority
    Introspection(IntrospectionConfig),
}

impl AuthSettings {
    /// Read the process environment
    ///
    /// Returns `Ok(None)` when `AUTH_PROVIDER` is unset or empty.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] raised while validating the selected strategy.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) with an arbitrary variable lookup
    ///
    /// The runtime environment is detected through the same lookup.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] raised while validating the selected strategy.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let environment = RuntimeEnvironment::from_lookup(&lookup);

        let Some(provider) = var("AUTH_PROVIDER") else {
            return Ok(None);
        };
        let required_scopes = var("AUTH_REQUIRED_SCOPES")
            .map(|s| parse_scope_list(&s))
            .unwrap_or_default();

        match provider.to_ascii_lowercase().as_str() {
            "jwt" => {
                let mut builder = SignedTokenConfig::builder()
                    .environment(environment)
                    .required_scopes(required_scopes);
                if let Some(uri) = var("AUTH_JWKS_URI") {
                    builder = builder.jwks_uri(uri);
                }
                if let Some(key) = lookup("AUTH_JWT_KEY").filter(|k| !k.trim().is_empty()) {
                    builder = builder.static_key(key);
                }
                if let Some(issuer) = var("AUTH_JWT_ISSUER") {
                    builder = builder.issuer(issuer);
                }
                if let Some(audience) = var("AUTH_JWT_AUDIENCE") {
                    builder = builder.audiences(parse_scope_list(&audience));
                }
                if let Some(algorithm) = var("AUTH_JWT_ALGORITHM") {
                    builder = builder.algorithm(algorithm);
                }
                if let Some(skew) = seconds(&var, "AUTH_JWT_CLOCK_SKEW")? {
                    builder = builder.clock_skew(skew);
                }
                if let Some(ttl) = seconds(&var, "AUTH_JWKS_CACHE_TTL")? {
                    builder = builder.jwks_cache_ttl(ttl);
                }
                Ok(Some(Self::Jwt(builder.build()?)))
            }
            "introspection" => {
                let client_id = var("AUTH_INTROSPECTION_CLIENT_ID")
                    .ok_or(ConfigError::MissingSetting("AUTH_INTROSPECTION_CLIENT_ID"))?;
                let client_secret = lookup("AUTH_INTROSPECTION_CLIENT_SECRET")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingSetting("AUTH_INTROSPECTION_CLIENT_SECRET"))?;
                let endpoint = var("AUTH_INTROSPECTION_URL")
                    .ok_or(ConfigError::MissingSetting("AUTH_INTROSPECTION_URL"))?;

                let mut builder = IntrospectionConfig::builder()
                    .endpoint(endpoint)
                    .client_credentials(client_id, client_secret)
                    .environment(environment)
                    .required_scopes(required_scopes);
                if let Some(timeout) = seconds(&var, "AUTH_INTROSPECTION_TIMEOUT")? {
                    builder = builder.timeout(timeout);
                }
                if let Some(method) = var("AUTH_INTROSPECTION_AUTH_METHOD") {
                    builder = builder.auth_method(method.parse::<ClientAuthMethod>()?);
                }
                Ok(Some(Self::Introspection(builder.build()?)))
            }
            "static" => Err(ConfigError::InvalidSetting {
                setting: "AUTH_PROVIDER",
                value: "static tokens cannot be configured from the environment".to_string(),
            }),
            other => Err(ConfigError::InvalidSetting {
                setting: "AUTH_PROVIDER",
                value: other.to_string(),
            }),
        }
    }

    /// Construct the selected verifier
    ///
    /// # Errors
    ///
    /// [`ConfigError::HttpClient`] if the outbound HTTP client cannot be built.
    pub fn into_verifier(self) -> Result<Arc<dyn TokenVerifier>, ConfigError> {
        let verifier: Arc<dyn TokenVerifier> = match self {
            Self::Jwt(config) => Arc::new(JwtVerifier::new(config)?),
            Self::Introspection(config) => Arc::new(IntrospectionVerifier::new(config)?),
        };
        info!(verifier = verifier.name(), "Token verifier configured");
        Ok(verifier)
    }
}

fn seconds<F>(var: &F, name: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidSetting {
                    setting: name,
                    value,
                })
        })
        .transpose()
}
