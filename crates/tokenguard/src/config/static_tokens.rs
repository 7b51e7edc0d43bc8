//! Static token table configuration (development and tests only)

use super::jwt::clean_scopes;
use crate::claims::TokenClaims;
use crate::environment::RuntimeEnvironment;
use crate::error::ConfigError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Validated configuration for
/// [`StaticTokenVerifier`](crate::static_tokens::StaticTokenVerifier)
///
/// Cannot be built when the environment is flagged production, and every
/// entry must name a subject or a client id.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tokenguard::{RuntimeEnvironment, StaticTokenConfig};
///
/// let config = StaticTokenConfig::builder()
///     .token("dev-token", json!({"sub": "alice", "scope": "read write"}))
///     .environment(RuntimeEnvironment::development())
///     .build()?;
/// assert_eq!(config.len(), 1);
///
/// let refused = StaticTokenConfig::builder()
///     .token("dev-token", json!({"sub": "alice"}))
///     .environment(RuntimeEnvironment::production())
///     .build();
/// assert!(refused.is_err());
/// # Ok::<(), tokenguard::ConfigError>(())
/// ```
#[derive(Clone)]
pub struct StaticTokenConfig {
    tokens: HashMap<String, TokenClaims>,
    required_scopes: Vec<String>,
}

impl fmt::Debug for StaticTokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenConfig")
            .field("tokens", &format_args!("[{} REDACTED]", self.tokens.len()))
            .field("required_scopes", &self.required_scopes)
            .finish()
    }
}

impl StaticTokenConfig {
    /// Start building a configuration
    pub fn builder() -> StaticTokenConfigBuilder {
        StaticTokenConfigBuilder::default()
    }

    /// Token table
    pub fn tokens(&self) -> &HashMap<String, TokenClaims> {
        &self.tokens
    }

    /// Number of configured tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are configured
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Scopes every token must carry
    pub fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }
}

/// Builder for [`StaticTokenConfig`]
#[derive(Default)]
pub struct StaticTokenConfigBuilder {
    entries: Vec<(String, Value)>,
    required_scopes: Vec<String>,
    environment: Option<RuntimeEnvironment>,
}

impl fmt::Debug for StaticTokenConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenConfigBuilder")
            .field("entries", &self.entries.len())
            .field("required_scopes", &self.required_scopes)
            .field("environment", &self.environment)
            .finish()
    }
}

impl StaticTokenConfigBuilder {
    /// Map a literal token to a claim object
    pub fn token(mut self, token: impl Into<String>, claims: Value) -> Self {
        self.entries.push((token.into(), claims));
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
    /// - [`ConfigError::StaticTokensInProduction`] in production
    /// - [`ConfigError::StaticTokenWithoutIdentity`] for an entry with
    ///   neither `sub` nor `client_id`
    /// - [`ConfigError::InvalidStaticToken`] for empty or duplicate tokens
    ///   and claim values that are not well-formed claim objects
    pub fn build(self) -> Result<StaticTokenConfig, ConfigError> {
        let environment = self.environment.unwrap_or_else(RuntimeEnvironment::detect);
        if environment.is_production() {
            return Err(ConfigError::StaticTokensInProduction);
        }

        let mut tokens = HashMap::with_capacity(self.entries.len());
        for (index, (token, value)) in self.entries.into_iter().enumerate() {
            let invalid = |reason: String| ConfigError::InvalidStaticToken { index, reason };

            if token.trim().is_empty() {
                return Err(invalid("token is empty".to_string()));
            }
            let Value::Object(map) = value else {
                return Err(invalid("claims must be a JSON object".to_string()));
            };
            let claims = TokenClaims::from_claim_map(map).map_err(|e| invalid(e.to_string()))?;

            let has_identity = [&claims.subject, &claims.client_id]
                .into_iter()
                .any(|field| field.as_deref().is_some_and(|v| !v.is_empty()));
            if !has_identity {
                return Err(ConfigError::StaticTokenWithoutIdentity(index));
            }

            if tokens.insert(token, claims).is_some() {
                return Err(invalid("token is listed more than once".to_string()));
            }
        }

        Ok(StaticTokenConfig {
            tokens,
            required_scopes: clean_scopes(self.required_scopes),
        })
    }
}
