//! Token introspection (RFC 7662) verifier configuration

use super::jwt::clean_scopes;
use crate::environment::RuntimeEnvironment;
use crate::error::ConfigError;
use crate::transport::{redacted_url, require_secure_url};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default per-call timeout
pub const DEFAULT_INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Shortest per-call timeout accepted
pub const MIN_INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest per-call timeout accepted
pub const MAX_INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// How the verifier authenticates itself to the introspection endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// HTTP Basic credentials (`client_secret_basic`)
    #[default]
    Basic,
    /// Credentials in the form body (`client_secret_post`)
    Post,
}

impl FromStr for ClientAuthMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" | "client_secret_basic" => Ok(Self::Basic),
            "post" | "client_secret_post" => Ok(Self::Post),
            other => Err(ConfigError::InvalidSetting {
                setting: "introspection auth method",
                value: other.to_string(),
            }),
        }
    }
}

/// Validated configuration for
/// [`IntrospectionVerifier`](crate::introspection::IntrospectionVerifier)
#[derive(Clone)]
pub struct IntrospectionConfig {
    endpoint: Url,
    client_id: String,
    client_secret: SecretString,
    auth_method: ClientAuthMethod,
    timeout: Duration,
    required_scopes: Vec<String>,
}

// Manual Debug impl to keep the client secret out of logs
impl fmt::Debug for IntrospectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrospectionConfig")
            .field("endpoint", &redacted_url(&self.endpoint))
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .field("timeout", &self.timeout)
            .field("required_scopes", &self.required_scopes)
            .finish()
    }
}

impl IntrospectionConfig {
    /// Start building a configuration
    pub fn builder() -> IntrospectionConfigBuilder {
        IntrospectionConfigBuilder::default()
    }

    /// Introspection endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Client id presented to the endpoint
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Client secret presented to the endpoint
    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    /// Client authentication method
    pub fn auth_method(&self) -> ClientAuthMethod {
        self.auth_method
    }

    /// Upper bound on one introspection call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Scopes every token must carry
    pub fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }
}

/// Builder for [`IntrospectionConfig`]
#[derive(Debug, Default)]
pub struct IntrospectionConfigBuilder {
    endpoint: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    auth_method: ClientAuthMethod,
    timeout: Option<Duration>,
    required_scopes: Vec<String>,
    environment: Option<RuntimeEnvironment>,
}

impl IntrospectionConfigBuilder {
    /// Introspection endpoint URL
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Client id and secret used to authenticate to the endpoint
    pub fn client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Client authentication method (default HTTP Basic)
    pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Per-call timeout (default 10s, range 1s..=60s)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
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
    /// [`ConfigError::MissingSetting`] for an absent endpoint or credential,
    /// transport errors for the endpoint URL, and
    /// [`ConfigError::DurationOutOfRange`] for the timeout.
    pub fn build(self) -> Result<IntrospectionConfig, ConfigError> {
        let environment = self.environment.unwrap_or_else(RuntimeEnvironment::detect);

        let endpoint = self
            .endpoint
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("introspection endpoint"))?;
        let endpoint = require_secure_url("introspection endpoint", &endpoint, &environment)?;

        let client_id = self
            .client_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingSetting("introspection client id"))?;
        let client_secret = self
            .client_secret
            .filter(|secret| !secret.expose_secret().is_empty())
            .ok_or(ConfigError::MissingSetting("introspection client secret"))?;

        let timeout = self.timeout.unwrap_or(DEFAULT_INTROSPECTION_TIMEOUT);
        if !(MIN_INTROSPECTION_TIMEOUT..=MAX_INTROSPECTION_TIMEOUT).contains(&timeout) {
            return Err(ConfigError::DurationOutOfRange {
                setting: "introspection timeout",
                actual: timeout,
                min: MIN_INTROSPECTION_TIMEOUT,
                max: MAX_INTROSPECTION_TIMEOUT,
            });
        }

        Ok(IntrospectionConfig {
            endpoint,
            client_id,
            client_secret,
            auth_method: self.auth_method,
            timeout,
            required_scopes: clean_scopes(self.required_scopes),
        })
    }
}
