//! OAuth 2.0 Token Introspection (RFC 7662)
//!
//! Opaque tokens are verified by asking the issuing authority. The response's
//! `active` member is the sole judge of validity: `active: false` is a 401 no
//! matter what else the response says. A call that times out, fails in
//! transport, returns a non-2xx status or an unreadable body says nothing
//! about the token and is reported as a 500.

use crate::claims::TokenClaims;
use crate::config::{ClientAuthMethod, IntrospectionConfig};
use crate::error::ConfigError;
use crate::result::ValidationResult;
use crate::transport::redacted_url;
use crate::verifier::{Failure, TokenVerifier, admit};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// `token_type_hint` sent with every request
pub const ACCESS_TOKEN_HINT: &str = "access_token";

/// Form body of an introspection request (RFC 7662 Section 2.1)
#[derive(Clone, Serialize)]
struct IntrospectionRequest<'a> {
    token: &'a str,
    token_type_hint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
}

// Manual Debug impl to prevent token and secret exposure in logs
impl fmt::Debug for IntrospectionRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrospectionRequest")
            .field("token", &"[REDACTED]")
            .field("token_type_hint", &self.token_type_hint)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Verifier for opaque tokens via an introspection endpoint
///
/// # Example
///
/// ```rust,no_run
/// use tokenguard::{IntrospectionConfig, IntrospectionVerifier, TokenVerifier};
///
/// # tokio_test::block_on(async {
/// let config = IntrospectionConfig::builder()
///     .endpoint("https://auth.example.com/oauth/introspect")
///     .client_credentials("resource-server", "s3cr3t")
///     .required_scopes(["orders:read"])
///     .build()?;
/// let verifier = IntrospectionVerifier::new(config)?;
///
/// let result = verifier.verify("opaque-token").await;
/// match result.error_code() {
///     None => println!("active token for {}", result.claims().unwrap().identity()),
///     Some(500) => println!("authority unavailable, try again later"),
///     Some(code) => println!("rejected with {code}"),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Clone)]
pub struct IntrospectionVerifier {
    config: IntrospectionConfig,
    http_client: reqwest::Client,
}

impl fmt::Debug for IntrospectionVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrospectionVerifier")
            .field("config", &self.config)
            .field("http_client", &"<reqwest::Client>")
            .finish()
    }
}

impl IntrospectionVerifier {
    /// Create a verifier with its own HTTP connection pool
    ///
    /// # Errors
    ///
    /// [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: IntrospectionConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::none()) // a 307 would replay client credentials
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a verifier on an existing HTTP client
    ///
    /// The configured timeout is applied per request, so it holds whatever
    /// timeouts `http_client` carries. `http_client` should not follow
    /// redirects.
    pub fn with_http_client(config: IntrospectionConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Verifier configuration
    pub fn config(&self) -> &IntrospectionConfig {
        &self.config
    }

    async fn introspect(&self, token: &str) -> Result<TokenClaims, Failure> {
        let config = &self.config;
        let secret = config.client_secret().expose_secret().as_str();

        let mut form = IntrospectionRequest {
            token,
            token_type_hint: ACCESS_TOKEN_HINT,
            client_id: None,
            client_secret: None,
        };
        let mut request = self
            .http_client
            .post(config.endpoint().clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(config.timeout());

        match config.auth_method() {
            ClientAuthMethod::Basic => {
                request = request.basic_auth(config.client_id(), Some(secret));
            }
            ClientAuthMethod::Post => {
                form.client_id = Some(config.client_id());
                form.client_secret = Some(secret);
            }
        }

        let response = request.form(&form).send().await.map_err(|e| {
            if e.is_timeout() {
                Failure::system(format!("introspection timed out after {:?}", config.timeout()))
            } else {
                Failure::system(format!("introspection request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::system(format!(
                "introspection endpoint returned {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Failure::system(format!("unreadable introspection response: {e}")))?;

        let claims = active_claims(body)?;
        TokenClaims::from_claim_map(claims)
            .map_err(|e| Failure::system(format!("introspection response has {e}")))
    }
}

/// Interpret an introspection response body
///
/// Returns the remaining members of an active response.
fn active_claims(body: Value) -> Result<Map<String, Value>, Failure> {
    let Value::Object(mut members) = body else {
        return Err(Failure::system("introspection response is not a JSON object"));
    };

    match members.remove("active") {
        Some(Value::Bool(true)) => Ok(members),
        Some(Value::Bool(false)) => Err(Failure::credential("token is not active")),
        Some(other) => Err(Failure::system(format!(
            "introspection `active` is not a boolean: {other}"
        ))),
        None => Err(Failure::system("introspection response has no `active` member")),
    }
}

#[async_trait]
impl TokenVerifier for IntrospectionVerifier {
    fn name(&self) -> &'static str {
        "introspection"
    }

    fn required_scopes(&self) -> &[String] {
        self.config.required_scopes()
    }

    async fn verify(&self, token: &str) -> ValidationResult {
        debug!(
            verifier = self.name(),
            endpoint = %redacted_url(self.config.endpoint()),
            "Introspecting token"
        );
        match self.introspect(token).await {
            Ok(claims) => admit(self.name(), token, claims, self.required_scopes()),
            Err(failure) => failure.into_result(self.name(), token),
        }
    }
}
