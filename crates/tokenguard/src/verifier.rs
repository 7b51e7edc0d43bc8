//! The verifier contract
//!
//! Callers depend on [`TokenVerifier`] only, never on a concrete strategy.
//! One verifier is constructed at startup and shared by handle
//! (`Arc<dyn TokenVerifier>`).

use crate::bearer::{self, hash_token};
use crate::claims::TokenClaims;
use crate::result::{ErrorKind, ValidationResult};
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, error, warn};

/// Bearer-token verification strategy
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tokenguard::{RuntimeEnvironment, StaticTokenConfig, StaticTokenVerifier, TokenVerifier};
///
/// # tokio_test::block_on(async {
/// let verifier = StaticTokenVerifier::new(
///     StaticTokenConfig::builder()
///         .token("dev-token", json!({"sub": "alice", "scope": "read"}))
///         .environment(RuntimeEnvironment::development())
///         .build()?,
/// );
///
/// let result = verifier.authenticate(Some("Bearer dev-token")).await;
/// assert!(result.success());
/// assert!(verifier.verify_scopes(result.claims().unwrap(), &["read".to_string()]));
///
/// let missing = verifier.authenticate(None).await;
/// assert_eq!(missing.error_code(), Some(401));
/// # Ok::<(), tokenguard::ConfigError>(())
/// # });
/// ```
#[async_trait]
pub trait TokenVerifier: Send + Sync + fmt::Debug {
    /// Strategy name for diagnostics
    fn name(&self) -> &'static str;

    /// Scopes this verifier requires of every token
    fn required_scopes(&self) -> &[String];

    /// Verify a raw bearer token
    ///
    /// Never fails: every outcome, including infrastructure failures, is a
    /// [`ValidationResult`].
    async fn verify(&self, token: &str) -> ValidationResult;

    /// Whether `claims` grants every scope in `required` (AND semantics)
    fn verify_scopes(&self, claims: &TokenClaims, required: &[String]) -> bool {
        bearer::verify_scopes(claims, required)
    }

    /// Extract the token from an `Authorization` header value
    fn extract_bearer_token<'h>(&self, header: Option<&'h str>) -> Option<&'h str> {
        bearer::extract_bearer_token(header)
    }

    /// Extract then verify; a missing or malformed header is a 401
    async fn authenticate(&self, header: Option<&str>) -> ValidationResult {
        match self.extract_bearer_token(header) {
            Some(token) => self.verify(token).await,
            None => {
                debug!(
                    verifier = self.name(),
                    header_present = header.is_some(),
                    "No bearer token in Authorization header"
                );
                ValidationResult::invalid_token()
            }
        }
    }
}

/// Internal reason a verification failed
///
/// The detail is written to the log alongside the token hash; callers only
/// ever see the generic description of the corresponding [`ErrorKind`].
#[derive(Debug)]
pub(crate) enum Failure {
    /// Credential problem (401)
    Credential(String),
    /// Infrastructure problem (500)
    System(String),
}

impl Failure {
    pub(crate) fn credential(reason: impl Into<String>) -> Self {
        Self::Credential(reason.into())
    }

    pub(crate) fn system(reason: impl Into<String>) -> Self {
        Self::System(reason.into())
    }

    /// Log the specific reason and collapse into the public result
    pub(crate) fn into_result(self, verifier: &'static str, token: &str) -> ValidationResult {
        let token_hash = hash_token(token);
        match self {
            Self::Credential(reason) => {
                warn!(
                    verifier = verifier,
                    token_hash = %token_hash,
                    reason = %reason,
                    error = ErrorKind::InvalidToken.as_str(),
                    "Token rejected"
                );
                ValidationResult::invalid_token()
            }
            Self::System(reason) => {
                error!(
                    verifier = verifier,
                    token_hash = %token_hash,
                    reason = %reason,
                    error = ErrorKind::ServerError.as_str(),
                    "Token verification failed"
                );
                ValidationResult::server_error()
            }
        }
    }
}

/// Apply the verifier's required scopes to authenticated claims
pub(crate) fn admit(
    verifier: &'static str,
    token: &str,
    claims: TokenClaims,
    required: &[String],
) -> ValidationResult {
    if !bearer::verify_scopes(&claims, required) {
        let missing: Vec<&str> = required
            .iter()
            .map(String::as_str)
            .filter(|scope| !claims.has_scope(scope))
            .collect();
        warn!(
            verifier = verifier,
            token_hash = %hash_token(token),
            identity = claims.identity(),
            missing_scopes = ?missing,
            error = ErrorKind::InsufficientScope.as_str(),
            "Token lacks required scopes"
        );
        return ValidationResult::insufficient_scope();
    }

    debug!(
        verifier = verifier,
        token_hash = %hash_token(token),
        identity = claims.identity(),
        "Token verified"
    );
    ValidationResult::valid(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(scopes: &[&str]) -> TokenClaims {
        TokenClaims {
            subject: Some("alice".into()),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_admit_without_requirements() {
        let result = admit("test", "tok", claims(&[]), &[]);
        assert!(result.success());
    }

    #[test]
    fn test_admit_scope_shortfall_is_403() {
        let required = vec!["read".to_string(), "write".to_string()];
        let result = admit("test", "tok", claims(&["read"]), &required);
        assert_eq!(result.error_code(), Some(403));
        assert_eq!(result.error(), Some("insufficient_scope"));
    }

    #[test]
    fn test_failures_map_to_generic_results() {
        let credential = Failure::credential("signature mismatch").into_result("test", "tok");
        assert_eq!(credential.error_code(), Some(401));
        assert_eq!(credential.error(), Some("invalid_token"));
        assert!(!credential.error_description().unwrap().contains("signature"));

        let system = Failure::system("connection refused").into_result("test", "tok");
        assert_eq!(system.error_code(), Some(500));
        assert!(!system.error_description().unwrap().contains("refused"));
    }
}
