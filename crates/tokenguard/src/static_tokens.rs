//! Static token verification (development and tests only)
//!
//! Tokens are indexed by their BLAKE3 digest rather than their text, so a
//! lookup hashes the presented token once and compares fixed-size digests.
//! How long a lookup takes does not depend on how much of a configured
//! token the presented one shares.

use crate::claims::TokenClaims;
use crate::config::StaticTokenConfig;
use crate::result::ValidationResult;
use crate::verifier::{Failure, TokenVerifier, admit};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

type TokenDigest = [u8; 32];

#[inline]
fn digest(token: &str) -> TokenDigest {
    blake3::hash(token.as_bytes()).into()
}

/// Verifier over a fixed token table
///
/// Only constructible from a [`StaticTokenConfig`], which refuses to build in
/// production.
#[derive(Clone)]
pub struct StaticTokenVerifier {
    tokens: HashMap<TokenDigest, TokenClaims>,
    required_scopes: Vec<String>,
}

impl fmt::Debug for StaticTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenVerifier")
            .field("tokens", &self.tokens.len())
            .field("required_scopes", &self.required_scopes)
            .finish()
    }
}

impl StaticTokenVerifier {
    /// Create a verifier from a validated token table
    pub fn new(config: StaticTokenConfig) -> Self {
        let tokens = config
            .tokens()
            .iter()
            .map(|(token, claims)| (digest(token), claims.clone()))
            .collect();
        Self {
            tokens,
            required_scopes: config.required_scopes().to_vec(),
        }
    }

    /// Number of configured tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    fn name(&self) -> &'static str {
        "static"
    }

    fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }

    async fn verify(&self, token: &str) -> ValidationResult {
        match self.tokens.get(&digest(token)) {
            Some(claims) => admit(self.name(), token, claims.clone(), &self.required_scopes),
            None => Failure::credential("token not in static table").into_result(self.name(), token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::RuntimeEnvironment;
    use serde_json::json;

    fn verifier(required: &[&str]) -> StaticTokenVerifier {
        StaticTokenVerifier::new(
            StaticTokenConfig::builder()
                .token("alice-token", json!({"sub": "alice", "scope": "read write"}))
                .token("job-token", json!({"client_id": "nightly-job", "scopes": ["read"]}))
                .required_scopes(required.iter().copied())
                .environment(RuntimeEnvironment::development())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_digest_consistency() {
        assert_eq!(digest("token"), digest("token"));
        assert_ne!(digest("token"), digest("token "));
        assert_ne!(digest("a"), digest("b"));
    }

    #[tokio::test]
    async fn test_known_tokens() {
        let v = verifier(&[]);
        assert_eq!(v.len(), 2);

        let alice = v.verify("alice-token").await;
        assert_eq!(alice.claims().unwrap().identity(), "alice");

        let job = v.verify("job-token").await;
        assert_eq!(job.claims().unwrap().identity(), "nightly-job");
    }

    #[tokio::test]
    async fn test_unknown_and_near_miss_tokens() {
        let v = verifier(&[]);
        for token in ["", "alice", "alice-token ", "ALICE-TOKEN", "alice-tokenx"] {
            let result = v.verify(token).await;
            assert_eq!(result.error_code(), Some(401), "token {token:?}");
        }
    }

    #[tokio::test]
    async fn test_required_scopes() {
        let v = verifier(&["write"]);
        assert!(v.verify("alice-token").await.success());
        assert_eq!(v.verify("job-token").await.error_code(), Some(403));
    }

    #[test]
    fn test_debug_hides_tokens() {
        assert!(!format!("{:?}", verifier(&[])).contains("alice-token"));
    }
}
