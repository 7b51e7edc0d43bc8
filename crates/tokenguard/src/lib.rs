//! # tokenguard - Bearer-Token Verification
//!
//! Decides, on every inbound request, whether a presented bearer credential
//! is authentic, unexpired, correctly scoped and safe to trust. Three trust
//! models sit behind one [`TokenVerifier`] contract:
//!
//! - [`JwtVerifier`] - self-contained signed tokens verified locally against
//!   a JWKS endpoint or a static key
//! - [`IntrospectionVerifier`] - opaque tokens verified by the issuing
//!   authority (RFC 7662)
//! - [`StaticTokenVerifier`] - a fixed token table for development and tests
//!
//! ## Design Principles
//!
//! - **Fail fast**: every configuration is validated by its builder at
//!   startup; weak HMAC secrets, algorithm confusion and plaintext transport
//!   never reach a request
//! - **Never throw**: verification always yields a [`ValidationResult`], and
//!   system failures (500) are kept apart from credential failures (401)
//! - **No oracle**: rejections carry generic descriptions; the specific
//!   reason is logged against a [`hash_token`] fingerprint, never the token
//!
//! ## Architecture
//!
//! - [`claims`] - [`TokenClaims`], the verified identity and scope record
//! - [`result`] - [`ValidationResult`] and the [`ErrorKind`] taxonomy
//! - [`bearer`] - header parsing, scope checks and token fingerprints
//! - [`config`] - validating builders and environment-variable settings
//! - [`environment`] - production and orchestrator detection
//! - [`transport`] - URL transport-security rules
//! - [`jwt`] - JWKS caching and signed-token verification
//! - [`introspection`] - RFC 7662 verification
//! - [`static_tokens`] - development token table
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use tokenguard::{RuntimeEnvironment, StaticTokenConfig, StaticTokenVerifier, TokenVerifier};
//!
//! # tokio_test::block_on(async {
//! let verifier = StaticTokenVerifier::new(
//!     StaticTokenConfig::builder()
//!         .token("dev-token", json!({"sub": "alice", "scope": "read"}))
//!         .required_scopes(["read"])
//!         .environment(RuntimeEnvironment::development())
//!         .build()?,
//! );
//!
//! let result = verifier.authenticate(Some("Bearer dev-token")).await;
//! assert_eq!(result.claims().map(|c| c.identity()), Some("alice"));
//!
//! let rejected = verifier.authenticate(Some("Bearer guess")).await;
//! assert_eq!(rejected.error_code(), Some(401));
//! assert_eq!(
//!     rejected.www_authenticate().as_deref(),
//!     Some(r#"Bearer error="invalid_token", error_description="The access token is invalid or expired""#),
//! );
//! # Ok::<(), tokenguard::ConfigError>(())
//! # });
//! ```
//!
//! ## Standards
//!
//! - **RFC 6750** - Bearer token usage and `WWW-Authenticate` challenges
//! - **RFC 7517** - JSON Web Key Sets
//! - **RFC 7519** - JSON Web Token
//! - **RFC 7662** - Token introspection

pub mod bearer;
pub mod claims;
pub mod config;
pub mod environment;
pub mod error;
pub mod introspection;
pub mod jwt;
pub mod result;
pub mod static_tokens;
pub mod transport;
pub mod verifier;

pub use bearer::{extract_bearer_token, hash_token, verify_scopes};
pub use claims::{Audience, MalformedClaim, TokenClaims};
pub use config::{
    AuthSettings, ClientAuthMethod, IntrospectionConfig, IntrospectionConfigBuilder, KeySource,
    SignedTokenConfig, SignedTokenConfigBuilder, StaticTokenConfig, StaticTokenConfigBuilder,
};
pub use environment::RuntimeEnvironment;
pub use error::{ConfigError, JwksError};
pub use introspection::IntrospectionVerifier;
pub use jwt::{JwksClient, JwtVerifier};
pub use result::{ErrorKind, Rejection, ValidationResult};
pub use static_tokens::StaticTokenVerifier;
pub use verifier::TokenVerifier;
