//! Error types
//!
//! Two families of errors exist in this crate:
//!
//! - [`ConfigError`] is raised while building a verifier configuration and is
//!   always fatal: a process must not start with an invalid verifier.
//! - [`JwksError`] describes a failure to obtain signing keys. It never
//!   escapes a verifier; it is logged and reported as a 500-class
//!   [`ValidationResult`](crate::ValidationResult).
//!
//! Credential problems are not errors at all. They are ordinary
//! `ValidationResult` values.

use std::time::Duration;
use thiserror::Error;

/// Configuration rejected at construction time
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither a JWKS endpoint nor static key material was configured
    #[error("signed-token configuration requires a JWKS endpoint or a static key")]
    MissingKeySource,

    /// Both a JWKS endpoint and static key material were configured
    #[error("signed-token configuration accepts a JWKS endpoint or a static key, not both")]
    ConflictingKeySources,

    /// Algorithm name is unknown or not allowed
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A symmetric algorithm was paired with a JWKS endpoint
    #[error("algorithm {0} is symmetric and cannot be used with a JWKS endpoint")]
    SymmetricAlgorithmWithJwks(String),

    /// HMAC secret shorter than the algorithm requires
    #[error("{algorithm} secret must be at least {required} bytes (got {actual})")]
    WeakKeyLength {
        /// Algorithm name
        algorithm: String,
        /// Minimum length in bytes
        required: usize,
        /// Length supplied
        actual: usize,
    },

    /// HMAC secret has a low-entropy shape
    #[error("HMAC secret rejected: {0}")]
    WeakKeyPattern(String),

    /// Static asymmetric key could not be parsed
    #[error("invalid key material for {algorithm}: {reason}")]
    InvalidKeyMaterial {
        /// Algorithm name
        algorithm: String,
        /// Parser message
        reason: String,
    },

    /// URL did not parse
    #[error("invalid {setting} URL: {reason}")]
    InvalidUrl {
        /// Setting the URL was supplied for
        setting: &'static str,
        /// Parser message
        reason: String,
    },

    /// URL uses plaintext transport where it is not allowed
    #[error("{setting} must use https (plain http is only allowed for loopback hosts outside production): {url}")]
    InsecureTransport {
        /// Setting the URL was supplied for
        setting: &'static str,
        /// Offending URL, without any password
        url: String,
    },

    /// A shared JWKS client was paired with a configuration it cannot serve
    #[error("JWKS client does not match the signed-token configuration: {0}")]
    JwksClientMismatch(String),

    /// Clock skew tolerance outside the permitted window
    #[error("clock skew tolerance {actual:?} exceeds the maximum of {max:?}")]
    ClockSkewOutOfRange {
        /// Value supplied
        actual: Duration,
        /// Upper bound
        max: Duration,
    },

    /// A duration setting is outside its permitted range
    #[error("{setting} must be between {min:?} and {max:?} (got {actual:?})")]
    DurationOutOfRange {
        /// Setting name
        setting: &'static str,
        /// Value supplied
        actual: Duration,
        /// Lower bound
        min: Duration,
        /// Upper bound
        max: Duration,
    },

    /// A required setting is absent or empty
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A setting value could not be parsed
    #[error("invalid value for {setting}: {value}")]
    InvalidSetting {
        /// Setting name
        setting: &'static str,
        /// Value supplied
        value: String,
    },

    /// Static tokens are for local development only
    #[error("static token verification is not allowed in production")]
    StaticTokensInProduction,

    /// Static token entry carries no identity
    #[error("static token entry #{0} has neither a subject nor a client_id")]
    StaticTokenWithoutIdentity(usize),

    /// Static token entry is malformed
    #[error("static token entry #{index} is invalid: {reason}")]
    InvalidStaticToken {
        /// Position of the entry in insertion order
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Outbound HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure to obtain a JWKS document
///
/// `Clone` so a single in-flight fetch can hand the same outcome to every
/// caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwksError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("JWKS fetch failed: {0}")]
    Fetch(String),

    /// Endpoint answered with a non-success status
    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    /// Body is not a JWK set
    #[error("invalid JWKS document: {0}")]
    Parse(String),
}
