//! Verifier configuration
//!
//! One immutable configuration type per strategy. Each is produced only by
//! its builder's `build()`, which validates every rule up front, so an
//! unsafe configuration never exists as a value and a misconfigured process
//! fails at startup instead of on its first request.
//!
//! - [`SignedTokenConfig`] - JWKS or static-key JWT verification
//! - [`IntrospectionConfig`] - RFC 7662 introspection
//! - [`StaticTokenConfig`] - fixed token table (never in production)
//! - [`AuthSettings`] - strategy selection from environment variables

pub mod algorithm;
mod env;
mod introspection;
mod jwt;
mod static_tokens;

pub use env::AuthSettings;
pub use introspection::{
    ClientAuthMethod, DEFAULT_INTROSPECTION_TIMEOUT, IntrospectionConfig,
    IntrospectionConfigBuilder, MAX_INTROSPECTION_TIMEOUT, MIN_INTROSPECTION_TIMEOUT,
};
pub use jwt::{
    DEFAULT_ALGORITHM, DEFAULT_CLOCK_SKEW, DEFAULT_JWKS_CACHE_TTL, KeySource, MAX_CLOCK_SKEW,
    MAX_JWKS_CACHE_TTL, MIN_JWKS_CACHE_TTL, SignedTokenConfig, SignedTokenConfigBuilder,
};
pub use static_tokens::{StaticTokenConfig, StaticTokenConfigBuilder};
