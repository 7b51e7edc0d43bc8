//! Signed-token verification
//!
//! - `jwks` - JWKS fetching and caching
//! - `verifier` - [`JwtVerifier`], the [`TokenVerifier`](crate::TokenVerifier)
//!   for self-contained signed tokens

pub mod jwks;
pub mod verifier;

pub use jwks::JwksClient;
pub use verifier::JwtVerifier;
