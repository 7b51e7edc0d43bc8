//! Helpers shared by every verifier
//!
//! - [`extract_bearer_token`] parses an `Authorization` header value
//! - [`verify_scopes`] checks required scopes with AND semantics
//! - [`hash_token`] produces the log-safe token fingerprint

use crate::claims::TokenClaims;
use sha2::{Digest, Sha256};

/// Length of the hex fingerprint produced by [`hash_token`]
pub const TOKEN_HASH_LEN: usize = 16;

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// The value is split on whitespace and must consist of exactly two parts,
/// the first equal to `Bearer` ignoring case. Anything else (absent header,
/// another scheme, missing or extra segments) yields `None`.
///
/// # Example
///
/// ```rust
/// use tokenguard::extract_bearer_token;
///
/// assert_eq!(extract_bearer_token(Some("Bearer abc.def")), Some("abc.def"));
/// assert_eq!(extract_bearer_token(Some("bearer abc")), Some("abc"));
/// assert_eq!(extract_bearer_token(Some("Basic abc")), None);
/// assert_eq!(extract_bearer_token(Some("Bearer a b")), None);
/// assert_eq!(extract_bearer_token(None), None);
/// ```
pub fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// Whether `claims` grants every scope in `required`
///
/// An empty requirement is always satisfied.
pub fn verify_scopes<S: AsRef<str>>(claims: &TokenClaims, required: &[S]) -> bool {
    required.iter().all(|scope| claims.has_scope(scope.as_ref()))
}

/// One-way fingerprint of a token for diagnostic output
///
/// The first [`TOKEN_HASH_LEN`] hex characters of the token's SHA-256
/// digest. Stable across calls, so log lines about the same token can be
/// correlated without the token itself ever being written.
pub fn hash_token(token: &str) -> String {
    let mut hex = format!("{:x}", Sha256::digest(token.as_bytes()));
    hex.truncate(TOKEN_HASH_LEN);
    hex
}

/// Parse a comma-separated scope list, dropping blanks
pub fn parse_scope_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
