//! Signing algorithm policy and HMAC secret strength
//!
//! Algorithm confusion is stopped at configuration time: a JWKS endpoint
//! publishes public keys, so pairing it with an HMAC algorithm would let a
//! client sign tokens with the public key as the shared secret. Only
//! asymmetric algorithms may be used with JWKS.
//!
//! HMAC secrets must meet a per-algorithm minimum length and must not have
//! an obviously low-entropy shape. The shape heuristics are policy, not an
//! entropy measurement:
//!
//! - fewer distinct bytes than a quarter of the secret's length
//! - the secret is a pattern of at most [`MAX_REPEAT_PATTERN_LEN`] bytes
//!   repeated at least [`MIN_PATTERN_REPEATS`] times

use crate::error::ConfigError;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::collections::HashSet;

/// Longest repeated unit the pattern check looks for
pub const MAX_REPEAT_PATTERN_LEN: usize = 16;

/// Repetitions of a unit that make a secret a pattern
pub const MIN_PATTERN_REPEATS: usize = 3;

/// Key material family an algorithm verifies with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Shared secret (HS*)
    Hmac,
    /// RSA public key (RS*, PS*)
    Rsa,
    /// Elliptic-curve public key (ES*)
    Ec,
    /// Edwards-curve public key (EdDSA)
    Ed,
}

/// Parse an algorithm name such as `RS256` (case-insensitive)
///
/// # Errors
///
/// [`ConfigError::UnsupportedAlgorithm`] for unknown names and for `none`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        "RS256" => Algorithm::RS256,
        "RS384" => Algorithm::RS384,
        "RS512" => Algorithm::RS512,
        "PS256" => Algorithm::PS256,
        "PS384" => Algorithm::PS384,
        "PS512" => Algorithm::PS512,
        "ES256" => Algorithm::ES256,
        "ES384" => Algorithm::ES384,
        "EDDSA" => Algorithm::EdDSA,
        _ => return Err(ConfigError::UnsupportedAlgorithm(name.trim().to_string())),
    };
    Ok(algorithm)
}

/// Key family for `algorithm`
pub fn key_family(algorithm: Algorithm) -> KeyFamily {
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => KeyFamily::Hmac,
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => KeyFamily::Rsa,
        Algorithm::ES256 | Algorithm::ES384 => KeyFamily::Ec,
        Algorithm::EdDSA => KeyFamily::Ed,
    }
}

/// Whether `algorithm` uses a shared secret
pub fn is_symmetric(algorithm: Algorithm) -> bool {
    key_family(algorithm) == KeyFamily::Hmac
}

/// Minimum HMAC secret length in bytes, or `None` for asymmetric algorithms
pub fn min_hmac_key_len(algorithm: Algorithm) -> Option<usize> {
    match algorithm {
        Algorithm::HS256 => Some(32),
        Algorithm::HS384 => Some(48),
        Algorithm::HS512 => Some(64),
        _ => None,
    }
}

/// Reject HMAC secrets that are too short or have a low-entropy shape
///
/// # Errors
///
/// [`ConfigError::WeakKeyLength`] or [`ConfigError::WeakKeyPattern`].
pub fn check_hmac_secret(algorithm: Algorithm, secret: &[u8]) -> Result<(), ConfigError> {
    let Some(required) = min_hmac_key_len(algorithm) else {
        return Ok(());
    };

    if secret.len() < required {
        return Err(ConfigError::WeakKeyLength {
            algorithm: format!("{algorithm:?}"),
            required,
            actual: secret.len(),
        });
    }

    let distinct = secret.iter().collect::<HashSet<_>>().len();
    if distinct * 4 < secret.len() {
        return Err(ConfigError::WeakKeyPattern(format!(
            "only {distinct} distinct characters in {} bytes",
            secret.len()
        )));
    }

    if let Some(unit) = repeated_unit_len(secret) {
        return Err(ConfigError::WeakKeyPattern(format!(
            "secret is a {unit}-byte pattern repeated"
        )));
    }

    Ok(())
}

/// Length of the shortest unit that, repeated, produces `secret`
fn repeated_unit_len(secret: &[u8]) -> Option<usize> {
    let max_unit = MAX_REPEAT_PATTERN_LEN.min(secret.len() / MIN_PATTERN_REPEATS);
    (1..=max_unit).find(|&unit| {
        secret
            .iter()
            .enumerate()
            .skip(unit)
            .all(|(i, byte)| *byte == secret[i % unit])
    })
}

/// Build the decoding key for static key material
///
/// HMAC algorithms take the raw secret (after the strength check); RSA, EC
/// and EdDSA algorithms take a PEM-encoded public key.
///
/// # Errors
///
/// Weak HMAC secrets, or [`ConfigError::InvalidKeyMaterial`] for PEM that
/// does not parse as a key of the algorithm's family.
pub fn decoding_key_for(algorithm: Algorithm, material: &[u8]) -> Result<DecodingKey, ConfigError> {
    let invalid = |e: jsonwebtoken::errors::Error| ConfigError::InvalidKeyMaterial {
        algorithm: format!("{algorithm:?}"),
        reason: e.to_string(),
    };

    match key_family(algorithm) {
        KeyFamily::Hmac => {
            check_hmac_secret(algorithm, material)?;
            Ok(DecodingKey::from_secret(material))
        }
        KeyFamily::Rsa => DecodingKey::from_rsa_pem(material).map_err(invalid),
        KeyFamily::Ec => DecodingKey::from_ec_pem(material).map_err(invalid),
        KeyFamily::Ed => DecodingKey::from_ed_pem(material).map_err(invalid),
    }
}
