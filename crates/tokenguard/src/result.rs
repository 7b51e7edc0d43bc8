//! Verification outcome
//!
//! Every verifier returns a [`ValidationResult`]: either the verified
//! [`TokenClaims`] or a [`Rejection`] carrying a machine-readable category
//! and an HTTP-style status. The enum shape guarantees that a result holds
//! claims or an error, never both and never neither.
//!
//! Public descriptions are deliberately generic. The precise reason a token
//! was refused goes to the diagnostic log, keyed by the token's hash.

use crate::claims::TokenClaims;
use std::fmt;

/// Category of a failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credential missing, malformed, expired, forged or unknown (401)
    InvalidToken,
    /// Credential authentic but lacking a required scope (403)
    InsufficientScope,
    /// Verification infrastructure failed (500)
    ServerError,
}

impl ErrorKind {
    /// Machine-readable error code (RFC 6750 style)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::InsufficientScope => "insufficient_scope",
            Self::ServerError => "server_error",
        }
    }

    /// HTTP status the host should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidToken => 401,
            Self::InsufficientScope => 403,
            Self::ServerError => 500,
        }
    }

    /// The description exposed to callers
    pub fn public_description(&self) -> &'static str {
        match self {
            Self::InvalidToken => "The access token is invalid or expired",
            Self::InsufficientScope => "The access token does not grant the required scope",
            Self::ServerError => "Token verification is temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a credential was refused, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    kind: ErrorKind,
    description: String,
}

impl Rejection {
    /// Rejection with the generic description for `kind`
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            description: kind.public_description().to_string(),
        }
    }

    /// Category
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Machine-readable code, e.g. `invalid_token`
    pub fn error(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// HTTP-style status code
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.error(), self.status_code(), self.description)
    }
}

impl std::error::Error for Rejection {}

/// Outcome of verifying one bearer token
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// Token accepted
    Valid(TokenClaims),
    /// Token refused
    Rejected(Rejection),
}

impl ValidationResult {
    /// Successful result
    pub fn valid(claims: TokenClaims) -> Self {
        Self::Valid(claims)
    }

    /// 401 `invalid_token`
    pub fn invalid_token() -> Self {
        Self::Rejected(Rejection::new(ErrorKind::InvalidToken))
    }

    /// 403 `insufficient_scope`
    pub fn insufficient_scope() -> Self {
        Self::Rejected(Rejection::new(ErrorKind::InsufficientScope))
    }

    /// 500 `server_error`
    pub fn server_error() -> Self {
        Self::Rejected(Rejection::new(ErrorKind::ServerError))
    }

    /// Whether the token was accepted
    pub fn success(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Claims, present iff successful
    pub fn claims(&self) -> Option<&TokenClaims> {
        match self {
            Self::Valid(claims) => Some(claims),
            Self::Rejected(_) => None,
        }
    }

    /// Rejection details, present iff failed
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Valid(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Machine-readable error category, present iff failed
    pub fn error(&self) -> Option<&'static str> {
        self.rejection().map(Rejection::error)
    }

    /// Human-readable error description, present iff failed
    pub fn error_description(&self) -> Option<&str> {
        self.rejection().map(Rejection::description)
    }

    /// HTTP-style status, present iff failed
    pub fn error_code(&self) -> Option<u16> {
        self.rejection().map(Rejection::status_code)
    }

    /// RFC 6750 `WWW-Authenticate` challenge for a failed result
    pub fn www_authenticate(&self) -> Option<String> {
        let rejection = self.rejection()?;
        // 500s are not a property of the credential; RFC 6750 has no code for them
        if rejection.kind() == ErrorKind::ServerError {
            return Some("Bearer".to_string());
        }
        Some(format!(
            "Bearer error=\"{}\", error_description=\"{}\"",
            rejection.error(),
            rejection.description()
        ))
    }

    /// Convert into a standard `Result`
    pub fn into_result(self) -> Result<TokenClaims, Rejection> {
        match self {
            Self::Valid(claims) => Ok(claims),
            Self::Rejected(rejection) => Err(rejection),
        }
    }
}

impl From<Rejection> for ValidationResult {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}
