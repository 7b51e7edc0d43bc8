//! Verified token claims
//!
//! [`TokenClaims`] is the identity and scope record produced by every
//! verifier. Signed tokens and introspection responses both arrive as a JSON
//! object; [`TokenClaims::from_claim_map`] folds such an object into the
//! modeled fields and passes everything it does not recognize through in
//! [`TokenClaims::extra_claims`].

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Identity reported when a token carries neither `sub` nor `client_id`
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// The `aud` claim: a single audience or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "api"`
    Single(String),
    /// `"aud": ["api", "admin"]`
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `audience` is one of the values carried
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::Single(value) => value == audience,
            Self::Multiple(values) => values.iter().any(|v| v == audience),
        }
    }

    /// All audience values, in token order
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// A claim was present but had the wrong shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed claim `{claim}`: {reason}")]
pub struct MalformedClaim {
    /// Claim name
    pub claim: &'static str,
    /// What was wrong with it
    pub reason: &'static str,
}

impl MalformedClaim {
    fn new(claim: &'static str, reason: &'static str) -> Self {
        Self { claim, reason }
    }
}

/// Facts extracted from a verified credential
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// `sub`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// `client_id`, falling back to `azp`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// `username`, falling back to `preferred_username`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// `iss`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// `aud`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Audience>,
    /// `iat`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    /// `exp`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// `nbf`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    /// Granted scopes in token order. Duplicates are kept; membership
    /// checks treat the list as a set.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Every claim not modeled above
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_claims: Map<String, Value>,
}

impl TokenClaims {
    /// Fold a JSON claim object into `TokenClaims`
    ///
    /// Recognized claims are `sub`, `iss`, `aud`, `iat`, `exp`, `nbf`,
    /// `scope`/`scopes`, `client_id`/`azp` and `username`/`preferred_username`.
    /// `scope` and `scopes` may each be a space-delimited string or an array
    /// of strings; when both are present their values are concatenated.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedClaim`] when a recognized claim has a type that
    /// cannot be interpreted (for example a numeric `sub`).
    pub fn from_claim_map(mut map: Map<String, Value>) -> Result<Self, MalformedClaim> {
        let subject = take_string(&mut map, "sub")?;
        let client_id = match take_string(&mut map, "client_id")? {
            Some(id) => Some(id),
            None => take_string(&mut map, "azp")?,
        };
        let username = match take_string(&mut map, "username")? {
            Some(name) => Some(name),
            None => take_string(&mut map, "preferred_username")?,
        };
        let issuer = take_string(&mut map, "iss")?;
        let audience = take_audience(&mut map)?;
        let issued_at = take_timestamp(&mut map, "iat")?;
        let expires_at = take_timestamp(&mut map, "exp")?;
        let not_before = take_timestamp(&mut map, "nbf")?;

        let mut scopes = take_scopes(&mut map, "scope")?;
        scopes.extend(take_scopes(&mut map, "scopes")?);

        Ok(Self {
            subject,
            client_id,
            username,
            issuer,
            audience,
            issued_at,
            expires_at,
            not_before,
            scopes,
            extra_claims: map,
        })
    }

    /// Subject if present, else client id, else [`UNKNOWN_IDENTITY`]
    pub fn identity(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.client_id.as_deref().filter(|c| !c.is_empty()))
            .unwrap_or(UNKNOWN_IDENTITY)
    }

    /// Whether the token carries `scope`
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Whether `aud` names `audience`
    pub fn audience_contains(&self, audience: &str) -> bool {
        self.audience
            .as_ref()
            .is_some_and(|aud| aud.contains(audience))
    }

    /// Expired relative to the current time, allowing `skew` of tolerance.
    /// A token without `exp` never expires.
    pub fn is_expired(&self, skew: Duration) -> bool {
        self.is_expired_at(Utc::now(), skew)
    }

    /// [`is_expired`](Self::is_expired) against an explicit clock
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        match expires_at.checked_add_signed(to_delta(skew)) {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Not valid yet relative to the current time, allowing `skew` of
    /// tolerance. A token without `nbf` is valid from issuance.
    pub fn is_not_yet_valid(&self, skew: Duration) -> bool {
        self.is_not_yet_valid_at(Utc::now(), skew)
    }

    /// [`is_not_yet_valid`](Self::is_not_yet_valid) against an explicit clock
    pub fn is_not_yet_valid_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let Some(not_before) = self.not_before else {
            return false;
        };
        match not_before.checked_sub_signed(to_delta(skew)) {
            Some(start) => now < start,
            None => false,
        }
    }
}

fn to_delta(skew: Duration) -> TimeDelta {
    TimeDelta::from_std(skew).unwrap_or(TimeDelta::MAX)
}

fn take_string(
    map: &mut Map<String, Value>,
    claim: &'static str,
) -> Result<Option<String>, MalformedClaim> {
    match map.remove(claim) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(MalformedClaim::new(claim, "expected a string")),
    }
}

fn take_audience(map: &mut Map<String, Value>) -> Result<Option<Audience>, MalformedClaim> {
    match map.remove("aud") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(Audience::Single(s))),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(MalformedClaim::new("aud", "expected an array of strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|values| Some(Audience::Multiple(values))),
        Some(_) => Err(MalformedClaim::new("aud", "expected a string or array")),
    }
}

fn take_timestamp(
    map: &mut Map<String, Value>,
    claim: &'static str,
) -> Result<Option<DateTime<Utc>>, MalformedClaim> {
    let seconds = match map.remove(claim) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(secs) => secs,
            // Fractional NumericDate values are truncated to whole seconds
            None => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.floor() as i64)
                .ok_or_else(|| MalformedClaim::new(claim, "timestamp out of range"))?,
        },
        Some(_) => return Err(MalformedClaim::new(claim, "expected a numeric timestamp")),
    };

    DateTime::from_timestamp(seconds, 0)
        .map(Some)
        .ok_or_else(|| MalformedClaim::new(claim, "timestamp out of range"))
}

fn take_scopes(
    map: &mut Map<String, Value>,
    claim: &'static str,
) -> Result<Vec<String>, MalformedClaim> {
    match map.remove(claim) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(MalformedClaim::new(claim, "expected an array of strings")),
            })
            .collect(),
        Some(_) => Err(MalformedClaim::new(claim, "expected a string or array")),
    }
}
