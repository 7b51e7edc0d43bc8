//! Transport security for outbound endpoints
//!
//! JWKS and introspection endpoints must be `https`. Plain `http` is
//! tolerated only for loopback hosts, and only when the
//! [`RuntimeEnvironment`] allows it. Hostnames are not resolved: a host is
//! loopback when it is a loopback IP literal, `localhost`, or a
//! `*.localhost` name (RFC 6761).

use crate::environment::RuntimeEnvironment;
use crate::error::ConfigError;
use std::net::IpAddr;
use tracing::warn;
use url::{Host, Url};

/// Parse `raw` and enforce the transport policy
///
/// # Errors
///
/// - [`ConfigError::InvalidUrl`] if the URL does not parse, has no host, or
///   uses a scheme other than `http`/`https`
/// - [`ConfigError::InsecureTransport`] if `http` is used where it is not
///   allowed
pub fn require_secure_url(
    setting: &'static str,
    raw: &str,
    environment: &RuntimeEnvironment,
) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        setting,
        reason: e.to_string(),
    })?;

    let Some(host) = url.host() else {
        return Err(ConfigError::InvalidUrl {
            setting,
            reason: "URL has no host".to_string(),
        });
    };

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(&host) && environment.allows_plaintext_loopback() => {
            warn!(
                setting = setting,
                url = %redacted_url(&url),
                "Using plaintext http for a loopback endpoint (development only)"
            );
            Ok(url)
        }
        "http" => Err(ConfigError::InsecureTransport {
            setting,
            url: redacted_url(&url),
        }),
        other => Err(ConfigError::InvalidUrl {
            setting,
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

/// `url` without its password, for logs and error messages
pub fn redacted_url(url: &Url) -> String {
    let mut shown = url.clone();
    // Only fails for URLs that cannot carry credentials at all
    let _ = shown.set_password(None);
    shown.to_string()
}

/// Whether `host` names the local machine without a DNS lookup
pub fn is_loopback_host(host: &Host<&str>) -> bool {
    match host {
        Host::Ipv4(ip) => IpAddr::V4(*ip).is_loopback(),
        Host::Ipv6(ip) => {
            ip.is_loopback() || ip.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_ascii_lowercase();
            name == "localhost" || name.ends_with(".localhost")
        }
    }
}
