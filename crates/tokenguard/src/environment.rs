//! Runtime environment detection
//!
//! Two independent facts gate configuration:
//!
//! - **production**: `APP_ENV` or `ENVIRONMENT` is `production`/`prod`.
//!   Static tokens are refused.
//! - **orchestrated**: the process runs under a container orchestrator
//!   (Kubernetes, ECS, Cloud Run, Nomad). Together with production, this
//!   disables the plaintext-loopback exception for outbound URLs.

/// Variables whose value marks a production deployment
const PRODUCTION_FLAGS: &[&str] = &["APP_ENV", "ENVIRONMENT"];

/// Variables whose presence marks an orchestrated deployment
const ORCHESTRATOR_MARKERS: &[&str] = &[
    "KUBERNETES_SERVICE_HOST",
    "ECS_CONTAINER_METADATA_URI",
    "ECS_CONTAINER_METADATA_URI_V4",
    "K_SERVICE",
    "NOMAD_ALLOC_ID",
];

/// Deployment facts relevant to verifier configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    production: bool,
    orchestrated: bool,
}

impl RuntimeEnvironment {
    /// Local development: neither production nor orchestrated
    pub const fn development() -> Self {
        Self {
            production: false,
            orchestrated: false,
        }
    }

    /// Flagged production
    pub const fn production() -> Self {
        Self {
            production: true,
            orchestrated: false,
        }
    }

    /// Running under an orchestrator without the production flag
    pub const fn orchestrated() -> Self {
        Self {
            production: false,
            orchestrated: true,
        }
    }

    /// Read the process environment
    pub fn detect() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Detect using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = PRODUCTION_FLAGS.iter().any(|name| {
            lookup(name).is_some_and(|value| {
                let value = value.trim();
                value.eq_ignore_ascii_case("production") || value.eq_ignore_ascii_case("prod")
            })
        });
        let orchestrated = ORCHESTRATOR_MARKERS
            .iter()
            .any(|name| lookup(name).is_some_and(|value| !value.trim().is_empty()));

        Self {
            production,
            orchestrated,
        }
    }

    /// Flagged as production
    pub fn is_production(&self) -> bool {
        self.production
    }

    /// Running under an orchestrator
    pub fn is_orchestrated(&self) -> bool {
        self.orchestrated
    }

    /// Whether plain `http://` to a loopback host is tolerated
    pub fn allows_plaintext_loopback(&self) -> bool {
        !self.production && !self.orchestrated
    }
}
