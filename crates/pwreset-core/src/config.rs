//! Workflow configuration.
//!
//! An immutable configuration struct constructed once at process start and
//! passed into each component, replacing the ambient constants of older
//! deployments. Directory and mail relay settings live with their own
//! components; this struct carries the knobs the orchestrator itself needs.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;
use validator::Validate;

const fn default_notifications_enabled() -> bool {
    true
}

const fn default_token_length() -> usize {
    15
}

const fn default_credential_length() -> usize {
    8
}

const fn default_session_ttl_secs() -> u64 {
    900
}

const fn default_trace_steps() -> bool {
    false
}

/// Configuration for the reset workflow orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Public base URL of the reset page; the confirmation link is built
    /// against it.
    #[validate(url)]
    pub public_url: String,

    /// Display suffix appended to account identifiers in messages
    /// (e.g. `@mail.suffix.com`).
    #[serde(default)]
    pub mail_suffix: String,

    /// Whether notification emails are sent at all.
    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,

    /// Length of generated confirmation tokens.
    #[validate(range(min = 8, max = 64))]
    #[serde(default = "default_token_length")]
    pub token_length: usize,

    /// Length of generated credentials.
    #[validate(range(min = 8, max = 64))]
    #[serde(default = "default_credential_length")]
    pub credential_length: usize,

    /// How long a pending reset request stays valid.
    #[validate(range(min = 60, max = 86400))]
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Emit debug-level step tracing for each workflow step.
    ///
    /// Controls logging verbosity only. The post-success scrub of session
    /// state is unconditional and cannot be disabled here.
    #[serde(default = "default_trace_steps")]
    pub trace_steps: bool,
}

impl AppConfig {
    /// Creates a configuration with the required public URL and defaults
    /// everywhere else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL is invalid or validation
    /// fails.
    pub fn new(public_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            public_url: public_url.into(),
            mail_suffix: String::new(),
            notifications_enabled: default_notifications_enabled(),
            token_length: default_token_length(),
            credential_length: default_credential_length(),
            session_ttl_secs: default_session_ttl_secs(),
            trace_steps: default_trace_steps(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `PWRESET_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if `PWRESET_PUBLIC_URL` is missing or
    /// any value fails validation.
    pub fn from_env() -> Result<Self, Error> {
        let public_url = env::var("PWRESET_PUBLIC_URL")
            .map_err(|_| Error::ConfigError("PWRESET_PUBLIC_URL is not set".to_string()))?;

        let config = Self {
            public_url,
            mail_suffix: env::var("PWRESET_MAIL_SUFFIX").unwrap_or_default(),
            notifications_enabled: env_flag(
                "PWRESET_NOTIFICATIONS_ENABLED",
                default_notifications_enabled(),
            ),
            token_length: env_number("PWRESET_TOKEN_LENGTH", default_token_length()),
            credential_length: env_number("PWRESET_CREDENTIAL_LENGTH", default_credential_length()),
            session_ttl_secs: env_number("PWRESET_SESSION_TTL_SECS", default_session_ttl_secs()),
            trace_steps: env_flag("PWRESET_TRACE_STEPS", default_trace_steps()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the display mail suffix.
    #[must_use]
    pub fn with_mail_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.mail_suffix = suffix.into();
        self
    }

    /// Enables or disables notification email sending.
    #[must_use]
    pub const fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Overrides the generated token length.
    #[must_use]
    pub const fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    /// Overrides the generated credential length.
    #[must_use]
    pub const fn with_credential_length(mut self, length: usize) -> Self {
        self.credential_length = length;
        self
    }

    /// Overrides the pending-request TTL in seconds.
    #[must_use]
    pub const fn with_session_ttl_secs(mut self, seconds: u64) -> Self {
        self.session_ttl_secs = seconds;
        self
    }

    /// Enables or disables debug step tracing.
    #[must_use]
    pub const fn with_trace_steps(mut self, enabled: bool) -> Self {
        self.trace_steps = enabled;
        self
    }

    /// Pending-request TTL as a [`Duration`].
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Parses the public URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL cannot be parsed.
    pub fn parse_public_url(&self) -> Result<Url, Error> {
        Url::parse(&self.public_url)
            .map_err(|e| Error::ConfigError(format!("Invalid public URL: {e}")))
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map_or(default, |v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
