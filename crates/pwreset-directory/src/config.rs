//! Configuration for the directory client.

use crate::dn::DistinguishedName;
use pwreset_core::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default connection timeout (seconds). The workflow runs on a user-facing
/// request path, so both defaults are short.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 5;
/// Default per-operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 5;

/// Phase-1 lookup filter: account located by surname prefix.
pub const DEFAULT_IDENT_FILTER: &str = "(&(objectClass=user)(objectCategory=person)(sn={ident}*))";
/// Phase-2 lookup filter: account re-located by its bound mail address.
pub const DEFAULT_MAIL_FILTER: &str = "(&(objectClass=user)(objectCategory=person)(mail={mail}*))";

/// Configuration for connecting to the directory service.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    url: String,
    secure: bool,
    bind_dn: String,
    bind_secret: SecretString,
    anonymous_read: bool,
    search_base: DistinguishedName,
    ident_filter_template: String,
    mail_filter_template: String,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl DirectoryConfig {
    /// Creates a new directory configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL is invalid.
    pub fn new(
        url: impl Into<String>,
        bind_dn: impl Into<String>,
        bind_secret: SecretString,
        search_base: DistinguishedName,
    ) -> Result<Self> {
        let url_string = url.into();
        let parsed = Url::parse(&url_string)
            .map_err(|e| Error::ConfigError(format!("Invalid directory URL: {e}")))?;
        let secure = parsed.scheme() == "ldaps";

        Ok(Self {
            url: url_string,
            secure,
            bind_dn: bind_dn.into(),
            bind_secret,
            anonymous_read: false,
            search_base,
            ident_filter_template: DEFAULT_IDENT_FILTER.to_string(),
            mail_filter_template: DEFAULT_MAIL_FILTER.to_string(),
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        })
    }

    /// Returns the directory endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true when the endpoint uses a secure transport (`ldaps`).
    ///
    /// Password replace operations require it; the directory rejects
    /// `unicodePwd` modifications over plaintext connections.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Returns the service bind distinguished name.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Returns the service bind secret.
    #[must_use]
    pub const fn bind_secret(&self) -> &SecretString {
        &self.bind_secret
    }

    /// Returns true when read operations bind anonymously.
    ///
    /// This is a deployment switch, not a per-request choice, and it never
    /// applies to write operations.
    #[must_use]
    pub const fn anonymous_read(&self) -> bool {
        self.anonymous_read
    }

    /// Returns the search base distinguished name.
    #[must_use]
    pub const fn search_base(&self) -> &DistinguishedName {
        &self.search_base
    }

    /// Builds the phase-1 lookup filter for a cleaned identifier.
    ///
    /// The value is filter-escaped before substitution.
    #[must_use]
    pub fn ident_filter(&self, identifier: &str) -> String {
        self.ident_filter_template
            .replace("{ident}", &crate::clean::escape_filter_value(identifier))
    }

    /// Builds the phase-2 lookup filter for a bound mail address.
    #[must_use]
    pub fn mail_filter(&self, mail: &str) -> String {
        self.mail_filter_template
            .replace("{mail}", &crate::clean::escape_filter_value(mail))
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the per-operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Enables anonymous binds for read operations.
    #[must_use]
    pub const fn with_anonymous_read(mut self, anonymous: bool) -> Self {
        self.anonymous_read = anonymous;
        self
    }

    /// Overrides the phase-1 filter template.
    ///
    /// The template must contain `{ident}` where the cleaned identifier is
    /// substituted.
    #[must_use]
    pub fn with_ident_filter_template(mut self, template: impl Into<String>) -> Self {
        self.ident_filter_template = template.into();
        self
    }

    /// Overrides the phase-2 filter template.
    ///
    /// The template must contain `{mail}` where the bound mail address is
    /// substituted.
    #[must_use]
    pub fn with_mail_filter_template(mut self, template: impl Into<String>) -> Self {
        self.mail_filter_template = template.into();
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets a custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the per-operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}
