//! Mail relay dispatch.
//!
//! Sends are best-effort: failures are reported to the caller but never
//! retried here, and the workflow decides how much a failed send matters
//! (a failed confirmation email is terminal for the requester; a failed
//! credential email never rolls back the directory write).

use crate::message::MailMessage;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pwreset_core::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Dispatch seam for notification emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message to one recipient.
    async fn send(&self, to: &str, message: &MailMessage) -> Result<()>;
}

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Relay host name or address.
    pub smtp_host: String,
    /// Relay port.
    pub smtp_port: u16,
    /// Optional relay credentials; an anonymous relay with an authorized
    /// source address needs none.
    pub smtp_credentials: Option<(String, SecretString)>,
    /// Fixed sender address.
    pub from_address: String,
    /// Master switch: when false every send is a no-op.
    pub enabled: bool,
}

impl MailerConfig {
    /// Creates a configuration for an anonymous relay.
    #[must_use]
    pub fn new(smtp_host: impl Into<String>, from_address: impl Into<String>) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port: 25,
            smtp_credentials: None,
            from_address: from_address.into(),
            enabled: true,
        }
    }

    /// Overrides the relay port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.smtp_port = port;
        self
    }

    /// Sets relay authentication credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.smtp_credentials = Some((username.into(), password));
        self
    }

    /// Enables or disables sending entirely.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Mailer backed by an async SMTP transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    enabled: bool,
}

impl SmtpMailer {
    /// Builds the transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the relay host is not usable.
    pub fn new(config: &MailerConfig) -> Result<Self> {
        let transport = match &config.smtp_credentials {
            Some((username, password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                    .map_err(|err| Error::ConfigError(format!("invalid SMTP relay: {err}")))?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(
                        username.clone(),
                        password.expose_secret().to_string(),
                    ))
                    .build()
            }
            None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build(),
        };

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
            enabled: config.enabled,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, message: &MailMessage) -> Result<()> {
        if !self.enabled {
            debug!(to, subject = %message.subject, "notifications disabled, skipping send");
            return Ok(());
        }

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|err| Error::ConfigError(format!("invalid sender address: {err}")))?,
            )
            .to(to
                .parse()
                .map_err(|err| Error::MailError(format!("invalid recipient address: {err}")))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .map_err(|err| Error::MailError(err.to_string()))?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|err| Error::MailError(err.to_string()))
    }
}
