//! # pwreset-notify
//!
//! Notification dispatcher for the credential reset workflow: composes the
//! confirmation-link and new-credential emails and hands them to an SMTP
//! relay. Sending is conditional on a configuration switch and never
//! retried.

#![deny(missing_docs)]

mod mailer;
mod message;

pub use mailer::{Mailer, MailerConfig, SmtpMailer};
pub use message::{confirmation_request, credential_issued, MailMessage};
