//! Credential generation.
//!
//! Same randomness and alphabet policy as token issue, independently
//! parameterized and never shared with it: a credential is generated by its
//! own call after token validation and must never double as a token.

use crate::random::random_string;
use secrecy::SecretString;

/// Default generated credential length.
pub const DEFAULT_CREDENTIAL_LENGTH: usize = 8;

/// Generates a fresh credential.
///
/// The value is wrapped immediately; it is exposed only to the directory
/// wire encoder and the notification body, and is wiped from memory when
/// the wrapper drops.
#[must_use]
pub fn generate(length: usize) -> SecretString {
    SecretString::from(random_string(length))
}
