//! Password wire encoding for the directory's `unicodePwd` attribute.
//!
//! The target directory only accepts a password replace when the value is
//! the plaintext surrounded by literal double quotes and encoded as
//! UTF-16LE bytes. Every character of the quoted string becomes two bytes
//! (character byte followed by a null byte for ASCII input). Any deviation
//! from this transform makes the directory reject the write or store a
//! corrupted credential.

use pwreset_core::{Error, Result};

/// Encodes a plaintext credential for a `unicodePwd` replace operation.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the credential is empty.
pub fn encode_password(password: &str) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Err(Error::Validation(
            "credential for directory write cannot be empty".to_string(),
        ));
    }

    let quoted = format!("\"{password}\"");
    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}
