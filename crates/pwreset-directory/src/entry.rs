//! Directory entry representations.

use crate::dn::DistinguishedName;
use pwreset_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attributes requested for a reset lookup.
pub const RESET_ATTRIBUTES: &[&str] = &["cn", "sn", "sAMAccountName", "mail"];

/// Attribute written by the password replace operation.
pub const PASSWORD_ATTRIBUTE: &str = "unicodePwd";

/// Raw LDAP entry as returned by a search.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (value order preserved from the server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }
}

/// Projection of a directory entry onto the fields the reset workflow reads.
///
/// The entry is owned by the external directory; this type only carries the
/// resolved identity and the authoritative mail address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetAccount {
    /// Distinguished name the password replace will target.
    pub dn: DistinguishedName,
    /// Account name (`sAMAccountName`).
    #[serde(default)]
    pub account_name: Option<String>,
    /// Canonical name (`cn`).
    #[serde(default)]
    pub common_name: Option<String>,
    /// Surname (`sn`).
    #[serde(default)]
    pub surname: Option<String>,
    /// Mail address on file. Authoritative for the workflow — never taken
    /// from user input.
    #[serde(default)]
    pub mail: Option<String>,
}

impl ResetAccount {
    /// Parses the reset projection out of a raw search entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDn`] if the entry's DN cannot be parsed.
    pub fn from_entry(entry: &DirectoryEntry) -> Result<Self> {
        let dn = DistinguishedName::parse(&entry.dn)?;
        Ok(Self {
            dn,
            account_name: entry.first("sAMAccountName").map(str::to_owned),
            common_name: entry.first("cn").map(str::to_owned),
            surname: entry.first("sn").map(str::to_owned),
            mail: entry
                .first("mail")
                .filter(|mail| !mail.is_empty())
                .map(str::to_owned),
        })
    }

    /// Returns the mail address on file, if any.
    #[must_use]
    pub fn mail(&self) -> Option<&str> {
        self.mail.as_deref()
    }

    /// Returns the mail address or an error when the entry carries none.
    ///
    /// The workflow must not proceed to token issue or mutation without a
    /// bound mail address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when no mail address is on file.
    pub fn require_mail(&self) -> Result<&str> {
        self.mail().ok_or_else(|| {
            Error::Validation("the matched account has no mail address on file".to_string())
        })
    }
}
