//! # pwreset-directory
//!
//! LDAP directory client for the credential reset workflow.
//!
//! Provides the typed directory operations the workflow needs — account
//! lookup by identifier, re-lookup by bound mail address, and the
//! privileged password replace — plus the input sanitization and wire
//! encoding those operations require.

#![deny(missing_docs)]

pub mod clean;
mod client;
mod config;
mod dn;
mod entry;
pub mod password;

pub use client::{DirectoryClient, LdapDirectoryConnector};
pub use config::{
    DirectoryConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_IDENT_FILTER, DEFAULT_MAIL_FILTER,
    DEFAULT_OPERATION_TIMEOUT_SECS,
};
pub use dn::{DistinguishedName, DnError};
pub use entry::{DirectoryEntry, ResetAccount, PASSWORD_ATTRIBUTE, RESET_ATTRIBUTES};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = pwreset_core::Result<T>;
