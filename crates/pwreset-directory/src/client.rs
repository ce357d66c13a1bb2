//! Directory client implementation.
//!
//! Every operation acquires a fresh connection, binds, executes and
//! unbinds — on success and failure paths alike. Connections are never
//! pooled or shared across requests.

use crate::{
    config::DirectoryConfig,
    dn::DistinguishedName,
    entry::{DirectoryEntry, ResetAccount, PASSWORD_ATTRIBUTE, RESET_ATTRIBUTES},
};
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use native_tls::{Certificate, TlsConnector};
use pwreset_core::{Error, Result};
use secrecy::ExposeSecret;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait DirectorySession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<DirectoryEntry>>;
    async fn replace_attribute(
        &mut self,
        dn: &str,
        attribute: &str,
        values: Vec<Vec<u8>>,
    ) -> Result<()>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait DirectoryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>>;
}

/// Directory client with a pluggable connection backend.
pub struct DirectoryClient {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn DirectoryConnector>,
}

impl DirectoryClient {
    /// Creates a directory client backed by a real LDAP connection.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn DirectoryConnector> =
            Box::new(LdapDirectoryConnector::new(config.clone()));
        Self { config, connector }
    }

    #[cfg(test)]
    pub(crate) fn with_connector(
        config: DirectoryConfig,
        connector: Box<dyn DirectoryConnector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// Locates the account matching a cleaned identifier (phase-1 lookup).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when nothing matches and
    /// [`Error::AmbiguousMatch`] when more than one entry does. A password
    /// reset must never guess between candidate accounts.
    pub async fn find_account(&self, identifier: &str) -> Result<ResetAccount> {
        debug!(identifier, "searching directory by identifier");
        let filter = self.config.ident_filter(identifier);
        self.lookup_single(&filter, identifier).await
    }

    /// Re-locates the account by its bound mail address (phase-2 lookup).
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::find_account`]: exactly one match required.
    pub async fn find_account_by_mail(&self, mail: &str) -> Result<ResetAccount> {
        debug!(mail, "searching directory by mail address");
        let filter = self.config.mail_filter(mail);
        self.lookup_single(&filter, mail).await
    }

    /// Replaces the password attribute of the entry at `dn` with an
    /// already wire-encoded value.
    ///
    /// Always binds with the privileged service credential; the
    /// anonymous-read switch never applies to writes. The replace is atomic
    /// from the caller's perspective: either the directory reports success
    /// or an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when the endpoint is not `ldaps` (the
    /// directory rejects password modifications over plaintext transports)
    /// and [`Error::WriteRejected`] when the directory refuses the replace.
    pub async fn replace_password(&self, dn: &DistinguishedName, encoded: Vec<u8>) -> Result<()> {
        if !self.config.is_secure() {
            return Err(Error::ConfigError(
                "a secure transport (ldaps) is required for password operations".to_string(),
            ));
        }

        let mut session = self.write_session().await?;
        let result = self
            .with_timeout(session.replace_attribute(dn.as_str(), PASSWORD_ATTRIBUTE, vec![encoded]))
            .await;
        close_session(session.as_mut()).await;
        result
    }

    async fn lookup_single(&self, filter: &str, subject: &str) -> Result<ResetAccount> {
        let mut session = self.read_session().await?;
        let result = self
            .with_timeout(session.search(
                self.config.search_base().as_str(),
                filter,
                RESET_ATTRIBUTES,
            ))
            .await;
        close_session(session.as_mut()).await;

        let entries = result?;
        match entries.as_slice() {
            [entry] => ResetAccount::from_entry(entry),
            [] => Err(Error::NotFound(subject.to_string())),
            _ => Err(Error::AmbiguousMatch {
                subject: subject.to_string(),
                matches: entries.len(),
            }),
        }
    }

    /// Opens a session bound for read operations, honoring the
    /// anonymous-read switch.
    async fn read_session(&self) -> Result<Box<dyn DirectorySession>> {
        let mut session = self.connect().await?;
        let bound = if self.config.anonymous_read() {
            self.with_timeout(session.simple_bind("", "")).await
        } else {
            self.bind_service(session.as_mut()).await
        };
        if let Err(err) = bound {
            close_session(session.as_mut()).await;
            return Err(err);
        }
        Ok(session)
    }

    /// Opens a session bound with the privileged service credential.
    async fn write_session(&self) -> Result<Box<dyn DirectorySession>> {
        let mut session = self.connect().await?;
        if let Err(err) = self.bind_service(session.as_mut()).await {
            close_session(session.as_mut()).await;
            return Err(err);
        }
        Ok(session)
    }

    async fn bind_service(&self, session: &mut dyn DirectorySession) -> Result<()> {
        self.with_timeout(session.simple_bind(
            self.config.bind_dn(),
            self.config.bind_secret().expose_secret(),
        ))
        .await
    }

    /// Connects with a single bounded retry for transient failures only.
    async fn connect(&self) -> Result<Box<dyn DirectorySession>> {
        match self.connector.connect().await {
            Err(err) if err.is_transient() => {
                warn!("directory connect failed ({err}), retrying once");
                self.connector.connect().await
            }
            other => other,
        }
    }

    async fn with_timeout<F, T>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        timeout(self.config.operation_timeout(), fut)
            .await
            .map_err(|_| Error::Timeout("directory operation timed out".to_string()))?
    }
}

/// Always unbind once an operation sequence ends; an unbind failure is not
/// allowed to mask the operation outcome.
async fn close_session(session: &mut dyn DirectorySession) {
    if let Err(err) = session.unbind().await {
        debug!("directory unbind failed: {err}");
    }
}

/// Connector backed by `ldap3`.
///
/// `ldap3` speaks protocol version 3 exclusively and does not chase
/// referrals, which pins the deterministic search behavior the workflow
/// relies on.
pub struct LdapDirectoryConnector {
    config: Arc<DirectoryConfig>,
}

impl LdapDirectoryConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DirectoryConnector for LdapDirectoryConnector {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>> {
        let settings = build_conn_settings(&self.config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(|err| Error::DirectoryUnavailable(err.to_string()))?;
        ldap3::drive!(conn);
        Ok(Box::new(LdapDirectorySession { inner: ldap }))
    }
}

struct LdapDirectorySession {
    inner: ldap3::Ldap,
}

#[async_trait]
impl DirectorySession for LdapDirectorySession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = self
            .inner
            .simple_bind(dn, password)
            .await
            .map_err(map_bind_error)?;
        result.success().map_err(map_bind_error)?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<DirectoryEntry>> {
        let result = self
            .inner
            .search(base_dn, Scope::Subtree, filter, attributes.to_vec())
            .await
            .map_err(map_directory_error)?;
        let (entries, _) = result.success().map_err(map_directory_error)?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn replace_attribute(
        &mut self,
        dn: &str,
        attribute: &str,
        values: Vec<Vec<u8>>,
    ) -> Result<()> {
        let values: HashSet<Vec<u8>> = values.into_iter().collect();
        let mods = vec![Mod::Replace(attribute.as_bytes().to_vec(), values)];
        let result = self.inner.modify(dn, mods).await.map_err(map_write_error)?;
        result.success().map_err(map_write_error)?;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner.unbind().await.map_err(map_directory_error)
    }
}

fn build_conn_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connection_timeout());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read directory CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid directory CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to load directory CA certificate: {err}"))
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn map_bind_error(err: ldap3::LdapError) -> Error {
    match err {
        ldap3::LdapError::LdapResult { .. } => Error::BindFailed(err.to_string()),
        _ => Error::DirectoryUnavailable(err.to_string()),
    }
}

fn map_directory_error(err: ldap3::LdapError) -> Error {
    Error::DirectoryUnavailable(err.to_string())
}

fn map_write_error(err: ldap3::LdapError) -> Error {
    Error::WriteRejected(err.to_string())
}
