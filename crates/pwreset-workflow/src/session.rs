//! Per-requester session state.
//!
//! The state that spans the two workflow phases — the cleaned identifier,
//! the bound mail address and the confirmation token — lives in a keyed
//! store with a defined expiry. Confirmation takes the record out of the
//! store atomically, so a duplicate submission (a double-clicked link)
//! cannot race the directory write.

use chrono::{DateTime, Utc};
use pwreset_core::{Error, Result, SessionId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Reason a workflow run ended in the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The supplied identifier was empty after sanitization.
    EmptyIdentifier,
    /// The directory service could not be contacted.
    DirectoryUnavailable,
    /// The directory rejected the bind.
    BindFailed,
    /// No directory entry matched.
    NotFound,
    /// More than one directory entry matched.
    AmbiguousMatch,
    /// The presented token did not match a pending request, or the request
    /// expired.
    InvalidOrExpiredToken,
    /// The directory rejected the password replace.
    WriteError,
    /// The notification email could not be sent.
    MailError,
    /// Internal failure.
    Internal,
}

impl From<&Error> for FailureReason {
    fn from(err: &Error) -> Self {
        match err {
            Error::Validation(_) => Self::EmptyIdentifier,
            Error::DirectoryUnavailable(_) | Error::Timeout(_) => Self::DirectoryUnavailable,
            Error::BindFailed(_) => Self::BindFailed,
            Error::NotFound(_) => Self::NotFound,
            Error::AmbiguousMatch { .. } => Self::AmbiguousMatch,
            Error::TokenMismatch | Error::SessionExpired => Self::InvalidOrExpiredToken,
            Error::WriteRejected(_) => Self::WriteError,
            Error::MailError(_) => Self::MailError,
            Error::ConfigError(_) | Error::InvalidDn(_) | Error::Internal(_) => Self::Internal,
        }
    }
}

/// Workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// No reset request in flight for this session.
    Idle,
    /// A request was accepted and the account resolved.
    Requested,
    /// The confirmation email was dispatched; waiting on the token.
    ConfirmationSent,
    /// A matching token was presented.
    ConfirmationReceived,
    /// A fresh credential was generated.
    CredentialIssued,
    /// The directory write succeeded and notifications went out.
    Completed,
    /// Terminal failure, reachable from every state.
    Failed(FailureReason),
}

/// Reset request record spanning the two workflow phases.
#[derive(Debug, Clone)]
pub struct ResetSession {
    pub(crate) account: String,
    pub(crate) bound_email: String,
    pub(crate) token: String,
    pub(crate) state: WorkflowState,
    pub(crate) created_at: DateTime<Utc>,
}

impl ResetSession {
    /// Creates a record for a freshly accepted request.
    ///
    /// `bound_email` comes from the resolved directory entry, never from
    /// user input.
    #[must_use]
    pub fn new(
        account: impl Into<String>,
        bound_email: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            bound_email: bound_email.into(),
            token: token.into(),
            state: WorkflowState::Requested,
            created_at: Utc::now(),
        }
    }

    /// Cleaned account identifier the request was made for.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Mail address bound from the directory entry.
    #[must_use]
    pub fn bound_email(&self) -> &str {
        &self.bound_email
    }

    /// Token bound to this request at issue time.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Current workflow state.
    #[must_use]
    pub const fn state(&self) -> WorkflowState {
        self.state
    }

    /// Clears every sensitive field.
    pub fn scrub(&mut self) {
        self.account.clear();
        self.bound_email.clear();
        self.token.clear();
    }
}

/// Keyed store of pending reset requests.
pub struct SessionStore {
    ttl_secs: u64,
    sessions: Mutex<HashMap<SessionId, ResetSession>>,
}

impl SessionStore {
    /// Creates a store whose records expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_secs: ttl.as_secs(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the record for a session.
    ///
    /// A new phase-1 request supersedes any previous pending request for
    /// the same session; only the token bound to the current record is
    /// valid for confirmation.
    pub async fn insert(&self, id: SessionId, session: ResetSession) {
        self.sessions.lock().await.insert(id, session);
    }

    /// Removes and returns the pending record for a session.
    ///
    /// The removal is atomic: a concurrent duplicate confirmation sees no
    /// pending record and fails like any unknown token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenMismatch`] when no record exists and
    /// [`Error::SessionExpired`] when the record outlived the TTL (the
    /// expired record is scrubbed and dropped).
    pub async fn take_pending(&self, id: &SessionId) -> Result<ResetSession> {
        let mut sessions = self.sessions.lock().await;
        let mut session = sessions.remove(id).ok_or(Error::TokenMismatch)?;
        if self.is_expired(&session, Utc::now()) {
            session.scrub();
            return Err(Error::SessionExpired);
        }
        Ok(session)
    }

    /// Reports the workflow state of a session, [`WorkflowState::Idle`]
    /// when no record exists.
    pub async fn state_of(&self, id: &SessionId) -> WorkflowState {
        self.sessions
            .lock()
            .await
            .get(id)
            .map_or(WorkflowState::Idle, ResetSession::state)
    }

    /// Drops every expired record, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        before - sessions.len()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns true when no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    fn is_expired(&self, session: &ResetSession, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.created_at)
            .num_seconds()
            .try_into()
            .is_ok_and(|age: u64| age >= self.ttl_secs)
    }
}
