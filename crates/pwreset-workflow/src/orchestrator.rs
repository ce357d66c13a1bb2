//! Reset workflow orchestration.
//!
//! Phase 1 ("check"): accept a request, resolve the account, bind a token
//! and dispatch the confirmation email. Phase 2 ("change"): validate the
//! presented token, re-resolve the account by its bound mail address,
//! generate a credential, write it to the directory and notify.
//!
//! Every external failure is caught here and converted into a user-facing
//! status report; callers never see a raw error.

use async_trait::async_trait;
use pwreset_core::{AppConfig, Error, Result, SessionId, StatusReport};
use pwreset_directory::{clean, password, DirectoryClient, DistinguishedName, ResetAccount};
use pwreset_notify::{confirmation_request, credential_issued, Mailer};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::credential;
use crate::session::{FailureReason, ResetSession, SessionStore, WorkflowState};
use crate::token;

/// Directory operations the orchestrator depends on.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Phase-1 lookup by cleaned identifier; exactly one match required.
    async fn find_account(&self, identifier: &str) -> Result<ResetAccount>;
    /// Phase-2 lookup by bound mail address; exactly one match required.
    async fn find_account_by_mail(&self, mail: &str) -> Result<ResetAccount>;
    /// Privileged single-attribute password replace.
    async fn replace_password(&self, dn: &DistinguishedName, encoded: Vec<u8>) -> Result<()>;
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn find_account(&self, identifier: &str) -> Result<ResetAccount> {
        DirectoryClient::find_account(self, identifier).await
    }

    async fn find_account_by_mail(&self, mail: &str) -> Result<ResetAccount> {
        DirectoryClient::find_account_by_mail(self, mail).await
    }

    async fn replace_password(&self, dn: &DistinguishedName, encoded: Vec<u8>) -> Result<()> {
        DirectoryClient::replace_password(self, dn, encoded).await
    }
}

/// The two-phase reset workflow.
pub struct ResetWorkflow {
    config: AppConfig,
    directory: Arc<dyn Directory>,
    mailer: Arc<dyn Mailer>,
    sessions: SessionStore,
}

impl ResetWorkflow {
    /// Creates a workflow over the given collaborators.
    #[must_use]
    pub fn new(config: AppConfig, directory: Arc<dyn Directory>, mailer: Arc<dyn Mailer>) -> Self {
        let sessions = SessionStore::new(config.session_ttl());
        Self {
            config,
            directory,
            mailer,
            sessions,
        }
    }

    /// Phase 1: accepts a reset request for a user-supplied identifier.
    ///
    /// On success the session holds a bound token and the confirmation
    /// email is dispatched. A failed dispatch is logged but the submission
    /// outcome reported to the caller does not change.
    pub async fn request_reset(&self, session_id: SessionId, raw_identifier: &str) -> StatusReport {
        let mut report = StatusReport::new();

        let identifier = clean::clean_lower(raw_identifier);
        if identifier.is_empty() {
            report.danger("No login was supplied");
            return report;
        }

        self.trace("connecting to the directory");
        let account = match self.directory.find_account(&identifier).await {
            Ok(account) => account,
            Err(err) => {
                self.log_failure(&err);
                report.push_error(&err);
                return report;
            }
        };
        self.trace("directory lookup succeeded");
        report.success(format!("User {identifier} found"));

        // The mail address comes from the resolved entry, never from input.
        let mail = match account.require_mail() {
            Ok(mail) => mail.to_string(),
            Err(err) => {
                report.push_error(&err);
                return report;
            }
        };

        let token = token::issue(self.config.token_length);
        let confirm_url = format!("{}?step=change&token={token}", self.config.public_url);
        self.trace("confirmation token issued");

        let mut session = ResetSession::new(identifier.clone(), mail.clone(), token);
        session.state = WorkflowState::ConfirmationSent;
        self.sessions.insert(session_id, session).await;

        self.trace("dispatching confirmation email");
        let message = confirmation_request(&identifier, &confirm_url);
        if let Err(err) = self.mailer.send(&mail, &message).await {
            // The requester cannot proceed without the link, but the
            // request itself was accepted.
            error!(code = err.error_code(), "confirmation email failed: {err}");
        }
        report.info(format!(
            "A confirmation e-mail has been sent to {mail}. Please keep this window open."
        ));
        report
    }

    /// Phase 2: confirms a pending request with the emailed token and
    /// performs the directory write.
    ///
    /// The pending record is taken out of the store atomically, so a
    /// duplicate confirmation behaves like an unknown token. On success all
    /// sensitive session state is scrubbed unconditionally; on a rejected
    /// write the record is kept (marked failed) for diagnosis and no
    /// credential email goes out.
    pub async fn confirm_reset(&self, session_id: SessionId, raw_token: &str) -> StatusReport {
        let mut report = StatusReport::new();

        let presented = clean::clean(raw_token);

        let mut session = match self.sessions.take_pending(&session_id).await {
            Ok(session) => session,
            Err(err) => {
                warn!(code = err.error_code(), "confirmation without pending request");
                report.push_error(&err);
                return report;
            }
        };

        if session.bound_email().is_empty() || !token::validate(session.token(), &presented) {
            // A wrong guess must not destroy the legitimate pending request.
            warn!(account = %session.account(), "presented token rejected");
            self.sessions.insert(session_id, session).await;
            report.push_error(&Error::TokenMismatch);
            return report;
        }
        session.state = WorkflowState::ConfirmationReceived;

        self.trace("connecting to the directory");
        let mail = session.bound_email().to_string();
        let account = match self.directory.find_account_by_mail(&mail).await {
            Ok(account) => account,
            Err(err) => {
                self.log_failure(&err);
                report.push_error(&err);
                self.fail_keeping_state(session_id, session, &err).await;
                return report;
            }
        };
        self.trace("directory lookup succeeded");
        report.success(format!("User {mail} found"));

        let credential = credential::generate(self.config.credential_length);
        session.state = WorkflowState::CredentialIssued;
        self.trace("credential generated");

        let encoded = match password::encode_password(credential.expose_secret()) {
            Ok(encoded) => encoded,
            Err(err) => {
                report.push_error(&err);
                self.fail_keeping_state(session_id, session, &err).await;
                return report;
            }
        };

        self.trace("writing credential to the directory");
        if let Err(err) = self.directory.replace_password(&account.dn, encoded).await {
            self.log_failure(&err);
            report.push_error(&err);
            self.fail_keeping_state(session_id, session, &err).await;
            return report;
        }
        session.state = WorkflowState::Completed;
        report.success(format!("The password for {mail} has been changed"));

        self.trace("dispatching credential email");
        let message = credential_issued(session.account(), credential.expose_secret());
        match self.mailer.send(&mail, &message).await {
            Ok(()) => report.info(format!(
                "An e-mail containing your new password has been sent to {mail}"
            )),
            Err(err) => {
                // The directory write already committed; a failed
                // notification does not roll it back.
                error!(code = err.error_code(), "credential email failed: {err}");
                report.push_error(&err);
            }
        }

        // Unconditional on success: identifier, bound mail, token and
        // credential all leave memory here, whatever the tracing
        // configuration says.
        session.scrub();
        drop(credential);
        report
    }

    /// Reports the workflow state of a session.
    pub async fn state_of(&self, session_id: &SessionId) -> WorkflowState {
        self.sessions.state_of(session_id).await
    }

    /// Returns true when no reset request is pending.
    pub async fn no_pending_requests(&self) -> bool {
        self.sessions.is_empty().await
    }

    /// Drops expired pending requests, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.sessions.purge_expired().await
    }

    /// Keeps the session record after a phase-2 failure so the failure can
    /// be diagnosed and the link retried.
    async fn fail_keeping_state(&self, id: SessionId, mut session: ResetSession, err: &Error) {
        session.state = WorkflowState::Failed(FailureReason::from(err));
        self.sessions.insert(id, session).await;
    }

    fn trace(&self, step: &str) {
        if self.config.trace_steps {
            debug!("{step}");
        }
    }

    fn log_failure(&self, err: &Error) {
        if err.should_log() {
            error!(code = err.error_code(), "{err}");
        }
    }
}
