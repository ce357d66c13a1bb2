//! End-to-end workflow scenarios against in-memory collaborators.

use async_trait::async_trait;
use pwreset_core::{AppConfig, Error, Result, SessionId, StatusLevel};
use pwreset_directory::{DistinguishedName, ResetAccount};
use pwreset_notify::{MailMessage, Mailer};
use pwreset_workflow::{Directory, FailureReason, ResetWorkflow, WorkflowState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory directory double. Lookup results are fixed per instance and
/// every call is counted so tests can assert that a phase never reached
/// the directory.
#[derive(Default)]
struct FakeDirectory {
    by_identifier: Vec<ResetAccount>,
    by_mail: Vec<ResetAccount>,
    reject_write: bool,
    lookups: AtomicUsize,
    writes: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeDirectory {
    fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn written(&self) -> Vec<(String, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    fn single_match(account: ResetAccount) -> Self {
        Self {
            by_identifier: vec![account.clone()],
            by_mail: vec![account],
            ..Self::default()
        }
    }
}

fn resolve(entries: &[ResetAccount], subject: &str) -> Result<ResetAccount> {
    match entries {
        [entry] => Ok(entry.clone()),
        [] => Err(Error::NotFound(subject.to_string())),
        _ => Err(Error::AmbiguousMatch {
            subject: subject.to_string(),
            matches: entries.len(),
        }),
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn find_account(&self, identifier: &str) -> Result<ResetAccount> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        resolve(&self.by_identifier, identifier)
    }

    async fn find_account_by_mail(&self, mail: &str) -> Result<ResetAccount> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        resolve(&self.by_mail, mail)
    }

    async fn replace_password(&self, dn: &DistinguishedName, encoded: Vec<u8>) -> Result<()> {
        if self.reject_write {
            return Err(Error::WriteRejected("constraint violation".to_string()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((dn.as_str().to_string(), encoded));
        Ok(())
    }
}

/// Recording mailer double.
#[derive(Default)]
struct RecordingMailer {
    refuse: bool,
    sent: Mutex<Vec<(String, MailMessage)>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<(String, MailMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, message: &MailMessage) -> Result<()> {
        if self.refuse {
            return Err(Error::MailError("relay refused".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.clone()));
        Ok(())
    }
}

fn jdupont() -> ResetAccount {
    ResetAccount {
        dn: DistinguishedName::parse("cn=Jean Dupont,ou=People,dc=example,dc=com").unwrap(),
        account_name: Some("jdupont".to_string()),
        common_name: Some("Jean Dupont".to_string()),
        surname: Some("Dupont".to_string()),
        mail: Some("jdupont@mail.suffix.com".to_string()),
    }
}

fn workflow(directory: &Arc<FakeDirectory>, mailer: &Arc<RecordingMailer>) -> ResetWorkflow {
    let config = AppConfig::new("https://reset.example.com/")
        .unwrap()
        .with_mail_suffix("@mail.suffix.com");
    ResetWorkflow::new(config, directory.clone(), mailer.clone())
}

/// Pulls the confirmation token out of the emailed link.
fn token_from(message: &MailMessage) -> String {
    let start = message.html.find("token=").expect("link in body") + "token=".len();
    let rest = &message.html[start..];
    rest[..rest.find('"').expect("closing quote")].to_string()
}

/// Decodes a quoted UTF-16LE password write back to plaintext.
fn decode_written_password(encoded: &[u8]) -> String {
    let units: Vec<u16> = encoded
        .chunks(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .expect("valid utf16")
        .trim_matches('"')
        .to_string()
}

#[tokio::test]
async fn scenario_a_happy_path() {
    let directory = Arc::new(FakeDirectory::single_match(jdupont()));
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    // Phase 1: request.
    let report = flow.request_reset(session, "jdupont").await;
    assert!(!report.has_failures());
    assert_eq!(flow.state_of(&session).await, WorkflowState::ConfirmationSent);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "jdupont@mail.suffix.com");
    let token = token_from(&sent[0].1);
    assert_eq!(token.len(), 15);

    // Phase 2: confirm with the exact emailed token.
    let report = flow.confirm_reset(session, &token).await;
    assert!(!report.has_failures());

    let writes = directory.written();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "cn=Jean Dupont,ou=People,dc=example,dc=com");
    // 8-character credential plus two quotes, two bytes per character.
    assert_eq!(writes[0].1.len(), 20);
    let credential = decode_written_password(&writes[0].1);
    assert_eq!(credential.len(), 8);

    // The credential email carries exactly the written password.
    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].1.html.contains(&credential));

    // Session state is scrubbed and gone.
    assert!(flow.no_pending_requests().await);
    assert_eq!(flow.state_of(&session).await, WorkflowState::Idle);
}

#[tokio::test]
async fn scenario_b_empty_identifier_stops_before_the_directory() {
    let directory = Arc::new(FakeDirectory::single_match(jdupont()));
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);

    let report = flow.request_reset(SessionId::generate(), "  \"'  ").await;
    assert_eq!(report.len(), 1);
    assert_eq!(report.entries()[0].level, StatusLevel::Danger);

    assert_eq!(directory.lookup_count(), 0);
    assert!(mailer.sent().is_empty());
    assert!(flow.no_pending_requests().await);
}

#[tokio::test]
async fn scenario_c_unknown_identifier_leaves_no_token_behind() {
    let directory = Arc::new(FakeDirectory::default());
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    let report = flow.request_reset(session, "nobody").await;
    assert!(report
        .entries()
        .iter()
        .any(|s| s.level == StatusLevel::Warning));

    assert!(mailer.sent().is_empty());
    assert!(flow.no_pending_requests().await);
    assert_eq!(flow.state_of(&session).await, WorkflowState::Idle);
}

#[tokio::test]
async fn scenario_d_wrong_token_never_reaches_the_directory() {
    let directory = Arc::new(FakeDirectory::single_match(jdupont()));
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    flow.request_reset(session, "jdupont").await;
    let lookups_after_request = directory.lookup_count();

    let report = flow.confirm_reset(session, "wrongtokenvalue").await;
    assert!(report
        .entries()
        .iter()
        .any(|s| s.level == StatusLevel::Danger));

    assert_eq!(directory.lookup_count(), lookups_after_request);
    assert!(directory.written().is_empty());
    // The legitimate pending request survives a wrong guess.
    assert_eq!(flow.state_of(&session).await, WorkflowState::ConfirmationSent);
}

#[tokio::test]
async fn scenario_e_ambiguous_mail_match_blocks_the_write() {
    let directory = Arc::new(FakeDirectory {
        by_identifier: vec![jdupont()],
        by_mail: vec![jdupont(), jdupont()],
        ..FakeDirectory::default()
    });
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    flow.request_reset(session, "jdupont").await;
    let token = token_from(&mailer.sent()[0].1);

    let report = flow.confirm_reset(session, &token).await;
    assert!(report.has_failures());
    assert!(directory.written().is_empty());
    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(
        flow.state_of(&session).await,
        WorkflowState::Failed(FailureReason::AmbiguousMatch)
    );
}

#[tokio::test]
async fn ambiguous_identifier_match_blocks_phase_one_too() {
    let directory = Arc::new(FakeDirectory {
        by_identifier: vec![jdupont(), jdupont()],
        ..FakeDirectory::default()
    });
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    let report = flow.request_reset(session, "dupont").await;
    assert!(report.has_failures());
    assert!(mailer.sent().is_empty());
    assert!(flow.no_pending_requests().await);
}

#[tokio::test]
async fn resubmitting_a_used_token_fails_like_an_unknown_token() {
    let directory = Arc::new(FakeDirectory::single_match(jdupont()));
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    flow.request_reset(session, "jdupont").await;
    let token = token_from(&mailer.sent()[0].1);

    let first = flow.confirm_reset(session, &token).await;
    assert!(!first.has_failures());
    assert_eq!(directory.written().len(), 1);

    // Second presentation of the same token: session already scrubbed.
    let second = flow.confirm_reset(session, &token).await;
    assert!(second
        .entries()
        .iter()
        .any(|s| s.level == StatusLevel::Danger));
    assert_eq!(directory.written().len(), 1);
    assert_eq!(mailer.sent().len(), 2);
}

#[tokio::test]
async fn rejected_write_keeps_state_and_sends_no_credential_email() {
    let directory = Arc::new(FakeDirectory {
        by_identifier: vec![jdupont()],
        by_mail: vec![jdupont()],
        reject_write: true,
        ..FakeDirectory::default()
    });
    let mailer = Arc::new(RecordingMailer::default());
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    flow.request_reset(session, "jdupont").await;
    let token = token_from(&mailer.sent()[0].1);

    let report = flow.confirm_reset(session, &token).await;
    assert!(report
        .entries()
        .iter()
        .any(|s| s.level == StatusLevel::Danger));

    // Only the confirmation email went out, and the session survives for
    // diagnosis.
    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(
        flow.state_of(&session).await,
        WorkflowState::Failed(FailureReason::WriteError)
    );
}

#[tokio::test]
async fn failed_confirmation_email_still_reports_submission_accepted() {
    let directory = Arc::new(FakeDirectory::single_match(jdupont()));
    let mailer = Arc::new(RecordingMailer {
        refuse: true,
        ..RecordingMailer::default()
    });
    let flow = workflow(&directory, &mailer);
    let session = SessionId::generate();

    let report = flow.request_reset(session, "jdupont").await;
    // The requester never gets the link, but the submission outcome reads
    // the same as a successful one.
    assert!(!report.has_failures());
    assert_eq!(flow.state_of(&session).await, WorkflowState::ConfirmationSent);
}

#[tokio::test]
async fn expired_request_behaves_like_an_unknown_token() {
    let directory = Arc::new(FakeDirectory::single_match(jdupont()));
    let mailer = Arc::new(RecordingMailer::default());
    let config = AppConfig::new("https://reset.example.com/")
        .unwrap()
        .with_session_ttl_secs(0);
    let flow = ResetWorkflow::new(config, directory.clone(), mailer.clone());
    let session = SessionId::generate();

    flow.request_reset(session, "jdupont").await;
    let token = token_from(&mailer.sent()[0].1);

    let report = flow.confirm_reset(session, &token).await;
    assert!(report
        .entries()
        .iter()
        .any(|s| s.level == StatusLevel::Danger));
    assert!(directory.written().is_empty());
    assert!(flow.no_pending_requests().await);
}

#[tokio::test]
async fn directory_outage_during_request_reports_generically() {
    // No entries configured and the lookup replaced by an outage.
    struct DownDirectory;

    #[async_trait]
    impl Directory for DownDirectory {
        async fn find_account(&self, _identifier: &str) -> Result<ResetAccount> {
            Err(Error::DirectoryUnavailable(
                "ldaps://directory.internal:636 refused".to_string(),
            ))
        }

        async fn find_account_by_mail(&self, _mail: &str) -> Result<ResetAccount> {
            Err(Error::DirectoryUnavailable(
                "ldaps://directory.internal:636 refused".to_string(),
            ))
        }

        async fn replace_password(
            &self,
            _dn: &DistinguishedName,
            _encoded: Vec<u8>,
        ) -> Result<()> {
            Err(Error::DirectoryUnavailable("unreachable".to_string()))
        }
    }

    let mailer = Arc::new(RecordingMailer::default());
    let config = AppConfig::new("https://reset.example.com/").unwrap();
    let flow = ResetWorkflow::new(config, Arc::new(DownDirectory), mailer.clone());

    let report = flow.request_reset(SessionId::generate(), "jdupont").await;
    assert!(report.has_failures());
    // Internal endpoint details never reach the user-facing text.
    assert!(report
        .entries()
        .iter()
        .all(|s| !s.text.contains("directory.internal")));
    assert!(mailer.sent().is_empty());
}
