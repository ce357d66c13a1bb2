//! User-facing status reporting.
//!
//! Both workflow entry points return an ordered list of leveled messages
//! rather than raising errors at the caller. The levels map onto the
//! presentation classes the front-end renders (`bg-success`, `bg-info`,
//! `bg-warning`, `bg-danger`).

use crate::error::Error;
use serde::Serialize;

/// Severity level of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// Operation step succeeded.
    Success,
    /// Informational notice.
    Info,
    /// Recoverable miss (e.g. no matching account).
    Warning,
    /// Terminal failure for this request.
    Danger,
}

impl StatusLevel {
    /// Presentation class used by the rendering layer.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "bg-success",
            Self::Info => "bg-info",
            Self::Warning => "bg-warning",
            Self::Danger => "bg-danger",
        }
    }
}

/// A single leveled status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Severity level.
    pub level: StatusLevel,
    /// User-facing text. Never contains internal connection details,
    /// query strings, tokens or credentials.
    pub text: String,
}

impl Status {
    /// Creates a status message.
    #[must_use]
    pub fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

impl From<&Error> for Status {
    /// Maps an internal error to its user-facing message.
    ///
    /// Infrastructure detail stays out of the text; a token mismatch and an
    /// expired request read identically so the message does not reveal
    /// whether a token ever existed.
    fn from(err: &Error) -> Self {
        match err {
            Error::Validation(msg) => Self::new(StatusLevel::Danger, msg.clone()),
            Error::DirectoryUnavailable(_) | Error::Timeout(_) => Self::new(
                StatusLevel::Danger,
                "The directory service could not be reached. Please try again later.",
            ),
            Error::BindFailed(_) => Self::new(
                StatusLevel::Danger,
                "The directory service refused the connection. Please try again later.",
            ),
            Error::NotFound(subject) => Self::new(
                StatusLevel::Warning,
                format!("Unable to find the user {subject}"),
            ),
            Error::AmbiguousMatch { subject, .. } => Self::new(
                StatusLevel::Warning,
                format!("The request for {subject} matched more than one account and cannot proceed"),
            ),
            Error::WriteRejected(_) => Self::new(
                StatusLevel::Danger,
                "The password could not be updated. Please contact your administrator.",
            ),
            Error::TokenMismatch | Error::SessionExpired => Self::new(
                StatusLevel::Danger,
                "No pending password change request was found for this confirmation",
            ),
            Error::MailError(_) => Self::new(
                StatusLevel::Warning,
                "The notification email could not be sent.",
            ),
            Error::ConfigError(_) | Error::InvalidDn(_) | Error::Internal(_) => {
                Self::new(StatusLevel::Danger, "An internal error occurred.")
            }
        }
    }
}

/// Ordered collection of status messages produced by one workflow phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    entries: Vec<Status>,
}

impl StatusReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a success message.
    pub fn success(&mut self, text: impl Into<String>) {
        self.entries.push(Status::new(StatusLevel::Success, text));
    }

    /// Appends an informational message.
    pub fn info(&mut self, text: impl Into<String>) {
        self.entries.push(Status::new(StatusLevel::Info, text));
    }

    /// Appends a warning message.
    pub fn warning(&mut self, text: impl Into<String>) {
        self.entries.push(Status::new(StatusLevel::Warning, text));
    }

    /// Appends a danger message.
    pub fn danger(&mut self, text: impl Into<String>) {
        self.entries.push(Status::new(StatusLevel::Danger, text));
    }

    /// Appends the user-facing rendering of an error.
    pub fn push_error(&mut self, err: &Error) {
        self.entries.push(Status::from(err));
    }

    /// Returns true if any entry blocks the workflow (warning or danger).
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries
            .iter()
            .any(|s| matches!(s.level, StatusLevel::Warning | StatusLevel::Danger))
    }

    /// Returns the recorded entries in order.
    #[must_use]
    pub fn entries(&self) -> &[Status] {
        &self.entries
    }

    /// Returns true if no messages were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_presentation_classes() {
        assert_eq!(StatusLevel::Success.css_class(), "bg-success");
        assert_eq!(StatusLevel::Info.css_class(), "bg-info");
        assert_eq!(StatusLevel::Warning.css_class(), "bg-warning");
        assert_eq!(StatusLevel::Danger.css_class(), "bg-danger");
    }

    #[test]
    fn report_records_in_order() {
        let mut report = StatusReport::new();
        report.success("User jdupont found");
        report.info("A confirmation e-mail has been sent");
        assert_eq!(report.len(), 2);
        assert_eq!(report.entries()[0].level, StatusLevel::Success);
        assert_eq!(report.entries()[1].level, StatusLevel::Info);
        assert!(!report.has_failures());
    }

    #[test]
    fn warnings_and_dangers_are_failures() {
        let mut report = StatusReport::new();
        report.success("ok");
        assert!(!report.has_failures());
        report.warning("no match");
        assert!(report.has_failures());

        let mut report = StatusReport::new();
        report.danger("no identifier supplied");
        assert!(report.has_failures());
    }

    #[test]
    fn connection_errors_render_generically() {
        let status = Status::from(&Error::DirectoryUnavailable(
            "ldaps://internal-host:636 refused".to_string(),
        ));
        assert_eq!(status.level, StatusLevel::Danger);
        assert!(!status.text.contains("internal-host"));
    }

    #[test]
    fn mismatch_and_expiry_render_identically() {
        let mismatch = Status::from(&Error::TokenMismatch);
        let expired = Status::from(&Error::SessionExpired);
        assert_eq!(mismatch, expired);
    }

    #[test]
    fn not_found_is_a_warning() {
        let status = Status::from(&Error::NotFound("jdupont".to_string()));
        assert_eq!(status.level, StatusLevel::Warning);
        assert!(status.text.contains("jdupont"));
    }

    #[test]
    fn report_serializes() {
        let mut report = StatusReport::new();
        report.warning("Unable to find the user jdupont");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("warning"));
        assert!(json.contains("jdupont"));
    }
}
