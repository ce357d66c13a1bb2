//! Error types for the credential reset workflow.
//!
//! Every external-dependency failure in the workflow is represented here and
//! converted into a user-facing status message at the point of call; none of
//! these propagate as uncaught faults to whatever transport hosts the
//! workflow.

use serde::Serialize;
use thiserror::Error;

/// Main error type for reset workflow operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// User-supplied input failed validation (empty identifier or token)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The directory service could not be contacted
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// The directory rejected the bind credentials
    #[error("Directory bind failed: {0}")]
    BindFailed(String),

    /// A directory or mail operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// No directory entry matched the lookup
    #[error("Not found: {0}")]
    NotFound(String),

    /// The lookup matched more than one directory entry
    #[error("Ambiguous match for {subject}: {matches} entries")]
    AmbiguousMatch {
        /// What was being looked up (identifier or mail)
        subject: String,
        /// Number of entries returned
        matches: usize,
    },

    /// The directory rejected the password replace operation
    #[error("Directory write rejected: {0}")]
    WriteRejected(String),

    /// The presented confirmation token does not match the pending request
    #[error("Confirmation token does not match any pending request")]
    TokenMismatch,

    /// The pending request expired before confirmation
    #[error("Reset request expired")]
    SessionExpired,

    /// The mail relay refused or failed to accept a message
    #[error("Mail delivery failed: {0}")]
    MailError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A distinguished name could not be parsed
    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Specialized result type for reset workflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error response for serialization.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::DirectoryUnavailable(_) => "DIRECTORY_UNAVAILABLE",
            Self::BindFailed(_) => "BIND_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AmbiguousMatch { .. } => "AMBIGUOUS_MATCH",
            Self::WriteRejected(_) => "WRITE_REJECTED",
            Self::TokenMismatch => "TOKEN_MISMATCH",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::MailError(_) => "MAIL_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidDn(_) => "INVALID_DN",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Converts the error into an `ErrorResponse`.
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
            },
        }
    }

    /// Returns true if this error should be logged as a serious error.
    ///
    /// Lookup misses and token mismatches are expected business outcomes;
    /// infrastructure failures are not.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnavailable(_)
                | Self::BindFailed(_)
                | Self::Timeout(_)
                | Self::WriteRejected(_)
                | Self::MailError(_)
                | Self::ConfigError(_)
                | Self::Internal(_)
        )
    }

    /// Returns true if retrying the failed operation once may succeed.
    ///
    /// Only transient connection failures qualify. Bind rejections, lookup
    /// misses and write rejections are never retryable.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::DirectoryUnavailable(_) | Self::Timeout(_))
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
