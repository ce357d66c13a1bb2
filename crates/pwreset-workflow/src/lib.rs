//! # pwreset-workflow
//!
//! The two-phase credential reset state machine: token issue and
//! validation, credential generation, pending-request storage with expiry,
//! and the orchestrator that ties them to the directory client and
//! notification dispatcher.

#![deny(missing_docs)]

pub mod credential;
mod orchestrator;
mod random;
pub mod session;
pub mod token;

pub use orchestrator::{Directory, ResetWorkflow};
pub use session::{FailureReason, ResetSession, SessionStore, WorkflowState};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = pwreset_core::Result<T>;
