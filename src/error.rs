use thiserror::Error;

use crate::domain::ComplianceVerdict;

/// Error taxonomy for the orchestration core.
///
/// Transport failures during quoting and feed/DLQ polling degrade gracefully
/// (logged, retried on the next natural trigger). Compliance and execution
/// failures are blocking conditions surfaced to the user.
#[derive(Error, Debug)]
pub enum PayflowError {
    // Quoting
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    // Compliance
    #[error("compliance check unavailable: {0}")]
    ComplianceUnavailable(String),

    /// A verdict, not a transport error. Carries the backend's reasoning and
    /// violation list verbatim; callers must render them unmodified.
    #[error("transfer blocked by compliance: {}", .0.reasoning)]
    ComplianceBlocked(ComplianceVerdict),

    // Settlement
    #[error("transfer execution failed: {0}")]
    ExecutionFailed(String),

    // Polling loops
    #[error("feed poll failed: {0}")]
    FeedPollFailed(String),

    #[error("dead-letter poll failed: {0}")]
    DlqPollFailed(String),

    #[error("approval dispatch failed for {id}: {reason}")]
    ApprovalDispatchFailed { id: String, reason: String },

    #[error("retry dispatch failed for task {task_id}: {reason}")]
    RetryDispatchFailed { task_id: String, reason: String },

    #[error("retry already pending for task {0}")]
    RetryAlreadyPending(String),

    // Orchestrator state machine
    #[error("a transfer is already in flight")]
    Busy,

    #[error("intent incomplete: {0}")]
    InvalidIntent(String),

    #[error("invalid transition: cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    // Bridge exits
    #[error("exit {exit_id} is still in its challenge period")]
    ChallengePeriodActive {
        exit_id: String,
        remaining_secs: Option<u64>,
    },
}

pub type Result<T> = std::result::Result<T, PayflowError>;
