//! Error types for the triage pipeline

use thiserror::Error;

/// Result type alias using `TriageError`.
pub type Result<T> = std::result::Result<T, TriageError>;

/// Errors surfaced to callers of the triage core.
///
/// Collaborator failures are deliberately absent: they are absorbed by the
/// pipeline and recorded in the audit trail instead.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Malformed input rejected before any stage runs.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Detection policy violates its own invariants.
    #[error("Invalid detection policy: {0}")]
    Config(String),

    /// Unexpected fault while a case was in flight. No partial case escapes.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TriageError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn stage_violation(case_id: &str, expected: &str, actual: &str) -> Self {
        Self::Internal(format!(
            "stage order violation in {}: expected '{}', got '{}'",
            case_id, expected, actual
        ))
    }

    /// Whether the caller sent bad input (as opposed to a server-side fault).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
