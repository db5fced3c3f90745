//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// These represent misconfiguration rather than runtime failure: an
/// unknown specialty or context type means a caller wired the system
/// wrong, so they surface to the immediate caller instead of being
/// encoded into a degraded result record.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown specialty: {0}")]
    UnknownSpecialty(String),

    #[error("Unknown context type: {0}")]
    UnknownContextType(String),

    #[error("Unknown request kind: {0}")]
    UnknownRequestKind(String),

    #[error("Invalid finding: {0}")]
    InvalidFinding(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
