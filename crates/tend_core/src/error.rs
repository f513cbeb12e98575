//! Error types for the scheduling engine.

use miette::Diagnostic;
use thiserror::Error;

use crate::id::ReminderId;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Engine error types.
#[derive(Debug, Error, Diagnostic)]
pub enum CoreError {
    /// Malformed input: bad schedule shape, empty title, missing snooze
    /// duration. Surfaced to the caller, never silently corrected.
    #[error("Validation failed: {message}")]
    #[diagnostic(
        code(tend_core::validation),
        help("Check the schedule spec: weekly needs a non-empty weekday set, custom needs an interval of at least one day")
    )]
    Validation { message: String },

    /// Unknown reminder, or a reminder owned by a different user.
    #[error("Reminder not found: {id}")]
    #[diagnostic(
        code(tend_core::not_found),
        help("The reminder doesn't exist or belongs to another user")
    )]
    NotFound { id: String },

    /// Optimistic-concurrency conflict that survived the internal retry.
    #[error("Reminder {id} was modified concurrently")]
    #[diagnostic(
        code(tend_core::concurrent_modification),
        help("Another writer updated this reminder at the same time; re-read and retry the operation")
    )]
    ConcurrentModification { id: String },

    /// Storage backend failure.
    #[error("Store error: {0}")]
    #[diagnostic(code(tend_core::store))]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(id: &ReminderId) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Create a concurrent modification error.
    pub fn concurrent_modification(id: &ReminderId) -> Self {
        Self::ConcurrentModification { id: id.to_string() }
    }
}

/// Errors a [`ReminderStore`](crate::store::ReminderStore) implementation
/// may report. Backend-specific detail is flattened to a string so the
/// engine stays independent of any particular storage crate.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// No record with the given ID.
    #[error("record not found")]
    NotFound,

    /// The version check failed: another writer got there first.
    #[error("version conflict")]
    VersionConflict,

    /// Anything else the backend reports (I/O, SQL, serialization).
    #[error("backend error: {0}")]
    Backend(String),
}
