//! Error types for the famsync engine.

use thiserror::Error;

use crate::event::CalendarId;

/// Errors that can occur while syncing calendars.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A parent or child calendar could not be read or written. Retried on the next pass.
    #[error("Calendar '{calendar}' unavailable: {reason}")]
    SourceUnavailable { calendar: String, reason: String },

    /// The backend refused a specific create/update/delete.
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// A child references a parent that is not configured.
    #[error("Child '{child}' references unknown parent '{parent}'")]
    ConfigurationInconsistency { child: CalendarId, parent: CalendarId },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Fails the whole pass before any child is processed.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    pub fn unavailable(calendar: impl ToString, reason: impl ToString) -> Self {
        SyncError::SourceUnavailable {
            calendar: calendar.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn rejected(reason: impl ToString) -> Self {
        SyncError::WriteRejected(reason.to_string())
    }
}

/// Result type alias for famsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
