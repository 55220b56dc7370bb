//! Error types for the clinic-booking library.
//!
//! This module provides custom error types using `thiserror` so that storage,
//! validation and booking failures can be told apart and turned into the
//! user-facing alerts the screens show.

use thiserror::Error;

/// Errors that can occur in the clinic-booking application.
#[derive(Error, Debug)]
pub enum ClinicError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The local store could not be opened or its schema could not be created
    #[error("Could not initialize database: {0}")]
    StorageInit(String),

    /// A store operation failed while serving a user action
    #[error("Could not {action}: {source}")]
    Storage {
        /// What the user was trying to do, e.g. "save your appointment"
        action: &'static str,
        /// Underlying failure
        #[source]
        source: Box<ClinicError>,
    },

    /// Input rejected before any side effect
    #[error("{0}")]
    Validation(String),

    /// The booking flow lost the doctor it was started for
    #[error("No doctor selected for this booking")]
    MissingDoctor,

    /// The slot is already held by another appointment with the same doctor
    #[error("{date} at {time} is already booked with {doctor_id}")]
    SlotTaken {
        /// Doctor identifier
        doctor_id: String,
        /// Appointment date
        date: String,
        /// Appointment time
        time: String,
    },

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid time format
    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A blocking store task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl ClinicError {
    /// Wrap a store failure with the user action it interrupted.
    #[must_use]
    pub fn storage(action: &'static str, source: Self) -> Self {
        Self::Storage {
            action,
            source: Box::new(source),
        }
    }

    /// True for errors the user can fix by correcting their input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidDate(_) | Self::InvalidTime(_) | Self::SlotTaken { .. }
        )
    }
}

/// Convenience type alias for Result with ClinicError
pub type Result<T> = std::result::Result<T, ClinicError>;

impl From<anyhow::Error> for ClinicError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_names_the_action() {
        let err = ClinicError::storage("save your appointment", ClinicError::Other("disk full".into()));
        assert_eq!(err.to_string(), "Could not save your appointment: disk full");
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_errors_are_flagged() {
        assert!(ClinicError::Validation("Please enter your name".into()).is_validation());
        assert!(ClinicError::InvalidTime("25:00".into()).is_validation());
        assert!(!ClinicError::MissingDoctor.is_validation());
    }
}
