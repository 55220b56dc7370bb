use chrono::{NaiveDate, NaiveTime};
use std::path::Path;

use crate::error::{ClinicError, Result};
use crate::models::{NewMedicalRecord, DATE_FORMAT, TIME_FORMAT};

/// Maximum accepted patient name length
pub const MAX_NAME_LEN: usize = 100;

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate patient name
    pub fn validate_patient_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ClinicError::Validation("Please enter the patient's name".to_string()));
        }

        if name.chars().count() > MAX_NAME_LEN {
            return Err(ClinicError::Validation(format!(
                "Patient name too long (max {MAX_NAME_LEN} characters)"
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(ClinicError::Validation(
                "Patient name contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate and parse a `YYYY-MM-DD` date
    pub fn validate_date(date: &str) -> Result<NaiveDate> {
        let trimmed = date.trim();
        if trimmed.is_empty() {
            return Err(ClinicError::Validation("Pick a date first".to_string()));
        }

        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map_err(|_| ClinicError::InvalidDate(date.to_string()))
    }

    /// Validate and parse an `HH:MM` time
    pub fn validate_time(time: &str) -> Result<NaiveTime> {
        let trimmed = time.trim();
        if trimmed.is_empty() {
            return Err(ClinicError::Validation("Pick a time first".to_string()));
        }

        NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
            .map_err(|_| ClinicError::InvalidTime(time.to_string()))
    }

    /// Validate a medical record before it is stored
    pub fn validate_record(record: &NewMedicalRecord) -> Result<()> {
        if record.doctor_name.trim().is_empty() || record.diagnosis.trim().is_empty() {
            return Err(ClinicError::Validation(
                "Please fill in doctor name and diagnosis".to_string(),
            ));
        }

        if !record.visit_date.trim().is_empty() {
            Self::validate_date(&record.visit_date)?;
        }

        Ok(())
    }

    /// Validate the on-disk database path
    pub fn validate_database_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.trim().is_empty() {
            return Err(ClinicError::Config("Database path cannot be empty".to_string()));
        }

        if path.is_dir() {
            return Err(ClinicError::Config(format!(
                "Database path is a directory: {}",
                path.display()
            )));
        }

        if path_str.len() > 4096 {
            return Err(ClinicError::Config("Database path too long (max 4096 characters)".to_string()));
        }

        Ok(())
    }

    /// Sanitize free-text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
