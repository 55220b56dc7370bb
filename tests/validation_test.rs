//! Comprehensive unit tests for validation.rs module

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use clinic_booking::error::ClinicError;
use clinic_booking::models::NewMedicalRecord;
use clinic_booking::validation::InputValidator;

#[test]
fn test_validate_patient_name_valid() {
    assert!(InputValidator::validate_patient_name("Jane Doe").is_ok());
}

#[test]
fn test_validate_patient_name_empty() {
    let err = InputValidator::validate_patient_name("").unwrap_err();
    assert_eq!(err.to_string(), "Please enter the patient's name");
}

#[test]
fn test_validate_patient_name_whitespace_only() {
    assert!(InputValidator::validate_patient_name("   ").is_err());
}

#[test]
fn test_validate_patient_name_too_long() {
    assert!(InputValidator::validate_patient_name(&"a".repeat(101)).is_err());
}

#[test]
fn test_validate_patient_name_exactly_100_chars() {
    assert!(InputValidator::validate_patient_name(&"a".repeat(100)).is_ok());
}

#[test]
fn test_validate_patient_name_with_control_chars() {
    assert!(InputValidator::validate_patient_name("Jane\0Doe").is_err());
    assert!(InputValidator::validate_patient_name("Jane\nDoe").is_err());
    assert!(InputValidator::validate_patient_name("Ja\u{1b}[31mne").is_err());
    assert!(InputValidator::validate_patient_name("Jane\tDoe").is_err());
    assert!(InputValidator::validate_patient_name("Ja\u{7}ne").is_err());
    assert!(InputValidator::validate_patient_name("Jane\u{7f}").is_err());
}

#[test]
fn test_validate_patient_name_unicode() {
    assert!(InputValidator::validate_patient_name("José Müller").is_ok());
}

#[test]
fn test_validate_date() {
    assert_eq!(
        InputValidator::validate_date("2030-01-01").unwrap(),
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    );
    assert!(matches!(InputValidator::validate_date("01/01/2030"), Err(ClinicError::InvalidDate(_))));
    assert!(matches!(InputValidator::validate_date("2030-02-30"), Err(ClinicError::InvalidDate(_))));
    assert!(matches!(InputValidator::validate_date(""), Err(ClinicError::Validation(_))));
}

#[test]
fn test_validate_time() {
    assert_eq!(
        InputValidator::validate_time("16:30").unwrap(),
        NaiveTime::from_hms_opt(16, 30, 0).unwrap()
    );
    assert!(matches!(InputValidator::validate_time("4pm"), Err(ClinicError::InvalidTime(_))));
    assert!(matches!(InputValidator::validate_time(" "), Err(ClinicError::Validation(_))));
}

#[test]
fn test_validate_record_requires_doctor_and_diagnosis() {
    let mut record = NewMedicalRecord {
        doctor_name: "Dr. Nancy Skin".to_string(),
        diagnosis: "Eczema".to_string(),
        ..NewMedicalRecord::default()
    };
    assert!(InputValidator::validate_record(&record).is_ok());

    record.diagnosis = " ".to_string();
    let err = InputValidator::validate_record(&record).unwrap_err();
    assert_eq!(err.to_string(), "Please fill in doctor name and diagnosis");
}

#[test]
fn test_validate_record_checks_visit_date() {
    let record = NewMedicalRecord {
        visit_date: "yesterday".to_string(),
        doctor_name: "Dr. Nancy Skin".to_string(),
        diagnosis: "Eczema".to_string(),
        ..NewMedicalRecord::default()
    };
    assert!(InputValidator::validate_record(&record).is_err());
}

#[test]
fn test_validate_database_path() {
    assert!(InputValidator::validate_database_path(Path::new("data/appointments.db")).is_ok());
    assert!(InputValidator::validate_database_path(Path::new("")).is_err());

    let dir = tempfile::tempdir().unwrap();
    assert!(InputValidator::validate_database_path(dir.path()).is_err());
}

#[test]
fn test_sanitize_text() {
    assert_eq!(InputValidator::sanitize_text("  Amoxicillin\u{7} 500mg \n"), "Amoxicillin 500mg");
    assert_eq!(InputValidator::sanitize_text("line one\nline two"), "line one\nline two");
}
