//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.
//! Column names keep the camelCase spelling of the on-device database so an
//! existing `appointments.db` opens without migration.

/// Appointments table schema
pub mod appointments {
    /// Table name
    pub const TABLE: &str = "appointments";
    /// Primary key column
    pub const ID: &str = "id";
    /// Patient name column
    pub const PATIENT_NAME: &str = "patientName";
    /// Doctor identifier column (not enforced as a foreign key)
    pub const DOCTOR_ID: &str = "doctorId";
    /// Doctor display name copied at booking time
    pub const DOCTOR_NAME: &str = "doctorName";
    /// Department identifier copied at booking time
    pub const DEPARTMENT: &str = "department";
    /// Appointment date column (`YYYY-MM-DD`)
    pub const DATE: &str = "date";
    /// Appointment time column (`HH:MM`)
    pub const TIME: &str = "time";
}

/// Patient medical records table schema
pub mod patient_records {
    /// Table name
    pub const TABLE: &str = "patient_records";
    /// Primary key column
    pub const ID: &str = "id";
    /// Visit date column
    pub const VISIT_DATE: &str = "visitDate";
    /// Doctor name column
    pub const DOCTOR_NAME: &str = "doctorName";
    /// Diagnosis column
    pub const DIAGNOSIS: &str = "diagnosis";
    /// Prescription column
    pub const PRESCRIPTION: &str = "prescription";
    /// Allergies column
    pub const ALLERGIES: &str = "allergies";
    /// Medical history column
    pub const MEDICAL_HISTORY: &str = "medicalHistory";
}
