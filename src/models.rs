//! Data models for appointments, medical records and chat turns
//!
//! This module contains the data structures shared by the store, the booking
//! workflow, the appointment list and the chat assistant.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Storage format of appointment dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format of appointment times
pub const TIME_FORMAT: &str = "%H:%M";
/// Department shown for rows booked without one
pub const DEFAULT_DEPARTMENT: &str = "General";

/// A stored appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Surrogate key assigned by the store
    pub id: i64,
    /// Name of the patient the slot is booked for
    pub patient_name: String,
    /// Identifier from the doctor directory
    pub doctor_id: String,
    /// Doctor display name at booking time
    pub doctor_name: String,
    /// Department identifier at booking time
    pub department: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Wall-clock start time, `HH:MM`
    pub time: String,
}

impl Appointment {
    /// Combined local date and time, or `None` when either part does not parse.
    #[must_use]
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        combine(&self.date, &self.time)
    }

    /// Department label for display, falling back to "General".
    #[must_use]
    pub fn department_or_default(&self) -> &str {
        if self.department.trim().is_empty() {
            DEFAULT_DEPARTMENT
        } else {
            &self.department
        }
    }
}

/// Data for creating a new appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    /// Name of the patient the slot is booked for
    pub patient_name: String,
    /// Identifier from the doctor directory
    pub doctor_id: String,
    /// Doctor display name
    pub doctor_name: String,
    /// Department identifier
    pub department: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Wall-clock start time, `HH:MM`
    pub time: String,
}

impl NewAppointment {
    /// Attach the store-assigned id.
    #[must_use]
    pub fn with_id(self, id: i64) -> Appointment {
        Appointment {
            id,
            patient_name: self.patient_name,
            doctor_id: self.doctor_id,
            doctor_name: self.doctor_name,
            department: self.department,
            date: self.date,
            time: self.time,
        }
    }
}

/// Parse a stored date and time into one local timestamp.
///
/// Times are accepted as `HH:MM` or `HH:MM:SS`. Anything else yields `None`.
#[must_use]
pub fn combine(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    let time = time.trim();
    let time = NaiveTime::parse_from_str(time, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .ok()?;
    Some(date.and_time(time))
}

/// A patient medical record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    /// Record identifier (millisecond timestamp at creation)
    pub id: String,
    /// Visit date, `YYYY-MM-DD`
    pub visit_date: String,
    /// Treating doctor
    pub doctor_name: String,
    /// Diagnosis text
    pub diagnosis: String,
    /// Prescription text
    pub prescription: String,
    /// Known allergies
    pub allergies: String,
    /// Relevant history
    pub medical_history: String,
}

/// Data for creating a new medical record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMedicalRecord {
    /// Visit date, `YYYY-MM-DD`; empty means today
    pub visit_date: String,
    /// Treating doctor (required)
    pub doctor_name: String,
    /// Diagnosis text (required)
    pub diagnosis: String,
    /// Prescription text
    pub prescription: String,
    /// Known allergies
    pub allergies: String,
    /// Relevant history
    pub medical_history: String,
}

/// Who wrote a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person using the app
    User,
    /// The assistant
    Bot,
}

impl Sender {
    /// Role name used by the completion API
    #[must_use]
    pub const fn role(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "assistant",
        }
    }
}

/// One turn of the in-memory conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the turn
    pub sender: Sender,
    /// Turn text
    pub text: String,
}

impl ChatMessage {
    /// A turn typed by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// A turn produced by the assistant
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}
