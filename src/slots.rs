//! Daily slot catalog
//!
//! Every day and every doctor share the same sixteen 30-minute start times,
//! 09:00 through 16:30. The catalog never looks at the store; marking slots
//! as taken is left to callers through [`slot_board`].

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::error::{ClinicError, Result};
use crate::models::{Appointment, TIME_FORMAT};
use crate::validation::InputValidator;

/// First bookable hour
pub const OPENING_HOUR: u32 = 9;
/// Length of one slot in minutes
pub const SLOT_MINUTES: u32 = 30;
/// Number of slots per day
pub const SLOTS_PER_DAY: u32 = 16;

/// The bookable start times of a day, earliest first.
#[must_use]
pub fn daily_slots() -> Vec<NaiveTime> {
    (0..SLOTS_PER_DAY)
        .filter_map(|i| {
            let minutes = i * SLOT_MINUTES;
            NaiveTime::from_hms_opt(OPENING_HOUR + minutes / 60, minutes % 60, 0)
        })
        .collect()
}

/// Slot start times formatted as `HH:MM`.
#[must_use]
pub fn daily_slot_labels() -> Vec<String> {
    daily_slots()
        .into_iter()
        .map(|t| t.format(TIME_FORMAT).to_string())
        .collect()
}

/// True if `time` is one of the catalog start times.
#[must_use]
pub fn is_slot(time: NaiveTime) -> bool {
    daily_slots().contains(&time)
}

/// Parse an `HH:MM` label and check it against the catalog.
pub fn parse_slot(label: &str) -> Result<NaiveTime> {
    let time = InputValidator::validate_time(label)?;
    if !is_slot(time) {
        return Err(ClinicError::Validation(format!(
            "{label} is not a bookable slot (09:00-16:30, every 30 minutes)"
        )));
    }
    Ok(time)
}

/// One catalog slot annotated for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    /// Slot start time
    pub time: NaiveTime,
    /// Already held by a stored appointment
    pub taken: bool,
}

/// The full catalog with each slot marked taken or free.
///
/// Taken slots stay in the board; whether they can still be picked is the
/// booking workflow's decision.
#[must_use]
pub fn slot_board(taken: &HashSet<NaiveTime>) -> Vec<SlotStatus> {
    daily_slots()
        .into_iter()
        .map(|time| SlotStatus {
            time,
            taken: taken.contains(&time),
        })
        .collect()
}

/// Start times already booked with `doctor_id` on `date`.
#[must_use]
pub fn taken_slots(appointments: &[Appointment], doctor_id: &str, date: NaiveDate) -> HashSet<NaiveTime> {
    appointments
        .iter()
        .filter(|a| a.doctor_id == doctor_id)
        .filter_map(Appointment::scheduled_at)
        .filter(|at| at.date() == date)
        .map(|at| at.time())
        .collect()
}
