//! Booking workflow
//!
//! Tracks one in-progress booking: the doctor it was opened for, the picked
//! date and slot, and the patient name. `confirm` is the only step with a side
//! effect, and it leaves the workflow untouched on failure so the user can
//! retry without re-entering anything.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{error, info, warn};

use crate::directory::{self, Doctor};
use crate::error::{ClinicError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{NewAppointment, DATE_FORMAT, DEFAULT_DEPARTMENT, TIME_FORMAT};
use crate::repository::AppointmentRepository;
use crate::slots;
use crate::validation::InputValidator;

/// Where the selection currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    /// Nothing picked yet; no slots are shown
    NoDateSelected,
    /// A date is picked; the slot list is shown
    DateSelected {
        /// Picked date
        date: NaiveDate,
    },
    /// A date and a slot are picked
    TimeSelected {
        /// Picked date
        date: NaiveDate,
        /// Picked slot start
        time: NaiveTime,
    },
}

/// The doctor a booking screen was opened for, as carried by navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorRef {
    /// Directory identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Department identifier, "General" when the directory has no entry
    pub department: String,
}

impl DoctorRef {
    /// Rebuild the doctor from navigation parameters.
    ///
    /// The id is required. A missing name is filled from the directory.
    #[must_use]
    pub fn from_params(id: Option<&str>, name: Option<&str>) -> Option<Self> {
        let id = id.map(str::trim).filter(|id| !id.is_empty())?;
        let listed = directory::doctor_by_id(id);
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string)
            .or_else(|| listed.map(|d| d.name.to_string()))?;
        let department = listed.map_or_else(|| DEFAULT_DEPARTMENT.to_string(), |d| d.department.to_string());

        Some(Self {
            id: id.to_string(),
            name,
            department,
        })
    }
}

impl From<&Doctor> for DoctorRef {
    fn from(doctor: &Doctor) -> Self {
        Self {
            id: doctor.id.to_string(),
            name: doctor.name.to_string(),
            department: doctor.department.to_string(),
        }
    }
}

/// Screen to show after a successful booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextScreen {
    /// Upcoming appointments list
    AppointmentList,
}

/// Result of a committed booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfirmation {
    /// Id assigned by the store
    pub appointment_id: i64,
    /// What was stored
    pub appointment: NewAppointment,
    /// Acknowledgement shown to the user
    pub message: String,
    /// Where to navigate next
    pub next: NextScreen,
}

/// State machine over a single in-progress booking
#[derive(Debug, Clone)]
pub struct BookingWorkflow {
    doctor: Option<DoctorRef>,
    state: BookingState,
    patient_name: String,
    prevent_double_booking: bool,
    metrics: Option<Arc<MetricsCollector>>,
}

impl BookingWorkflow {
    /// Start a booking from navigation parameters.
    ///
    /// Missing parameters do not fail here; `confirm` reports them.
    #[must_use]
    pub fn new(doctor_id: Option<&str>, doctor_name: Option<&str>) -> Self {
        Self::with_doctor(DoctorRef::from_params(doctor_id, doctor_name))
    }

    /// Start a booking for a directory doctor
    #[must_use]
    pub fn for_doctor(doctor: &Doctor) -> Self {
        Self::with_doctor(Some(doctor.into()))
    }

    fn with_doctor(doctor: Option<DoctorRef>) -> Self {
        Self {
            doctor,
            state: BookingState::NoDateSelected,
            patient_name: String::new(),
            prevent_double_booking: false,
            metrics: None,
        }
    }

    /// Refuse slots the same doctor already has booked
    #[must_use]
    pub fn prevent_double_booking(mut self, enabled: bool) -> Self {
        self.prevent_double_booking = enabled;
        self
    }

    /// Count confirmed bookings in `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Current selection state
    #[must_use]
    pub const fn state(&self) -> BookingState {
        self.state
    }

    /// Doctor being booked, if navigation delivered one
    #[must_use]
    pub const fn doctor(&self) -> Option<&DoctorRef> {
        self.doctor.as_ref()
    }

    /// Picked date
    #[must_use]
    pub const fn selected_date(&self) -> Option<NaiveDate> {
        match self.state {
            BookingState::NoDateSelected => None,
            BookingState::DateSelected { date } | BookingState::TimeSelected { date, .. } => Some(date),
        }
    }

    /// Picked slot
    #[must_use]
    pub const fn selected_time(&self) -> Option<NaiveTime> {
        match self.state {
            BookingState::TimeSelected { time, .. } => Some(time),
            _ => None,
        }
    }

    /// Patient name as typed
    #[must_use]
    pub fn patient_name(&self) -> &str {
        &self.patient_name
    }

    /// Pick a date. Any previously picked slot is cleared.
    pub fn select_date(&mut self, date: NaiveDate) {
        self.state = BookingState::DateSelected { date };
    }

    /// Pick a slot for the selected date.
    pub fn select_time(&mut self, time: NaiveTime) -> Result<()> {
        let Some(date) = self.selected_date() else {
            return Err(ClinicError::Validation("Pick a date before choosing a time".to_string()));
        };
        if !slots::is_slot(time) {
            return Err(ClinicError::Validation(format!(
                "{} is not a bookable slot",
                time.format(TIME_FORMAT)
            )));
        }

        self.state = BookingState::TimeSelected { date, time };
        Ok(())
    }

    /// Record the patient name
    pub fn set_patient_name(&mut self, name: impl Into<String>) {
        self.patient_name = name.into();
    }

    /// Slots to render: the full catalog once a date is picked, none before.
    #[must_use]
    pub fn visible_slots(&self) -> Vec<NaiveTime> {
        if self.selected_date().is_some() {
            slots::daily_slots()
        } else {
            Vec::new()
        }
    }

    /// True when name, date and time are all present
    #[must_use]
    pub fn can_confirm(&self) -> bool {
        !self.patient_name.trim().is_empty() && matches!(self.state, BookingState::TimeSelected { .. })
    }

    /// The row `confirm` would insert, after validation.
    pub fn pending_appointment(&self) -> Result<NewAppointment> {
        InputValidator::validate_patient_name(&self.patient_name)?;

        let BookingState::TimeSelected { date, time } = self.state else {
            return Err(ClinicError::Validation("Pick a date and time first".to_string()));
        };

        let doctor = self.doctor.as_ref().ok_or(ClinicError::MissingDoctor)?;

        Ok(NewAppointment {
            patient_name: self.patient_name.trim().to_string(),
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            department: doctor.department.clone(),
            date: date.format(DATE_FORMAT).to_string(),
            time: time.format(TIME_FORMAT).to_string(),
        })
    }

    /// Validate and commit the booking. Performs at most one insert.
    pub async fn confirm<R>(&self, repository: &R) -> Result<BookingConfirmation>
    where
        R: AppointmentRepository + ?Sized,
    {
        let appointment = self.pending_appointment().map_err(|e| {
            warn!(error = %e, "Booking rejected before reaching the store");
            e
        })?;

        if self.prevent_double_booking {
            self.ensure_slot_free(repository, &appointment).await?;
        }

        let appointment_id = repository.insert(appointment.clone()).await.map_err(|e| {
            error!(error = %e, doctor_id = %appointment.doctor_id, "Could not save appointment");
            ClinicError::storage("save your appointment", e)
        })?;

        if let Some(metrics) = &self.metrics {
            metrics.record_booking(&appointment.department);
        }
        info!(
            appointment_id,
            doctor_id = %appointment.doctor_id,
            date = %appointment.date,
            time = %appointment.time,
            "Appointment booked"
        );

        let message = format!(
            "Your appointment is set for {} at {}!",
            appointment.date, appointment.time
        );
        Ok(BookingConfirmation {
            appointment_id,
            appointment,
            message,
            next: NextScreen::AppointmentList,
        })
    }

    async fn ensure_slot_free<R>(&self, repository: &R, appointment: &NewAppointment) -> Result<()>
    where
        R: AppointmentRepository + ?Sized,
    {
        let existing = repository
            .list_all()
            .await
            .map_err(|e| ClinicError::storage("check slot availability", e))?;

        let clash = existing.iter().any(|a| {
            a.doctor_id == appointment.doctor_id && a.date == appointment.date && a.time == appointment.time
        });
        if clash {
            return Err(ClinicError::SlotTaken {
                doctor_id: appointment.doctor_id.clone(),
                date: appointment.date.clone(),
                time: appointment.time.clone(),
            });
        }
        Ok(())
    }
}
