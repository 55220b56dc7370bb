//! Upcoming appointments list
//!
//! Shows stored appointments that have not started yet, soonest first, and
//! handles the two-step cancel confirmation.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::error::{ClinicError, Result};
use crate::metrics::MetricsCollector;
use crate::models::Appointment;
use crate::repository::AppointmentRepository;

/// Title of the cancel confirmation
pub const DELETE_PROMPT_TITLE: &str = "Cancel Appointment";
/// Body of the cancel confirmation
pub const DELETE_PROMPT_MESSAGE: &str = "Are you sure you want to cancel this appointment?";

/// Source of "now" for filtering
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stopped at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Keep rows scheduled at or after `now`, soonest first.
///
/// Rows whose date or time does not parse are dropped. Rows with equal
/// timestamps keep their store order.
#[must_use]
pub fn upcoming(rows: Vec<Appointment>, now: NaiveDateTime) -> Vec<Appointment> {
    let mut kept: Vec<(NaiveDateTime, Appointment)> = rows
        .into_iter()
        .filter_map(|row| match row.scheduled_at() {
            Some(at) => Some((at, row)),
            None => {
                debug!(id = row.id, date = %row.date, time = %row.time, "Skipping unparseable appointment");
                None
            }
        })
        .filter(|(at, _)| *at >= now)
        .collect();

    kept.sort_by_key(|(at, _)| *at);
    kept.into_iter().map(|(_, row)| row).collect()
}

/// A pending cancel confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    /// Appointment the prompt is about
    pub appointment_id: i64,
    /// Prompt title
    pub title: &'static str,
    /// Prompt body
    pub message: &'static str,
}

/// Answer to a [`DeletePrompt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    /// Keep the appointment
    No,
    /// Cancel the appointment
    Yes,
}

/// What resolving a prompt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Row removed and list refreshed
    Deleted,
    /// Row was already gone; list refreshed
    Missing,
    /// User answered no
    Kept,
}

/// The appointment list screen
pub struct AppointmentListView<R> {
    repository: R,
    clock: Box<dyn Clock>,
    appointments: Vec<Appointment>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl<R: AppointmentRepository> AppointmentListView<R> {
    /// An empty list backed by `repository`; call [`Self::on_focus`] to load.
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            clock: Box::new(SystemClock),
            appointments: Vec::new(),
            metrics: None,
        }
    }

    /// Filter against `clock` instead of the system time
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Count cancellations in `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Rows currently displayed
    #[must_use]
    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// Reload from the store. Runs on mount and every time the screen regains focus.
    ///
    /// On failure the list is emptied and the error returned.
    pub async fn on_focus(&mut self) -> Result<&[Appointment]> {
        match self.repository.list_all().await {
            Ok(rows) => {
                self.appointments = upcoming(rows, self.clock.now());
                debug!(count = self.appointments.len(), "Upcoming appointments loaded");
                Ok(&self.appointments)
            }
            Err(e) => {
                error!(error = %e, "Failed to load appointments");
                self.appointments.clear();
                Err(ClinicError::storage("load your appointments", e))
            }
        }
    }

    /// First step of a cancel. `None` when the id is not on screen.
    #[must_use]
    pub fn request_delete(&self, appointment_id: i64) -> Option<DeletePrompt> {
        self.appointments
            .iter()
            .any(|a| a.id == appointment_id)
            .then_some(DeletePrompt {
                appointment_id,
                title: DELETE_PROMPT_TITLE,
                message: DELETE_PROMPT_MESSAGE,
            })
    }

    /// Second step of a cancel.
    ///
    /// A failed delete leaves the list as it was.
    pub async fn resolve_delete(&mut self, prompt: DeletePrompt, choice: PromptChoice) -> Result<DeleteOutcome> {
        if choice == PromptChoice::No {
            return Ok(DeleteOutcome::Kept);
        }

        let id = prompt.appointment_id;
        let deleted = self.repository.delete_by_id(id).await.map_err(|e| {
            error!(error = %e, appointment_id = id, "Failed to delete appointment");
            ClinicError::storage("cancel your appointment", e)
        })?;

        if deleted {
            info!(appointment_id = id, "Appointment cancelled");
            if let Some(metrics) = &self.metrics {
                metrics.record_cancellation();
            }
        } else {
            warn!(appointment_id = id, "Appointment was already gone");
        }

        let refreshed = self.on_focus().await.map(|_| ());
        if let Err(e) = refreshed {
            // The delete itself succeeded; keep what we had minus the row.
            warn!(error = %e, "Refresh after delete failed");
            self.appointments.retain(|a| a.id != id);
        }

        Ok(if deleted {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::Missing
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(id: i64, date: &str, time: &str) -> Appointment {
        Appointment {
            id,
            patient_name: "Jane".into(),
            doctor_id: "cardiology-1".into(),
            doctor_name: "Dr. Alice Heart".into(),
            department: "cardiology".into(),
            date: date.into(),
            time: time.into(),
        }
    }

    fn noon(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn past_rows_are_hidden_and_future_rows_sorted() {
        let rows = vec![
            row(1, "2030-01-03", "09:00"),
            row(2, "2030-01-01", "09:00"),
            row(3, "2030-01-02", "16:30"),
            row(4, "2030-01-02", "09:00"),
        ];
        let ids: Vec<i64> = upcoming(rows, noon(1)).iter().map(|a| a.id).collect();
        assert_eq!(ids, [4, 3, 1]);
    }

    #[test]
    fn the_current_minute_still_counts() {
        let rows = vec![row(1, "2030-01-01", "12:00")];
        assert_eq!(upcoming(rows, noon(1)).len(), 1);
    }

    #[test]
    fn unparseable_rows_are_dropped() {
        let rows = vec![row(1, "someday", "09:00"), row(2, "2030-01-05", "later"), row(3, "2030-01-05", "10:00")];
        let ids: Vec<i64> = upcoming(rows, noon(1)).iter().map(|a| a.id).collect();
        assert_eq!(ids, [3]);
    }

    #[test]
    fn ties_keep_store_order() {
        let rows = vec![row(9, "2030-01-05", "10:00"), row(2, "2030-01-05", "10:00")];
        let ids: Vec<i64> = upcoming(rows, noon(1)).iter().map(|a| a.id).collect();
        assert_eq!(ids, [9, 2]);
    }
}
