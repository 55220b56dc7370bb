//! Integration tests for the upcoming appointments list

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use clinic_booking::db::Database;
use clinic_booking::error::{ClinicError, Result};
use clinic_booking::metrics::MetricsCollector;
use clinic_booking::models::{Appointment, NewAppointment};
use clinic_booking::repository::{AppointmentRepository, SqliteAppointmentRepository};
use clinic_booking::upcoming::{
    upcoming, AppointmentListView, DeleteOutcome, FixedClock, PromptChoice, DELETE_PROMPT_MESSAGE,
    DELETE_PROMPT_TITLE,
};
use mockall::mock;
use proptest::prelude::*;

mock! {
    pub Repo {}

    #[async_trait]
    impl AppointmentRepository for Repo {
        async fn insert(&self, appointment: NewAppointment) -> Result<i64>;
        async fn list_all(&self) -> Result<Vec<Appointment>>;
        async fn delete_by_id(&self, id: i64) -> Result<bool>;
    }
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2030, 1, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap()
}

fn booking(date: &str, time: &str) -> NewAppointment {
    NewAppointment {
        patient_name: "Jane".to_string(),
        doctor_id: "cardiology-1".to_string(),
        doctor_name: "Dr. Alice Heart".to_string(),
        department: "cardiology".to_string(),
        date: date.to_string(),
        time: time.to_string(),
    }
}

async fn seeded(rows: &[(&str, &str)]) -> (Arc<SqliteAppointmentRepository>, Vec<i64>) {
    let database = Database::open_in_memory().expect("open");
    database.initialize().expect("init");
    let repository = Arc::new(SqliteAppointmentRepository::new(Arc::new(database)));

    let mut ids = Vec::new();
    for (date, time) in rows {
        ids.push(repository.insert(booking(date, time)).await.expect("insert"));
    }
    (repository, ids)
}

#[tokio::test]
async fn test_focus_shows_only_future_rows_soonest_first() {
    let (repository, ids) = seeded(&[
        ("2030-01-05", "10:00"),
        ("2029-12-31", "09:00"),
        ("2030-01-02", "09:30"),
        ("not-a-date", "09:00"),
    ])
    .await;

    let mut view = AppointmentListView::new(repository).with_clock(FixedClock(at(1, 12, 0)));
    let shown: Vec<i64> = view.on_focus().await.expect("load").iter().map(|a| a.id).collect();

    assert_eq!(shown, vec![ids[2], ids[0]]);
}

#[tokio::test]
async fn test_focus_picks_up_rows_added_elsewhere() {
    let (repository, _) = seeded(&[("2030-01-05", "10:00")]).await;
    let mut view = AppointmentListView::new(Arc::clone(&repository)).with_clock(FixedClock(at(1, 12, 0)));
    assert_eq!(view.on_focus().await.expect("load").len(), 1);

    repository.insert(booking("2030-01-03", "11:00")).await.expect("insert");
    assert_eq!(view.appointments().len(), 1);

    let dates: Vec<String> = view.on_focus().await.expect("reload").iter().map(|a| a.date.clone()).collect();
    assert_eq!(dates, vec!["2030-01-03", "2030-01-05"]);
}

#[tokio::test]
async fn test_delete_requires_confirmation() {
    let (repository, ids) = seeded(&[("2030-01-05", "10:00"), ("2030-01-06", "10:00")]).await;
    let metrics = MetricsCollector::shared();
    let mut view = AppointmentListView::new(Arc::clone(&repository))
        .with_clock(FixedClock(at(1, 12, 0)))
        .with_metrics(Arc::clone(&metrics));
    view.on_focus().await.expect("load");

    let prompt = view.request_delete(ids[0]).expect("row is on screen");
    assert_eq!(prompt.title, DELETE_PROMPT_TITLE);
    assert_eq!(prompt.message, DELETE_PROMPT_MESSAGE);

    let outcome = view.resolve_delete(prompt.clone(), PromptChoice::No).await.expect("no");
    assert_eq!(outcome, DeleteOutcome::Kept);
    assert_eq!(repository.list_all().await.expect("list").len(), 2);

    let outcome = view.resolve_delete(prompt, PromptChoice::Yes).await.expect("yes");
    assert_eq!(outcome, DeleteOutcome::Deleted);
    let remaining: Vec<i64> = view.appointments().iter().map(|a| a.id).collect();
    assert_eq!(remaining, vec![ids[1]]);
    assert_eq!(metrics.snapshot().cancellations, 1);
}

#[tokio::test]
async fn test_unknown_id_has_no_prompt() {
    let (repository, _) = seeded(&[("2030-01-05", "10:00")]).await;
    let mut view = AppointmentListView::new(repository).with_clock(FixedClock(at(1, 12, 0)));
    view.on_focus().await.expect("load");
    assert!(view.request_delete(999).is_none());
}

#[tokio::test]
async fn test_row_deleted_elsewhere_is_reported_missing() {
    let (repository, ids) = seeded(&[("2030-01-05", "10:00")]).await;
    let mut view = AppointmentListView::new(Arc::clone(&repository)).with_clock(FixedClock(at(1, 12, 0)));
    view.on_focus().await.expect("load");
    let prompt = view.request_delete(ids[0]).expect("prompt");

    repository.delete_by_id(ids[0]).await.expect("concurrent delete");

    let outcome = view.resolve_delete(prompt, PromptChoice::Yes).await.expect("resolve");
    assert_eq!(outcome, DeleteOutcome::Missing);
    assert!(view.appointments().is_empty());
}

#[tokio::test]
async fn test_failed_delete_leaves_list_unchanged() {
    let mut repo = MockRepo::new();
    repo.expect_list_all().times(1).returning(|| Ok(vec![booking("2030-01-05", "10:00").with_id(3)]));
    repo.expect_delete_by_id()
        .times(1)
        .returning(|_| Err(ClinicError::Other("database is locked".to_string())));

    let mut view = AppointmentListView::new(repo).with_clock(FixedClock(at(1, 12, 0)));
    view.on_focus().await.expect("load");
    let prompt = view.request_delete(3).expect("prompt");

    let err = view.resolve_delete(prompt, PromptChoice::Yes).await.expect_err("delete fails");
    assert!(matches!(err, ClinicError::Storage { action: "cancel your appointment", .. }));
    assert_eq!(view.appointments().len(), 1);
}

#[tokio::test]
async fn test_failed_load_empties_the_list() {
    let mut repo = MockRepo::new();
    let mut first = true;
    repo.expect_list_all().times(2).returning(move || {
        if std::mem::take(&mut first) {
            Ok(vec![booking("2030-01-05", "10:00").with_id(1)])
        } else {
            Err(ClinicError::Other("disk I/O error".to_string()))
        }
    });

    let mut view = AppointmentListView::new(repo).with_clock(FixedClock(at(1, 12, 0)));
    assert_eq!(view.on_focus().await.expect("load").len(), 1);
    assert!(view.on_focus().await.is_err());
    assert!(view.appointments().is_empty());
}

fn slot_label(index: u32) -> String {
    format!("{:02}:{:02}", 9 + index / 2, (index % 2) * 30)
}

proptest! {
    #[test]
    fn prop_upcoming_is_sorted_and_never_in_the_past(
        rows in prop::collection::vec((1u32..=28, 0u32..16), 0..40),
        now_day in 1u32..=28,
        now_hour in 0u32..24,
    ) {
        let now = at(now_day, now_hour, 0);
        let appointments: Vec<Appointment> = rows
            .iter()
            .enumerate()
            .map(|(i, (day, slot))| {
                booking(&format!("2030-01-{day:02}"), &slot_label(*slot)).with_id(i as i64)
            })
            .collect();
        let expected = appointments
            .iter()
            .filter(|a| a.scheduled_at().is_some_and(|t| t >= now))
            .count();

        let shown = upcoming(appointments, now);

        prop_assert_eq!(shown.len(), expected);
        let times: Vec<NaiveDateTime> = shown.iter().filter_map(Appointment::scheduled_at).collect();
        prop_assert!(times.iter().all(|t| *t >= now));
        prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
}
