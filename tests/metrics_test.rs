//! Comprehensive unit tests for metrics.rs module

use std::sync::Arc;
use std::time::Duration;

use clinic_booking::metrics::{MetricsCollector, MetricsSnapshot, MetricsTimer};

#[test]
fn test_metrics_collector_default() {
    assert_eq!(MetricsCollector::default().snapshot(), MetricsSnapshot::default());
}

#[test]
fn test_metrics_initialization() {
    assert!(MetricsCollector::init().is_ok());
}

#[test]
fn test_record_store_operation_failure() {
    let collector = MetricsCollector::default();
    collector.record_store_operation("insert_appointment", Duration::from_millis(5), true);
    collector.record_store_operation("list_appointments", Duration::from_millis(5), false);

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.store_operations, 2);
    assert_eq!(snapshot.store_errors, 1);
}

#[test]
fn test_record_bookings_and_cancellations() {
    let collector = MetricsCollector::default();
    collector.record_booking("cardiology");
    collector.record_booking("General");
    collector.record_cancellation();

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.bookings, 2);
    assert_eq!(snapshot.cancellations, 1);
}

#[test]
fn test_record_chat_requests() {
    let collector = MetricsCollector::default();
    collector.record_chat_request(Duration::from_secs(7), 3, false);
    collector.record_chat_request(Duration::from_millis(40), 0, true);

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.chat_requests, 2);
    assert_eq!(snapshot.chat_retries, 3);
    assert_eq!(snapshot.chat_fallbacks, 1);
}

#[test]
fn test_metrics_timer() {
    let collector = MetricsCollector::shared();
    let timer = MetricsTimer::new(Arc::clone(&collector), "delete_appointment");
    std::thread::sleep(Duration::from_millis(2));
    timer.finish(true);

    assert_eq!(collector.snapshot().store_operations, 1);
}
