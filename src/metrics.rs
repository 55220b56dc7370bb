use anyhow::Result;
use metrics::{counter, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metric names
pub mod names {
    /// Store operations by operation and status
    pub const STORE_OPERATIONS_TOTAL: &str = "clinic_store_operations_total";
    /// Store operation latency
    pub const STORE_OPERATION_DURATION: &str = "clinic_store_operation_duration_seconds";
    /// Confirmed bookings
    pub const BOOKINGS_TOTAL: &str = "clinic_bookings_total";
    /// Cancelled appointments
    pub const CANCELLATIONS_TOTAL: &str = "clinic_cancellations_total";
    /// Outbound completion requests
    pub const CHAT_REQUESTS_TOTAL: &str = "clinic_chat_requests_total";
    /// Rate-limit retries
    pub const CHAT_RETRIES_TOTAL: &str = "clinic_chat_retries_total";
    /// Replies replaced by the fallback message
    pub const CHAT_FALLBACKS_TOTAL: &str = "clinic_chat_fallbacks_total";
    /// Completion round-trip latency, retries included
    pub const CHAT_DURATION: &str = "clinic_chat_duration_seconds";
    /// Errors by type
    pub const ERRORS_TOTAL: &str = "clinic_errors_total";
}

/// Metrics collection and management
///
/// Every event is forwarded to the `metrics` facade and also tallied locally,
/// so tests and the CLI can read counts without installing an exporter.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    store_operations: AtomicU64,
    store_errors: AtomicU64,
    bookings: AtomicU64,
    cancellations: AtomicU64,
    chat_requests: AtomicU64,
    chat_retries: AtomicU64,
    chat_fallbacks: AtomicU64,
}

/// Point-in-time copy of the local tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Store operations attempted
    pub store_operations: u64,
    /// Store operations that failed
    pub store_errors: u64,
    /// Bookings confirmed
    pub bookings: u64,
    /// Appointments cancelled
    pub cancellations: u64,
    /// Chat messages sent to the completion service
    pub chat_requests: u64,
    /// Rate-limit retries performed
    pub chat_retries: u64,
    /// Replies that degraded to the fallback text
    pub chat_fallbacks: u64,
}

impl MetricsCollector {
    /// Create a shareable collector
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Initialize metrics collection
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|_| anyhow::anyhow!("Failed to initialize metrics recorder: already installed"))?;

        Ok(())
    }

    /// Record store operation metrics
    pub fn record_store_operation(&self, operation: &'static str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };

        counter!(names::STORE_OPERATIONS_TOTAL, "operation" => operation, "status" => status).increment(1);
        histogram!(names::STORE_OPERATION_DURATION, "operation" => operation).record(duration.as_secs_f64());
        self.store_operations.fetch_add(1, Ordering::Relaxed);

        if !success {
            self.record_error("database", operation);
            self.store_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a confirmed booking
    pub fn record_booking(&self, department: &str) {
        counter!(names::BOOKINGS_TOTAL, "department" => department.to_string()).increment(1);
        self.bookings.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cancelled appointment
    pub fn record_cancellation(&self) {
        counter!(names::CANCELLATIONS_TOTAL).increment(1);
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one chat exchange with the completion service
    pub fn record_chat_request(&self, duration: Duration, retries: u32, fell_back: bool) {
        counter!(names::CHAT_REQUESTS_TOTAL).increment(1);
        counter!(names::CHAT_RETRIES_TOTAL).increment(u64::from(retries));
        histogram!(names::CHAT_DURATION).record(duration.as_secs_f64());
        self.chat_requests.fetch_add(1, Ordering::Relaxed);
        self.chat_retries.fetch_add(u64::from(retries), Ordering::Relaxed);

        if fell_back {
            counter!(names::CHAT_FALLBACKS_TOTAL).increment(1);
            self.record_error("completion", "chat");
            self.chat_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &'static str, operation: &'static str) {
        counter!(names::ERRORS_TOTAL, "type" => error_type, "operation" => operation).increment(1);
    }

    /// Read the local tallies
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            store_operations: self.store_operations.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            bookings: self.bookings.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            chat_requests: self.chat_requests.load(Ordering::Relaxed),
            chat_retries: self.chat_retries.load(Ordering::Relaxed),
            chat_fallbacks: self.chat_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Performance timing wrapper for store metrics
pub struct MetricsTimer {
    collector: Arc<MetricsCollector>,
    operation: &'static str,
    start: Instant,
}

impl MetricsTimer {
    /// Start timing `operation`
    #[must_use]
    pub fn new(collector: Arc<MetricsCollector>, operation: &'static str) -> Self {
        Self {
            collector,
            operation,
            start: Instant::now(),
        }
    }

    /// Stop timing and record the outcome
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed();
        self.collector.record_store_operation(self.operation, duration, success);
    }
}
