//! Clinic Booking - Appointments, Records and a Symptom Assistant
//!
//! A Rust library for booking clinic appointments against a local SQLite
//! store and chatting with an LLM-backed assistant.
//!
//! # Features
//!
//! - Static department and doctor directory
//! - Fixed 30-minute slot catalog and a booking state machine
//! - Upcoming appointments with two-step cancellation
//! - Patient medical records
//! - Chat completions with rate-limit backoff and department suggestions

/// Booking state machine
pub mod booking;
/// Chat assistant and completion client
pub mod chat;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Departments and doctors
pub mod directory;
/// Error types
pub mod error;
/// Symptom keyword matching
pub mod keywords;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Bookable time slots
pub mod slots;
/// Upcoming appointments list
pub mod upcoming;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use booking::{BookingConfirmation, BookingState, BookingWorkflow};
pub use chat::{ChatAssistant, CompletionClient, OpenAiClient, SendOutcome};
pub use config::AppConfig;
pub use db::Database;
pub use error::{ClinicError, Result};
pub use models::{Appointment, ChatMessage, MedicalRecord, NewAppointment, NewMedicalRecord};
pub use repository::{AppointmentRepository, SqliteAppointmentRepository};
pub use upcoming::AppointmentListView;
