use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::{ClinicError, Result};
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::models::{Appointment, MedicalRecord, NewAppointment, NewMedicalRecord, DATE_FORMAT};
use crate::schema::{appointments, patient_records};
use crate::validation::InputValidator;

/// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
/// A connection checked out of [`DbPool`]
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

const CREATE_APPOINTMENTS: &str = include_str!("../migrations/2025-06-01-000000_create_appointments/up.sql");
const DROP_APPOINTMENTS: &str = include_str!("../migrations/2025-06-01-000000_create_appointments/down.sql");
const CREATE_PATIENT_RECORDS: &str = include_str!("../migrations/2025-06-01-000001_create_patient_records/up.sql");
const DROP_PATIENT_RECORDS: &str = include_str!("../migrations/2025-06-01-000001_create_patient_records/down.sql");

/// Local record store for appointments and medical records.
///
/// One instance is constructed at start-up and handed to whatever needs it.
/// The lifecycle is explicit: [`Database::open`], [`Database::initialize`],
/// then [`Database::close`] when the session ends.
pub struct Database {
    pool: DbPool,
    metrics: Arc<MetricsCollector>,
}

impl Database {
    /// Open (or create) the store at `path`.
    ///
    /// The schema is not touched; call [`Database::initialize`] next.
    pub fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let path = path.as_ref();
        InputValidator::validate_database_path(path)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ClinicError::StorageInit(format!("{}: {e}", parent.display())))?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(max_connections.max(1))
            .build(manager)
            .map_err(|e| ClinicError::StorageInit(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), max_connections, "Opened appointment store");
        Ok(Self {
            pool,
            metrics: MetricsCollector::shared(),
        })
    }

    /// Open a private in-memory store.
    ///
    /// The pool holds a single connection so every caller sees the same data.
    pub fn open_in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .map_err(|e| ClinicError::StorageInit(e.to_string()))?;

        debug!("Opened in-memory appointment store");
        Ok(Self {
            pool,
            metrics: MetricsCollector::shared(),
        })
    }

    /// Report store operations to `metrics` instead of a private collector.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Collector receiving this store's operation metrics
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Ensure the schema exists. Safe to call on every start.
    pub fn initialize(&self) -> Result<()> {
        let conn = self
            .get_connection()
            .map_err(|e| ClinicError::StorageInit(e.to_string()))?;
        Self::run_migrations(&conn).map_err(|e| ClinicError::StorageInit(e.to_string()))?;

        info!("Appointment store schema ready");
        Ok(())
    }

    /// Drop and recreate every table, discarding all stored data.
    ///
    /// Only runs when explicitly asked for (`database.reset_on_launch`).
    pub fn reset(&self) -> Result<()> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        tx.execute_batch(DROP_APPOINTMENTS)?;
        tx.execute_batch(DROP_PATIENT_RECORDS)?;
        Self::run_migrations(&tx)?;
        tx.commit()?;

        warn!("Appointment store was reset; all appointments and records were dropped");
        Ok(())
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(CREATE_APPOINTMENTS)?;
        conn.execute_batch(CREATE_PATIENT_RECORDS)?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// End the store's lifecycle. Pending connections are released.
    pub fn close(self) {
        let state = self.pool.state();
        info!(
            connections = state.connections,
            idle = state.idle_connections,
            "Closing appointment store"
        );
        drop(self.pool);
    }

    fn timed<T>(&self, operation: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let timer = MetricsTimer::new(Arc::clone(&self.metrics), operation);
        let result = f();
        timer.finish(result.is_ok());
        result
    }

    /// Append an appointment in a single transaction and return its id.
    pub fn insert_appointment(&self, appointment: &NewAppointment) -> Result<i64> {
        self.timed("insert_appointment", || {
            let mut conn = self.get_connection()?;
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?)",
                    appointments::TABLE,
                    appointments::PATIENT_NAME,
                    appointments::DOCTOR_ID,
                    appointments::DOCTOR_NAME,
                    appointments::DEPARTMENT,
                    appointments::DATE,
                    appointments::TIME
                ),
                params![
                    appointment.patient_name,
                    appointment.doctor_id,
                    appointment.doctor_name,
                    appointment.department,
                    appointment.date,
                    appointment.time
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            debug!(id, doctor_id = %appointment.doctor_id, date = %appointment.date, time = %appointment.time, "Inserted appointment");
            Ok(id)
        })
    }

    /// All appointment rows in storage order.
    pub fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.timed("list_appointments", || {
            let conn = self.get_connection()?;
            let mut stmt = conn.prepare(&format!("SELECT * FROM {}", appointments::TABLE))?;
            let rows = stmt.query_map([], map_appointment)?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
    }

    /// Get an appointment by ID
    pub fn get_appointment(&self, id: i64) -> Result<Option<Appointment>> {
        let conn = self.get_connection()?;
        let appointment = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?", appointments::TABLE, appointments::ID),
                params![id],
                map_appointment,
            )
            .optional()?;
        Ok(appointment)
    }

    /// Remove one appointment. Returns `false` when the id was already gone.
    pub fn delete_appointment(&self, id: i64) -> Result<bool> {
        self.timed("delete_appointment", || {
            let conn = self.get_connection()?;
            let removed = conn.execute(
                &format!("DELETE FROM {} WHERE {} = ?", appointments::TABLE, appointments::ID),
                params![id],
            )?;
            if removed == 0 {
                debug!(id, "Delete skipped; appointment no longer exists");
            }
            Ok(removed > 0)
        })
    }

    /// Store a medical record. Empty visit dates default to today.
    pub fn insert_record(&self, record: &NewMedicalRecord) -> Result<MedicalRecord> {
        InputValidator::validate_record(record)?;

        self.timed("insert_record", || {
            let visit_date = if record.visit_date.trim().is_empty() {
                Local::now().date_naive().format(DATE_FORMAT).to_string()
            } else {
                record.visit_date.trim().to_string()
            };

            let mut conn = self.get_connection()?;
            let tx = conn.transaction()?;

            // Ids are creation timestamps in milliseconds; bump on collision
            let mut millis = Utc::now().timestamp_millis();
            loop {
                let exists: bool = tx.query_row(
                    &format!(
                        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
                        patient_records::TABLE,
                        patient_records::ID
                    ),
                    params![millis.to_string()],
                    |row| row.get(0),
                )?;
                if !exists {
                    break;
                }
                millis += 1;
            }

            let stored = MedicalRecord {
                id: millis.to_string(),
                visit_date,
                doctor_name: record.doctor_name.trim().to_string(),
                diagnosis: record.diagnosis.trim().to_string(),
                prescription: record.prescription.clone(),
                allergies: record.allergies.clone(),
                medical_history: record.medical_history.clone(),
            };

            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                    patient_records::TABLE,
                    patient_records::ID,
                    patient_records::VISIT_DATE,
                    patient_records::DOCTOR_NAME,
                    patient_records::DIAGNOSIS,
                    patient_records::PRESCRIPTION,
                    patient_records::ALLERGIES,
                    patient_records::MEDICAL_HISTORY
                ),
                params![
                    stored.id,
                    stored.visit_date,
                    stored.doctor_name,
                    stored.diagnosis,
                    stored.prescription,
                    stored.allergies,
                    stored.medical_history
                ],
            )?;
            tx.commit()?;

            Ok(stored)
        })
    }

    /// Medical records, most recent visit first.
    pub fn list_records(&self) -> Result<Vec<MedicalRecord>> {
        self.timed("list_records", || {
            let conn = self.get_connection()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT * FROM {} ORDER BY {} DESC, {} DESC",
                patient_records::TABLE,
                patient_records::VISIT_DATE,
                patient_records::ID
            ))?;
            let rows = stmt.query_map([], map_record)?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
    }

    /// Remove one medical record. Returns `false` when the id was already gone.
    pub fn delete_record(&self, id: &str) -> Result<bool> {
        self.timed("delete_record", || {
            let conn = self.get_connection()?;
            let removed = conn.execute(
                &format!("DELETE FROM {} WHERE {} = ?", patient_records::TABLE, patient_records::ID),
                params![id],
            )?;
            Ok(removed > 0)
        })
    }
}

/// Map a database row to an Appointment
fn map_appointment(row: &Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(appointments::ID)?,
        patient_name: row.get(appointments::PATIENT_NAME)?,
        doctor_id: row.get(appointments::DOCTOR_ID)?,
        doctor_name: row.get(appointments::DOCTOR_NAME)?,
        department: row.get(appointments::DEPARTMENT)?,
        date: row.get(appointments::DATE)?,
        time: row.get(appointments::TIME)?,
    })
}

/// Map a database row to a MedicalRecord
fn map_record(row: &Row) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: row.get(patient_records::ID)?,
        visit_date: row.get(patient_records::VISIT_DATE)?,
        doctor_name: row.get(patient_records::DOCTOR_NAME)?,
        diagnosis: row.get(patient_records::DIAGNOSIS)?,
        prescription: row.get::<_, Option<String>>(patient_records::PRESCRIPTION)?.unwrap_or_default(),
        allergies: row.get::<_, Option<String>>(patient_records::ALLERGIES)?.unwrap_or_default(),
        medical_history: row
            .get::<_, Option<String>>(patient_records::MEDICAL_HISTORY)?
            .unwrap_or_default(),
    })
}

/// Open and initialize the store described by `config`.
///
/// Any failure here is fatal for the booking flow of this session and is
/// reported as [`ClinicError::StorageInit`].
pub fn establish_connection(config: &DatabaseConfig, metrics: Arc<MetricsCollector>) -> Result<Database> {
    let database = Database::open(&config.path, config.max_connections)
        .map_err(|e| match e {
            ClinicError::StorageInit(_) => e,
            other => ClinicError::StorageInit(other.to_string()),
        })?
        .with_metrics(metrics);

    if config.reset_on_launch {
        warn!("database.reset_on_launch is set; dropping stored data");
        database
            .reset()
            .map_err(|e| ClinicError::StorageInit(e.to_string()))?;
    }

    database.initialize()?;
    Ok(database)
}
