use async_trait::async_trait;
use std::sync::Arc;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Appointment, NewAppointment};

/// Appointment storage as seen by the booking workflow and the list view.
///
/// Calls suspend the caller until the store answers; nothing here blocks the
/// async runtime.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Append a row atomically and return the id the store assigned.
    async fn insert(&self, appointment: NewAppointment) -> Result<i64>;
    /// Every stored row, in no particular order.
    async fn list_all(&self) -> Result<Vec<Appointment>>;
    /// Remove one row. `Ok(false)` when the id no longer exists.
    async fn delete_by_id(&self, id: i64) -> Result<bool>;
}

/// [`AppointmentRepository`] backed by the SQLite [`Database`]
pub struct SqliteAppointmentRepository {
    database: Arc<Database>,
}

impl SqliteAppointmentRepository {
    /// Wrap a shared store handle
    #[must_use]
    pub const fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// The underlying store
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl AppointmentRepository for SqliteAppointmentRepository {
    async fn insert(&self, appointment: NewAppointment) -> Result<i64> {
        let database = Arc::clone(&self.database);
        tokio::task::spawn_blocking(move || database.insert_appointment(&appointment)).await?
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        let database = Arc::clone(&self.database);
        tokio::task::spawn_blocking(move || database.list_appointments()).await?
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let database = Arc::clone(&self.database);
        tokio::task::spawn_blocking(move || database.delete_appointment(id)).await?
    }
}

#[async_trait]
impl<T: AppointmentRepository + ?Sized> AppointmentRepository for Arc<T> {
    async fn insert(&self, appointment: NewAppointment) -> Result<i64> {
        (**self).insert(appointment).await
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        (**self).list_all().await
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        (**self).delete_by_id(id).await
    }
}
