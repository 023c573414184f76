//! Relational storage behind a backend-neutral trait.
//!
//! Handlers never see a pool directly; they get an `Arc<dyn Store>` from
//! `AppState`. `connect` picks PostgreSQL or SQLite from the database URL.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{
    AppointmentStatus, AppointmentView, CustomerRow, NewAppointment, NewUser, ReviewRow,
    ReviewWithAuthorRow, SessionRow, UserRow,
};

pub mod aggregate;
pub mod postgres;
pub mod sqlite;
mod sql;

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record belongs to another user")]
    NotOwner,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which appointments a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    /// Appointments owned by one user; owner contact fields are left out.
    User(i32),
    /// Every appointment, with the owner's contact fields attached.
    All,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Apply the embedded schema (idempotent).
    async fn migrate(&self) -> Result<(), StoreError>;

    /// Close the underlying pool. Further calls fail.
    async fn close(&self);

    /* users & sessions */

    async fn create_user(&self, user: &NewUser) -> Result<i32, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError>;

    async fn username_or_email_taken(&self, username: &str, email: &str)
    -> Result<bool, StoreError>;

    async fn create_session(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError>;

    async fn find_session(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> Result<Option<SessionRow>, StoreError>;

    async fn revoke_session(&self, session_id: i32) -> Result<(), StoreError>;

    async fn list_customers(&self) -> Result<Vec<CustomerRow>, StoreError>;

    /* appointments */

    async fn list_appointments(
        &self,
        scope: AppointmentScope,
    ) -> Result<Vec<AppointmentView>, StoreError>;

    /// Insert the appointment, its service tags and image references in one
    /// transaction. Nothing is left behind when any insert fails.
    async fn create_appointment(&self, new: &NewAppointment) -> Result<i32, StoreError>;

    /// Overwrite the status column of one appointment. `NotFound` when no row matched.
    async fn set_appointment_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> Result<(), StoreError>;

    async fn count_appointments(&self) -> Result<i64, StoreError>;

    async fn count_appointments_with_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<i64, StoreError>;

    /// Appointments dated within `[from, to]`, both ends inclusive.
    async fn count_appointments_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, StoreError>;

    async fn count_customers(&self) -> Result<i64, StoreError>;

    /* reviews */

    async fn list_reviews(&self) -> Result<Vec<ReviewWithAuthorRow>, StoreError>;

    async fn list_reviews_by_user(&self, user_id: i32) -> Result<Vec<ReviewRow>, StoreError>;

    async fn create_review(
        &self,
        user_id: i32,
        rating: i32,
        comment: &str,
    ) -> Result<i32, StoreError>;

    /// `NotFound` for an unknown id, `NotOwner` when the review belongs to someone else.
    async fn update_review(
        &self,
        id: i32,
        user_id: i32,
        rating: i32,
        comment: &str,
    ) -> Result<(), StoreError>;

    async fn delete_review(&self, id: i32, user_id: i32) -> Result<(), StoreError>;
}

/// Open a store for `database_url` and apply its schema.
pub async fn connect(database_url: &str) -> Result<Arc<dyn Store>, StoreError> {
    let store: Arc<dyn Store> = if database_url.starts_with("postgres://")
        || database_url.starts_with("postgresql://")
    {
        Arc::new(PgStore::connect(database_url).await?)
    } else if database_url.starts_with("sqlite:") {
        Arc::new(SqliteStore::connect(database_url).await?)
    } else {
        return Err(StoreError::UnsupportedUrl(database_url.to_string()));
    };

    store.migrate().await?;
    Ok(store)
}

/// Translate a unique-constraint violation into `Conflict`.
pub(crate) fn unique_violation(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Database(e),
    }
}
