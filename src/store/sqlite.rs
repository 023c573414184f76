// src/store/sqlite.rs

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use super::{
    AppointmentScope, Store, StoreError,
    aggregate::fold_rows_into_views,
    sql::{COUNT_APPOINTMENTS, LIST_REVIEWS, appointment_listing},
    unique_violation,
};
use crate::models::{
    AppointmentJoinRow, AppointmentStatus, AppointmentView, CustomerRow, NewAppointment, NewUser,
    ReviewRow, ReviewWithAuthorRow, SessionRow, UserRow,
};

const SCHEMA: &str = include_str!("../../migrations/sqlite.sql");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database opens a fresh, empty one,
        // so the pool is pinned to a single connection that never expires.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        tracing::info!(in_memory, "connected to sqlite");
        Ok(Self { pool })
    }

    /// Raw pool access for test fixtures.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Explain why an owner-scoped review mutation touched no row.
    async fn review_miss(&self, id: i32) -> StoreError {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM reviews WHERE id = ?)"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await;

        match exists {
            Ok(true) => StoreError::NotOwner,
            Ok(false) => StoreError::NotFound,
            Err(e) => StoreError::Database(e),
        }
    }
}

fn rowid(id: i64) -> Result<i32, StoreError> {
    i32::try_from(id).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl Store for SqliteStore {
    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_user(&self, user: &NewUser) -> Result<i32, StoreError> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (username, password, email, phone, full_name, address, is_admin)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.full_name)
        .bind(user.address.as_deref())
        .bind(user.is_admin)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "username or email already registered"))?;

        rowid(res.last_insert_rowid())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password, is_admin
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, StoreError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE username = ? OR email = ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn create_session(
        &self,
        user_id: i32,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO session_tokens (user_id, token_hash, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(
        &self,
        token_hash: &str,
        now: NaiveDateTime,
    ) -> Result<Option<SessionRow>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT st.id AS session_id, st.user_id, u.is_admin
            FROM session_tokens st
            JOIN users u ON u.id = st.user_id
            WHERE st.token_hash = ?
              AND st.revoked_at IS NULL
              AND st.expires_at > ?
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn revoke_session(&self, session_id: i32) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE session_tokens
            SET revoked_at = CURRENT_TIMESTAMP
            WHERE id = ? AND revoked_at IS NULL
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_customers(&self) -> Result<Vec<CustomerRow>, StoreError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, username, email, phone, full_name, address, created_at
            FROM users
            WHERE is_admin = 0
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_appointments(
        &self,
        scope: AppointmentScope,
    ) -> Result<Vec<AppointmentView>, StoreError> {
        let sql = appointment_listing(scope, "?");
        let mut query = sqlx::query_as::<_, AppointmentJoinRow>(&sql);
        if let AppointmentScope::User(user_id) = scope {
            query = query.bind(user_id);
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(fold_rows_into_views(rows, scope == AppointmentScope::All))
    }

    async fn create_appointment(&self, new: &NewAppointment) -> Result<i32, StoreError> {
        // dropping `tx` on an early return rolls everything back
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            r#"
            INSERT INTO appointments (user_id, appointment_date, appointment_time, status, notes)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.appointment_date)
        .bind(new.appointment_time)
        .bind(AppointmentStatus::Pending.as_str())
        .bind(new.notes.as_deref())
        .execute(&mut *tx)
        .await?;
        let appointment_id = rowid(res.last_insert_rowid())?;

        for service in &new.services {
            sqlx::query(
                r#"
                INSERT INTO appointment_services (appointment_id, service_name)
                VALUES (?, ?)
                "#,
            )
            .bind(appointment_id)
            .bind(service)
            .execute(&mut *tx)
            .await?;
        }

        for image in &new.images {
            sqlx::query(
                r#"
                INSERT INTO appointment_images (appointment_id, image_path)
                VALUES (?, ?)
                "#,
            )
            .bind(appointment_id)
            .bind(image)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(appointment_id)
    }

    async fn set_appointment_status(
        &self,
        id: i32,
        status: AppointmentStatus,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(r#"UPDATE appointments SET status = ? WHERE id = ?"#)
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_appointments(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar(COUNT_APPOINTMENTS)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn count_appointments_with_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM appointments WHERE status = ?"#)
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn count_appointments_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, StoreError> {
        // dates are stored as YYYY-MM-DD text, which sorts chronologically
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM appointments
            WHERE appointment_date >= ? AND appointment_date <= ?
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn count_customers(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE is_admin = 0"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn list_reviews(&self) -> Result<Vec<ReviewWithAuthorRow>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewWithAuthorRow>(LIST_REVIEWS)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_reviews_by_user(&self, user_id: i32) -> Result<Vec<ReviewRow>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, user_id, rating, comment, created_at
            FROM reviews
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_review(
        &self,
        user_id: i32,
        rating: i32,
        comment: &str,
    ) -> Result<i32, StoreError> {
        let res = sqlx::query(
            r#"
            INSERT INTO reviews (user_id, rating, comment)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .execute(&self.pool)
        .await?;
        rowid(res.last_insert_rowid())
    }

    async fn update_review(
        &self,
        id: i32,
        user_id: i32,
        rating: i32,
        comment: &str,
    ) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE reviews
            SET rating = ?, comment = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(rating)
        .bind(comment)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(self.review_miss(id).await);
        }
        Ok(())
    }

    async fn delete_review(&self, id: i32, user_id: i32) -> Result<(), StoreError> {
        let res = sqlx::query(r#"DELETE FROM reviews WHERE id = ? AND user_id = ?"#)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(self.review_miss(id).await);
        }
        Ok(())
    }
}
