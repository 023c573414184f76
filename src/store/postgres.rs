// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, postgres::PgPoolOptions};

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

const SCHEMA: &str = include_str!("../../migrations/postgres.sql");

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        tracing::info!("connected to postgres");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_user(&self, user: &NewUser) -> Result<i32, StoreError> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (username, password, email, phone, full_name, address, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.full_name)
        .bind(user.address.as_deref())
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "username or email already registered"))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password, is_admin
            FROM users
            WHERE username = $1
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
            SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)
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
            VALUES ($1, $2, $3)
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
            WHERE st.token_hash = $1
              AND st.revoked_at IS NULL
              AND st.expires_at > $2
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
            WHERE id = $1 AND revoked_at IS NULL
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
            WHERE is_admin = false
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
        let sql = appointment_listing(scope, "$1");
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

        let appointment_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO appointments (user_id, appointment_date, appointment_time, status, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(new.user_id)
        .bind(new.appointment_date)
        .bind(new.appointment_time)
        .bind(AppointmentStatus::Pending.as_str())
        .bind(new.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for service in &new.services {
            sqlx::query(
                r#"
                INSERT INTO appointment_services (appointment_id, service_name)
                VALUES ($1, $2)
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
                VALUES ($1, $2)
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
        let res = sqlx::query(r#"UPDATE appointments SET status = $1 WHERE id = $2"#)
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
        let n: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM appointments WHERE status = $1"#)
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
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM appointments
            WHERE appointment_date >= $1 AND appointment_date <= $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    async fn count_customers(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE is_admin = false"#)
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
            WHERE user_id = $1
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
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO reviews (user_id, rating, comment)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
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
            SET rating = $1, comment = $2
            WHERE id = $3 AND user_id = $4
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
        let res = sqlx::query(r#"DELETE FROM reviews WHERE id = $1 AND user_id = $2"#)
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

impl PgStore {
    /// Explain why an owner-scoped review mutation touched no row.
    async fn review_miss(&self, id: i32) -> StoreError {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM reviews WHERE id = $1)"#,
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
