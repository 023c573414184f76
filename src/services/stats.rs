// src/services/stats.rs

use chrono::{Duration, NaiveDate};

use crate::{
    error::ApiError,
    models::{AppointmentStatus, DashboardStats},
    store::Store,
};

/// Rolling window ending today: `[today - 7 days, today]`, both inclusive.
/// Not aligned to calendar weeks.
pub fn this_week_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(7), today)
}

/// The four dashboard counters. They share no data, so they are issued
/// concurrently and joined; the result is a point-in-time approximation.
pub async fn dashboard(store: &dyn Store, today: NaiveDate) -> Result<DashboardStats, ApiError> {
    let (from, to) = this_week_window(today);

    let (total_appointments, pending_appointments, total_users, this_week_appointments) = tokio::try_join!(
        store.count_appointments(),
        store.count_appointments_with_status(AppointmentStatus::Pending),
        store.count_customers(),
        store.count_appointments_between(from, to),
    )?;

    Ok(DashboardStats {
        total_appointments,
        pending_appointments,
        total_users,
        this_week_appointments,
    })
}
