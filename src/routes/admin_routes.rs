// src/routes/admin_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;

use crate::{
    error::ApiError,
    middleware::auth_context::AdminContext,
    models::{
        AppState, AppointmentView, CustomerRow, DashboardStats, MessageResponse,
        StatusUpdateRequest,
    },
    services::{appointments, stats},
    store::AppointmentScope,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(all_appointments))
        .route("/appointments/{id}/status", put(update_status))
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
}

pub async fn all_appointments(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<Vec<AppointmentView>>, ApiError> {
    let views = appointments::list(state.store.as_ref(), AppointmentScope::All).await?;
    Ok(Json(views))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminContext(admin): AdminContext,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<StatusUpdateRequest>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    let status =
        appointments::transition_status(state.store.as_ref(), id, req.status.as_deref()).await?;
    tracing::debug!(admin_id = admin.user_id, appointment_id = id, %status, "status change by admin");
    Ok(Json(MessageResponse::new("Status updated")))
}

pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<DashboardStats>, ApiError> {
    let today = Utc::now().date_naive();
    Ok(Json(stats::dashboard(state.store.as_ref(), today).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<Vec<CustomerRow>>, ApiError> {
    Ok(Json(state.store.list_customers().await?))
}
