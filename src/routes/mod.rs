use crate::models::AppState;
use axum::Router;

pub mod admin_routes;
pub mod appointment_routes;
pub mod auth_routes;
pub mod review_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth_routes::router())
        .nest("/api/appointments", appointment_routes::router())
        .nest("/api/admin", admin_routes::router())
        .nest("/api/reviews", review_routes::router())
        .with_state(state)
}
