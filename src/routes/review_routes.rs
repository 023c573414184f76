// src/routes/review_routes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{
        AppState, CreateReviewResponse, MessageResponse, ReviewRequest, ReviewRow,
        ReviewWithAuthorRow,
    },
    services::reviews,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route("/my", get(my_reviews))
        .route("/{id}", put(update_review).delete(delete_review))
}

/// Public: no token needed.
pub async fn list_reviews(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReviewWithAuthorRow>>, ApiError> {
    Ok(Json(state.store.list_reviews().await?))
}

pub async fn my_reviews(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ReviewRow>>, ApiError> {
    Ok(Json(state.store.list_reviews_by_user(auth.user_id).await?))
}

pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Json(req), _): WithRejection<Json<ReviewRequest>, ApiError>,
) -> Result<(StatusCode, Json<CreateReviewResponse>), ApiError> {
    let id = reviews::create(state.store.as_ref(), auth.user_id, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateReviewResponse {
            id,
            message: "Review added".into(),
        }),
    ))
}

pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<ReviewRequest>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    reviews::update(state.store.as_ref(), id, auth.user_id, &req).await?;
    Ok(Json(MessageResponse::new("Review updated")))
}

pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Path(id), _): WithRejection<Path<i32>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    reviews::delete(state.store.as_ref(), id, auth.user_id).await?;
    Ok(Json(MessageResponse::new("Review deleted")))
}
