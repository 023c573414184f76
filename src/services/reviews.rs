// src/services/reviews.rs

use serde_json::Value;

use crate::{
    error::ApiError,
    models::ReviewRequest,
    store::{Store, StoreError},
};

const MAX_COMMENT_LEN: usize = 2000;

/// Rating must be a whole number in 1..=5. Numeric strings are accepted
/// because form posts send everything as text.
pub fn parse_rating(raw: Option<&Value>) -> Result<i32, ApiError> {
    let invalid = || ApiError::validation("rating must be a whole number between 1 and 5");

    let rating = match raw.ok_or_else(|| ApiError::validation("rating is required"))? {
        Value::Number(n) => n.as_i64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if !(1..=5).contains(&rating) {
        return Err(invalid());
    }
    Ok(rating as i32)
}

pub fn parse_comment(raw: Option<&str>) -> Result<String, ApiError> {
    let comment = raw.map(str::trim).unwrap_or_default();
    if comment.is_empty() {
        return Err(ApiError::validation("comment is required"));
    }
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::validation(format!(
            "comment is too long (max {MAX_COMMENT_LEN})"
        )));
    }
    Ok(comment.to_string())
}

fn review_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::NotFound("REVIEW_NOT_FOUND", "Review not found".into()),
        StoreError::NotOwner => {
            ApiError::Forbidden("FORBIDDEN", "You can only modify your own reviews".into())
        }
        other => other.into(),
    }
}

pub async fn create(store: &dyn Store, user_id: i32, req: &ReviewRequest) -> Result<i32, ApiError> {
    let rating = parse_rating(req.rating.as_ref())?;
    let comment = parse_comment(req.comment.as_deref())?;

    let id = store.create_review(user_id, rating, &comment).await?;
    tracing::info!(review_id = id, user_id, rating, "review created");
    Ok(id)
}

pub async fn update(
    store: &dyn Store,
    id: i32,
    user_id: i32,
    req: &ReviewRequest,
) -> Result<(), ApiError> {
    let rating = parse_rating(req.rating.as_ref())?;
    let comment = parse_comment(req.comment.as_deref())?;

    store
        .update_review(id, user_id, rating, &comment)
        .await
        .map_err(review_error)?;
    tracing::info!(review_id = id, user_id, "review updated");
    Ok(())
}

pub async fn delete(store: &dyn Store, id: i32, user_id: i32) -> Result<(), ApiError> {
    store.delete_review(id, user_id).await.map_err(review_error)?;
    tracing::info!(review_id = id, user_id, "review deleted");
    Ok(())
}
