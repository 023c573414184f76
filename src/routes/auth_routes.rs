use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use axum_extra::extract::WithRejection;

use crate::{
    auth::{hash_password, issue_session, verify_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::*,
    store::StoreError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(v)
}

fn validate_password(pw: &str) -> Result<(), ApiError> {
    if pw.trim().len() < 6 {
        return Err(ApiError::validation("password must be at least 6 characters"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::validation("email is not valid")),
    }
}

/// A unique-constraint hit during insert means another registration won the race.
fn registration_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict(_) => ApiError::user_exists(),
        other => other.into(),
    }
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = required(&req.username, "username")?;
    let full_name = required(&req.full_name, "fullName")?;
    let email = required(&req.email, "email")?;
    let phone = required(&req.phone, "phone")?;
    validate_email(email)?;
    validate_password(&req.password)?;

    if state.store.username_or_email_taken(username, email).await? {
        return Err(ApiError::user_exists());
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        ApiError::Internal("Registration failed".into())
    })?;

    // the unique constraints still catch a concurrent registration
    let user_id = state
        .store
        .create_user(&NewUser {
            username: username.to_string(),
            password_hash,
            email: email.to_string(),
            phone: phone.to_string(),
            full_name: full_name.to_string(),
            address: req
                .address
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            is_admin: false,
        })
        .await
        .map_err(registration_error)?;

    let token = issue_session(state.store.as_ref(), user_id, state.session_ttl_hours).await?;
    tracing::info!(user_id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful".into(),
            token,
            user_id,
            is_admin: false,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let user = state
        .store
        .find_user_by_username(username)
        .await?
        .ok_or_else(ApiError::invalid_credentials)?;

    if !verify_password(&req.password, &user.password) {
        return Err(ApiError::invalid_credentials());
    }

    let token = issue_session(state.store.as_ref(), user.id, state.session_ttl_hours).await?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user_id: user.id,
        is_admin: user.is_admin,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.revoke_session(auth.session_id).await?;
    Ok(Json(MessageResponse::new("Logged out")))
}
