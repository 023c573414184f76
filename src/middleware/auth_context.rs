use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{Authorization, authorization::Bearer};

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::AppState;

/// Identity of the caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i32,
    pub is_admin: bool,
    pub session_id: i32,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| {
                        ApiError::Unauthorized("TOKEN_REQUIRED", "Bearer token required".into())
                    })?;

            let token_hash = hash_access_token(authz.token());

            let session = state
                .store
                .find_session(&token_hash, Utc::now().naive_utc())
                .await?
                .ok_or_else(ApiError::session_expired)?;

            Ok(AuthContext {
                user_id: session.user_id,
                is_admin: session.is_admin,
                session_id: session.session_id,
            })
        }
    }
}

/// An `AuthContext` that is known to belong to an administrator.
#[derive(Debug, Clone)]
pub struct AdminContext(pub AuthContext);

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let auth = AuthContext::from_request_parts(parts, state).await?;
            if !auth.is_admin {
                return Err(ApiError::admin_required());
            }
            Ok(AdminContext(auth))
        }
    }
}
