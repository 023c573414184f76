//! Garden-services booking API: customers book appointments with service tags
//! and photos, leave reviews; administrators triage appointments and watch
//! dashboard counters.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod uploads;

use axum::Router;

use crate::{
    config::AdminSeed,
    models::{AppState, NewUser},
    store::Store,
};

pub use crate::routes::router as build_router;

/// Create the configured admin account unless the username already exists.
pub async fn seed_admin(store: &dyn Store, seed: &AdminSeed) -> anyhow::Result<()> {
    if store.find_user_by_username(&seed.username).await?.is_some() {
        return Ok(());
    }

    let password_hash = auth::hash_password(&seed.password).map_err(anyhow::Error::msg)?;
    let id = store
        .create_user(&NewUser {
            username: seed.username.clone(),
            password_hash,
            email: seed.email.clone(),
            phone: seed.phone.clone(),
            full_name: "Admin User".into(),
            address: None,
            is_admin: true,
        })
        .await?;
    tracing::info!(user_id = id, username = %seed.username, "seeded admin account");
    Ok(())
}

/// Router with the shared HTTP layers applied.
pub fn app(state: AppState) -> Router {
    use axum::http::header;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
