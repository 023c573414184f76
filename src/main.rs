use garden_booking::{app, config::Config, models::AppState, seed_admin, store, uploads::UploadDir};

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let store = store::connect(&cfg.database_url).await?;

    if let Some(seed) = &cfg.admin {
        seed_admin(store.as_ref(), seed).await?;
    }

    let uploads = UploadDir::new(&cfg.upload_dir);
    uploads.ensure().await?;
    tracing::info!(dir = %uploads.root().display(), "storing uploads on local disk");

    let state = AppState {
        store: store.clone(),
        uploads,
        session_ttl_hours: cfg.session_ttl_hours,
    };

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("store closed, bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
