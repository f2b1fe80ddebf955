mod broadcast;
mod config;
mod counters;
mod db;
mod directory;
mod error;
mod routes;
mod sample;
mod session;
mod state;
mod stream;

use crate::broadcast::ResultBroadcaster;
use crate::config::Config;
use crate::db::SampleStore;
use crate::directory::StationDirectory;
use crate::session::SessionManager;
use crate::state::AppState;
use anyhow::Result;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,noise_ingest=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing()?;

    let pool = db::connect_lazy(&config)?;
    let store = SampleStore::new(pool.clone());
    let directory = Arc::new(StationDirectory::new(pool));
    let broadcaster = Arc::new(ResultBroadcaster::new(config.observer_queue));
    let sessions = Arc::new(SessionManager::new(
        store.clone(),
        directory.clone(),
        broadcaster.clone(),
    ));

    // first load happens off the startup path; a dead database leaves the
    // directory empty until the next refresh
    {
        let directory = directory.clone();
        tokio::spawn(async move {
            if let Err(err) = directory.refresh().await {
                tracing::warn!(error = %err, "initial station directory load failed");
            }
        });
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        config: config.clone(),
        store,
        directory,
        broadcaster,
        sessions: sessions.clone(),
    };
    let app = routes::router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.http_bind).await?;
    tracing::info!(bind = %config.http_bind, "noise-ingest HTTP listening");
    let http_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = http_handle => {}
    }

    sessions.stop();
    Ok(())
}
