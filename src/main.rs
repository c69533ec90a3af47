use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    object_store::ObjectStore, session_manager::SessionManager, storage_service::StorageService,
};

/// How often idle resumable sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting storage-emulator with config: {:?}", cfg);

    // --- Initialize core service ---
    let store = ObjectStore::new();
    for bucket in &cfg.buckets {
        store.create_bucket(bucket).await;
        tracing::info!("Created bucket {}", bucket);
    }

    let sessions = SessionManager::new(Some(cfg.session_ttl));
    if sessions
        .clone()
        .start_cleanup_task(SESSION_SWEEP_INTERVAL)
        .is_some()
    {
        tracing::debug!(
            "Resumable sessions expire after {}s of inactivity",
            cfg.session_ttl.as_secs()
        );
    }

    let storage = StorageService::new(store, sessions, cfg.public_url.clone());

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(storage);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
