//! Roster Server Library
//!
//! Tenant-isolated staff roster: boss accounts, staff records, and
//! proof-of-ID documents behind a bearer-token API.

pub mod core;
pub mod staff;

use axum::{extract::DefaultBodyLimit, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::core::mail::{LogNotifier, ResetNotifier, WebhookNotifier};
use crate::core::{db, AppState, ServerConfig};

/// Full application: routes plus the HTTP layers.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    core::router(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Already set when embedded; ignore
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    info!("=== Roster Server ===");

    let config = ServerConfig::default();
    roster_common::init_structure(&config.root)?;
    info!("Data root: {:?}", config.root);

    let pool = db::connect(&config.database_url).await?;
    let documents = doc_store::open(config.documents.clone()).await?;

    let notifier: Arc<dyn ResetNotifier> = match &config.reset_webhook_url {
        Some(url) => {
            info!("Reset codes delivered via webhook");
            Arc::new(WebhookNotifier::new(url.clone())?)
        }
        None => {
            info!("Reset codes delivered to the log");
            Arc::new(LogNotifier)
        }
    };

    let port = config.port;
    let state = AppState::new(config, pool, documents, notifier);
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Roster server listening on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
