//! HTTP server for the canal ice dashboard API.
//!
//! Routes:
//!   GET /api/latest                  newest record per location, relabelled
//!   GET /api/history/:location       recent records for one location, oldest first
//!   GET /api/status                  per-location labels and the overall label
//!   GET /api/all                     every record, newest first
//!   GET /health                      liveness and configuration presence
//!
//! Anything else falls through to the dashboard asset directory when one is
//! configured.

pub mod handlers;

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::aggregate::Aggregator;
use crate::config::{ConfigError, ServiceConfig, StoreBackend, StoreConfig};
use crate::dev_mode::{DevMode, DevModeError};
use crate::logging::{self, DataSource};
use crate::store::{InMemoryStore, MeasurementStore, PostgresStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    DevMode(#[from] DevModeError),

    #[error("store.backend = \"postgres\" needs store.database_url or DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What `/health` reports about the store, captured once at startup.
#[derive(Debug, Clone)]
pub struct StoreSummary {
    pub backend: &'static str,
    pub endpoint_configured: bool,
    pub table: String,
}

/// Shared application state, built once at startup and handed to every
/// handler.
pub struct AppState {
    pub aggregator: Aggregator,
    pub default_history_limit: usize,
    pub store_summary: StoreSummary,
}

impl AppState {
    pub fn new(aggregator: Aggregator, config: &ServiceConfig) -> Self {
        let store_summary = StoreSummary {
            backend: aggregator.store().backend_name(),
            endpoint_configured: config.store.database_url.is_some(),
            table: config.store.table.clone(),
        };
        Self {
            aggregator,
            default_history_limit: config.api.default_history_limit,
            store_summary,
        }
    }
}

/// Builds the router. Layers apply to the asset fallback too.
pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/api/latest", get(handlers::api::latest_handler))
        .route("/api/history/:location", get(handlers::api::history_handler))
        .route("/api/status", get(handlers::api::status_handler))
        .route("/api/all", get(handlers::api::all_handler))
        .route("/health", get(handlers::health::health_handler));

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };

    app.layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Opens the configured store backend.
///
/// A PostgreSQL server that is down at startup does not stop the service;
/// the API answers with failure envelopes until it comes back.
pub async fn build_store(
    config: &StoreConfig,
    dev: &DevMode,
) -> Result<Arc<dyn MeasurementStore>, ServerError> {
    match config.backend {
        StoreBackend::Memory => {
            let store = match &config.fixture_path {
                Some(path) => dev.load_store(path)?,
                None => {
                    logging::warn(
                        DataSource::Dev,
                        None,
                        "memory backend without fixture_path; every query will be empty",
                    );
                    InMemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            let url = config.database_url.clone().ok_or(ServerError::MissingDatabaseUrl)?;
            let table = config.table.clone();
            let store = tokio::task::spawn_blocking(move || PostgresStore::connect(&url, &table))
                .await
                .map_err(|e| StoreError::Connection {
                    reason: format!("connect task failed: {e}"),
                })??;
            if store.is_connected() {
                logging::info(
                    DataSource::Store,
                    None,
                    &format!("Connected to PostgreSQL, reading {}", config.table),
                );
            }
            Ok(Arc::new(store))
        }
    }
}

/// Runs the server until Ctrl-C.
pub async fn serve(config: ServiceConfig, dev: DevMode) -> Result<(), ServerError> {
    let addr = config.listen_addr()?;
    let store = build_store(&config.store, &dev).await?;
    let state = Arc::new(AppState::new(Aggregator::new(store), &config));
    let app = build_router(state, config.server.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    logging::info(
        DataSource::System,
        None,
        &format!("Rideau Canal dashboard API listening on http://{addr}"),
    );
    logging::info(DataSource::System, None, &format!("Health check at http://{addr}/health"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logging::info(DataSource::System, None, "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logging::error(
            DataSource::System,
            None,
            &format!("failed to listen for shutdown signal: {e}"),
        );
        std::future::pending::<()>().await;
    }
    logging::info(DataSource::System, None, "Shutting down server...");
}
