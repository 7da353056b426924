//! Health handler.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::locations::all_location_keys;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub store: StoreHealth,
    pub locations: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    /// "configured" or "missing"; the URL itself is never echoed.
    pub endpoint: &'static str,
    pub table: String,
}

/// GET /health - liveness plus configuration presence. Does not query the store.
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let summary = &state.store_summary;
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        store: StoreHealth {
            backend: summary.backend,
            endpoint: if summary.endpoint_configured {
                "configured"
            } else {
                "missing"
            },
            table: summary.table.clone(),
        },
        locations: all_location_keys(),
    })
}
