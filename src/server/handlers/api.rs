//! Dashboard data endpoints.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_limit, ApiError};
use crate::model::{LocationStatus, MeasurementRecord, SafetyStatus};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub data: Vec<MeasurementRecord>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub location: String,
    pub data: Vec<MeasurementRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub overall_status: SafetyStatus,
    pub locations: Vec<LocationStatus>,
}

#[derive(Debug, Serialize)]
pub struct AllResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<MeasurementRecord>,
}

/// Kept as text so a non-numeric `limit` degrades to the default instead of
/// rejecting the request.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<String>,
}

/// GET /api/latest
pub async fn latest_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<LatestResponse>, ApiError> {
    let snapshot = state
        .aggregator
        .latest()
        .await
        .map_err(ApiError::new("Failed to fetch latest data"))?;

    Ok(Json(LatestResponse {
        success: true,
        timestamp: snapshot.generated_at,
        data: snapshot.records,
    }))
}

/// GET /api/history/:location?limit=N
pub async fn history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(location): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = parse_limit(params.limit.as_deref(), state.default_history_limit);
    let history = state
        .aggregator
        .history(&location, limit)
        .await
        .map_err(ApiError::new("Failed to fetch historical data"))?;

    Ok(Json(HistoryResponse {
        success: true,
        location: history.location,
        data: history.records,
    }))
}

/// GET /api/status
pub async fn status_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state
        .aggregator
        .status()
        .await
        .map_err(ApiError::new("Failed to fetch system status"))?;

    Ok(Json(StatusResponse {
        success: true,
        overall_status: status.overall_status,
        locations: status.locations,
    }))
}

/// GET /api/all
pub async fn all_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<AllResponse>, ApiError> {
    let records = state
        .aggregator
        .all()
        .await
        .map_err(ApiError::new("Failed to fetch all data"))?;

    Ok(Json(AllResponse {
        success: true,
        count: records.len(),
        data: records,
    }))
}
