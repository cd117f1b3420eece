use std::sync::Arc;

use axum::{extract::State, Json};
use hydromap_core::models::{DelineationResponse, EngineStatus};

use crate::dto::DelineateRequest;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn delineate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DelineateRequest>,
) -> Result<Json<DelineationResponse>, ApiError> {
    tracing::info!(
        lat = request.lat,
        lon = request.lon,
        snap_to_stream = ?request.snap_to_stream,
        snap_radius = ?request.snap_radius,
        "Processing delineation request"
    );

    let response = state.delineator.delineate(request.into()).await.map_err(|e| {
        tracing::error!(error = %e, category = ?e.category(), "Delineation failed");
        ApiError::from(e)
    })?;

    Ok(Json(response))
}

pub async fn delineation_status(State(state): State<Arc<AppState>>) -> Json<EngineStatus> {
    Json(state.delineator.status())
}
