//! Request handlers

use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tollgate_core::{Decision, FeatureId, FeatureStatus, MetricsSnapshot};
use tollgate_engine::QuotaExceeded;
use tracing::info;
use uuid::Uuid;

/// Admit one use of a feature
pub async fn attempt(
    State(state): State<AppState>,
    Path((id, feature)): Path<(Uuid, String)>,
) -> Result<Json<Decision>, ApiError> {
    let feature = FeatureId::new(feature)?;
    let decision = state.engine.attempt(id, &feature, Utc::now()).await?;
    Ok(Json(decision))
}

/// Remaining allowance for one feature
pub async fn feature_status(
    State(state): State<AppState>,
    Path((id, feature)): Path<(Uuid, String)>,
) -> Result<Json<FeatureStatus>, ApiError> {
    let feature = FeatureId::new(feature)?;
    let status = state.engine.status(id, &feature, Utc::now()).await?;
    Ok(Json(status))
}

/// Remaining allowance across the whole feature catalog
pub async fn subscriber_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FeatureStatus>>, ApiError> {
    let statuses = state.engine.status_all(id, Utc::now()).await?;
    Ok(Json(statuses))
}

/// Recent quota-exceeded events, oldest first
pub async fn exceeded_events(State(state): State<AppState>) -> Json<Vec<QuotaExceeded>> {
    Json(state.events.recent())
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub version: u64,
}

/// Re-read the policy file and hot-swap the table
pub async fn reload_policy(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let version = state
        .engine
        .policy()
        .reload_from_file(&state.policy_path)?;
    info!("policy reloaded to version {version}");
    Ok(Json(ReloadResponse { version }))
}

/// Engine counters snapshot
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.engine.metrics())
}

/// Liveness probe
pub async fn health() -> &'static str {
    "OK"
}
