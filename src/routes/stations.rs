use crate::db::StationRecord;
use crate::error::map_db_error;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SaveStationsResponse {
    pub affected: u64,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub entries: usize,
}

pub(crate) async fn list_stations(
    State(state): State<AppState>,
) -> Result<Json<Vec<StationRecord>>, (StatusCode, String)> {
    state
        .store
        .list_stations()
        .await
        .map(Json)
        .map_err(map_db_error)
}

pub(crate) async fn save_stations(
    State(state): State<AppState>,
    Json(rows): Json<Vec<StationRecord>>,
) -> Result<Json<SaveStationsResponse>, (StatusCode, String)> {
    let affected = state
        .store
        .upsert_stations(&rows)
        .await
        .map_err(map_db_error)?;

    // best effort: stale-but-available beats failing the save
    if let Err(err) = state.directory.refresh().await {
        tracing::warn!(error = %err, "directory refresh after station save failed");
    }

    Ok(Json(SaveStationsResponse { affected }))
}

pub(crate) async fn refresh_directory(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, (StatusCode, String)> {
    let entries = state
        .directory
        .refresh()
        .await
        .map_err(|err| (StatusCode::SERVICE_UNAVAILABLE, err.to_string()))?;
    Ok(Json(RefreshResponse { entries }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stations", get(list_stations).post(save_stations))
        .route("/stations/refresh", post(refresh_directory))
}
