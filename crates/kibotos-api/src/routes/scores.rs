use axum::extract::{Path, State};
use axum::Json;
use kibotos_types::{KibotosError, ScoresView};

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn latest(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<Json<ScoresView>, ApiError> {
    let status = state
        .store
        .get_cycle_status()
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;
    let cycle_id = status
        .last_completed_cycle_id
        .ok_or(KibotosError::NotFound)
        .map_err(|e| ApiError::new(e, request_id))?;

    let breakdown = state
        .store
        .get_scores(cycle_id)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    Ok(Json(ScoresView { cycle_id, breakdown }))
}

pub async fn by_cycle(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(cycle_id): Path<i64>,
) -> Result<Json<ScoresView>, ApiError> {
    let breakdown = state
        .store
        .get_scores(cycle_id)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    Ok(Json(ScoresView { cycle_id, breakdown }))
}
