use axum::extract::{Path, State};
use axum::Json;
use kibotos_types::{CycleStatus, CycleView};

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn status(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<Json<CycleStatus>, ApiError> {
    let status = state
        .store
        .get_cycle_status()
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;
    Ok(Json(status))
}

pub async fn get_cycle(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(cycle_id): Path<i64>,
) -> Result<Json<CycleView>, ApiError> {
    let cycle = state
        .store
        .get_cycle(cycle_id)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?
        .ok_or(kibotos_types::KibotosError::NotFound)
        .map_err(|e| ApiError::new(e, request_id))?;
    Ok(Json(CycleView::from(cycle)))
}
