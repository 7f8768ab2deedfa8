use axum::extract::{Path, State};
use axum::Json;
use kibotos_types::{KibotosError, WeightsView};

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn latest(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<Json<WeightsView>, ApiError> {
    let weights = state
        .store
        .get_latest_weights()
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?
        .ok_or(KibotosError::NotFound)
        .map_err(|e| ApiError::new(e, request_id))?;
    Ok(Json(WeightsView::from(weights)))
}

pub async fn by_cycle(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(cycle_id): Path<i64>,
) -> Result<Json<WeightsView>, ApiError> {
    let weights = state
        .store
        .get_weights(cycle_id)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?
        .ok_or(KibotosError::NotFound)
        .map_err(|e| ApiError::new(e, request_id))?;
    Ok(Json(WeightsView::from(weights)))
}
