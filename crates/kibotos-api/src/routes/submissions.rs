use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use kibotos_types::{
    KibotosError, SubmissionAccepted, SubmissionRequest, SubmissionView,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionAccepted>), ApiError> {
    let outcome = kibotos_admission::admit(&state.store, req).await;
    let label = if outcome.is_ok() { "accepted" } else { "rejected" };
    kibotos_telemetry::metrics::ADMISSION_OUTCOMES
        .with_label_values(&[label])
        .inc();

    let submission = outcome.map_err(|e| ApiError::new(e, request_id))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmissionAccepted {
            uuid: submission.uuid,
            cycle_id: submission.cycle_id,
            state: submission.state.to_string(),
        }),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(uuid): Path<Uuid>,
) -> Result<Json<SubmissionView>, ApiError> {
    let submission = state
        .store
        .get_submission(uuid)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?
        .ok_or(KibotosError::NotFound)
        .map_err(|e| ApiError::new(e, request_id))?;

    let evaluation = state
        .store
        .get_evaluation(uuid)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    Ok(Json(SubmissionView::new(submission, evaluation)))
}
