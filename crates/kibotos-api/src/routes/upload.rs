use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use kibotos_types::{KibotosError, PresignRequest, PresignResponse};

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn presign_upload(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<PresignRequest>,
) -> Result<Json<PresignResponse>, ApiError> {
    let (url, video_key) = state
        .objectstore
        .presign_upload(&req.filename, &req.content_type, state.presign_ttl_sec)
        .await
        .map_err(|e| ApiError::new(KibotosError::from(e), request_id))?;

    let expires_at = Utc::now() + Duration::seconds(state.presign_ttl_sec as i64);

    Ok(Json(PresignResponse {
        url,
        video_key,
        expires_at,
    }))
}
