use chrono::Duration;

use axum::extract::State;
use axum::Json;
use kibotos_types::{
    DedupCheckRequest, DedupCheckResponse, FetchRequest, FetchResponse, KibotosError,
    LeasedSubmission, RenewRequest, RenewResponse, SubmitRequest, VlmProxyRequest,
    VlmProxyResponse,
};

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn fetch(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<FetchRequest>,
) -> Result<Json<FetchResponse>, ApiError> {
    let lease_duration = Duration::seconds(req.lease_duration_sec as i64);
    let submissions = state
        .store
        .lease_pending(&req.worker_id, req.limit as i64, lease_duration)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    kibotos_telemetry::metrics::LEASES_GRANTED.inc_by(submissions.len() as f64);

    let mut leases = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let prompt = state
            .store
            .get_prompt(&submission.prompt_id)
            .await
            .map_err(|e| ApiError::new(e.into(), request_id))?
            .ok_or(KibotosError::NotFound)
            .map_err(|e| ApiError::new(e, request_id))?;

        let download_url = state
            .objectstore
            .presign_download(&submission.video_key, state.presign_ttl_sec)
            .await
            .map_err(|e| ApiError::new(KibotosError::from(e), request_id))?;

        leases.push(LeasedSubmission {
            submission,
            prompt,
            download_url,
        });
    }

    Ok(Json(FetchResponse { leases }))
}

pub async fn submit(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<kibotos_types::SubmissionView>, ApiError> {
    let label = match &req.outcome {
        kibotos_types::EvaluationOutcome::Scored { .. } => "scored",
        kibotos_types::EvaluationOutcome::Rejected { .. } => "rejected",
    };
    kibotos_telemetry::metrics::EVALUATION_OUTCOMES
        .with_label_values(&["commit", label])
        .inc();

    let submission = state
        .store
        .commit_evaluation(&req.worker_id, req.uuid, req.outcome)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    let evaluation = state
        .store
        .get_evaluation(req.uuid)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    Ok(Json(kibotos_types::SubmissionView::new(submission, evaluation)))
}

pub async fn renew(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<RenewRequest>,
) -> Result<Json<RenewResponse>, ApiError> {
    let lease_duration = Duration::seconds(req.lease_duration_sec as i64);
    let lease_expires_at = state
        .store
        .renew_lease(&req.worker_id, req.uuid, lease_duration)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    Ok(Json(RenewResponse { lease_expires_at }))
}

/// Proxies a VLM scoring call so workers never need `VLM_API_KEY` directly.
/// Paced by an in-process token bucket and the durable cross-replica
/// `acquire_vlm_tokens` counter.
pub async fn vlm(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<VlmProxyRequest>,
) -> Result<Json<VlmProxyResponse>, ApiError> {
    state.vlm_pacer.until_ready().await;

    let granted = state
        .store
        .acquire_vlm_tokens(1, 100, Duration::seconds(1))
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;
    if granted.is_none() {
        return Err(ApiError::new(KibotosError::RateLimited, request_id));
    }

    kibotos_telemetry::metrics::VLM_INFLIGHT.inc();
    let result = state.vlm_client.score(&req).await;
    kibotos_telemetry::metrics::VLM_INFLIGHT.dec();

    let response = result.map_err(|e| ApiError::new(KibotosError::from(e), request_id))?;
    Ok(Json(response))
}

/// Scores a worker-computed perceptual hash against the SCORED history the
/// worker has no direct read access to.
pub async fn dedup(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<DedupCheckRequest>,
) -> Result<Json<DedupCheckResponse>, ApiError> {
    let found = state
        .store
        .find_near_duplicate(req.cycle_id, &req.phash)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;

    let response = match found {
        Some((matched_uuid, similarity)) => DedupCheckResponse {
            quality_score: (1.0 - similarity).clamp(0.0, 1.0),
            matched_uuid: Some(matched_uuid),
            similarity: Some(similarity),
        },
        None => DedupCheckResponse {
            quality_score: 1.0,
            matched_uuid: None,
            similarity: None,
        },
    };

    Ok(Json(response))
}
