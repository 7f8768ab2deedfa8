//! Wire DTOs for the HTTP surface and the worker leasing protocol.
//!
//! These are intentionally separate from the entities in `entities.rs`:
//! entities are the store's row shapes; DTOs are what crosses the wire and
//! may omit or reshape fields (e.g. a submission request has no `uuid` yet).

use crate::entities::{
    ActorType, CameraType, Cycle, CycleWeights, Evaluation, MinerScoreBreakdown, Prompt,
    RejectionReason, Submission,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /v1/submissions` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub prompt_id: String,
    pub miner_uid: i64,
    pub miner_hotkey: String,
    pub video_key: String,
    pub video_hash: String,
    pub duration_sec: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub camera_type: CameraType,
    pub actor_type: ActorType,
    #[serde(default)]
    pub action_description: Option<String>,
    pub signature: String,
    pub submitted_at: DateTime<Utc>,
}

/// `POST /v1/submissions` success response (202 Accepted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionAccepted {
    pub uuid: Uuid,
    pub cycle_id: i64,
    pub state: String,
}

/// `GET /v1/submissions/{uuid}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionView {
    pub uuid: Uuid,
    pub cycle_id: i64,
    pub prompt_id: String,
    pub miner_uid: i64,
    pub state: String,
    pub rejection_reason: Option<RejectionReason>,
    pub submitted_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub evaluation: Option<Evaluation>,
}

impl SubmissionView {
    pub fn new(submission: Submission, evaluation: Option<Evaluation>) -> Self {
        Self {
            uuid: submission.uuid,
            cycle_id: submission.cycle_id,
            prompt_id: submission.prompt_id,
            miner_uid: submission.miner_uid,
            state: submission.state.to_string(),
            rejection_reason: submission.rejection_reason,
            submitted_at: submission.submitted_at,
            evaluated_at: submission.evaluated_at,
            evaluation,
        }
    }
}

/// `GET /v1/cycles/status` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleStatus {
    pub active_cycle_id: Option<i64>,
    pub active_cycle_started_at: Option<DateTime<Utc>>,
    pub evaluating_cycle_id: Option<i64>,
    pub last_completed_cycle_id: Option<i64>,
    pub total_cycles: i64,
}

/// `GET /v1/prompts/categories` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// `POST /v1/upload/presign` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
}

/// `POST /v1/upload/presign` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignResponse {
    pub url: String,
    pub video_key: String,
    pub expires_at: DateTime<Utc>,
}

/// `POST /v1/evaluate/fetch` request: a worker asking the gateway to lease work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub worker_id: String,
    pub limit: u32,
    /// Requested lease lifetime in seconds; the worker sizes this to its own
    /// expected evaluation time (`max(60, 3 * expected_eval_time)`).
    pub lease_duration_sec: u32,
}

/// `POST /v1/evaluate/fetch` response: the leased submissions plus the
/// prompt each one is evaluated against (so the worker never needs its own
/// prompt lookup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeasedSubmission {
    pub submission: Submission,
    pub prompt: Prompt,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub leases: Vec<LeasedSubmission>,
}

/// Outcome of evaluating one leased submission, reported back by a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Scored {
        technical_score: f64,
        relevance_score: f64,
        quality_score: f64,
        details: crate::entities::EvaluationDetails,
        model_version: String,
        prompt_version: String,
    },
    Rejected {
        reason: RejectionReason,
        /// When true, the submission is returned to PENDING for a later
        /// retry attempt instead of terminally rejected (bounded by
        /// `MAX_VLM_ATTEMPTS`); only meaningful for `VLM_UNAVAILABLE`.
        retryable: bool,
    },
}

/// `POST /v1/evaluate/submit` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub worker_id: String,
    pub uuid: Uuid,
    pub outcome: EvaluationOutcome,
}

/// `POST /v1/evaluate/renew` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewRequest {
    pub worker_id: String,
    pub uuid: Uuid,
    pub lease_duration_sec: u32,
}

/// `POST /v1/evaluate/renew` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewResponse {
    pub lease_expires_at: DateTime<Utc>,
}

/// `POST /v1/evaluate/vlm` request: a worker asking the gateway to proxy one
/// VLM scoring call so the worker never needs `VLM_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmProxyRequest {
    pub scenario: String,
    pub action_description: Option<String>,
    pub camera_type: CameraType,
    pub actor_type: ActorType,
    pub keyframes_base64: Vec<String>,
}

/// `POST /v1/evaluate/vlm` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmProxyResponse {
    pub action_match: f64,
    pub perspective: f64,
    pub demo_quality: f64,
    pub training_utility: f64,
    pub model_version: String,
}

/// `POST /v1/evaluate/dedup` request: a worker asking the gateway to score
/// the perceptual hash it computed locally against the store's
/// cross-replica SCORED history, which it has no direct access to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupCheckRequest {
    pub cycle_id: i64,
    pub phash: String,
}

/// `POST /v1/evaluate/dedup` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupCheckResponse {
    pub quality_score: f64,
    pub matched_uuid: Option<Uuid>,
    pub similarity: Option<f64>,
}

/// `GET /v1/weights/{cycle_id}` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsView {
    pub cycle_id: i64,
    pub block_number: Option<i64>,
    pub weights: std::collections::BTreeMap<String, f64>,
    pub weights_u16: WeightsU16View,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightsU16View {
    pub uids: Vec<i64>,
    pub weights: Vec<u16>,
}

impl From<CycleWeights> for WeightsView {
    fn from(cw: CycleWeights) -> Self {
        let weights = cw
            .weights
            .iter()
            .map(|(uid, w)| (uid.to_string(), *w))
            .collect();
        let mut uids = Vec::with_capacity(cw.weights_u16.len());
        let mut weights_u16 = Vec::with_capacity(cw.weights_u16.len());
        for (uid, w) in &cw.weights_u16 {
            uids.push(*uid);
            weights_u16.push(*w);
        }
        Self {
            cycle_id: cw.cycle_id,
            block_number: cw.block_number,
            weights,
            weights_u16: WeightsU16View {
                uids,
                weights: weights_u16,
            },
        }
    }
}

/// `GET /v1/scores/*` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoresView {
    pub cycle_id: i64,
    pub breakdown: Vec<MinerScoreBreakdown>,
}

/// Generic error envelope returned by every non-2xx API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: Uuid,
}

/// `GET /v1/status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusView {
    pub version: String,
    pub build: String,
}

/// Common envelope the scheduler/worker use when reporting a `Cycle` over
/// admin-facing introspection, kept here so both binaries share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleView {
    pub id: i64,
    pub state: String,
    pub started_at: DateTime<Utc>,
    pub evaluating_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Cycle> for CycleView {
    fn from(c: Cycle) -> Self {
        Self {
            id: c.id,
            state: c.state.to_string(),
            started_at: c.started_at,
            evaluating_at: c.evaluating_at,
            completed_at: c.completed_at,
        }
    }
}
