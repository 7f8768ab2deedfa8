//! Raw `sqlx::FromRow` row shapes and their conversions into domain entities.
//!
//! Kept separate from `kibotos-types` so the domain crate stays free of a
//! `sqlx` dependency; only this crate knows about column layout.

use chrono::{DateTime, Utc};
use kibotos_types::{
    ActorType, CameraType, Cycle, CycleState, CycleWeights, Evaluation, EvaluationDetails,
    KibotosError, Prompt, PromptRequirements, RejectionReason, Submission, SubmissionState,
};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct PromptRow {
    pub id: String,
    pub category: String,
    pub task: String,
    pub scenario: String,
    pub requirements: serde_json::Value,
    pub weight: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PromptRow> for Prompt {
    type Error = KibotosError;

    fn try_from(row: PromptRow) -> Result<Self, Self::Error> {
        let requirements: PromptRequirements = serde_json::from_value(row.requirements)
            .map_err(|e| KibotosError::Internal(format!("corrupt prompt requirements: {e}")))?;
        Ok(Prompt {
            id: row.id,
            category: row.category,
            task: row.task,
            scenario: row.scenario,
            requirements,
            weight: row.weight,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CycleRow {
    pub id: i64,
    pub state: String,
    pub started_at: DateTime<Utc>,
    pub evaluating_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<CycleRow> for Cycle {
    type Error = KibotosError;

    fn try_from(row: CycleRow) -> Result<Self, Self::Error> {
        Ok(Cycle {
            id: row.id,
            state: parse_cycle_state(&row.state)?,
            started_at: row.started_at,
            evaluating_at: row.evaluating_at,
            completed_at: row.completed_at,
        })
    }
}

pub(crate) fn parse_cycle_state(s: &str) -> Result<CycleState, KibotosError> {
    match s {
        "ACTIVE" => Ok(CycleState::Active),
        "EVALUATING" => Ok(CycleState::Evaluating),
        "COMPLETED" => Ok(CycleState::Completed),
        other => Err(KibotosError::Internal(format!("unknown cycle state {other}"))),
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SubmissionRow {
    pub uuid: Uuid,
    pub cycle_id: i64,
    pub prompt_id: String,
    pub miner_uid: i64,
    pub miner_hotkey: String,
    pub video_key: String,
    pub video_hash: String,
    pub duration_sec: f64,
    pub width: i32,
    pub height: i32,
    pub fps: f64,
    pub camera_type: String,
    pub actor_type: String,
    pub action_description: Option<String>,
    pub signature: String,
    pub state: String,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub vlm_attempts: i32,
    pub submitted_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = KibotosError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            uuid: row.uuid,
            cycle_id: row.cycle_id,
            prompt_id: row.prompt_id,
            miner_uid: row.miner_uid,
            miner_hotkey: row.miner_hotkey,
            video_key: row.video_key,
            video_hash: row.video_hash,
            duration_sec: row.duration_sec,
            width: row.width as u32,
            height: row.height as u32,
            fps: row.fps,
            camera_type: parse_camera_type(&row.camera_type)?,
            actor_type: parse_actor_type(&row.actor_type)?,
            action_description: row.action_description,
            signature: row.signature,
            state: parse_submission_state(&row.state)?,
            lease_owner: row.lease_owner,
            lease_expires_at: row.lease_expires_at,
            submitted_at: row.submitted_at,
            evaluated_at: row.evaluated_at,
            rejection_reason: row
                .rejection_reason
                .as_deref()
                .map(parse_rejection_reason)
                .transpose()?,
            vlm_attempts: row.vlm_attempts,
        })
    }
}

pub(crate) fn parse_submission_state(s: &str) -> Result<SubmissionState, KibotosError> {
    match s {
        "PENDING" => Ok(SubmissionState::Pending),
        "EVALUATING" => Ok(SubmissionState::Evaluating),
        "SCORED" => Ok(SubmissionState::Scored),
        "REJECTED" => Ok(SubmissionState::Rejected),
        other => Err(KibotosError::Internal(format!("unknown submission state {other}"))),
    }
}

fn parse_camera_type(s: &str) -> Result<CameraType, KibotosError> {
    CameraType::ALL
        .into_iter()
        .find(|c| c.as_str() == s)
        .ok_or_else(|| KibotosError::Internal(format!("unknown camera type {s}")))
}

fn parse_actor_type(s: &str) -> Result<ActorType, KibotosError> {
    ActorType::ALL
        .into_iter()
        .find(|a| a.as_str() == s)
        .ok_or_else(|| KibotosError::Internal(format!("unknown actor type {s}")))
}

fn parse_rejection_reason(s: &str) -> Result<RejectionReason, KibotosError> {
    match s {
        "HASH_MISMATCH" => Ok(RejectionReason::HashMismatch),
        "TECHNICAL" => Ok(RejectionReason::Technical),
        "VLM_UNAVAILABLE" => Ok(RejectionReason::VlmUnavailable),
        other => Err(KibotosError::Internal(format!("unknown rejection reason {other}"))),
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct EvaluationRow {
    pub submission_uuid: Uuid,
    pub technical_score: f64,
    pub relevance_score: f64,
    pub quality_score: f64,
    pub final_score: f64,
    pub details: serde_json::Value,
    pub model_version: String,
    pub prompt_version: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EvaluationRow> for Evaluation {
    type Error = KibotosError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let details: EvaluationDetails = serde_json::from_value(row.details)
            .map_err(|e| KibotosError::Internal(format!("corrupt evaluation details: {e}")))?;
        Ok(Evaluation {
            submission_uuid: row.submission_uuid,
            technical_score: row.technical_score,
            relevance_score: row.relevance_score,
            quality_score: row.quality_score,
            final_score: row.final_score,
            details,
            model_version: row.model_version,
            prompt_version: row.prompt_version,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CycleWeightsRow {
    pub cycle_id: i64,
    pub block_number: Option<i64>,
    pub weights: serde_json::Value,
    pub weights_u16: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CycleWeightsRow> for CycleWeights {
    type Error = KibotosError;

    fn try_from(row: CycleWeightsRow) -> Result<Self, Self::Error> {
        let weights: BTreeMap<String, f64> = serde_json::from_value(row.weights)
            .map_err(|e| KibotosError::Internal(format!("corrupt weights: {e}")))?;
        let weights_u16: BTreeMap<String, u16> = serde_json::from_value(row.weights_u16)
            .map_err(|e| KibotosError::Internal(format!("corrupt weights_u16: {e}")))?;
        Ok(CycleWeights {
            cycle_id: row.cycle_id,
            block_number: row.block_number,
            weights: remap_keys(weights)?,
            weights_u16: remap_keys(weights_u16)?,
            created_at: row.created_at,
        })
    }
}

/// JSONB object keys are always strings; miner uids are `i64` in the domain
/// model, so round-trip through string keys at the storage boundary.
fn remap_keys<V>(input: BTreeMap<String, V>) -> Result<BTreeMap<i64, V>, KibotosError> {
    input
        .into_iter()
        .map(|(k, v)| {
            k.parse::<i64>()
                .map(|k| (k, v))
                .map_err(|e| KibotosError::Internal(format!("corrupt miner_uid key {k:?}: {e}")))
        })
        .collect()
}

pub(crate) fn stringify_keys<V: Clone>(input: &BTreeMap<i64, V>) -> BTreeMap<String, V> {
    input.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}
