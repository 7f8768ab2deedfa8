//! Domain entities.
//!
//! ## Data model invariants
//!
//! - At most one cycle is `ACTIVE` at any time, and at most one is `EVALUATING`.
//! - Cycle state is monotone: `ACTIVE -> EVALUATING -> COMPLETED`, never backwards.
//! - `started_at <= evaluating_at <= completed_at`.
//! - A submission in `EVALUATING` always has a `lease_owner` and a
//!   `lease_expires_at` after `submitted_at`.
//! - `SCORED` and `REJECTED` are terminal; a submission's `cycle_id` never
//!   changes after admission.
//! - `final = 0.2*technical + 0.5*relevance + 0.3*quality` within float tolerance.
//! - `sum(weights) == 1` within `1e-6` when the map is non-empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Tolerance used across the crate for float-equality invariant checks.
pub const FLOAT_TOLERANCE: f64 = 1e-6;

/// Full range of the `weights_u16` projection.
pub const WEIGHTS_U16_SCALE: u32 = 65_535;

/// Maximum number of times a submission may be bounced back to PENDING after
/// a VLM failure before it is terminally rejected.
pub const MAX_VLM_ATTEMPTS: i32 = 3;

/// Minimum hex length of a SHA-256 digest rendered as lowercase hex.
pub const VIDEO_HASH_HEX_LEN: usize = 64;

/// A task prompt that submissions are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub category: String,
    pub task: String,
    pub scenario: String,
    pub requirements: PromptRequirements,
    pub weight: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Minimum/maximum technical constraints a submission for this prompt must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequirements {
    pub min_duration_sec: f64,
    pub max_duration_sec: f64,
    #[serde(default)]
    pub min_width: Option<u32>,
    #[serde(default)]
    pub min_height: Option<u32>,
}

/// Lifecycle state of a collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Active,
    Evaluating,
    Completed,
}

impl CycleState {
    /// Whether `self -> next` is an allowed forward transition.
    pub fn can_transition_to(self, next: CycleState) -> bool {
        matches!(
            (self, next),
            (CycleState::Active, CycleState::Evaluating)
                | (CycleState::Evaluating, CycleState::Completed)
        )
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CycleState::Active => "ACTIVE",
            CycleState::Evaluating => "EVALUATING",
            CycleState::Completed => "COMPLETED",
        };
        write!(f, "{s}")
    }
}

/// A fixed-duration collection window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: i64,
    pub state: CycleState,
    pub started_at: DateTime<Utc>,
    pub evaluating_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    Pending,
    Evaluating,
    Scored,
    Rejected,
}

impl SubmissionState {
    /// Terminal states never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Scored | SubmissionState::Rejected)
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubmissionState::Pending => "PENDING",
            SubmissionState::Evaluating => "EVALUATING",
            SubmissionState::Scored => "SCORED",
            SubmissionState::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// Camera placement declared by the miner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraType {
    EgoHead,
    EgoChest,
    EgoWrist,
    RobotHead,
    RobotWrist,
}

impl CameraType {
    pub const ALL: [CameraType; 5] = [
        CameraType::EgoHead,
        CameraType::EgoChest,
        CameraType::EgoWrist,
        CameraType::RobotHead,
        CameraType::RobotWrist,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CameraType::EgoHead => "ego_head",
            CameraType::EgoChest => "ego_chest",
            CameraType::EgoWrist => "ego_wrist",
            CameraType::RobotHead => "robot_head",
            CameraType::RobotWrist => "robot_wrist",
        }
    }
}

/// Actor performing the task in the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Human,
    Robot,
    HumanWithRobot,
}

impl ActorType {
    pub const ALL: [ActorType; 3] = [
        ActorType::Human,
        ActorType::Robot,
        ActorType::HumanWithRobot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActorType::Human => "human",
            ActorType::Robot => "robot",
            ActorType::HumanWithRobot => "human_with_robot",
        }
    }
}

/// A closed enumeration of miner-attributable rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    HashMismatch,
    Technical,
    VlmUnavailable,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectionReason::HashMismatch => "HASH_MISMATCH",
            RejectionReason::Technical => "TECHNICAL",
            RejectionReason::VlmUnavailable => "VLM_UNAVAILABLE",
        };
        write!(f, "{s}")
    }
}

/// One miner-supplied video + metadata record bound to exactly one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub uuid: Uuid,
    pub cycle_id: i64,
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
    pub action_description: Option<String>,
    pub signature: String,
    pub state: SubmissionState,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<RejectionReason>,
    pub vlm_attempts: i32,
}

/// Structured per-stage detail captured for an evaluation, for operator
/// debugging and for recomputing historical scores against a new rubric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDetails {
    #[serde(default)]
    pub technical: serde_json::Value,
    #[serde(default)]
    pub relevance: serde_json::Value,
    #[serde(default)]
    pub quality: serde_json::Value,
}

/// The scored outcome of the three-stage evaluation pipeline for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub submission_uuid: Uuid,
    pub technical_score: f64,
    pub relevance_score: f64,
    pub quality_score: f64,
    pub final_score: f64,
    pub details: EvaluationDetails,
    pub model_version: String,
    pub prompt_version: String,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    /// Composes the final score from the weighted stage components.
    pub fn compose_final(technical: f64, relevance: f64, quality: f64) -> f64 {
        0.2 * technical + 0.5 * relevance + 0.3 * quality
    }
}

/// Per-miner weight map for a completed cycle, in both float and u16 form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleWeights {
    pub cycle_id: i64,
    pub block_number: Option<i64>,
    pub weights: BTreeMap<i64, f64>,
    pub weights_u16: BTreeMap<i64, u16>,
    pub created_at: DateTime<Utc>,
}

/// A per-miner, per-hour admission counter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateCounter {
    pub miner_uid: i64,
    pub window_start: DateTime<Utc>,
    pub count: i32,
}

/// Maximum accepted submissions per miner per rolling hour.
pub const RATE_LIMIT_PER_HOUR: i32 = 4;

/// A submission ready to be admitted, after schema validation and signature
/// verification have already run. `cycle_id` is deliberately absent: the
/// store resolves it to the current `ACTIVE` cycle inside the admission
/// transaction, so admission and cycle-open checks can never race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub uuid: Uuid,
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
    pub action_description: Option<String>,
    pub signature: String,
    pub submitted_at: DateTime<Utc>,
}

/// Per-miner score breakdown used by the `/v1/scores` endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerScoreBreakdown {
    pub miner_uid: i64,
    pub submission_count: i64,
    pub total_final_score: f64,
    pub mean_final_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_transitions_are_forward_only() {
        assert!(CycleState::Active.can_transition_to(CycleState::Evaluating));
        assert!(CycleState::Evaluating.can_transition_to(CycleState::Completed));
        assert!(!CycleState::Active.can_transition_to(CycleState::Completed));
        assert!(!CycleState::Evaluating.can_transition_to(CycleState::Active));
        assert!(!CycleState::Completed.can_transition_to(CycleState::Active));
    }

    #[test]
    fn terminal_states() {
        assert!(SubmissionState::Scored.is_terminal());
        assert!(SubmissionState::Rejected.is_terminal());
        assert!(!SubmissionState::Pending.is_terminal());
        assert!(!SubmissionState::Evaluating.is_terminal());
    }

    #[test]
    fn final_score_composition() {
        let f = Evaluation::compose_final(1.0, 1.0, 1.0);
        assert!((f - 1.0).abs() < FLOAT_TOLERANCE);
        let f = Evaluation::compose_final(0.0, 0.0, 0.0);
        assert!((f - 0.0).abs() < FLOAT_TOLERANCE);
        let f = Evaluation::compose_final(0.5, 0.8, 0.2);
        assert!((f - (0.2 * 0.5 + 0.5 * 0.8 + 0.3 * 0.2)).abs() < FLOAT_TOLERANCE);
    }
}
