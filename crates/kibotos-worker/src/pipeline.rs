//! The three-stage evaluation pipeline run against one leased submission.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use kibotos_types::{
    EvaluationDetails, EvaluationOutcome, LeasedSubmission, RejectionReason,
};
use kibotos_vlm::VlmClient;
use sha2::{Digest, Sha256};

use crate::client::GatewayClient;
use crate::phash::compute_phash;
use crate::probe::{score_technical, DeclaredMetadata, VideoProbe};

const MODEL_VERSION: &str = "kibotos-worker/vlm-v1";
const PROMPT_VERSION: &str = "v1";

/// Default lease remaining-fraction threshold below which the worker
/// renews rather than let the lease lapse mid-evaluation.
const RENEW_THRESHOLD: f64 = 0.25;

pub struct PipelineDeps {
    pub gateway: Arc<GatewayClient>,
    pub vlm: Arc<dyn VlmClient>,
    pub probe: Arc<dyn VideoProbe>,
    pub keyframe_count: u32,
    pub worker_id: String,
}

/// Runs Stage 1-3 against `leased`, issuing a lease renewal mid-flight if
/// Stage 2 is running long, and returns the outcome to commit.
///
/// Returns `None` if the lease was lost during a renewal attempt: the
/// caller should silently abandon the submission rather than committing.
pub async fn evaluate(
    deps: &PipelineDeps,
    leased: &LeasedSubmission,
    lease_duration: Duration,
) -> Option<EvaluationOutcome> {
    let started = tokio::time::Instant::now();
    let submission = &leased.submission;

    let bytes = match deps.gateway.download(&leased.download_url).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(uuid = %submission.uuid, error = %err, "download failed");
            return Some(EvaluationOutcome::Rejected {
                reason: RejectionReason::VlmUnavailable,
                retryable: true,
            });
        }
    };

    // Stage 1a: hash check.
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let actual_hash = hex::encode(hasher.finalize());
    if actual_hash != submission.video_hash {
        return Some(EvaluationOutcome::Rejected {
            reason: RejectionReason::HashMismatch,
            retryable: false,
        });
    }

    // Stage 1b: technical probe.
    let declared = DeclaredMetadata {
        duration_sec: submission.duration_sec,
        width: submission.width,
        height: submission.height,
        fps: submission.fps,
    };
    let technical = match deps.probe.probe(&bytes, &declared) {
        Ok(report) => score_technical(&declared, &report),
        Err(_) => {
            return Some(EvaluationOutcome::Rejected {
                reason: RejectionReason::Technical,
                retryable: false,
            })
        }
    };
    if !technical.passed {
        return Some(EvaluationOutcome::Rejected {
            reason: RejectionReason::Technical,
            retryable: false,
        });
    }

    // Mid-pipeline lease renewal if Stage 2 is likely to run past expiry.
    if started.elapsed().as_secs_f64() > lease_duration.as_secs_f64() * (1.0 - RENEW_THRESHOLD) {
        if let Err(err) = deps
            .gateway
            .renew(&deps.worker_id, submission.uuid, lease_duration.as_secs() as u32)
            .await
        {
            tracing::info!(uuid = %submission.uuid, error = %err, "lease renewal failed, abandoning");
            return None;
        }
    }

    // Stage 2: VLM relevance scoring.
    let keyframes_base64 = sample_keyframes(&bytes, deps.keyframe_count);
    let vlm_request = kibotos_types::VlmProxyRequest {
        scenario: leased.prompt.scenario.clone(),
        action_description: submission.action_description.clone(),
        camera_type: submission.camera_type,
        actor_type: submission.actor_type,
        keyframes_base64,
    };

    let vlm_response = match deps.vlm.score(&vlm_request).await {
        Ok(response) => response,
        Err(_) => {
            return Some(EvaluationOutcome::Rejected {
                reason: RejectionReason::VlmUnavailable,
                retryable: true,
            })
        }
    };

    let relevance_score = 0.40 * vlm_response.action_match
        + 0.20 * vlm_response.perspective
        + 0.20 * vlm_response.demo_quality
        + 0.20 * vlm_response.training_utility;

    // Stage 3: perceptual-hash duplicate detection.
    let phash = compute_phash(&bytes);
    let dedup = deps
        .gateway
        .dedup_check(submission.cycle_id, phash.clone())
        .await;
    let quality_score = match dedup {
        Ok(response) => response.quality_score,
        Err(err) => {
            tracing::warn!(uuid = %submission.uuid, error = %err, "dedup check failed, scoring as unique");
            1.0
        }
    };

    let details = EvaluationDetails {
        technical: serde_json::json!({
            "resolution_component": technical.resolution_component,
            "fps_component": technical.fps_component,
            "duration_component": technical.duration_component,
        }),
        relevance: serde_json::to_value(&vlm_response).unwrap_or_default(),
        quality: serde_json::json!({ "phash": phash }),
    };

    Some(EvaluationOutcome::Scored {
        technical_score: technical.mean(),
        relevance_score,
        quality_score,
        details,
        model_version: MODEL_VERSION.to_string(),
        prompt_version: PROMPT_VERSION.to_string(),
    })
}

/// Samples `k` evenly-spaced byte windows and base64-encodes them as
/// keyframe stand-ins; a real deployment extracts actual decoded frames
/// before this point (video decoding is an external collaborator, see
/// `probe`).
fn sample_keyframes(bytes: &[u8], k: u32) -> Vec<String> {
    if bytes.is_empty() || k == 0 {
        return Vec::new();
    }
    let k = k as usize;
    let window = (bytes.len() / k).max(1);
    (0..k)
        .filter_map(|i| {
            let start = i * window;
            if start >= bytes.len() {
                return None;
            }
            let end = (start + window).min(bytes.len());
            Some(base64::engine::general_purpose::STANDARD.encode(&bytes[start..end]))
        })
        .collect()
}
