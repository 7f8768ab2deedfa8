//! Shared fixtures for the integration suites below: a seedable prompt and
//! a validly-signed submission request, so each test only states what it's
//! actually varying.

use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use kibotos_store::Store;
use kibotos_types::{
    ActorType, CameraType, Prompt, PromptRequirements, SubmissionRequest,
};
use rand::rngs::OsRng;

/// Builds and persists an active prompt with generous technical bounds, so
/// admission tests don't need to reason about the technical-validation
/// thresholds unless that's what they're testing.
pub async fn seed_prompt(store: &Store, id: &str) -> Prompt {
    let prompt = Prompt {
        id: id.to_string(),
        category: "manipulation".to_string(),
        task: "pick up the object".to_string(),
        scenario: "a tabletop pick-and-place task".to_string(),
        requirements: PromptRequirements {
            min_duration_sec: 1.0,
            max_duration_sec: 600.0,
            min_width: None,
            min_height: None,
        },
        weight: 1.0,
        active: true,
        created_at: Utc::now(),
    };
    store.create_prompt(&prompt).await.expect("seed prompt")
}

/// A fresh Ed25519 keypair, so callers can sign one or more requests under
/// the same identity without repeating key generation.
pub fn miner_keypair() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Builds a `SubmissionRequest` validly signed by `signing_key`, with
/// `video_hash` left to the caller so duplicate/near-duplicate tests can
/// control it directly.
pub fn signed_request(
    signing_key: &SigningKey,
    prompt_id: &str,
    miner_uid: i64,
    video_hash: &str,
) -> SubmissionRequest {
    let submitted_at = Utc::now();
    let video_key = format!("videos/{video_hash}.mp4");

    let message = kibotos_admission::canonical_message(
        video_hash,
        &video_key,
        prompt_id,
        miner_uid,
        submitted_at,
    );
    let signature = signing_key.sign(&message);

    SubmissionRequest {
        prompt_id: prompt_id.to_string(),
        miner_uid,
        miner_hotkey: hex::encode(signing_key.verifying_key().to_bytes()),
        video_key,
        video_hash: video_hash.to_string(),
        duration_sec: 30.0,
        width: 1920,
        height: 1080,
        fps: 30.0,
        camera_type: CameraType::EgoHead,
        actor_type: ActorType::Human,
        action_description: None,
        signature: hex::encode(signature.to_bytes()),
        submitted_at,
    }
}
