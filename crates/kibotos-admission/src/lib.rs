//! Admission pipeline: the four ordered checks a submission passes through
//! before it exists in the store. Schema and signature are pure and
//! require no I/O; dedup and the final store admit both need a [`Store`]
//! handle, so this crate is the thin layer that wires them together and is
//! mounted directly behind `POST /v1/submissions` in `kibotos-api`.

mod canonical;
mod schema;
mod signature;

pub use canonical::canonical_message;
pub use schema::validate_schema;
pub use signature::verify_signature;

use kibotos_store::Store;
use kibotos_types::{KibotosError, NewSubmission, Submission, SubmissionRequest};
use uuid::Uuid;

/// Runs the full Stage 1-4 admission pipeline and, on success, returns the
/// submission as it now exists in the store (PENDING, bound to whichever
/// cycle was ACTIVE at insert time).
///
/// Order matters: schema and signature are checked before the store is
/// touched at all, so a malformed or forged request never costs a query.
/// Dedup runs before `admit_submission` so a duplicate never consumes a
/// rate-limit slot.
pub async fn admit(store: &Store, req: SubmissionRequest) -> Result<Submission, KibotosError> {
    validate_schema(&req)?;
    verify_signature(&req)?;

    if store
        .exists_duplicate_hash(req.miner_uid, &req.video_hash)
        .await
        .map_err(KibotosError::from)?
    {
        return Err(KibotosError::Duplicate);
    }

    let new_submission = NewSubmission {
        uuid: Uuid::new_v4(),
        prompt_id: req.prompt_id,
        miner_uid: req.miner_uid,
        miner_hotkey: req.miner_hotkey,
        video_key: req.video_key,
        video_hash: req.video_hash,
        duration_sec: req.duration_sec,
        width: req.width,
        height: req.height,
        fps: req.fps,
        camera_type: req.camera_type,
        actor_type: req.actor_type,
        action_description: req.action_description,
        signature: req.signature,
        submitted_at: req.submitted_at,
    };

    store
        .admit_submission(&new_submission)
        .await
        .map_err(KibotosError::from)
}
