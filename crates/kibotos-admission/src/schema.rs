//! Stage 1 admission check: structural validation of a submission request
//! that doesn't require touching the store or cryptography.

use kibotos_types::{KibotosError, SubmissionRequest};

const VIDEO_HASH_LEN: usize = 64;
const DURATION_SEC_RANGE: std::ops::RangeInclusive<f64> = 1.0..=300.0;
const FPS_RANGE: std::ops::RangeInclusive<f64> = 15.0..=120.0;
const MIN_WIDTH: u32 = 480;
const MIN_HEIGHT: u32 = 360;

/// Runs every structural check in order, returning the first failure. `camera_type`/`actor_type` are already
/// closed enums by the time they reach here (serde rejects anything outside
/// the wire set), so only the remaining fields need range/format checks.
pub fn validate_schema(req: &SubmissionRequest) -> Result<(), KibotosError> {
    if req.prompt_id.trim().is_empty() {
        return Err(KibotosError::Validation("prompt_id must not be empty".into()));
    }

    if !is_lowercase_hex(&req.video_hash, VIDEO_HASH_LEN) {
        return Err(KibotosError::Validation(format!(
            "video_hash must be {VIDEO_HASH_LEN} lowercase hex characters"
        )));
    }

    if !DURATION_SEC_RANGE.contains(&req.duration_sec) {
        return Err(KibotosError::Validation(format!(
            "duration_sec must be in [{}, {}]",
            DURATION_SEC_RANGE.start(),
            DURATION_SEC_RANGE.end()
        )));
    }

    if req.width < MIN_WIDTH || req.height < MIN_HEIGHT {
        return Err(KibotosError::Validation(format!(
            "resolution must be at least {MIN_WIDTH}x{MIN_HEIGHT}"
        )));
    }

    if !FPS_RANGE.contains(&req.fps) {
        return Err(KibotosError::Validation(format!(
            "fps must be in [{}, {}]",
            FPS_RANGE.start(),
            FPS_RANGE.end()
        )));
    }

    if req.video_key.trim().is_empty() {
        return Err(KibotosError::Validation("video_key must not be empty".into()));
    }

    if !is_lowercase_hex(&req.miner_hotkey, 64) {
        return Err(KibotosError::Validation(
            "miner_hotkey must be 64 lowercase hex characters (32-byte Ed25519 key)".into(),
        ));
    }

    if !is_lowercase_hex(&req.signature, 128) {
        return Err(KibotosError::Validation(
            "signature must be 128 lowercase hex characters (64-byte Ed25519 signature)".into(),
        ));
    }

    Ok(())
}

fn is_lowercase_hex(s: &str, expected_len: usize) -> bool {
    s.len() == expected_len && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kibotos_types::{ActorType, CameraType};

    fn valid_request() -> SubmissionRequest {
        SubmissionRequest {
            prompt_id: "prompt-1".into(),
            miner_uid: 7,
            miner_hotkey: "a".repeat(64),
            video_key: "videos/a.mp4".into(),
            video_hash: "b".repeat(64),
            duration_sec: 30.0,
            width: 1920,
            height: 1080,
            fps: 30.0,
            camera_type: CameraType::EgoHead,
            actor_type: ActorType::Human,
            action_description: None,
            signature: "c".repeat(128),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_schema(&valid_request()).is_ok());
    }

    #[test]
    fn rejects_short_video_hash() {
        let mut req = valid_request();
        req.video_hash = "b".repeat(63);
        assert!(matches!(
            validate_schema(&req),
            Err(KibotosError::Validation(_))
        ));
    }

    #[test]
    fn rejects_uppercase_hex() {
        let mut req = valid_request();
        req.video_hash = "B".repeat(64);
        assert!(validate_schema(&req).is_err());
    }

    #[test]
    fn rejects_duration_out_of_range() {
        let mut req = valid_request();
        req.duration_sec = 301.0;
        assert!(validate_schema(&req).is_err());

        let mut req = valid_request();
        req.duration_sec = 0.5;
        assert!(validate_schema(&req).is_err());
    }

    #[test]
    fn rejects_low_resolution() {
        let mut req = valid_request();
        req.width = 479;
        assert!(validate_schema(&req).is_err());
    }

    #[test]
    fn rejects_fps_out_of_range() {
        let mut req = valid_request();
        req.fps = 14.9;
        assert!(validate_schema(&req).is_err());

        let mut req = valid_request();
        req.fps = 120.1;
        assert!(validate_schema(&req).is_err());
    }

    #[test]
    fn rejects_malformed_signature_length() {
        let mut req = valid_request();
        req.signature = "c".repeat(127);
        assert!(validate_schema(&req).is_err());
    }
}
