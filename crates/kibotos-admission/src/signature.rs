//! Stage 2 admission check: Ed25519 signature verification over the
//! canonical message built in [`crate::canonical`].

use crate::canonical::canonical_message;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use kibotos_types::{KibotosError, SubmissionRequest};

/// Verifies that `req.signature` is a valid Ed25519 signature by
/// `req.miner_hotkey` over the canonical serialization of the submission.
/// Any malformed hex, wrong-length key, or cryptographic mismatch collapses
/// to `BAD_SIGNATURE` without distinguishing the cause to the caller.
pub fn verify_signature(req: &SubmissionRequest) -> Result<(), KibotosError> {
    let pubkey_bytes: [u8; 32] = hex::decode(&req.miner_hotkey)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(KibotosError::BadSignature)?;
    let sig_bytes: [u8; 64] = hex::decode(&req.signature)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(KibotosError::BadSignature)?;

    let verifying_key =
        VerifyingKey::from_bytes(&pubkey_bytes).map_err(|_| KibotosError::BadSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    let message = canonical_message(
        &req.video_hash,
        &req.video_key,
        &req.prompt_id,
        req.miner_uid,
        req.submitted_at,
    );

    verifying_key
        .verify(&message, &signature)
        .map_err(|_| KibotosError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ed25519_dalek::{Signer, SigningKey};
    use kibotos_types::{ActorType, CameraType};
    use rand::rngs::OsRng;

    fn signed_request(signing_key: &SigningKey) -> SubmissionRequest {
        let submitted_at = Utc::now();
        let video_hash = "a".repeat(64);
        let video_key = "videos/x.mp4".to_string();
        let prompt_id = "prompt-1".to_string();
        let miner_uid = 7;

        let message = canonical_message(&video_hash, &video_key, &prompt_id, miner_uid, submitted_at);
        let signature: Signature = signing_key.sign(&message);

        SubmissionRequest {
            prompt_id,
            miner_uid,
            miner_hotkey: hex::encode(signing_key.verifying_key().to_bytes()),
            video_key,
            video_hash,
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

    #[test]
    fn accepts_a_genuine_signature() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let req = signed_request(&signing_key);
        assert!(verify_signature(&req).is_ok());
    }

    #[test]
    fn rejects_signature_from_a_different_key() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let other_key = SigningKey::generate(&mut OsRng);
        let mut req = signed_request(&signing_key);
        req.miner_hotkey = hex::encode(other_key.verifying_key().to_bytes());

        assert!(matches!(
            verify_signature(&req),
            Err(KibotosError::BadSignature)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let mut req = signed_request(&signing_key);
        req.video_hash = "b".repeat(64);

        assert!(matches!(
            verify_signature(&req),
            Err(KibotosError::BadSignature)
        ));
    }

    #[test]
    fn rejects_malformed_hex() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let mut req = signed_request(&signing_key);
        req.signature = "not-hex".into();

        assert!(matches!(
            verify_signature(&req),
            Err(KibotosError::BadSignature)
        ));
    }

    #[test]
    fn a_signature_minutes_apart_within_the_same_truncated_minute_still_verifies() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let req = signed_request(&signing_key);

        // Re-verifying later in the same minute (clock skew between miner
        // and gateway) must not invalidate the signature.
        assert!(verify_signature(&req).is_ok());
    }
}
