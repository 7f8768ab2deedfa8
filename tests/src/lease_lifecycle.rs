//! Work leasing: `SKIP LOCKED` hand-out, the CAS guard on renewal and
//! commit, and the bounded VLM-retry-before-terminal-rejection path.

use chrono::Duration;
use kibotos_store::Store;
use kibotos_types::{EvaluationDetails, EvaluationOutcome, KibotosError, RejectionReason};

use crate::support::{miner_keypair, seed_prompt, signed_request};

async fn seeded_pending_submission(store: &Store) -> uuid::Uuid {
    store.open_cycle().await.expect("open cycle");
    seed_prompt(store, "prompt-1").await;
    let signing_key = miner_keypair();
    let req = signed_request(&signing_key, "prompt-1", 1, &"e".repeat(64));
    let submission = kibotos_admission::admit(store, req).await.expect("admit");
    submission.uuid
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn leasing_transitions_pending_to_evaluating(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    seeded_pending_submission(&store).await;

    let leased = store
        .lease_pending("worker-a", 10, Duration::seconds(60))
        .await
        .expect("lease");
    assert_eq!(leased.len(), 1);
    assert_eq!(leased[0].state.to_string(), "EVALUATING");
    assert_eq!(leased[0].lease_owner.as_deref(), Some("worker-a"));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn an_unexpired_lease_is_not_handed_to_another_worker(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    seeded_pending_submission(&store).await;

    store
        .lease_pending("worker-a", 10, Duration::seconds(60))
        .await
        .expect("first lease");

    let second = store
        .lease_pending("worker-b", 10, Duration::seconds(60))
        .await
        .expect("second lease attempt");
    assert!(second.is_empty());
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn an_expired_lease_can_be_reclaimed(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    seeded_pending_submission(&store).await;

    store
        .lease_pending("worker-a", 10, Duration::seconds(-1))
        .await
        .expect("lease already expired");

    let reclaimed = store
        .lease_pending("worker-b", 10, Duration::seconds(60))
        .await
        .expect("reclaim");
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(reclaimed[0].lease_owner.as_deref(), Some("worker-b"));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn renewal_fails_for_a_caller_that_does_not_hold_the_lease(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let uuid = seeded_pending_submission(&store).await;
    store
        .lease_pending("worker-a", 10, Duration::seconds(60))
        .await
        .expect("lease");

    let err = store
        .renew_lease("worker-b", uuid, Duration::seconds(60))
        .await
        .unwrap_err();
    assert!(matches!(err, kibotos_store::StoreError::Domain(KibotosError::LeaseLost)));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn a_second_workers_commit_fails_after_the_lease_is_reclaimed(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let uuid = seeded_pending_submission(&store).await;

    store
        .lease_pending("worker-a", 10, Duration::seconds(-1))
        .await
        .expect("lease, then let it expire");
    store
        .lease_pending("worker-b", 10, Duration::seconds(60))
        .await
        .expect("reclaim");

    let outcome = EvaluationOutcome::Rejected {
        reason: RejectionReason::Technical,
        retryable: false,
    };
    let err = store
        .commit_evaluation("worker-a", uuid, outcome)
        .await
        .unwrap_err();
    assert!(matches!(err, kibotos_store::StoreError::Domain(KibotosError::LeaseLost)));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn a_scored_outcome_commits_as_terminal(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let uuid = seeded_pending_submission(&store).await;
    store
        .lease_pending("worker-a", 10, Duration::seconds(60))
        .await
        .expect("lease");

    let outcome = EvaluationOutcome::Scored {
        technical_score: 1.0,
        relevance_score: 0.8,
        quality_score: 1.0,
        details: EvaluationDetails::default(),
        model_version: "test-model".to_string(),
        prompt_version: "v1".to_string(),
    };
    let committed = store
        .commit_evaluation("worker-a", uuid, outcome)
        .await
        .expect("commit");
    assert_eq!(committed.state.to_string(), "SCORED");
    assert!(committed.lease_owner.is_none());

    let evaluation = store
        .get_evaluation(uuid)
        .await
        .expect("get evaluation")
        .expect("evaluation present");
    let expected_final = 0.2 * 1.0 + 0.5 * 0.8 + 0.3 * 1.0;
    assert!((evaluation.final_score - expected_final).abs() < 1e-9);
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn vlm_unavailable_releases_to_pending_until_attempts_are_exhausted(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let uuid = seeded_pending_submission(&store).await;

    for attempt in 0..kibotos_types::MAX_VLM_ATTEMPTS - 1 {
        let leased = store
            .lease_pending("worker-a", 10, Duration::seconds(60))
            .await
            .expect("lease");
        assert_eq!(leased.len(), 1, "attempt {attempt} should find a lease");

        let outcome = EvaluationOutcome::Rejected {
            reason: RejectionReason::VlmUnavailable,
            retryable: true,
        };
        let submission = store
            .commit_evaluation("worker-a", uuid, outcome)
            .await
            .expect("commit retry");
        assert_eq!(submission.state.to_string(), "PENDING");
    }

    // The final attempt exhausts the retry budget and terminally rejects.
    let leased = store
        .lease_pending("worker-a", 10, Duration::seconds(60))
        .await
        .expect("final lease");
    assert_eq!(leased.len(), 1);

    let outcome = EvaluationOutcome::Rejected {
        reason: RejectionReason::VlmUnavailable,
        retryable: true,
    };
    let submission = store
        .commit_evaluation("worker-a", uuid, outcome)
        .await
        .expect("commit final");
    assert_eq!(submission.state.to_string(), "REJECTED");
    assert_eq!(submission.rejection_reason, Some(RejectionReason::VlmUnavailable));
}
