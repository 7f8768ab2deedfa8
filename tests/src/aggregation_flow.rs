//! End-to-end: admit submissions from several miners, score them, close and
//! complete the cycle through the same `get_scores` -> `aggregate` ->
//! `complete_cycle` path the scheduler drives, and check the persisted
//! weights satisfy the projection invariant.

use chrono::Duration;
use kibotos_aggregator::{aggregate, ScoredSubmission};
use kibotos_store::Store;
use kibotos_types::{EvaluationDetails, EvaluationOutcome};

use crate::support::{miner_keypair, seed_prompt, signed_request};

async fn admit_and_score(store: &Store, miner_uid: i64, video_hash: &str, relevance: f64) {
    let signing_key = miner_keypair();
    let req = signed_request(&signing_key, "prompt-1", miner_uid, video_hash);
    let submission = kibotos_admission::admit(store, req).await.expect("admit");

    let leased = store
        .lease_pending("worker-a", 10, Duration::seconds(60))
        .await
        .expect("lease");
    assert!(leased.iter().any(|s| s.uuid == submission.uuid));

    let outcome = EvaluationOutcome::Scored {
        technical_score: 1.0,
        relevance_score: relevance,
        quality_score: 1.0,
        details: EvaluationDetails::default(),
        model_version: "test-model".to_string(),
        prompt_version: "v1".to_string(),
    };
    store
        .commit_evaluation("worker-a", submission.uuid, outcome)
        .await
        .expect("commit");
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn scores_and_weights_round_trip_through_a_full_cycle(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let cycle = store.open_cycle().await.expect("open");
    seed_prompt(&store, "prompt-1").await;

    admit_and_score(&store, 1, &"1".repeat(64), 1.0).await;
    admit_and_score(&store, 2, &"2".repeat(64), 0.5).await;
    admit_and_score(&store, 3, &"3".repeat(64), 0.5).await;

    store
        .close_cycle_to_evaluating(cycle.id)
        .await
        .expect("close");
    assert_eq!(
        store.count_nonterminal_in_cycle(cycle.id).await.expect("count"),
        0
    );

    let breakdown = store.get_scores(cycle.id).await.expect("scores");
    assert_eq!(breakdown.len(), 3);

    let submissions: Vec<ScoredSubmission> = breakdown
        .iter()
        .map(|b| ScoredSubmission {
            miner_uid: b.miner_uid,
            final_score: b.total_final_score,
        })
        .collect();
    let mut weights = aggregate(cycle.id, &submissions);
    weights.created_at = chrono::Utc::now();

    let completed = store
        .complete_cycle(cycle.id, &weights)
        .await
        .expect("complete");
    assert_eq!(completed.state.to_string(), "COMPLETED");

    let sum_u16: u32 = weights.weights_u16.values().map(|&w| w as u32).sum();
    assert_eq!(sum_u16, 65535);

    let persisted = store
        .get_weights(cycle.id)
        .await
        .expect("get weights")
        .expect("weights present");
    assert_eq!(persisted.weights.len(), 3);
    // Miner 1 scored twice the relevance of miners 2 and 3, so it should
    // take roughly twice the weight share.
    assert!(persisted.weights[&1] > persisted.weights[&2]);
    assert!((persisted.weights[&2] - persisted.weights[&3]).abs() < 1e-9);
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn get_latest_scores_resolves_the_most_recently_completed_cycle(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let cycle = store.open_cycle().await.expect("open");
    seed_prompt(&store, "prompt-1").await;

    admit_and_score(&store, 5, &"5".repeat(64), 0.9).await;

    store
        .close_cycle_to_evaluating(cycle.id)
        .await
        .expect("close");

    let breakdown = store.get_scores(cycle.id).await.expect("scores");
    let submissions: Vec<ScoredSubmission> = breakdown
        .iter()
        .map(|b| ScoredSubmission {
            miner_uid: b.miner_uid,
            final_score: b.total_final_score,
        })
        .collect();
    let mut weights = aggregate(cycle.id, &submissions);
    weights.created_at = chrono::Utc::now();
    store.complete_cycle(cycle.id, &weights).await.expect("complete");

    let latest = store.get_latest_scores().await.expect("latest scores");
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].miner_uid, 5);
}
