//! Cycle state machine: forward-only transitions, the single-active /
//! single-evaluating invariants enforced by the partial unique indexes, and
//! the `HasPending` guard that keeps a cycle from completing while
//! submissions are still outstanding.

use kibotos_store::Store;
use kibotos_types::{CycleWeights, KibotosError};

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn only_one_cycle_can_be_active_at_a_time(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    store.open_cycle().await.expect("first open");

    let err = store.open_cycle().await.unwrap_err();
    assert!(matches!(err, kibotos_store::StoreError::Domain(KibotosError::AlreadyActive)));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn closes_an_active_cycle_to_evaluating(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let cycle = store.open_cycle().await.expect("open");

    let closed = store
        .close_cycle_to_evaluating(cycle.id)
        .await
        .expect("close");
    assert_eq!(closed.state.to_string(), "EVALUATING");

    let status = store.get_cycle_status().await.expect("status");
    assert_eq!(status.active_cycle_id, None);
    assert_eq!(status.evaluating_cycle_id, Some(cycle.id));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn cannot_close_a_cycle_that_is_not_active(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let cycle = store.open_cycle().await.expect("open");
    store
        .close_cycle_to_evaluating(cycle.id)
        .await
        .expect("close once");

    let err = store.close_cycle_to_evaluating(cycle.id).await.unwrap_err();
    assert!(matches!(err, kibotos_store::StoreError::Domain(KibotosError::WrongState)));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn completion_is_blocked_while_submissions_are_outstanding(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let cycle = store.open_cycle().await.expect("open");
    crate::support::seed_prompt(&store, "prompt-1").await;

    let signing_key = crate::support::miner_keypair();
    let req = crate::support::signed_request(&signing_key, "prompt-1", 1, &"d".repeat(64));
    kibotos_admission::admit(&store, req).await.expect("admit");

    store
        .close_cycle_to_evaluating(cycle.id)
        .await
        .expect("close");

    assert_eq!(
        store.count_nonterminal_in_cycle(cycle.id).await.expect("count"),
        1
    );

    let weights = CycleWeights {
        cycle_id: cycle.id,
        ..Default::default()
    };
    let err = store.complete_cycle(cycle.id, &weights).await.unwrap_err();
    assert!(matches!(err, kibotos_store::StoreError::Domain(KibotosError::HasPending)));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn completes_a_cycle_with_no_outstanding_submissions(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let cycle = store.open_cycle().await.expect("open");
    store
        .close_cycle_to_evaluating(cycle.id)
        .await
        .expect("close");

    let mut weights = CycleWeights {
        cycle_id: cycle.id,
        ..Default::default()
    };
    weights.weights.insert(7, 1.0);
    weights.weights_u16.insert(7, 65535);

    let completed = store
        .complete_cycle(cycle.id, &weights)
        .await
        .expect("complete");
    assert_eq!(completed.state.to_string(), "COMPLETED");

    let status = store.get_cycle_status().await.expect("status");
    assert_eq!(status.evaluating_cycle_id, None);
    assert_eq!(status.last_completed_cycle_id, Some(cycle.id));

    let persisted = store
        .get_latest_weights()
        .await
        .expect("get weights")
        .expect("weights present");
    assert_eq!(persisted.weights[&7], 1.0);
}
