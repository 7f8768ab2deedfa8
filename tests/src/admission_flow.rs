//! Admission: schema/signature checks are covered as pure unit tests inside
//! `kibotos-admission`; this module covers what only a real store can prove
//! — the open-cycle gate, exact-duplicate rejection, and the sliding-hour
//! rate limit, all enforced inside `admit_submission`'s transaction.

use kibotos_store::Store;
use kibotos_types::{RATE_LIMIT_PER_HOUR, KibotosError};

use crate::support::{miner_keypair, seed_prompt, signed_request};

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn admits_a_valid_signed_submission_to_the_open_cycle(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    let cycle = store.open_cycle().await.expect("open cycle");
    seed_prompt(&store, "prompt-1").await;

    let signing_key = miner_keypair();
    let req = signed_request(&signing_key, "prompt-1", 1, &"a".repeat(64));

    let submission = kibotos_admission::admit(&store, req).await.expect("admit");
    assert_eq!(submission.cycle_id, cycle.id);
    assert_eq!(submission.state.to_string(), "PENDING");
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn rejects_admission_with_no_open_cycle(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    seed_prompt(&store, "prompt-1").await;

    let signing_key = miner_keypair();
    let req = signed_request(&signing_key, "prompt-1", 1, &"a".repeat(64));

    let err = kibotos_admission::admit(&store, req).await.unwrap_err();
    assert!(matches!(err, KibotosError::NoOpenCycle));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn rejects_a_repeated_video_hash_from_the_same_miner(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    store.open_cycle().await.expect("open cycle");
    seed_prompt(&store, "prompt-1").await;

    let signing_key = miner_keypair();
    let video_hash = "b".repeat(64);

    let first = signed_request(&signing_key, "prompt-1", 1, &video_hash);
    kibotos_admission::admit(&store, first).await.expect("first admit");

    let second = signed_request(&signing_key, "prompt-1", 1, &video_hash);
    let err = kibotos_admission::admit(&store, second).await.unwrap_err();
    assert!(matches!(err, KibotosError::Duplicate));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn enforces_the_sliding_hour_rate_limit_per_miner(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    store.open_cycle().await.expect("open cycle");
    seed_prompt(&store, "prompt-1").await;

    let signing_key = miner_keypair();

    for i in 0..RATE_LIMIT_PER_HOUR {
        let req = signed_request(&signing_key, "prompt-1", 9, &format!("{i:064}"));
        kibotos_admission::admit(&store, req)
            .await
            .unwrap_or_else(|e| panic!("admission {i} should succeed, got {e:?}"));
    }

    let over_limit = signed_request(&signing_key, "prompt-1", 9, &"f".repeat(64));
    let err = kibotos_admission::admit(&store, over_limit).await.unwrap_err();
    assert!(matches!(err, KibotosError::RateLimited));
}

#[sqlx::test(migrations = "../crates/kibotos-store/migrations")]
async fn rejects_submissions_against_an_unknown_prompt(pool: sqlx::PgPool) {
    let store = Store::from_pool(pool);
    store.open_cycle().await.expect("open cycle");

    let signing_key = miner_keypair();
    let req = signed_request(&signing_key, "no-such-prompt", 1, &"c".repeat(64));

    let err = kibotos_admission::admit(&store, req).await.unwrap_err();
    assert!(matches!(err, KibotosError::UnknownPrompt));
}
