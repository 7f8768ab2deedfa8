//! # Store
//!
//! Transactional persistence for cycles, submissions, evaluations, weights,
//! and the rate-limit counters that gate admission. Every primitive here is
//! safe to call from many concurrent processes: cross-process coordination
//! (leasing, admission, cycle transitions) is expressed as guarded
//! `UPDATE ... WHERE` statements checked via `rows_affected()`, or as
//! `SELECT ... FOR UPDATE SKIP LOCKED` inside a single transaction, never as
//! in-process locks.

mod cycles;
mod dedup;
mod error;
mod prompts;
mod rate_limit;
mod rows;
mod submissions;
mod vlm_tokens;
mod weights;

pub use error::StoreError;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Handle to the Postgres-backed store. Cheap to clone: wraps a pooled
/// connection handle shared by every task that holds one.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect to Postgres and run embedded migrations.
    ///
    /// `max_connections` should be sized per binary: the gateway and the
    /// scheduler each run their own pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Wrap an already-constructed pool, bypassing migrations. Used by
    /// integration tests that set up schema via `sqlx::test` fixtures.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
