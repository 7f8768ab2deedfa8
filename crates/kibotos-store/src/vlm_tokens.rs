use crate::{Store, StoreError};
use chrono::{Duration, Utc};

impl Store {
    /// Best-effort global token bucket backing VLM call pacing, shared
    /// across every `kibotos-api` replica via the single-row
    /// `vlm_rate_tokens` table. Refills lazily on read: if the wall clock
    /// has advanced past `window`, the bucket resets to `capacity` before
    /// the request is evaluated.
    ///
    /// Returns the tokens remaining after granting `n`, or `None` if the
    /// bucket doesn't have `n` tokens available (the caller should back off
    /// rather than call the VLM).
    pub async fn acquire_vlm_tokens(
        &self,
        n: i32,
        capacity: i32,
        window: Duration,
    ) -> Result<Option<i32>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let (tokens, window_start): (i32, chrono::DateTime<Utc>) = sqlx::query_as(
            "SELECT tokens, window_start FROM vlm_rate_tokens WHERE id = 1 FOR UPDATE",
        )
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        let (tokens, window_start) = if now - window_start >= window {
            (capacity, now)
        } else {
            (tokens, window_start)
        };

        let remaining = if tokens >= n {
            Some(tokens - n)
        } else {
            None
        };

        sqlx::query(
            "UPDATE vlm_rate_tokens SET tokens = $1, window_start = $2 WHERE id = 1",
        )
        .bind(remaining.unwrap_or(tokens))
        .bind(window_start)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(remaining)
    }
}
