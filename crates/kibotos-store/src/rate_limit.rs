use chrono::{DateTime, Duration, Utc};
use kibotos_types::{KibotosError, RATE_LIMIT_PER_HOUR};
use sqlx::PgConnection;

/// Increments the sliding-hour admission counter for `miner_uid` and fails
/// `RateLimited` if this admission would exceed `RATE_LIMIT_PER_HOUR`.
///
/// Must run inside the same transaction as the submission insert so a
/// rolled-back admission never leaks budget.
///
/// The window is anchored to the miner's first submission in the last hour:
/// if their most recent `window_start` is still within the hour, the count
/// keyed by that window is incremented; otherwise a fresh window opens at
/// `now`, sliding forward rather than snapping to wall-clock hour boundaries.
pub(crate) async fn check_and_increment(
    conn: &mut PgConnection,
    miner_uid: i64,
    now: DateTime<Utc>,
) -> Result<(), KibotosError> {
    let cutoff = now - Duration::hours(1);

    let current_window: Option<DateTime<Utc>> = sqlx::query_scalar(
        r#"
SELECT window_start FROM miner_rate_counters
WHERE miner_uid = $1 AND window_start > $2
ORDER BY window_start DESC
LIMIT 1
        "#,
    )
    .bind(miner_uid)
    .bind(cutoff)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| KibotosError::Internal(e.to_string()))?;

    let window_start = current_window.unwrap_or(now);

    let count: i32 = sqlx::query_scalar(
        r#"
INSERT INTO miner_rate_counters (miner_uid, window_start, count)
VALUES ($1, $2, 1)
ON CONFLICT (miner_uid, window_start) DO UPDATE SET count = miner_rate_counters.count + 1
RETURNING count
        "#,
    )
    .bind(miner_uid)
    .bind(window_start)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| KibotosError::Internal(e.to_string()))?;

    if count > RATE_LIMIT_PER_HOUR {
        return Err(KibotosError::RateLimited);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    // Exercised end-to-end via admit_submission in the integration test
    // crate (requires a live Postgres instance); no pure-function surface
    // here worth a unit test on its own.
}
