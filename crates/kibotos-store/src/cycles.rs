use crate::rows::CycleRow;
use crate::{Store, StoreError};
use kibotos_types::{Cycle, CycleStatus, CycleWeights, KibotosError};

impl Store {
    /// Opens a new ACTIVE cycle. Fails `AlreadyActive` if one already exists
    /// enforced by the partial unique index on `cycles`.
    pub async fn open_cycle(&self) -> Result<Cycle, StoreError> {
        let row = sqlx::query_as::<_, CycleRow>(
            r#"
INSERT INTO cycles (state)
VALUES ('ACTIVE')
RETURNING id, state, started_at, evaluating_at, completed_at
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Domain(KibotosError::AlreadyActive)
            }
            _ => StoreError::Database(e),
        })?;

        Ok(Cycle::try_from(row)?)
    }

    /// Transitions an ACTIVE cycle to EVALUATING. Fails `WrongState` if the
    /// cycle is not currently ACTIVE.
    pub async fn close_cycle_to_evaluating(&self, cycle_id: i64) -> Result<Cycle, StoreError> {
        let result = sqlx::query(
            r#"
UPDATE cycles
SET state = 'EVALUATING', evaluating_at = now()
WHERE id = $1 AND state = 'ACTIVE'
            "#,
        )
        .bind(cycle_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Domain(KibotosError::WrongState));
        }

        self.get_cycle(cycle_id)
            .await?
            .ok_or_else(|| StoreError::Domain(KibotosError::NotFound))
    }

    /// Transitions an EVALUATING cycle to COMPLETED and persists `weights`.
    /// Guarded in a single transaction by state=EVALUATING and zero
    /// non-terminal submissions remaining.
    pub async fn complete_cycle(
        &self,
        cycle_id: i64,
        weights: &CycleWeights,
    ) -> Result<Cycle, StoreError> {
        let mut tx = self.pool.begin().await?;

        let remaining: i64 = sqlx::query_scalar(
            r#"
SELECT count(*) FROM submissions
WHERE cycle_id = $1 AND state IN ('PENDING', 'EVALUATING')
            "#,
        )
        .bind(cycle_id)
        .fetch_one(&mut *tx)
        .await?;

        if remaining > 0 {
            return Err(StoreError::Domain(KibotosError::HasPending));
        }

        let weights_json = serde_json::to_value(crate::rows::stringify_keys(&weights.weights))
            .map_err(|e| StoreError::Domain(KibotosError::Internal(e.to_string())))?;
        let weights_u16_json =
            serde_json::to_value(crate::rows::stringify_keys(&weights.weights_u16))
                .map_err(|e| StoreError::Domain(KibotosError::Internal(e.to_string())))?;

        let result = sqlx::query(
            r#"
UPDATE cycles
SET state = 'COMPLETED', completed_at = now()
WHERE id = $1 AND state = 'EVALUATING'
            "#,
        )
        .bind(cycle_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Domain(KibotosError::WrongState));
        }

        sqlx::query(
            r#"
INSERT INTO cycle_weights (cycle_id, block_number, weights, weights_u16)
VALUES ($1, $2, $3, $4)
ON CONFLICT (cycle_id) DO UPDATE SET
    block_number = EXCLUDED.block_number,
    weights = EXCLUDED.weights,
    weights_u16 = EXCLUDED.weights_u16
            "#,
        )
        .bind(cycle_id)
        .bind(weights.block_number)
        .bind(weights_json)
        .bind(weights_u16_json)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, CycleRow>(
            r#"
SELECT id, state, started_at, evaluating_at, completed_at
FROM cycles WHERE id = $1
            "#,
        )
        .bind(cycle_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Cycle::try_from(row)?)
    }

    /// Returns the single ACTIVE cycle, if one exists.
    pub async fn get_open_cycle(&self) -> Result<Option<Cycle>, StoreError> {
        let row = sqlx::query_as::<_, CycleRow>(
            r#"
SELECT id, state, started_at, evaluating_at, completed_at
FROM cycles WHERE state = 'ACTIVE'
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(Cycle::try_from).transpose().map_err(StoreError::Domain)
    }

    /// Fetches a cycle by id regardless of state.
    pub async fn get_cycle(&self, cycle_id: i64) -> Result<Option<Cycle>, StoreError> {
        let row = sqlx::query_as::<_, CycleRow>(
            r#"
SELECT id, state, started_at, evaluating_at, completed_at
FROM cycles WHERE id = $1
            "#,
        )
        .bind(cycle_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Cycle::try_from).transpose().map_err(StoreError::Domain)
    }

    /// Summary view used by `GET /v1/status`.
    pub async fn get_cycle_status(&self) -> Result<CycleStatus, StoreError> {
        let active = sqlx::query_as::<_, CycleRow>(
            "SELECT id, state, started_at, evaluating_at, completed_at FROM cycles WHERE state = 'ACTIVE'",
        )
        .fetch_optional(&self.pool)
        .await?;

        let evaluating = sqlx::query_as::<_, CycleRow>(
            "SELECT id, state, started_at, evaluating_at, completed_at FROM cycles WHERE state = 'EVALUATING'",
        )
        .fetch_optional(&self.pool)
        .await?;

        let last_completed: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM cycles WHERE state = 'COMPLETED' ORDER BY completed_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let total_cycles: i64 = sqlx::query_scalar("SELECT count(*) FROM cycles")
            .fetch_one(&self.pool)
            .await?;

        Ok(CycleStatus {
            active_cycle_id: active.as_ref().map(|r| r.id),
            active_cycle_started_at: active.as_ref().map(|r| r.started_at),
            evaluating_cycle_id: evaluating.as_ref().map(|r| r.id),
            last_completed_cycle_id: last_completed,
            total_cycles,
        })
    }

    /// Number of submissions in `cycle_id` that have not reached a terminal
    /// state (`SCORED`/`REJECTED`). The scheduler polls this to decide when
    /// it is safe to aggregate and complete a cycle.
    pub async fn count_nonterminal_in_cycle(&self, cycle_id: i64) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
SELECT count(*) FROM submissions
WHERE cycle_id = $1 AND state IN ('PENDING', 'EVALUATING')
            "#,
        )
        .bind(cycle_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
