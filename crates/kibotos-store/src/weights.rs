use crate::rows::CycleWeightsRow;
use crate::{Store, StoreError};
use kibotos_types::{CycleWeights, MinerScoreBreakdown};

impl Store {
    pub async fn get_weights(&self, cycle_id: i64) -> Result<Option<CycleWeights>, StoreError> {
        let row = sqlx::query_as::<_, CycleWeightsRow>(
            r#"
SELECT cycle_id, block_number, weights, weights_u16, created_at
FROM cycle_weights WHERE cycle_id = $1
            "#,
        )
        .bind(cycle_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CycleWeights::try_from).transpose().map_err(StoreError::Domain)
    }

    pub async fn get_latest_weights(&self) -> Result<Option<CycleWeights>, StoreError> {
        let row = sqlx::query_as::<_, CycleWeightsRow>(
            r#"
SELECT cycle_id, block_number, weights, weights_u16, created_at
FROM cycle_weights ORDER BY cycle_id DESC LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(CycleWeights::try_from).transpose().map_err(StoreError::Domain)
    }

    /// Per-miner score breakdown for one cycle, derived from the same
    /// per-submission final scores the aggregator consumes.
    pub async fn get_scores(&self, cycle_id: i64) -> Result<Vec<MinerScoreBreakdown>, StoreError> {
        let rows = sqlx::query_as::<_, MinerScoreBreakdownRow>(
            r#"
SELECT
    s.miner_uid AS miner_uid,
    count(*) AS submission_count,
    sum(e.final_score) AS total_final_score,
    avg(e.final_score) AS mean_final_score
FROM submissions s
JOIN evaluations e ON e.submission_uuid = s.uuid
WHERE s.cycle_id = $1 AND s.state = 'SCORED'
GROUP BY s.miner_uid
ORDER BY s.miner_uid
            "#,
        )
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Score breakdown for the most recently completed cycle.
    pub async fn get_latest_scores(&self) -> Result<Vec<MinerScoreBreakdown>, StoreError> {
        let latest_cycle_id: Option<i64> = sqlx::query_scalar(
            "SELECT cycle_id FROM cycle_weights ORDER BY cycle_id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        match latest_cycle_id {
            Some(cycle_id) => self.get_scores(cycle_id).await,
            None => Ok(Vec::new()),
        }
    }
}

#[derive(sqlx::FromRow)]
struct MinerScoreBreakdownRow {
    miner_uid: i64,
    submission_count: i64,
    total_final_score: f64,
    mean_final_score: f64,
}

impl From<MinerScoreBreakdownRow> for MinerScoreBreakdown {
    fn from(row: MinerScoreBreakdownRow) -> Self {
        MinerScoreBreakdown {
            miner_uid: row.miner_uid,
            submission_count: row.submission_count,
            total_final_score: row.total_final_score,
            mean_final_score: row.mean_final_score,
        }
    }
}
