use crate::rows::{EvaluationRow, SubmissionRow};
use crate::{rate_limit, Store, StoreError};
use chrono::{DateTime, Duration, Utc};
use kibotos_types::{
    Evaluation, EvaluationOutcome, KibotosError, NewSubmission, RejectionReason, Submission,
    MAX_VLM_ATTEMPTS,
};
use serde_json::Value;
use uuid::Uuid;

impl Store {
    /// Admits `new` as a PENDING submission bound to the current ACTIVE
    /// cycle. One transaction performs, in order: (a) re-reads the ACTIVE
    /// cycle, failing `NoOpenCycle` if there is none, (b) increments and
    /// checks the miner's sliding-hour rate counter, failing `RateLimited`,
    /// (c) verifies the prompt is active, failing `UnknownPrompt`, (d)
    /// inserts the submission as PENDING.
    pub async fn admit_submission(&self, new: &NewSubmission) -> Result<Submission, StoreError> {
        let mut tx = self.pool.begin().await?;

        let cycle_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM cycles WHERE state = 'ACTIVE'")
                .fetch_optional(&mut *tx)
                .await?;
        let cycle_id = cycle_id.ok_or(StoreError::Domain(KibotosError::NoOpenCycle))?;

        rate_limit::check_and_increment(&mut tx, new.miner_uid, new.submitted_at)
            .await
            .map_err(StoreError::Domain)?;

        let prompt_active: Option<bool> =
            sqlx::query_scalar("SELECT active FROM prompts WHERE id = $1")
                .bind(&new.prompt_id)
                .fetch_optional(&mut *tx)
                .await?;
        match prompt_active {
            Some(true) => {}
            Some(false) | None => return Err(StoreError::Domain(KibotosError::UnknownPrompt)),
        }

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
INSERT INTO submissions (
    uuid, cycle_id, prompt_id, miner_uid, miner_hotkey, video_key, video_hash,
    duration_sec, width, height, fps, camera_type, actor_type,
    action_description, signature, state, submitted_at
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 'PENDING', $16
)
RETURNING uuid, cycle_id, prompt_id, miner_uid, miner_hotkey, video_key, video_hash,
          duration_sec, width, height, fps, camera_type, actor_type,
          action_description, signature, state, lease_owner, lease_expires_at,
          vlm_attempts, submitted_at, evaluated_at, rejection_reason
            "#,
        )
        .bind(new.uuid)
        .bind(cycle_id)
        .bind(&new.prompt_id)
        .bind(new.miner_uid)
        .bind(&new.miner_hotkey)
        .bind(&new.video_key)
        .bind(&new.video_hash)
        .bind(new.duration_sec)
        .bind(new.width as i32)
        .bind(new.height as i32)
        .bind(new.fps)
        .bind(new.camera_type.as_str())
        .bind(new.actor_type.as_str())
        .bind(&new.action_description)
        .bind(&new.signature)
        .bind(new.submitted_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Submission::try_from(row)?)
    }

    /// Leases up to `n` submissions for `worker_id`: rows where
    /// `state = PENDING` or (`state = EVALUATING` and the lease has
    /// expired), oldest-first, atomically transitioned to EVALUATING with a
    /// fresh lease. Uses `FOR UPDATE SKIP LOCKED` so concurrent workers
    /// never double-lease a row.
    pub async fn lease_pending(
        &self,
        worker_id: &str,
        n: i64,
        lease_duration: Duration,
    ) -> Result<Vec<Submission>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let candidates: Vec<Uuid> = sqlx::query_scalar(
            r#"
SELECT uuid FROM submissions
WHERE state = 'PENDING' OR (state = 'EVALUATING' AND lease_expires_at < now())
ORDER BY submitted_at ASC
LIMIT $1
FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(n)
        .fetch_all(&mut *tx)
        .await?;

        if candidates.is_empty() {
            tx.commit().await?;
            return Ok(Vec::new());
        }

        let lease_expires_at = Utc::now() + lease_duration;
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
UPDATE submissions
SET state = 'EVALUATING', lease_owner = $1, lease_expires_at = $2
WHERE uuid = ANY($3)
RETURNING uuid, cycle_id, prompt_id, miner_uid, miner_hotkey, video_key, video_hash,
          duration_sec, width, height, fps, camera_type, actor_type,
          action_description, signature, state, lease_owner, lease_expires_at,
          vlm_attempts, submitted_at, evaluated_at, rejection_reason
            "#,
        )
        .bind(worker_id)
        .bind(lease_expires_at)
        .bind(&candidates)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        rows.into_iter()
            .map(Submission::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Domain)
    }

    /// Extends the lease on a submission still held by `worker_id`. Fails
    /// `LeaseLost` if the caller no longer holds it.
    pub async fn renew_lease(
        &self,
        worker_id: &str,
        uuid: Uuid,
        lease_duration: Duration,
    ) -> Result<DateTime<Utc>, StoreError> {
        let lease_expires_at = Utc::now() + lease_duration;

        let result = sqlx::query(
            r#"
UPDATE submissions
SET lease_expires_at = $1
WHERE uuid = $2 AND lease_owner = $3 AND state = 'EVALUATING'
            "#,
        )
        .bind(lease_expires_at)
        .bind(uuid)
        .bind(worker_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Domain(KibotosError::LeaseLost));
        }

        Ok(lease_expires_at)
    }

    /// Commits the terminal outcome of evaluating `uuid`, guarded by
    /// `lease_owner = worker_id AND state = EVALUATING`. On a lease that has
    /// moved on (reclaimed by another worker, or already terminal), fails
    /// `LeaseLost` and discards the caller's result.
    ///
    /// A `Rejected{VLM_UNAVAILABLE, retryable: true}` outcome that hasn't yet
    /// exhausted `MAX_VLM_ATTEMPTS` is released back to PENDING instead of
    /// being written as a terminal rejection.
    pub async fn commit_evaluation(
        &self,
        worker_id: &str,
        uuid: Uuid,
        outcome: EvaluationOutcome,
    ) -> Result<Submission, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, SubmissionRow>(
            r#"
SELECT uuid, cycle_id, prompt_id, miner_uid, miner_hotkey, video_key, video_hash,
       duration_sec, width, height, fps, camera_type, actor_type,
       action_description, signature, state, lease_owner, lease_expires_at,
       vlm_attempts, submitted_at, evaluated_at, rejection_reason
FROM submissions
WHERE uuid = $1 AND lease_owner = $2 AND state = 'EVALUATING'
FOR UPDATE
            "#,
        )
        .bind(uuid)
        .bind(worker_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = current.ok_or(StoreError::Domain(KibotosError::LeaseLost))?;

        let row = match outcome {
            EvaluationOutcome::Scored {
                technical_score,
                relevance_score,
                quality_score,
                details,
                model_version,
                prompt_version,
            } => {
                let final_score =
                    Evaluation::compose_final(technical_score, relevance_score, quality_score);
                let details_json: Value = serde_json::to_value(&details)
                    .map_err(|e| StoreError::Domain(KibotosError::Internal(e.to_string())))?;

                sqlx::query_as::<_, EvaluationRow>(
                    r#"
INSERT INTO evaluations (
    submission_uuid, technical_score, relevance_score, quality_score,
    final_score, details, model_version, prompt_version
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
RETURNING submission_uuid, technical_score, relevance_score, quality_score,
          final_score, details, model_version, prompt_version, created_at
                    "#,
                )
                .bind(uuid)
                .bind(technical_score)
                .bind(relevance_score)
                .bind(quality_score)
                .bind(final_score)
                .bind(details_json)
                .bind(&model_version)
                .bind(&prompt_version)
                .fetch_one(&mut *tx)
                .await?;

                let phash = details
                    .quality
                    .get("phash")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);

                sqlx::query(
                    r#"
UPDATE submissions
SET state = 'SCORED', lease_owner = NULL, lease_expires_at = NULL, evaluated_at = now(),
    video_phash = COALESCE($2, video_phash)
WHERE uuid = $1
                    "#,
                )
                .bind(uuid)
                .bind(phash)
                .execute(&mut *tx)
                .await?;

                reselect(&mut tx, uuid).await?
            }
            EvaluationOutcome::Rejected { reason, retryable } => {
                let should_retry = retryable
                    && reason == RejectionReason::VlmUnavailable
                    && current.vlm_attempts + 1 < MAX_VLM_ATTEMPTS;

                if should_retry {
                    sqlx::query(
                        r#"
UPDATE submissions
SET state = 'PENDING', lease_owner = NULL, lease_expires_at = NULL,
    vlm_attempts = vlm_attempts + 1
WHERE uuid = $1
                        "#,
                    )
                    .bind(uuid)
                    .execute(&mut *tx)
                    .await?;
                } else {
                    sqlx::query(
                        r#"
UPDATE submissions
SET state = 'REJECTED', lease_owner = NULL, lease_expires_at = NULL,
    evaluated_at = now(), rejection_reason = $2,
    vlm_attempts = vlm_attempts + 1
WHERE uuid = $1
                        "#,
                    )
                    .bind(uuid)
                    .bind(reason.to_string())
                    .execute(&mut *tx)
                    .await?;
                }

                reselect(&mut tx, uuid).await?
            }
        };

        tx.commit().await?;

        Ok(Submission::try_from(row)?)
    }

    /// Fetches a submission by id regardless of state.
    pub async fn get_submission(&self, uuid: Uuid) -> Result<Option<Submission>, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
SELECT uuid, cycle_id, prompt_id, miner_uid, miner_hotkey, video_key, video_hash,
       duration_sec, width, height, fps, camera_type, actor_type,
       action_description, signature, state, lease_owner, lease_expires_at,
       vlm_attempts, submitted_at, evaluated_at, rejection_reason
FROM submissions WHERE uuid = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Submission::try_from).transpose().map_err(StoreError::Domain)
    }

    /// Fetches the evaluation for a submission, if one was written.
    pub async fn get_evaluation(&self, uuid: Uuid) -> Result<Option<Evaluation>, StoreError> {
        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
SELECT submission_uuid, technical_score, relevance_score, quality_score,
       final_score, details, model_version, prompt_version, created_at
FROM evaluations WHERE submission_uuid = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Evaluation::try_from).transpose().map_err(StoreError::Domain)
    }
}

async fn reselect(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    uuid: Uuid,
) -> Result<SubmissionRow, sqlx::Error> {
    sqlx::query_as::<_, SubmissionRow>(
        r#"
SELECT uuid, cycle_id, prompt_id, miner_uid, miner_hotkey, video_key, video_hash,
       duration_sec, width, height, fps, camera_type, actor_type,
       action_description, signature, state, lease_owner, lease_expires_at,
       vlm_attempts, submitted_at, evaluated_at, rejection_reason
FROM submissions WHERE uuid = $1
        "#,
    )
    .bind(uuid)
    .fetch_one(&mut **tx)
    .await
}
