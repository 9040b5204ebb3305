use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, Postgres, Transaction, types::Json};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::{
    jobs::{Job, JobKey, JobStatus, RetentionPolicy},
    repository::JobRepository,
};
use stronghold_types::errors::{ApplicationError, DbError};

use crate::{
    mapping::{db_error, from_rows},
    models as db_models,
};

const JOB_COLUMNS: &str = "id, key, village_id, task, status, run_at, attempts, max_attempts, backoff, last_error, locked_until, finished_at, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresJobRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresJobRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

async fn find_active_by_key(
    conn: &mut PgConnection,
    key: &JobKey,
) -> Result<Option<Job>, ApplicationError> {
    let row = sqlx::query_as::<_, db_models::Job>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE key = $1 AND status IN ('Pending', 'Processing')"
    ))
    .bind(key.as_str())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(row.map(Job::try_from).transpose()?)
}

async fn prune_status(
    conn: &mut PgConnection,
    status: JobStatus,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<u64, ApplicationError> {
    let cutoff = now - Duration::seconds(policy.max_age_secs);
    let result = sqlx::query(
        r#"
        DELETE FROM jobs
        WHERE id IN (
            SELECT id FROM (
                SELECT id, finished_at,
                       ROW_NUMBER() OVER (ORDER BY finished_at DESC NULLS LAST) AS rank
                FROM jobs
                WHERE status = $1
            ) ranked
            WHERE rank > $2 OR finished_at < $3
        )
        "#,
    )
    .bind(status.as_str())
    .bind(policy.max_count.max(0))
    .bind(cutoff)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(result.rows_affected())
}

#[async_trait::async_trait]
impl<'a> JobRepository for PostgresJobRepository<'a> {
    async fn add(&self, job: &Job) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let inserted = sqlx::query(
            r#"
            INSERT INTO jobs
                (id, key, village_id, task, status, run_at, attempts, max_attempts, backoff, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (key) WHERE status IN ('Pending', 'Processing') DO NOTHING
            "#,
        )
        .bind(job.id)
        .bind(job.key.as_str())
        .bind(job.village_id)
        .bind(Json(&job.task))
        .bind(job.status.as_str())
        .bind(job.run_at)
        .bind(job.attempts as i32)
        .bind(job.max_attempts as i32)
        .bind(Json(&job.backoff))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

        if inserted.rows_affected() > 0 {
            return Ok(job.clone());
        }

        find_active_by_key(conn, &job.key)
            .await?
            .ok_or_else(|| ApplicationError::Db(DbError::Conflict(job.key.to_string())))
    }

    async fn get_by_id(&self, job_id: Uuid) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?
        .ok_or(ApplicationError::Db(DbError::JobNotFound(job_id)))?;

        Ok(row.try_into()?)
    }

    async fn get_latest_by_key(&self, key: &JobKey) -> Result<Option<Job>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Job>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE key = $1
            ORDER BY status IN ('Pending', 'Processing') DESC, created_at DESC
            LIMIT 1
            "#
        ))
        .bind(key.as_str())
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(row.map(Job::try_from).transpose()?)
    }

    async fn list_by_village_id(&self, village_id: Uuid) -> Result<Vec<Job>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE village_id = $1 ORDER BY run_at"
        ))
        .bind(village_id)
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        from_rows(rows)
    }

    async fn remove_pending(&self, key: &JobKey) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let result = sqlx::query("DELETE FROM jobs WHERE key = $1 AND status = 'Pending'")
            .bind(key.as_str())
            .execute(&mut *tx_guard.as_mut())
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_and_lock_due_jobs(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        lease_secs: i64,
    ) -> Result<Vec<Job>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::Job>(&format!(
            r#"
            UPDATE jobs
            SET status = 'Processing',
                attempts = attempts + 1,
                locked_until = $3,
                updated_at = $1
            WHERE id IN (
                SELECT id
                FROM jobs
                WHERE (status = 'Pending' AND run_at <= $1)
                   OR (status = 'Processing' AND locked_until < $1)
                ORDER BY run_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(limit)
        .bind(now + Duration::seconds(lease_secs))
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        let mut jobs: Vec<Job> = from_rows(rows)?;
        jobs.sort_by_key(|j| j.run_at);
        Ok(jobs)
    }

    async fn mark_as_completed(
        &self,
        job_id: Uuid,
        claimed_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'Completed', locked_until = NULL, finished_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'Processing' AND attempts = $2
            "#,
        )
        .bind(job_id)
        .bind(claimed_attempts as i32)
        .bind(at)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn schedule_retry(
        &self,
        job_id: Uuid,
        claimed_attempts: u32,
        run_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'Pending', run_at = $3, locked_until = NULL, last_error = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'Processing' AND attempts = $2
            "#,
        )
        .bind(job_id)
        .bind(claimed_attempts as i32)
        .bind(run_at)
        .bind(error_message)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_as_failed(
        &self,
        job_id: Uuid,
        claimed_attempts: u32,
        at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'Failed', locked_until = NULL, last_error = $4, finished_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'Processing' AND attempts = $2
            "#,
        )
        .bind(job_id)
        .bind(claimed_attempts as i32)
        .bind(at)
        .bind(error_message)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn prune(
        &self,
        now: DateTime<Utc>,
        completed: &RetentionPolicy,
        failed: &RetentionPolicy,
    ) -> Result<u64, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let pruned = prune_status(conn, JobStatus::Completed, completed, now).await?
            + prune_status(conn, JobStatus::Failed, failed, now).await?;
        Ok(pruned)
    }
}
