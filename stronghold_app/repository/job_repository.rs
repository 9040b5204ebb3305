use chrono::{DateTime, Utc};
use uuid::Uuid;

use stronghold_types::errors::ApplicationError;

use crate::jobs::{Job, JobKey, RetentionPolicy};

#[async_trait::async_trait]
pub trait JobRepository: Send + Sync {
    /// Stores a new job unless one with the same key is still pending or
    /// processing. Returns whichever job now owns the key.
    async fn add(&self, job: &Job) -> Result<Job, ApplicationError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Job, ApplicationError>;

    /// Most recently created job for the key, in any status.
    async fn get_latest_by_key(&self, key: &JobKey) -> Result<Option<Job>, ApplicationError>;

    /// Lists jobs scheduled for a village.
    async fn list_by_village_id(&self, village_id: Uuid) -> Result<Vec<Job>, ApplicationError>;

    /// Deletes the job for `key` if it is still pending.
    async fn remove_pending(&self, key: &JobKey) -> Result<bool, ApplicationError>;

    /// Finds and locks atomically due jobs, setting the status to "Processing",
    /// bumping the attempt counter and leasing them until `now + lease_secs`.
    /// Processing jobs whose lease expired are claimed again.
    async fn find_and_lock_due_jobs(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        lease_secs: i64,
    ) -> Result<Vec<Job>, ApplicationError>;

    /// Set job status to "Completed".
    ///
    /// The terminal updates below only apply to the claim identified by
    /// `claimed_attempts`: they return `false` when the job is no longer
    /// processing under that claim (its lease expired and it was claimed again).
    async fn mark_as_completed(
        &self,
        job_id: Uuid,
        claimed_attempts: u32,
        at: DateTime<Utc>,
    ) -> Result<bool, ApplicationError>;

    /// Puts the job back to "Pending", due at `run_at`.
    async fn schedule_retry(
        &self,
        job_id: Uuid,
        claimed_attempts: u32,
        run_at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, ApplicationError>;

    /// Set job status to "Failed", with an error message.
    async fn mark_as_failed(
        &self,
        job_id: Uuid,
        claimed_attempts: u32,
        at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, ApplicationError>;

    /// Deletes finished jobs beyond the retention policies, returning how many went.
    async fn prune(
        &self,
        now: DateTime<Utc>,
        completed: &RetentionPolicy,
        failed: &RetentionPolicy,
    ) -> Result<u64, ApplicationError>;
}
