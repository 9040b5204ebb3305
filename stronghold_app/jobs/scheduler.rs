//! Keyed, delayed, retryable jobs on top of the `JobRepository`.

use tracing::debug;
use uuid::Uuid;

use stronghold_types::errors::ApplicationError;

use crate::{
    jobs::{Job, JobKey, JobOptions, JobState, tasks::JobTask},
    uow::UnitOfWork,
};

/// Registers `task` to run after `options.delay_ms`. When a job with the same
/// key is still pending or processing, that job is returned unchanged.
pub async fn enqueue(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
    task: JobTask,
    options: JobOptions,
) -> Result<Job, ApplicationError> {
    let job = Job::new(village_id, task, &options, uow.now());
    let stored = uow.jobs().add(&job).await?;

    if stored.id != job.id {
        debug!(key = %stored.key, job_id = %stored.id, "Job already scheduled");
    } else {
        debug!(key = %stored.key, run_at = %stored.run_at, "Job scheduled");
    }
    Ok(stored)
}

/// Removes a job that has not started yet.
pub async fn cancel(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    key: &JobKey,
) -> Result<bool, ApplicationError> {
    let removed = uow.jobs().remove_pending(key).await?;
    if removed {
        debug!(%key, "Job cancelled");
    }
    Ok(removed)
}

pub async fn status(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    key: &JobKey,
) -> Result<JobState, ApplicationError> {
    let state = uow
        .jobs()
        .get_latest_by_key(key)
        .await?
        .map_or(JobState::Absent, |job| job.state(uow.now()));
    Ok(state)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::sync::Arc;

    use stronghold_types::Result;

    use super::*;
    use crate::{
        jobs::{Backoff, tasks::ResolveBattleTask},
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock},
        uow::UnitOfWorkProvider,
    };

    fn battle_task(battle_id: Uuid) -> JobTask {
        JobTask::ResolveBattle(ResolveBattleTask { battle_id })
    }

    fn options(delay_ms: i64) -> JobOptions {
        JobOptions {
            delay_ms,
            attempts: 5,
            backoff: Backoff::Exponential { base_ms: 1000 },
        }
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent_per_key() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let battle_id = Uuid::new_v4();
        let village_id = Uuid::new_v4();

        let uow = provider.begin().await?;
        let first = enqueue(&uow, village_id, battle_task(battle_id), options(5_000)).await?;
        let second = enqueue(&uow, village_id, battle_task(battle_id), options(1_000)).await?;
        uow.commit().await?;

        assert_eq!(first.id, second.id, "Same key should return the existing job");
        assert_eq!(second.run_at, first.run_at, "Existing job must not be rescheduled");

        let uow = provider.begin().await?;
        let jobs = uow.jobs().list_by_village_id(village_id).await?;
        assert_eq!(jobs.len(), 1);
        uow.rollback().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_status_transitions_and_cancel() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let battle_id = Uuid::new_v4();
        let key = JobKey::battle(battle_id);

        let uow = provider.begin().await?;
        assert_eq!(status(&uow, &key).await?, JobState::Absent);
        enqueue(&uow, Uuid::new_v4(), battle_task(battle_id), options(2_000)).await?;
        assert_eq!(status(&uow, &key).await?, JobState::Delayed);
        uow.commit().await?;

        clock.advance(Duration::milliseconds(2_000));
        let uow = provider.begin().await?;
        assert_eq!(status(&uow, &key).await?, JobState::Waiting);

        assert!(cancel(&uow, &key).await?, "Pending job should be removed");
        assert!(!cancel(&uow, &key).await?, "Nothing left to remove");
        assert_eq!(status(&uow, &key).await?, JobState::Absent);
        uow.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_active_job_cannot_be_cancelled() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let battle_id = Uuid::new_v4();
        let key = JobKey::battle(battle_id);

        let uow = provider.begin().await?;
        enqueue(&uow, Uuid::new_v4(), battle_task(battle_id), options(0)).await?;
        let claimed = uow.jobs().find_and_lock_due_jobs(uow.now(), 10, 60).await?;
        assert_eq!(claimed.len(), 1);

        assert_eq!(status(&uow, &key).await?, JobState::Active);
        assert!(!cancel(&uow, &key).await?, "Active jobs are not removable");

        let again = enqueue(&uow, Uuid::new_v4(), battle_task(battle_id), options(0)).await?;
        assert_eq!(again.id, claimed[0].id, "Active key still dedupes");
        uow.rollback().await?;
        Ok(())
    }
}
