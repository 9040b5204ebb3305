use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use stronghold_game::models::training::TrainingTask;
use stronghold_types::{buildings::BuildingName, errors::ApplicationError, troops::TroopStatus};

use crate::{
    events::GameEvent,
    jobs::{
        Backoff, Job, JobKey, JobOptions, scheduler,
        tasks::{JobTask, TrainUnitTask},
    },
    uow::UnitOfWork,
};

pub const TRAIN_JOB_ATTEMPTS: u32 = 5;
pub const TRAIN_JOB_BACKOFF_MS: i64 = 2_000;

pub fn train_job_options(delay_ms: i64) -> JobOptions {
    JobOptions {
        delay_ms,
        attempts: TRAIN_JOB_ATTEMPTS,
        backoff: Backoff::Exponential {
            base_ms: TRAIN_JOB_BACKOFF_MS,
        },
    }
}

/// Schedules the tick delivering the next unit of a running task.
pub async fn schedule_next_unit(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    task: &TrainingTask,
) -> Result<Option<Job>, ApplicationError> {
    let Some(due_at) = task.next_unit_due_at() else {
        return Ok(None);
    };
    let delay_ms = (due_at - uow.now()).num_milliseconds().max(0);
    let job = scheduler::enqueue(
        uow,
        task.village_id,
        JobTask::TrainUnit(TrainUnitTask {
            village_id: task.village_id,
            task_id: task.id,
            building: task.building,
            expected_remaining: task.remaining,
        }),
        train_job_options(delay_ms),
    )
    .await?;
    Ok(Some(job))
}

/// Promotes the oldest pending task of the slot when nothing is in progress.
pub async fn trigger_next_task_if_available(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
    building: BuildingName,
    start_at: DateTime<Utc>,
) -> Result<Option<TrainingTask>, ApplicationError> {
    let repo = uow.training_tasks();
    if repo.find_in_progress(village_id, building).await?.is_some() {
        return Ok(None);
    }
    let Some(next) = repo.next_pending(village_id, building).await? else {
        return Ok(None);
    };
    let Some(started) = repo.start(next.id, start_at).await? else {
        return Ok(None);
    };

    schedule_next_unit(uow, &started).await?;
    info!(task_id = %started.id, troop = %started.troop, count = started.count, "Training task started");
    Ok(Some(started))
}

/// Delivers one unit for the tick scheduled at `expected_remaining`.
/// Stale or duplicate ticks return `None`.
pub async fn record_unit_trained(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    task_id: Uuid,
    expected_remaining: u32,
) -> Result<Option<TrainingTask>, ApplicationError> {
    let Some(task) = uow
        .training_tasks()
        .record_unit(task_id, expected_remaining)
        .await?
    else {
        debug!(%task_id, expected_remaining, "Stale training tick");
        return Ok(None);
    };

    uow.troops()
        .increment(task.village_id, task.troop, TroopStatus::Idle, 1)
        .await?;
    uow.events().push(GameEvent::UnitTrained {
        village_id: task.village_id,
        task_id: task.id,
        troop: task.troop,
        remaining: task.remaining,
    });

    if task.remaining > 0 {
        schedule_next_unit(uow, &task).await?;
    } else {
        uow.events().push(GameEvent::TrainingCompleted {
            village_id: task.village_id,
            task_id: task.id,
            troop: task.troop,
            count: task.count,
        });
        let start_at = next_start(uow, &task);
        trigger_next_task_if_available(uow, task.village_id, task.building, start_at).await?;
    }

    Ok(Some(task))
}

/// Grants every remaining unit at once and promotes the next task of the slot,
/// starting it when this one was due to end. Returns the units granted.
pub async fn force_complete_task(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    task_id: Uuid,
) -> Result<Option<u32>, ApplicationError> {
    let task = uow.training_tasks().get_by_id(task_id).await?;
    let Some(granted) = uow.training_tasks().force_complete(task_id).await? else {
        debug!(%task_id, "Training task not in progress");
        return Ok(None);
    };

    if granted > 0 {
        uow.troops()
            .increment(task.village_id, task.troop, TroopStatus::Idle, granted)
            .await?;
        scheduler::cancel(uow, &JobKey::training(task.id, task.remaining)).await?;
    }

    uow.events().push(GameEvent::TrainingCompleted {
        village_id: task.village_id,
        task_id: task.id,
        troop: task.troop,
        count: task.count,
    });

    let start_at = next_start(uow, &task);
    trigger_next_task_if_available(uow, task.village_id, task.building, start_at).await?;

    Ok(Some(granted))
}

/// The slot frees up when the task was due to end, never later than now.
fn next_start(uow: &Box<dyn UnitOfWork<'_> + '_>, task: &TrainingTask) -> DateTime<Utc> {
    let now = uow.now();
    task.end_time.map_or(now, |end| end.min(now))
}
