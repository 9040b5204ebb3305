use async_trait::async_trait;
use tracing::{info, instrument};

use stronghold_types::errors::ApplicationError;

use crate::{
    helpers::training::record_unit_trained,
    jobs::{
        Job,
        handler::{JobHandler, JobHandlerContext},
        tasks::TrainUnitTask,
    },
};

pub struct TrainUnitJobHandler {
    payload: TrainUnitTask,
}

impl TrainUnitJobHandler {
    pub fn new(payload: TrainUnitTask) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl JobHandler for TrainUnitJobHandler {
    #[instrument(skip_all, fields(
        task_type = "TrainUnit",
        task_id = %self.payload.task_id,
        remaining = self.payload.expected_remaining,
        village_id = %job.village_id
    ))]
    async fn handle<'ctx, 'a>(
        &'ctx self,
        ctx: &'ctx JobHandlerContext<'a>,
        job: &'ctx Job,
    ) -> Result<(), ApplicationError> {
        info!("Executing TrainUnit job");

        if let Some(task) =
            record_unit_trained(&ctx.uow, self.payload.task_id, self.payload.expected_remaining)
                .await?
        {
            info!(troop = %task.troop, remaining = task.remaining, "Unit trained");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::sync::Arc;

    use stronghold_game::models::training::TrainingStatus;
    use stronghold_types::{
        Result,
        buildings::BuildingName,
        troops::{TroopName, TroopStatus},
    };

    use super::*;
    use crate::{
        config::Config,
        jobs::{JobKey, tasks::JobTask},
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, seed_running_task, seed_village},
        uow::UnitOfWorkProvider,
    };

    fn tick(village_id: uuid::Uuid, task_id: uuid::Uuid, remaining: u32) -> (TrainUnitTask, Job) {
        let payload = TrainUnitTask {
            village_id,
            task_id,
            building: BuildingName::Barracks,
            expected_remaining: remaining,
        };
        let job = Job::new(
            village_id,
            JobTask::TrainUnit(payload.clone()),
            &crate::helpers::training::train_job_options(0),
            chrono::Utc::now(),
        );
        (payload, job)
    }

    #[tokio::test]
    async fn test_train_unit_trains_one_and_queues_next_tick() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;
        let task = seed_running_task(&provider, village.id, TroopName::Militia, 3, 2_000).await?;

        clock.advance(Duration::milliseconds(2_000));
        let (payload, job) = tick(village.id, task.id, 3);
        let uow = provider.begin().await?;
        let ctx = JobHandlerContext {
            uow,
            config: Arc::new(Config::from_env()),
        };
        TrainUnitJobHandler::new(payload).handle(&ctx, &job).await?;

        let idle = ctx
            .uow
            .troops()
            .get_quantity(village.id, TroopName::Militia, TroopStatus::Idle)
            .await?;
        assert_eq!(idle, 1, "Should have trained exactly 1 unit");

        let stored = ctx.uow.training_tasks().get_by_id(task.id).await?;
        assert_eq!(stored.remaining, 2);

        let next = ctx
            .uow
            .jobs()
            .get_latest_by_key(&JobKey::training(task.id, 2))
            .await?
            .expect("next tick should be scheduled");
        assert_eq!(next.run_at, clock.now() + Duration::milliseconds(2_000));
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_tick_is_ignored() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;
        let task = seed_running_task(&provider, village.id, TroopName::Militia, 3, 2_000).await?;

        let (payload, job) = tick(village.id, task.id, 2);
        let uow = provider.begin().await?;
        let ctx = JobHandlerContext {
            uow,
            config: Arc::new(Config::from_env()),
        };
        TrainUnitJobHandler::new(payload).handle(&ctx, &job).await?;

        let stored = ctx.uow.training_tasks().get_by_id(task.id).await?;
        assert_eq!(stored.remaining, 3, "A tick for another remaining value is a no-op");
        Ok(())
    }

    #[tokio::test]
    async fn test_last_tick_completes_task() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;
        let task = seed_running_task(&provider, village.id, TroopName::Militia, 1, 2_000).await?;

        clock.advance(Duration::milliseconds(2_000));
        let (payload, job) = tick(village.id, task.id, 1);
        let uow = provider.begin().await?;
        let ctx = JobHandlerContext {
            uow,
            config: Arc::new(Config::from_env()),
        };
        TrainUnitJobHandler::new(payload).handle(&ctx, &job).await?;

        let stored = ctx.uow.training_tasks().get_by_id(task.id).await?;
        assert_eq!(stored.status, TrainingStatus::Completed);
        assert!(
            ctx.uow
                .jobs()
                .get_latest_by_key(&JobKey::training(task.id, 0))
                .await?
                .is_none(),
            "No tick after the last unit"
        );
        Ok(())
    }
}
