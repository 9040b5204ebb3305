use std::sync::Arc;
use tracing::{info, instrument};

use stronghold_game::models::training::TrainingStatus;
use stronghold_types::{
    common::ResourceGroup,
    errors::{ApplicationError, DbError, GameError},
};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::CancelTraining},
    events::GameEvent,
    helpers::{ledger, reconcile::catch_up_village, training::trigger_next_task_if_available},
    jobs::{JobKey, scheduler},
    uow::UnitOfWork,
};

pub struct CancelTrainingCommandHandler {}

impl CancelTrainingCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<CancelTraining> for CancelTrainingCommandHandler {
    #[instrument(skip_all, fields(village_id = %command.village_id, task_id = %command.task_id))]
    async fn handle(
        &self,
        command: CancelTraining,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<ResourceGroup, ApplicationError> {
        // An overdue task is finished, not refunded.
        catch_up_village(uow, command.village_id).await?;

        let task = uow.training_tasks().get_by_id(command.task_id).await?;
        if task.village_id != command.village_id {
            return Err(ApplicationError::Db(DbError::TrainingTaskNotFound(
                command.task_id,
            )));
        }
        if task.status.is_finished() {
            return Err(ApplicationError::Game(GameError::TaskNotCancellable));
        }

        let previous = uow
            .training_tasks()
            .cancel(task.id)
            .await?
            .ok_or(GameError::TaskNotCancellable)?;

        let refund = previous.refund();
        ledger::add(uow, previous.village_id, &refund).await?;

        if previous.status == TrainingStatus::InProgress {
            scheduler::cancel(uow, &JobKey::training(previous.id, previous.remaining)).await?;
            trigger_next_task_if_available(uow, previous.village_id, previous.building, uow.now())
                .await?;
        }

        uow.events().push(GameEvent::TrainingCancelled {
            village_id: previous.village_id,
            task_id: previous.id,
            refund,
        });
        info!(remaining = previous.remaining, ?refund, "Training cancelled");

        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::sync::Arc;

    use stronghold_types::{
        Result,
        buildings::BuildingName,
        troops::{TroopName, TroopStatus},
    };

    use super::*;
    use crate::{
        command_handlers::TrainUnitsCommandHandler,
        cqrs::commands::TrainUnits,
        jobs::JobState,
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, seed_village},
        uow::UnitOfWorkProvider,
    };

    #[tokio::test]
    async fn test_cancel_refunds_remaining_units_and_promotes_next() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;
        let train = TrainUnitsCommandHandler::new();

        let uow = provider.begin().await?;
        let first = train
            .handle(
                TrainUnits {
                    village_id: village.id,
                    troop: TroopName::Militia,
                    count: 3,
                },
                &uow,
                &config,
            )
            .await?;
        let second = train
            .handle(
                TrainUnits {
                    village_id: village.id,
                    troop: TroopName::Militia,
                    count: 1,
                },
                &uow,
                &config,
            )
            .await?;
        uow.commit().await?;

        clock.advance(Duration::milliseconds(100));
        let uow = provider.begin().await?;
        let refund = CancelTrainingCommandHandler::new()
            .handle(
                CancelTraining {
                    village_id: village.id,
                    task_id: first.id,
                },
                &uow,
                &config,
            )
            .await?;

        assert_eq!(refund, ResourceGroup::new(72, 48, 24, 12), "floor(cost × 3 × 0.8)");

        let cancelled = uow.training_tasks().get_by_id(first.id).await?;
        assert_eq!(cancelled.status, TrainingStatus::Cancelled);
        assert_eq!(
            scheduler::status(&uow, &JobKey::training(first.id, 3)).await?,
            JobState::Absent,
            "Outstanding tick is removed"
        );

        let promoted = uow.training_tasks().get_by_id(second.id).await?;
        assert_eq!(promoted.status, TrainingStatus::InProgress);
        assert_eq!(promoted.start_time, Some(clock.now()));

        let idle = uow
            .troops()
            .get_quantity(village.id, TroopName::Militia, TroopStatus::Idle)
            .await?;
        assert_eq!(idle, 0);
        uow.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_overdue_task_completes_it_instead() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;

        let uow = provider.begin().await?;
        let task = TrainUnitsCommandHandler::new()
            .handle(
                TrainUnits {
                    village_id: village.id,
                    troop: TroopName::Militia,
                    count: 3,
                },
                &uow,
                &config,
            )
            .await?;
        uow.commit().await?;

        let end_time = task.end_time.expect("running task has an end time");
        clock.set(end_time + Duration::seconds(5));
        let uow = provider.begin().await?;
        let result = CancelTrainingCommandHandler::new()
            .handle(
                CancelTraining {
                    village_id: village.id,
                    task_id: task.id,
                },
                &uow,
                &config,
            )
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::TaskNotCancellable))
        ));

        let finished = uow.training_tasks().get_by_id(task.id).await?;
        assert_eq!(finished.status, TrainingStatus::Completed);
        let idle = uow
            .troops()
            .get_quantity(village.id, TroopName::Militia, TroopStatus::Idle)
            .await?;
        assert_eq!(idle, 3, "Every unit was trained, none refunded");

        uow.rollback().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_twice_is_rejected() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;

        let uow = provider.begin().await?;
        let task = TrainUnitsCommandHandler::new()
            .handle(
                TrainUnits {
                    village_id: village.id,
                    troop: TroopName::Militia,
                    count: 1,
                },
                &uow,
                &config,
            )
            .await?;
        let handler = CancelTrainingCommandHandler::new();
        let command = CancelTraining {
            village_id: village.id,
            task_id: task.id,
        };
        handler.handle(command.clone(), &uow, &config).await?;

        let again = handler.handle(command, &uow, &config).await;
        assert!(matches!(
            again,
            Err(ApplicationError::Game(GameError::TaskNotCancellable))
        ));
        uow.rollback().await?;
        Ok(())
    }
}
