use std::sync::Arc;
use tracing::{info, instrument};

use stronghold_game::{balance::troop_spec, models::training::TrainingTask};
use stronghold_types::errors::{ApplicationError, GameError};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::TrainUnits},
    events::GameEvent,
    helpers::{ledger, training::trigger_next_task_if_available},
    uow::UnitOfWork,
};

pub struct TrainUnitsCommandHandler {}

impl TrainUnitsCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<TrainUnits> for TrainUnitsCommandHandler {
    #[instrument(skip_all, fields(
        village_id = %command.village_id,
        troop = %command.troop,
        count = command.count
    ))]
    async fn handle(
        &self,
        command: TrainUnits,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<TrainingTask, ApplicationError> {
        let spec = troop_spec(&command.troop)?;
        if command.count == 0 {
            return Err(ApplicationError::Game(GameError::InvalidQuantity));
        }

        let building = uow
            .buildings()
            .get_by_name(command.village_id, spec.building)
            .await?;
        if building.is_none_or(|b| b.level < spec.required_level) {
            return Err(ApplicationError::Game(
                GameError::BuildingRequirementsNotMet {
                    building: spec.building,
                    level: spec.required_level,
                },
            ));
        }

        let task = TrainingTask::new(
            command.village_id,
            spec.name,
            spec.building,
            command.count,
            spec.cost,
            spec.unit_time_ms(config.server_speed),
            uow.now(),
        );
        ledger::deduct(uow, command.village_id, &task.total_cost()).await?;
        uow.training_tasks().create(&task).await?;

        // Starts right away when the slot is free, otherwise waits in line.
        let task = match trigger_next_task_if_available(uow, task.village_id, task.building, uow.now())
            .await?
        {
            Some(started) if started.id == task.id => started,
            _ => task,
        };

        uow.events().push(GameEvent::TrainingQueued {
            village_id: task.village_id,
            task_id: task.id,
            troop: task.troop,
            count: task.count,
        });
        info!(task_id = %task.id, status = ?task.status, "Training queued");

        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::sync::Arc;

    use stronghold_game::models::training::TrainingStatus;
    use stronghold_types::{
        Result, buildings::BuildingName, common::ResourceGroup, troops::TroopName,
    };

    use super::*;
    use crate::{
        jobs::{JobKey, JobState, scheduler},
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, seed_village},
        uow::UnitOfWorkProvider,
    };

    fn train(village_id: uuid::Uuid, troop: TroopName, count: u32) -> TrainUnits {
        TrainUnits {
            village_id,
            troop,
            count,
        }
    }

    #[tokio::test]
    async fn test_train_units_starts_first_task() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;

        let uow = provider.begin().await?;
        let task = TrainUnitsCommandHandler::new()
            .handle(train(village.id, TroopName::Militia, 5), &uow, &config)
            .await?;

        let unit_ms = 10_000 / config.server_speed as i64;
        assert_eq!(task.status, TrainingStatus::InProgress);
        assert_eq!(task.start_time, Some(clock.now()));
        assert_eq!(
            task.end_time,
            Some(clock.now() + Duration::milliseconds(unit_ms * 5))
        );

        let stored = uow.villages().get_by_id(village.id).await?;
        assert_eq!(
            stored.stocks,
            ResourceGroup::new(500 - 150, 500 - 100, 500 - 50, 500 - 25)
        );

        let key = JobKey::training(task.id, 5);
        assert_eq!(scheduler::status(&uow, &key).await?, JobState::Delayed);
        uow.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_second_task_waits_in_line() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;
        let handler = TrainUnitsCommandHandler::new();

        let uow = provider.begin().await?;
        handler
            .handle(train(village.id, TroopName::Militia, 2), &uow, &config)
            .await?;
        let second = handler
            .handle(train(village.id, TroopName::Spearman, 1), &uow, &config)
            .await?;

        assert_eq!(second.status, TrainingStatus::Pending);
        assert!(second.start_time.is_none());
        assert_eq!(
            scheduler::status(&uow, &JobKey::training(second.id, 1)).await?,
            JobState::Absent
        );
        uow.rollback().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_train_units_validation() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[(BuildingName::Barracks, 1)]).await?;
        let handler = TrainUnitsCommandHandler::new();

        let uow = provider.begin().await?;
        let zero = handler
            .handle(train(village.id, TroopName::Militia, 0), &uow, &config)
            .await;
        assert!(matches!(
            zero,
            Err(ApplicationError::Game(GameError::InvalidQuantity))
        ));

        let locked = handler
            .handle(train(village.id, TroopName::Archer, 1), &uow, &config)
            .await;
        assert!(matches!(
            locked,
            Err(ApplicationError::Game(
                GameError::BuildingRequirementsNotMet { level: 5, .. }
            ))
        ));

        let too_many = handler
            .handle(train(village.id, TroopName::Militia, 100), &uow, &config)
            .await;
        assert!(matches!(
            too_many,
            Err(ApplicationError::Game(GameError::NotEnoughResources))
        ));
        uow.rollback().await?;
        Ok(())
    }
}
