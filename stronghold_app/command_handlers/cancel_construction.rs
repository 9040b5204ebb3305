use std::sync::Arc;
use tracing::{info, instrument};

use stronghold_game::balance::CANCEL_REFUND_PERCENT;
use stronghold_types::{
    common::ResourceGroup,
    errors::{AppError, ApplicationError, GameError},
};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::CancelConstruction},
    events::GameEvent,
    helpers::{ledger, reconcile::catch_up_village},
    jobs::{JobKey, scheduler},
    uow::UnitOfWork,
};

pub struct CancelConstructionCommandHandler {}

impl CancelConstructionCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<CancelConstruction> for CancelConstructionCommandHandler {
    #[instrument(skip_all, fields(village_id = %command.village_id, building = %command.building))]
    async fn handle(
        &self,
        command: CancelConstruction,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<ResourceGroup, ApplicationError> {
        // An overdue upgrade is finished, not refunded.
        catch_up_village(uow, command.village_id).await?;

        let building = uow
            .buildings()
            .get_by_name(command.village_id, command.building)
            .await?
            .ok_or(GameError::BuildingNotFound(command.building))?;
        if !building.is_queued() {
            return Err(ApplicationError::Game(GameError::BuildingNotQueued(
                building.name,
            )));
        }
        let target_level = building.level + 1;

        // Once the completion job is running the upgrade can no longer be stopped.
        let key = JobKey::building(building.id, target_level);
        if !scheduler::cancel(uow, &key).await? {
            return Err(ApplicationError::App(AppError::ConstructionInProgress(
                building.id,
            )));
        }

        if !uow
            .buildings()
            .cancel_upgrade(building.id, target_level)
            .await?
        {
            return Err(ApplicationError::Game(GameError::BuildingNotQueued(
                building.name,
            )));
        }
        let refund = match uow
            .construction_tasks()
            .cancel(building.id, target_level)
            .await?
        {
            Some(task) => task.cost.percent(CANCEL_REFUND_PERCENT),
            None => ResourceGroup::default(),
        };
        ledger::add(uow, command.village_id, &refund).await?;

        uow.events().push(GameEvent::BuildingUpgradeCancelled {
            village_id: command.village_id,
            building_id: building.id,
            name: building.name,
            refund,
        });
        info!(?refund, "Building upgrade cancelled");

        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stronghold_types::{Result, buildings::BuildingName};

    use super::*;
    use crate::{
        command_handlers::UpgradeBuildingCommandHandler,
        cqrs::commands::UpgradeBuilding,
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, queue_upgrade, seed_village},
        uow::UnitOfWorkProvider,
    };

    #[tokio::test]
    async fn test_cancel_construction_refunds_eighty_percent() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[]).await?;

        let uow = provider.begin().await?;
        UpgradeBuildingCommandHandler::new()
            .handle(
                UpgradeBuilding {
                    village_id: village.id,
                    building: BuildingName::Sawmill,
                },
                &uow,
                &config,
            )
            .await?;
        let refund = CancelConstructionCommandHandler::new()
            .handle(
                CancelConstruction {
                    village_id: village.id,
                    building: BuildingName::Sawmill,
                },
                &uow,
                &config,
            )
            .await?;

        assert_eq!(refund, ResourceGroup::new(16, 80, 40, 24));
        let stored = uow.villages().get_by_id(village.id).await?;
        assert_eq!(stored.stocks, ResourceGroup::new(496, 480, 490, 494));

        let building = uow
            .buildings()
            .get_by_name(village.id, BuildingName::Sawmill)
            .await?
            .unwrap();
        assert_eq!(building.level, 0);
        assert!(!building.is_queued());
        assert!(uow.jobs().list_by_village_id(village.id).await?.is_empty());
        uow.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_overdue_upgrade_finishes_it_instead() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[(BuildingName::Farm, 1)]).await?;
        queue_upgrade(&provider, village.id, BuildingName::Farm, 10_000).await?;

        clock.advance(chrono::Duration::seconds(20));
        let uow = provider.begin().await?;
        let result = CancelConstructionCommandHandler::new()
            .handle(
                CancelConstruction {
                    village_id: village.id,
                    building: BuildingName::Farm,
                },
                &uow,
                &config,
            )
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::BuildingNotQueued(
                BuildingName::Farm
            )))
        ));

        let farm = uow
            .buildings()
            .get_by_name(village.id, BuildingName::Farm)
            .await?
            .unwrap();
        assert_eq!(farm.level, 2, "The upgrade completed before the cancel");
        uow.rollback().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_idle_building_fails() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let village = seed_village(&provider, &[]).await?;

        let uow = provider.begin().await?;
        let result = CancelConstructionCommandHandler::new()
            .handle(
                CancelConstruction {
                    village_id: village.id,
                    building: BuildingName::Farm,
                },
                &uow,
                &config,
            )
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::BuildingNotQueued(
                BuildingName::Farm
            )))
        ));
        uow.rollback().await?;
        Ok(())
    }
}
