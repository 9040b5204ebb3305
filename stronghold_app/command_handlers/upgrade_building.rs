use std::sync::Arc;
use tracing::{info, instrument};

use stronghold_game::models::construction::ConstructionTask;
use stronghold_types::errors::{ApplicationError, GameError};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::UpgradeBuilding},
    events::GameEvent,
    helpers::{construction::build_job_options, ledger},
    jobs::{
        scheduler,
        tasks::{BuildingUpgradeTask, JobTask},
    },
    uow::UnitOfWork,
};

pub struct UpgradeBuildingCommandHandler {}

impl Default for UpgradeBuildingCommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl UpgradeBuildingCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<UpgradeBuilding> for UpgradeBuildingCommandHandler {
    #[instrument(skip_all, fields(village_id = %command.village_id, building = %command.building))]
    async fn handle(
        &self,
        command: UpgradeBuilding,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<ConstructionTask, ApplicationError> {
        let building = uow
            .buildings()
            .get_by_name(command.village_id, command.building)
            .await?
            .ok_or(GameError::BuildingNotFound(command.building))?;

        let (target_level, cost) = building.next_upgrade()?;
        let duration_ms = cost.duration_ms(config.server_speed);

        ledger::deduct(uow, command.village_id, &cost.resources).await?;

        let now = uow.now();
        let task = ConstructionTask::new(
            command.village_id,
            building.id,
            building.name,
            target_level,
            cost.resources,
            now,
            now + chrono::Duration::milliseconds(duration_ms),
        );
        if !uow.buildings().mark_queued(building.id, task.end_time).await? {
            return Err(ApplicationError::Game(GameError::BuildingAlreadyQueued(
                building.name,
            )));
        }
        uow.construction_tasks().create(&task).await?;

        scheduler::enqueue(
            uow,
            command.village_id,
            JobTask::BuildingUpgrade(BuildingUpgradeTask {
                village_id: command.village_id,
                building_id: building.id,
                building_name: building.name,
                target_level,
            }),
            build_job_options(duration_ms),
        )
        .await?;

        uow.events().push(GameEvent::BuildingUpgradeStarted {
            village_id: command.village_id,
            building_id: building.id,
            name: building.name,
            target_level,
            finish_at: task.end_time,
        });
        info!(target_level, finish_at = %task.end_time, "Building upgrade queued");

        Ok(task)
    }
}
