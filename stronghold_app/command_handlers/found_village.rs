use std::sync::Arc;
use tracing::{debug, info, instrument};

use stronghold_game::models::{building::Building, village::Village};
use stronghold_types::{
    buildings::BuildingName,
    errors::{ApplicationError, GameError},
};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::FoundVillage},
    events::GameEvent,
    uow::UnitOfWork,
};

pub struct FoundVillageCommandHandler {}

impl FoundVillageCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<FoundVillage> for FoundVillageCommandHandler {
    #[instrument(skip_all, fields(player_id = %command.player_id, position = %command.position))]
    async fn handle(
        &self,
        command: FoundVillage,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<Village, ApplicationError> {
        let village_repo = uow.villages();

        if let Some(existing) = village_repo.get_by_position(&command.position).await? {
            if existing.player_id == command.player_id {
                debug!(village_id = %existing.id, "Village already founded");
                return Ok(existing);
            }
            return Err(ApplicationError::Game(GameError::PositionOccupied(
                command.position,
            )));
        }

        let village = Village::new(command.player_id, command.name, command.position, uow.now());
        village_repo.create(&village).await?;

        let buildings: Vec<Building> = BuildingName::ALL
            .iter()
            .map(|name| Building::new(village.id, *name))
            .collect();
        uow.buildings().create_many(&buildings).await?;

        uow.events().push(GameEvent::VillageFounded {
            village_id: village.id,
            player_id: village.player_id,
            position: village.position,
        });
        info!(village_id = %village.id, "Village founded");

        Ok(village)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use uuid::Uuid;

    use stronghold_types::{Result, common::ResourceGroup, map::Position};

    use super::*;
    use crate::{
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock},
        uow::UnitOfWorkProvider,
    };

    fn command(player_id: Uuid, position: Position) -> FoundVillage {
        FoundVillage {
            player_id,
            name: "Rivendell".to_string(),
            position,
        }
    }

    #[tokio::test]
    async fn test_found_village_creates_starting_state() -> Result<()> {
        let provider = InMemoryUnitOfWorkProvider::new(Arc::new(MockClock::default()));
        let config = Arc::new(Config::from_env());
        let player_id = Uuid::new_v4();

        let uow = provider.begin().await?;
        let village = FoundVillageCommandHandler::new()
            .handle(command(player_id, Position::new(3, 4)), &uow, &config)
            .await?;

        assert_eq!(village.stocks, ResourceGroup::new(500, 500, 500, 500));
        assert_eq!(village.production, ResourceGroup::new(10, 10, 10, 8));

        let buildings = uow.buildings().list_by_village_id(village.id).await?;
        assert_eq!(buildings.len(), 16, "Every building type starts at level 0");
        assert!(buildings.iter().all(|b| b.level == 0 && !b.is_queued()));
        uow.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_found_village_is_idempotent_per_player() -> Result<()> {
        let provider = InMemoryUnitOfWorkProvider::new(Arc::new(MockClock::default()));
        let config = Arc::new(Config::from_env());
        let player_id = Uuid::new_v4();
        let handler = FoundVillageCommandHandler::new();

        let uow = provider.begin().await?;
        let first = handler
            .handle(command(player_id, Position::new(0, 0)), &uow, &config)
            .await?;
        let second = handler
            .handle(command(player_id, Position::new(0, 0)), &uow, &config)
            .await?;
        assert_eq!(first.id, second.id);

        let taken = handler
            .handle(command(Uuid::new_v4(), Position::new(0, 0)), &uow, &config)
            .await;
        assert!(matches!(
            taken,
            Err(ApplicationError::Game(GameError::PositionOccupied(_)))
        ));
        uow.rollback().await?;
        Ok(())
    }
}
