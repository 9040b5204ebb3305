use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument};

use stronghold_game::models::{
    battle::Battle,
    movement::ArmyMovement,
    troops::{normalize_manifest, slowest_speed},
};
use stronghold_types::errors::{ApplicationError, GameError};

use crate::{
    config::Config,
    cqrs::{CommandHandler, commands::AttackVillage},
    events::GameEvent,
    helpers::combat::{battle_job_options, reserve_troops},
    jobs::{
        scheduler,
        tasks::{JobTask, ResolveBattleTask},
    },
    uow::UnitOfWork,
};

pub struct AttackVillageCommandHandler {}

impl AttackVillageCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<AttackVillage> for AttackVillageCommandHandler {
    #[instrument(skip_all, fields(
        village_id = %command.village_id,
        origin = %command.origin,
        target = %command.target
    ))]
    async fn handle(
        &self,
        command: AttackVillage,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<Battle, ApplicationError> {
        let village_repo = uow.villages();

        let defender = village_repo
            .get_by_position(&command.target)
            .await?
            .ok_or(GameError::NoTargetVillage(command.target))?;
        let attacker = village_repo.get_by_id(command.village_id).await?;
        if attacker.position != command.origin {
            return Err(ApplicationError::Game(GameError::InvalidOrigin(
                command.origin,
            )));
        }
        if defender.id == attacker.id {
            return Err(ApplicationError::Game(GameError::CannotAttackOwnVillage));
        }

        let manifest = normalize_manifest(&command.troops)?;
        let speed = slowest_speed(&manifest)?;
        reserve_troops(uow, attacker.id, &manifest).await?;

        let travel_ms = attacker
            .position
            .travel_time_ms(&defender.position, speed, config.server_speed);
        let now = uow.now();
        let battle = Battle::new(
            attacker.id,
            defender.id,
            attacker.position,
            defender.position,
            manifest,
            now,
            now + Duration::milliseconds(travel_ms),
        );
        uow.battles().create(&battle).await?;
        for movement in ArmyMovement::for_battle(&battle) {
            uow.movements().create(&movement).await?;
        }

        scheduler::enqueue(
            uow,
            attacker.id,
            JobTask::ResolveBattle(ResolveBattleTask {
                battle_id: battle.id,
            }),
            battle_job_options(travel_ms),
        )
        .await?;

        uow.events().push(GameEvent::AttackLaunched {
            battle_id: battle.id,
            attacker_village_id: attacker.id,
            defender_village_id: defender.id,
            arrival_time: battle.arrival_time,
        });
        info!(battle_id = %battle.id, arrival = %battle.arrival_time, "Attack launched");

        Ok(battle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stronghold_game::test_utils::VillageFactoryOptions;
    use stronghold_types::{
        Result,
        map::Position,
        troops::{TroopAmount, TroopName, TroopStatus},
    };

    use super::*;
    use crate::{
        jobs::{JobKey, JobState},
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, seed_troops, seed_village_with},
        uow::UnitOfWorkProvider,
    };

    async fn setup(
        provider: &InMemoryUnitOfWorkProvider,
    ) -> Result<(uuid::Uuid, Position, Position)> {
        let attacker = seed_village_with(
            provider,
            VillageFactoryOptions {
                position: Some(Position::new(0, 0)),
                ..Default::default()
            },
            &[],
        )
        .await?;
        let defender = seed_village_with(
            provider,
            VillageFactoryOptions {
                position: Some(Position::new(3, 4)),
                ..Default::default()
            },
            &[],
        )
        .await?;
        seed_troops(
            provider,
            attacker.id,
            &[
                TroopAmount::new(TroopName::Militia, 10),
                TroopAmount::new(TroopName::Ram, 2),
            ],
        )
        .await?;
        Ok((attacker.id, attacker.position, defender.position))
    }

    #[tokio::test]
    async fn test_attack_reserves_troops_and_schedules_battle() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let (village_id, origin, target) = setup(&provider).await?;

        let uow = provider.begin().await?;
        let battle = AttackVillageCommandHandler::new()
            .handle(
                AttackVillage {
                    village_id,
                    origin,
                    target,
                    troops: vec![
                        TroopAmount::new(TroopName::Militia, 4),
                        TroopAmount::new(TroopName::Ram, 1),
                        TroopAmount::new(TroopName::Militia, 2),
                    ],
                },
                &uow,
                &config,
            )
            .await?;

        // distance 5 at ram speed 3 tiles/hour
        let travel_ms = 6_000_000 / config.server_speed as i64;
        assert_eq!(battle.arrival_time, clock.now() + Duration::milliseconds(travel_ms));
        assert_eq!(battle.troops.len(), 2, "Duplicate entries are merged");

        let troops = uow.troops();
        assert_eq!(
            troops
                .get_quantity(village_id, TroopName::Militia, TroopStatus::Idle)
                .await?,
            4
        );
        assert_eq!(
            troops
                .get_quantity(village_id, TroopName::Militia, TroopStatus::OnRoute)
                .await?,
            6
        );
        assert_eq!(
            troops
                .get_quantity(village_id, TroopName::Ram, TroopStatus::OnRoute)
                .await?,
            1
        );

        let movements = uow.movements().list_active_by_village_id(village_id).await?;
        assert_eq!(movements.len(), 1);
        assert_eq!(
            scheduler::status(&uow, &JobKey::battle(battle.id)).await?,
            JobState::Delayed
        );
        uow.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_attack_validation() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());
        let (village_id, origin, target) = setup(&provider).await?;
        let handler = AttackVillageCommandHandler::new();
        let attack = |origin: Position, target: Position, troops: Vec<TroopAmount>| AttackVillage {
            village_id,
            origin,
            target,
            troops,
        };
        let militia = vec![TroopAmount::new(TroopName::Militia, 1)];

        let uow = provider.begin().await?;
        let result = handler
            .handle(attack(origin, Position::new(50, 50), militia.clone()), &uow, &config)
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::NoTargetVillage(_)))
        ));

        let result = handler
            .handle(attack(Position::new(1, 1), target, militia.clone()), &uow, &config)
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::InvalidOrigin(_)))
        ));

        let result = handler
            .handle(attack(origin, origin, militia.clone()), &uow, &config)
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::CannotAttackOwnVillage))
        ));

        let result = handler
            .handle(
                attack(origin, target, vec![TroopAmount::new(TroopName::Militia, 0)]),
                &uow,
                &config,
            )
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::NoUnitsSelected))
        ));

        let result = handler
            .handle(
                attack(origin, target, vec![TroopAmount::new(TroopName::Knight, 1)]),
                &uow,
                &config,
            )
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::NotEnoughUnits(
                TroopName::Knight
            )))
        ));
        uow.rollback().await?;
        Ok(())
    }
}
