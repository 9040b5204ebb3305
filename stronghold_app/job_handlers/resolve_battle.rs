use async_trait::async_trait;
use tracing::{info, instrument};

use stronghold_types::errors::ApplicationError;

use crate::{
    helpers::combat::resolve_battle,
    jobs::{
        Job,
        handler::{JobHandler, JobHandlerContext},
        tasks::ResolveBattleTask,
    },
};

pub struct ResolveBattleJobHandler {
    payload: ResolveBattleTask,
}

impl ResolveBattleJobHandler {
    pub fn new(payload: ResolveBattleTask) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl JobHandler for ResolveBattleJobHandler {
    #[instrument(skip_all, fields(
        task_type = "ResolveBattle",
        battle_id = %self.payload.battle_id,
        village_id = %job.village_id,
    ))]
    async fn handle<'ctx, 'a>(
        &'ctx self,
        ctx: &'ctx JobHandlerContext<'a>,
        job: &'ctx Job,
    ) -> Result<(), ApplicationError> {
        info!("Executing ResolveBattle job");

        if resolve_battle(&ctx.uow, self.payload.battle_id)
            .await?
            .is_some()
        {
            info!("Battle resolved");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stronghold_game::{models::battle::BattleStatus, test_utils::VillageFactoryOptions};
    use stronghold_types::{
        Result,
        errors::AppError,
        map::Position,
        troops::{TroopAmount, TroopName},
    };

    use super::*;
    use crate::{
        command_handlers::AttackVillageCommandHandler,
        config::Config,
        cqrs::{CommandHandler, commands::AttackVillage},
        helpers::combat::battle_job_options,
        jobs::tasks::JobTask,
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, seed_troops, seed_village_with},
        uow::UnitOfWorkProvider,
    };

    #[tokio::test]
    async fn test_resolve_battle_waits_for_arrival() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let config = Arc::new(Config::from_env());

        let attacker = seed_village_with(
            &provider,
            VillageFactoryOptions {
                position: Some(Position::new(0, 0)),
                ..Default::default()
            },
            &[],
        )
        .await?;
        seed_village_with(
            &provider,
            VillageFactoryOptions {
                position: Some(Position::new(0, 2)),
                ..Default::default()
            },
            &[],
        )
        .await?;
        seed_troops(
            &provider,
            attacker.id,
            &[TroopAmount::new(TroopName::Militia, 5)],
        )
        .await?;

        let uow = provider.begin().await?;
        let battle = AttackVillageCommandHandler::new()
            .handle(
                AttackVillage {
                    village_id: attacker.id,
                    origin: Position::new(0, 0),
                    target: Position::new(0, 2),
                    troops: vec![TroopAmount::new(TroopName::Militia, 5)],
                },
                &uow,
                &config,
            )
            .await?;
        uow.commit().await?;

        let payload = ResolveBattleTask {
            battle_id: battle.id,
        };
        let job = Job::new(
            attacker.id,
            JobTask::ResolveBattle(payload.clone()),
            &battle_job_options(0),
            clock.now(),
        );
        let handler = ResolveBattleJobHandler::new(payload);

        // Delivered early: an error, so the worker retries later.
        let ctx = JobHandlerContext {
            uow: provider.begin().await?,
            config: config.clone(),
        };
        let early = handler.handle(&ctx, &job).await;
        assert!(matches!(
            early,
            Err(ApplicationError::App(AppError::BattleNotArrived(id))) if id == battle.id
        ));
        ctx.uow.rollback().await?;

        clock.set(battle.arrival_time);
        let ctx = JobHandlerContext {
            uow: provider.begin().await?,
            config,
        };
        handler.handle(&ctx, &job).await?;
        handler.handle(&ctx, &job).await?;

        let resolved = ctx.uow.battles().get_by_id(battle.id).await?;
        assert_eq!(resolved.status, BattleStatus::Resolved);
        assert_eq!(resolved.resolved_at, Some(battle.arrival_time));
        assert!(
            ctx.uow
                .movements()
                .list_active_by_village_id(attacker.id)
                .await?
                .is_empty(),
            "Movements are marked arrived"
        );
        assert_eq!(
            ctx.uow.events().drain().len(),
            1,
            "A resolved battle is not resolved twice"
        );
        ctx.uow.commit().await?;
        Ok(())
    }
}
