use tracing::debug;
use uuid::Uuid;

use stronghold_game::models::battle::{Battle, BattleStatus};
use stronghold_types::{
    errors::{AppError, ApplicationError, GameError},
    troops::{TroopAmount, TroopStatus},
};

use crate::{
    events::GameEvent,
    jobs::{Backoff, JobKey, JobOptions, scheduler},
    uow::UnitOfWork,
};

pub const BATTLE_JOB_ATTEMPTS: u32 = 5;
pub const BATTLE_JOB_BACKOFF_MS: i64 = 1_000;

pub fn battle_job_options(delay_ms: i64) -> JobOptions {
    JobOptions {
        delay_ms,
        attempts: BATTLE_JOB_ATTEMPTS,
        backoff: Backoff::Exponential {
            base_ms: BATTLE_JOB_BACKOFF_MS,
        },
    }
}

/// Moves the manifest from idle to on_route. Fails on the first troop type
/// short of units; the caller's transaction then discards every move of the batch.
pub async fn reserve_troops(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
    manifest: &[TroopAmount],
) -> Result<(), ApplicationError> {
    let troops = uow.troops();
    for entry in manifest {
        let reserved = troops
            .try_decrement(village_id, entry.troop, TroopStatus::Idle, entry.quantity)
            .await?;
        if !reserved {
            return Err(ApplicationError::Game(GameError::NotEnoughUnits(entry.troop)));
        }
        troops
            .increment(village_id, entry.troop, TroopStatus::OnRoute, entry.quantity)
            .await?;
    }
    Ok(())
}

/// Transitions a battle to resolved once its army has arrived.
///
/// Returns `None` when it was already resolved. Running before arrival is an
/// error so the job gets retried.
pub async fn resolve_battle(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    battle_id: Uuid,
) -> Result<Option<Battle>, ApplicationError> {
    let battle = uow.battles().get_by_id(battle_id).await?;
    if battle.status == BattleStatus::Resolved {
        debug!(%battle_id, "Battle already resolved");
        return Ok(None);
    }
    let now = uow.now();
    if battle.arrival_time > now {
        return Err(ApplicationError::App(AppError::BattleNotArrived(battle_id)));
    }

    let Some(resolved) = uow.battles().resolve(battle_id, now).await? else {
        debug!(%battle_id, "Battle resolved concurrently");
        return Ok(None);
    };
    uow.movements().mark_arrived_for_battle(battle_id).await?;
    scheduler::cancel(uow, &JobKey::battle(battle_id)).await?;

    uow.events().push(GameEvent::BattleResolved {
        battle_id,
        attacker_village_id: resolved.attacker_village_id,
        defender_village_id: resolved.defender_village_id,
        resolved_at: now,
    });

    Ok(Some(resolved))
}
