use tracing::debug;
use uuid::Uuid;

use stronghold_game::{balance::production_increase, models::building::Building};
use stronghold_types::errors::{ApplicationError, DbError};

use crate::{
    events::GameEvent,
    helpers::ledger,
    jobs::{Backoff, JobKey, JobOptions, scheduler},
    uow::UnitOfWork,
};

pub const BUILD_JOB_ATTEMPTS: u32 = 5;
pub const BUILD_JOB_BACKOFF_MS: i64 = 2_000;

pub fn build_job_options(delay_ms: i64) -> JobOptions {
    JobOptions {
        delay_ms,
        attempts: BUILD_JOB_ATTEMPTS,
        backoff: Backoff::Exponential {
            base_ms: BUILD_JOB_BACKOFF_MS,
        },
    }
}

/// Applies a finished upgrade: level, construction task and production rate.
///
/// Returns `None` when the upgrade to `target_level` was already applied or is
/// no longer queued, so the scheduler and the reconciler can both call it.
/// Stocks are collected up to the moment the upgrade finished before the new
/// rate kicks in.
pub async fn finish_building(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
    building_id: Uuid,
    target_level: u8,
) -> Result<Option<Building>, ApplicationError> {
    let building = uow.buildings().get_by_id(building_id).await?;
    if building.village_id != village_id {
        return Err(ApplicationError::Db(DbError::BuildingNotFound(building_id)));
    }
    if building.level >= target_level || !building.is_queued() {
        debug!(%building_id, level = building.level, target_level, "Upgrade already applied");
        return Ok(None);
    }

    let finished_at = building.queued_until.unwrap_or_else(|| uow.now());
    ledger::collect_at(uow, village_id, finished_at).await?;

    let Some(upgraded) = uow
        .buildings()
        .complete_upgrade(building_id, target_level)
        .await?
    else {
        debug!(%building_id, target_level, "Upgrade no longer pending");
        return Ok(None);
    };

    uow.construction_tasks()
        .complete(building_id, target_level)
        .await?;

    if let Some((kind, amount)) = production_increase(&upgraded.name, upgraded.level) {
        uow.villages()
            .increase_production(village_id, kind, amount)
            .await?;
    }

    // The reconciler may get here first; drop the completion job still waiting.
    scheduler::cancel(uow, &JobKey::building(building_id, target_level)).await?;

    uow.events().push(GameEvent::BuildingUpgraded {
        village_id,
        building_id,
        name: upgraded.name,
        level: upgraded.level,
    });

    Ok(Some(upgraded))
}
