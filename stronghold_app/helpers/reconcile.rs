use tracing::debug;
use uuid::Uuid;

use stronghold_game::models::training::TrainingStatus;
use stronghold_types::errors::ApplicationError;

use crate::{
    helpers::{
        combat::resolve_battle,
        construction::finish_building,
        ledger,
        training::{force_complete_task, trigger_next_task_if_available},
    },
    uow::UnitOfWork,
};

/// Applies every timer of the village that expired by `uow.now()`, in the order
/// the timers fired.
pub async fn catch_up_village(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
) -> Result<(), ApplicationError> {
    let now = uow.now();

    // Overdue upgrades, each collecting up to its own finish time first.
    let mut overdue: Vec<_> = uow
        .buildings()
        .list_by_village_id(village_id)
        .await?
        .into_iter()
        .filter(|b| b.is_upgrade_due(now))
        .collect();
    overdue.sort_by_key(|b| b.queued_until);
    let finished = overdue.len();
    for building in overdue {
        finish_building(uow, village_id, building.id, building.level + 1).await?;
    }

    ledger::collect(uow, village_id).await?;

    // Force completion promotes the next task, which may be overdue as well.
    let mut completed = 0;
    loop {
        let queue = uow
            .training_tasks()
            .list_unfinished_by_village_id(village_id)
            .await?;
        let Some(task) = queue.into_iter().find(|t| t.is_overdue(now)) else {
            break;
        };
        force_complete_task(uow, task.id).await?;
        completed += 1;
    }

    let pending: Vec<_> = uow
        .training_tasks()
        .list_unfinished_by_village_id(village_id)
        .await?
        .into_iter()
        .filter(|t| t.status == TrainingStatus::Pending)
        .map(|t| t.building)
        .collect();
    for building in pending {
        trigger_next_task_if_available(uow, village_id, building, now).await?;
    }

    for battle in uow.battles().list_due_for_village(village_id, now).await? {
        resolve_battle(uow, battle.id).await?;
    }

    if finished > 0 || completed > 0 {
        debug!(%village_id, finished, completed, "Village caught up");
    }
    Ok(())
}
