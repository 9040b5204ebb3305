
use chrono::Duration;
use uuid::Uuid;

use stronghold_app::{
    command_handlers::{RefreshVillageStateCommandHandler, TrainUnitsCommandHandler},
    cqrs::commands::{RefreshVillageState, TrainUnits},
    test_utils::tests::seed_village,
    uow::UnitOfWorkProvider,
};
use stronghold_game::models::training::{TrainingStatus, TrainingTask};
use stronghold_types::{
    Result,
    buildings::BuildingName,
    troops::{TroopName, TroopStatus},
};

use test_utils::tests::{TestApp, setup_app};

async fn idle_militia(app: &TestApp, village_id: Uuid) -> Result<u32> {
    let uow = app.provider.begin().await?;
    let quantity = uow
        .troops()
        .get_quantity(village_id, TroopName::Militia, TroopStatus::Idle)
        .await?;
    uow.rollback().await?;
    Ok(quantity)
}

async fn train(app: &TestApp, village_id: Uuid, count: u32) -> Result<TrainingTask> {
    app.bus
        .execute(
            TrainUnits {
                village_id,
                troop: TroopName::Militia,
                count,
            },
            TrainUnitsCommandHandler::new(),
        )
        .await
}

#[tokio::test]
async fn test_reconciler_catches_up_on_partial_training() -> Result<()> {
    let app = setup_app(5);
    let village = seed_village(&app.provider, &[(BuildingName::Barracks, 1)]).await?;
    let start = app.clock.now();

    let task = train(&app, village.id, 5).await?;
    assert_eq!(task.status, TrainingStatus::InProgress);
    assert_eq!(task.unit_time_ms, 2_000);

    app.clock.set(start + Duration::milliseconds(2_000));
    assert_eq!(app.worker.process_due_jobs().await?, 1);
    assert_eq!(idle_militia(&app, village.id).await?, 1);

    // The worker falls behind: the reconciler grants the rest at once.
    app.clock.set(start + Duration::milliseconds(11_000));
    let details = app
        .bus
        .execute(
            RefreshVillageState {
                village_id: village.id,
            },
            RefreshVillageStateCommandHandler::new(),
        )
        .await?;

    let idle = details
        .troops
        .iter()
        .find(|g| g.troop == TroopName::Militia && g.status == TroopStatus::Idle)
        .map(|g| g.quantity);
    assert_eq!(idle, Some(5));
    assert!(details.training_queue.is_empty());

    // The tick still waiting was dropped, so nothing is granted twice.
    assert_eq!(app.worker.process_due_jobs().await?, 0);
    assert_eq!(idle_militia(&app, village.id).await?, 5);
    Ok(())
}

#[tokio::test]
async fn test_ticks_deliver_every_unit_and_start_next_task() -> Result<()> {
    let app = setup_app(5);
    let village = seed_village(&app.provider, &[(BuildingName::Barracks, 1)]).await?;
    let start = app.clock.now();

    let first = train(&app, village.id, 3).await?;
    let second = train(&app, village.id, 2).await?;
    assert_eq!(first.status, TrainingStatus::InProgress);
    assert_eq!(second.status, TrainingStatus::Pending);

    for k in 1..=3 {
        app.clock.set(start + Duration::milliseconds(2_000 * k));
        assert_eq!(app.worker.process_due_jobs().await?, 1);
    }
    assert_eq!(idle_militia(&app, village.id).await?, 3);

    let uow = app.provider.begin().await?;
    let first = uow.training_tasks().get_by_id(first.id).await?;
    let second = uow.training_tasks().get_by_id(second.id).await?;
    uow.rollback().await?;

    assert_eq!(first.status, TrainingStatus::Completed);
    assert_eq!(first.remaining, 0);
    assert_eq!(second.status, TrainingStatus::InProgress);
    assert_eq!(second.start_time, first.end_time, "Next task starts where the previous one ended");

    for k in 4..=5 {
        app.clock.set(start + Duration::milliseconds(2_000 * k));
        assert_eq!(app.worker.process_due_jobs().await?, 1);
    }
    assert_eq!(idle_militia(&app, village.id).await?, 5);

    app.clock.advance(Duration::minutes(1));
    assert_eq!(app.worker.process_due_jobs().await?, 0, "Queue is drained");
    Ok(())
}
