
use tokio::sync::broadcast::Receiver;

use stronghold_app::{
    command_handlers::{RefreshVillageStateCommandHandler, UpgradeBuildingCommandHandler},
    cqrs::{
        commands::{RefreshVillageState, UpgradeBuilding},
        queries::GetJobStatus,
    },
    events::PublishedEvent,
    jobs::{JobKey, JobState},
    queries_handlers::GetJobStatusHandler,
    test_utils::tests::seed_village,
    uow::UnitOfWorkProvider,
};
use stronghold_game::models::village::{STARTING_PRODUCTION, STARTING_STOCKS};
use stronghold_types::{
    Result,
    buildings::{BuildingName, BuildingStatus},
};

use test_utils::tests::setup_app;

fn drain_event_names(rx: &mut Receiver<PublishedEvent>) -> Vec<String> {
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.event);
    }
    names
}

#[tokio::test]
async fn test_full_build_flow() -> Result<()> {
    let app = setup_app(1);
    let mut events = app.publisher.subscribe();
    let village = seed_village(&app.provider, &[(BuildingName::Sawmill, 1)]).await?;

    let task = app
        .bus
        .execute(
            UpgradeBuilding {
                village_id: village.id,
                building: BuildingName::Sawmill,
            },
            UpgradeBuildingCommandHandler::new(),
        )
        .await?;
    assert_eq!(task.target_level, 2);

    let key = JobKey::building(task.building_id, 2);
    let state = app
        .bus
        .query(GetJobStatus { key: key.clone() }, GetJobStatusHandler::new())
        .await?;
    assert_eq!(state, JobState::Delayed);

    {
        let uow = app.provider.begin().await?;
        let stored = uow.villages().get_by_id(village.id).await?;
        assert_eq!(
            Some(stored.stocks),
            STARTING_STOCKS.checked_sub(&task.cost),
            "Upgrade cost should be deducted up front"
        );
        let building = uow.buildings().get_by_id(task.building_id).await?;
        assert_eq!(building.level, 1, "Level must not change before the upgrade ends");
        assert_eq!(building.status, BuildingStatus::Queued);
        uow.rollback().await?;
    }

    assert_eq!(app.worker.process_due_jobs().await?, 0, "Job is not due yet");

    app.clock.set(task.end_time);
    assert_eq!(app.worker.process_due_jobs().await?, 1);

    {
        let uow = app.provider.begin().await?;
        let building = uow.buildings().get_by_id(task.building_id).await?;
        assert_eq!(building.level, 2);
        assert_eq!(building.status, BuildingStatus::Idle);

        let stored = uow.villages().get_by_id(village.id).await?;
        assert!(
            stored.production.wood() > STARTING_PRODUCTION.wood(),
            "Sawmill should raise wood production"
        );
        uow.rollback().await?;
    }

    let state = app
        .bus
        .query(GetJobStatus { key }, GetJobStatusHandler::new())
        .await?;
    assert_eq!(state, JobState::Completed);

    let names = drain_event_names(&mut events);
    assert!(names.contains(&"building.upgrade_started".to_string()));
    assert!(names.contains(&"building.upgraded".to_string()));

    // A later reconciliation finds nothing left to apply.
    let details = app
        .bus
        .execute(
            RefreshVillageState {
                village_id: village.id,
            },
            RefreshVillageStateCommandHandler::new(),
        )
        .await?;
    let sawmill = details
        .buildings
        .iter()
        .find(|b| b.name == BuildingName::Sawmill)
        .map(|b| b.level);
    assert_eq!(sawmill, Some(2));
    assert!(details.construction_tasks.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_reconciler_finishes_overdue_upgrade_before_worker() -> Result<()> {
    let app = setup_app(1);
    let village = seed_village(&app.provider, &[(BuildingName::Farm, 1)]).await?;

    let task = app
        .bus
        .execute(
            UpgradeBuilding {
                village_id: village.id,
                building: BuildingName::Farm,
            },
            UpgradeBuildingCommandHandler::new(),
        )
        .await?;

    app.clock.set(task.end_time + chrono::Duration::seconds(30));
    let details = app
        .bus
        .execute(
            RefreshVillageState {
                village_id: village.id,
            },
            RefreshVillageStateCommandHandler::new(),
        )
        .await?;

    let farm = details
        .buildings
        .iter()
        .find(|b| b.name == BuildingName::Farm)
        .cloned();
    assert_eq!(farm.map(|b| b.level), Some(2));
    assert!(details.village.production.food() > STARTING_PRODUCTION.food());

    // The completion job was dropped, the upgrade is never applied twice.
    assert_eq!(app.worker.process_due_jobs().await?, 0);
    let state = app
        .bus
        .query(
            GetJobStatus {
                key: JobKey::building(task.building_id, 2),
            },
            GetJobStatusHandler::new(),
        )
        .await?;
    assert_eq!(state, JobState::Absent);
    Ok(())
}
