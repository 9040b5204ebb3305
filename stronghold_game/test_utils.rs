use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use stronghold_types::{
    buildings::{BuildingName, BuildingStatus},
    common::ResourceGroup,
    map::Position,
    troops::TroopName,
};

use crate::models::{
    building::Building,
    training::TrainingTask,
    village::{STARTING_PRODUCTION, STARTING_STOCKS, Village},
};

#[derive(Default, Clone)]
pub struct VillageFactoryOptions {
    pub id: Option<Uuid>,
    pub player_id: Option<Uuid>,
    pub name: Option<String>,
    pub position: Option<Position>,
    pub stocks: Option<ResourceGroup>,
    pub production: Option<ResourceGroup>,
    pub last_collected_at: Option<DateTime<Utc>>,
}

#[derive(Default, Clone)]
pub struct BuildingFactoryOptions {
    pub village_id: Option<Uuid>,
    pub name: Option<BuildingName>,
    pub level: Option<u8>,
    pub queued_until: Option<DateTime<Utc>>,
}

#[derive(Default, Clone)]
pub struct TrainingTaskFactoryOptions {
    pub village_id: Option<Uuid>,
    pub troop: Option<TroopName>,
    pub building: Option<BuildingName>,
    pub count: Option<u32>,
    pub unit_cost: Option<ResourceGroup>,
    pub unit_time_ms: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

pub fn village_factory(options: VillageFactoryOptions) -> Village {
    let mut rng = rand::thread_rng();
    let now = options.last_collected_at.unwrap_or_else(Utc::now);
    let position = options
        .position
        .unwrap_or_else(|| Position::new(rng.gen_range(-200..200), rng.gen_range(-200..200)));
    let default_name = format!("village_{}", rng.r#gen::<u32>());

    Village {
        id: options.id.unwrap_or_else(Uuid::new_v4),
        player_id: options.player_id.unwrap_or_else(Uuid::new_v4),
        name: options.name.unwrap_or(default_name),
        position,
        stocks: options.stocks.unwrap_or(STARTING_STOCKS),
        production: options.production.unwrap_or(STARTING_PRODUCTION),
        last_collected_at: now,
        created_at: now,
    }
}

pub fn building_factory(options: BuildingFactoryOptions) -> Building {
    let mut building = Building::new(
        options.village_id.unwrap_or_else(Uuid::new_v4),
        options.name.unwrap_or(BuildingName::Sawmill),
    );
    building.level = options.level.unwrap_or(0);
    if let Some(until) = options.queued_until {
        building.status = BuildingStatus::Queued;
        building.queued_until = Some(until);
    }
    building
}

pub fn training_task_factory(options: TrainingTaskFactoryOptions) -> TrainingTask {
    TrainingTask::new(
        options.village_id.unwrap_or_else(Uuid::new_v4),
        options.troop.unwrap_or(TroopName::Militia),
        options.building.unwrap_or(BuildingName::Barracks),
        options.count.unwrap_or(5),
        options
            .unit_cost
            .unwrap_or(ResourceGroup::new(30, 20, 10, 5)),
        options.unit_time_ms.unwrap_or(2000),
        options.created_at.unwrap_or_else(Utc::now),
    )
}
