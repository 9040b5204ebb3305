use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Village {
    pub id: Uuid,
    pub player_id: Uuid,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub stocks: serde_json::Value,
    pub production: serde_json::Value,
    pub last_collected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Building {
    pub id: Uuid,
    pub village_id: Uuid,
    pub name: String,
    pub level: i16,
    pub status: String,
    pub queued_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ConstructionTask {
    pub id: Uuid,
    pub village_id: Uuid,
    pub building_id: Uuid,
    pub building_name: String,
    pub target_level: i16,
    pub cost: serde_json::Value,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TroopGroup {
    pub village_id: Uuid,
    pub troop: String,
    pub status: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct TrainingTask {
    pub id: Uuid,
    pub village_id: Uuid,
    pub troop: String,
    pub building: String,
    pub count: i32,
    pub remaining: i32,
    pub unit_cost: serde_json::Value,
    pub unit_time_ms: i64,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Battle {
    pub id: Uuid,
    pub attacker_village_id: Uuid,
    pub defender_village_id: Uuid,
    pub origin: serde_json::Value,
    pub target: serde_json::Value,
    pub troops: serde_json::Value,
    pub start_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: String,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Movement {
    pub id: Uuid,
    pub village_id: Uuid,
    pub battle_id: Uuid,
    pub direction: String,
    pub origin: serde_json::Value,
    pub target: serde_json::Value,
    pub troops: serde_json::Value,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub arrived: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub key: String,
    pub village_id: Uuid,
    pub task: serde_json::Value,
    pub status: String,
    pub run_at: DateTime<Utc>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff: serde_json::Value,
    pub last_error: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
