use serde::de::DeserializeOwned;
use std::{fmt::Display, str::FromStr};

use stronghold_app::jobs::{Job, JobKey};
use stronghold_game::models as game_models;
use stronghold_types::{
    errors::{ApplicationError, DbError},
    map::Position,
};

use crate::models as db_models;

/// Maps a driver error, flagging serialization failures and deadlocks as
/// conflicts so callers can retry the whole transaction.
pub fn db_error(err: sqlx::Error) -> ApplicationError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) {
            return ApplicationError::Db(DbError::Conflict(db_err.message().to_string()));
        }
    }
    ApplicationError::Db(DbError::Database(err))
}

/// True for unique constraint violations on `constraint`.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

fn parse<T>(value: &str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse::<T>()
        .map_err(|e| DbError::InvalidData(e.to_string()))
}

fn json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::InvalidData(e.to_string()))
}

fn unsigned<T: TryFrom<i64>>(value: i64, column: &str) -> Result<T, DbError> {
    T::try_from(value).map_err(|_| DbError::InvalidData(format!("{column} out of range: {value}")))
}

impl TryFrom<db_models::Village> for game_models::village::Village {
    type Error = DbError;

    fn try_from(village: db_models::Village) -> Result<Self, Self::Error> {
        Ok(Self {
            id: village.id,
            player_id: village.player_id,
            name: village.name,
            position: Position::new(village.x, village.y),
            stocks: json(village.stocks)?,
            production: json(village.production)?,
            last_collected_at: village.last_collected_at,
            created_at: village.created_at,
        })
    }
}

impl TryFrom<db_models::Building> for game_models::building::Building {
    type Error = DbError;

    fn try_from(building: db_models::Building) -> Result<Self, Self::Error> {
        Ok(Self {
            id: building.id,
            village_id: building.village_id,
            name: parse(&building.name)?,
            level: unsigned(building.level.into(), "level")?,
            status: parse(&building.status)?,
            queued_until: building.queued_until,
        })
    }
}

impl TryFrom<db_models::ConstructionTask> for game_models::construction::ConstructionTask {
    type Error = DbError;

    fn try_from(task: db_models::ConstructionTask) -> Result<Self, Self::Error> {
        Ok(Self {
            id: task.id,
            village_id: task.village_id,
            building_id: task.building_id,
            building_name: parse(&task.building_name)?,
            target_level: unsigned(task.target_level.into(), "target_level")?,
            cost: json(task.cost)?,
            status: parse(&task.status)?,
            start_time: task.start_time,
            end_time: task.end_time,
        })
    }
}

impl TryFrom<db_models::TroopGroup> for game_models::troops::TroopGroup {
    type Error = DbError;

    fn try_from(group: db_models::TroopGroup) -> Result<Self, Self::Error> {
        Ok(Self {
            village_id: group.village_id,
            troop: parse(&group.troop)?,
            status: parse(&group.status)?,
            quantity: unsigned(group.quantity.into(), "quantity")?,
        })
    }
}

impl TryFrom<db_models::TrainingTask> for game_models::training::TrainingTask {
    type Error = DbError;

    fn try_from(task: db_models::TrainingTask) -> Result<Self, Self::Error> {
        Ok(Self {
            id: task.id,
            village_id: task.village_id,
            troop: parse(&task.troop)?,
            building: parse(&task.building)?,
            count: unsigned(task.count.into(), "count")?,
            remaining: unsigned(task.remaining.into(), "remaining")?,
            unit_cost: json(task.unit_cost)?,
            unit_time_ms: task.unit_time_ms,
            status: parse(&task.status)?,
            start_time: task.start_time,
            end_time: task.end_time,
            created_at: task.created_at,
        })
    }
}

impl TryFrom<db_models::Battle> for game_models::battle::Battle {
    type Error = DbError;

    fn try_from(battle: db_models::Battle) -> Result<Self, Self::Error> {
        Ok(Self {
            id: battle.id,
            attacker_village_id: battle.attacker_village_id,
            defender_village_id: battle.defender_village_id,
            origin: json(battle.origin)?,
            target: json(battle.target)?,
            troops: json(battle.troops)?,
            start_time: battle.start_time,
            arrival_time: battle.arrival_time,
            status: parse(&battle.status)?,
            resolved_at: battle.resolved_at,
        })
    }
}

impl TryFrom<db_models::Movement> for game_models::movement::ArmyMovement {
    type Error = DbError;

    fn try_from(movement: db_models::Movement) -> Result<Self, Self::Error> {
        Ok(Self {
            id: movement.id,
            village_id: movement.village_id,
            battle_id: movement.battle_id,
            direction: parse(&movement.direction)?,
            origin: json(movement.origin)?,
            target: json(movement.target)?,
            troops: json(movement.troops)?,
            departure_time: movement.departure_time,
            arrival_time: movement.arrival_time,
            arrived: movement.arrived,
        })
    }
}

impl TryFrom<db_models::Job> for Job {
    type Error = DbError;

    fn try_from(job: db_models::Job) -> Result<Self, Self::Error> {
        Ok(Self {
            id: job.id,
            key: JobKey::from(job.key),
            village_id: job.village_id,
            task: json(job.task)?,
            status: parse(&job.status)?,
            run_at: job.run_at,
            attempts: unsigned(job.attempts.into(), "attempts")?,
            max_attempts: unsigned(job.max_attempts.into(), "max_attempts")?,
            backoff: json(job.backoff)?,
            last_error: job.last_error,
            locked_until: job.locked_until,
            finished_at: job.finished_at,
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }
}

/// Converts a batch of rows, failing on the first malformed one.
pub fn from_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, ApplicationError>
where
    T: TryFrom<R, Error = DbError>,
{
    rows.into_iter()
        .map(|row| T::try_from(row).map_err(ApplicationError::Db))
        .collect()
}
