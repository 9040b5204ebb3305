use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::repository::BuildingRepository;
use stronghold_game::models::building::Building;
use stronghold_types::{
    buildings::BuildingName,
    errors::{ApplicationError, DbError},
};

use crate::{
    mapping::{db_error, from_rows},
    models as db_models,
};

const BUILDING_COLUMNS: &str = "id, village_id, name, level, status, queued_until";

#[derive(Clone)]
pub struct PostgresBuildingRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresBuildingRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

async fn lock_building(
    conn: &mut PgConnection,
    building_id: Uuid,
) -> Result<Building, ApplicationError> {
    let row = sqlx::query_as::<_, db_models::Building>(&format!(
        "SELECT {BUILDING_COLUMNS} FROM buildings WHERE id = $1 FOR UPDATE"
    ))
    .bind(building_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?
    .ok_or(ApplicationError::Db(DbError::BuildingNotFound(building_id)))?;

    Ok(row.try_into()?)
}

async fn save_building(conn: &mut PgConnection, building: &Building) -> Result<(), ApplicationError> {
    sqlx::query("UPDATE buildings SET level = $2, status = $3, queued_until = $4 WHERE id = $1")
        .bind(building.id)
        .bind(i16::from(building.level))
        .bind(building.status.as_str())
        .bind(building.queued_until)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

#[async_trait::async_trait]
impl<'a> BuildingRepository for PostgresBuildingRepository<'a> {
    async fn create_many(&self, buildings: &[Building]) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        for building in buildings {
            sqlx::query(
                r#"
                INSERT INTO buildings (id, village_id, name, level, status, queued_until)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(building.id)
            .bind(building.village_id)
            .bind(building.name.as_str())
            .bind(i16::from(building.level))
            .bind(building.status.as_str())
            .bind(building.queued_until)
            .execute(&mut *tx_guard.as_mut())
            .await
            .map_err(db_error)?;
        }
        Ok(())
    }

    async fn get_by_id(&self, building_id: Uuid) -> Result<Building, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Building>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings WHERE id = $1"
        ))
        .bind(building_id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?
        .ok_or(ApplicationError::Db(DbError::BuildingNotFound(building_id)))?;

        Ok(row.try_into()?)
    }

    async fn get_by_name(
        &self,
        village_id: Uuid,
        name: BuildingName,
    ) -> Result<Option<Building>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Building>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings WHERE village_id = $1 AND name = $2"
        ))
        .bind(village_id)
        .bind(name.as_str())
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(row.map(Building::try_from).transpose()?)
    }

    async fn list_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<Building>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::Building>(&format!(
            "SELECT {BUILDING_COLUMNS} FROM buildings WHERE village_id = $1"
        ))
        .bind(village_id)
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        let mut buildings: Vec<Building> = from_rows(rows)?;
        buildings.sort_by_key(|b| b.name);
        Ok(buildings)
    }

    async fn mark_queued(
        &self,
        building_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut building = lock_building(conn, building_id).await?;
        if building.start_upgrade(until).is_err() {
            return Ok(false);
        }
        save_building(conn, &building).await?;
        Ok(true)
    }

    async fn complete_upgrade(
        &self,
        building_id: Uuid,
        target_level: u8,
    ) -> Result<Option<Building>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut building = lock_building(conn, building_id).await?;
        if !building.complete_upgrade(target_level) {
            return Ok(None);
        }
        save_building(conn, &building).await?;
        Ok(Some(building))
    }

    async fn cancel_upgrade(
        &self,
        building_id: Uuid,
        target_level: u8,
    ) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut building = lock_building(conn, building_id).await?;
        if !building.cancel_upgrade(target_level) {
            return Ok(false);
        }
        save_building(conn, &building).await?;
        Ok(true)
    }
}
