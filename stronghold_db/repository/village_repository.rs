use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, Transaction, types::Json};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::repository::VillageRepository;
use stronghold_game::models::village::Village;
use stronghold_types::{
    common::{ResourceGroup, ResourceKind},
    errors::{ApplicationError, DbError, GameError},
    map::Position,
};

use crate::{
    mapping::{db_error, from_rows, is_unique_violation},
    models as db_models,
};

const VILLAGE_COLUMNS: &str =
    "id, player_id, name, x, y, stocks, production, last_collected_at, created_at";

/// Implements VillageRepository and operates on transactions.
#[derive(Clone)]
pub struct PostgresVillageRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresVillageRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

/// Loads the village row and keeps it locked until the transaction ends.
async fn lock_village(conn: &mut PgConnection, village_id: Uuid) -> Result<Village, ApplicationError> {
    let row = sqlx::query_as::<_, db_models::Village>(&format!(
        "SELECT {VILLAGE_COLUMNS} FROM villages WHERE id = $1 FOR UPDATE"
    ))
    .bind(village_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?
    .ok_or(ApplicationError::Db(DbError::VillageNotFound(village_id)))?;

    Ok(row.try_into()?)
}

async fn save_economy(conn: &mut PgConnection, village: &Village) -> Result<(), ApplicationError> {
    sqlx::query(
        "UPDATE villages SET stocks = $2, production = $3, last_collected_at = $4 WHERE id = $1",
    )
    .bind(village.id)
    .bind(Json(&village.stocks))
    .bind(Json(&village.production))
    .bind(village.last_collected_at)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait::async_trait]
impl<'a> VillageRepository for PostgresVillageRepository<'a> {
    async fn create(&self, village: &Village) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(
            r#"
            INSERT INTO villages (id, player_id, name, x, y, stocks, production, last_collected_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(village.id)
        .bind(village.player_id)
        .bind(&village.name)
        .bind(village.position.x)
        .bind(village.position.y)
        .bind(Json(&village.stocks))
        .bind(Json(&village.production))
        .bind(village.last_collected_at)
        .bind(village.created_at)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "villages_position_key") {
                ApplicationError::Game(GameError::PositionOccupied(village.position))
            } else {
                db_error(e)
            }
        })?;

        Ok(())
    }

    async fn get_by_id(&self, village_id: Uuid) -> Result<Village, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Village>(&format!(
            "SELECT {VILLAGE_COLUMNS} FROM villages WHERE id = $1"
        ))
        .bind(village_id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?
        .ok_or(ApplicationError::Db(DbError::VillageNotFound(village_id)))?;

        Ok(row.try_into()?)
    }

    async fn get_by_position(
        &self,
        position: &Position,
    ) -> Result<Option<Village>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Village>(&format!(
            "SELECT {VILLAGE_COLUMNS} FROM villages WHERE x = $1 AND y = $2"
        ))
        .bind(position.x)
        .bind(position.y)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(row.map(Village::try_from).transpose()?)
    }

    async fn list_by_player_id(&self, player_id: Uuid) -> Result<Vec<Village>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::Village>(&format!(
            "SELECT {VILLAGE_COLUMNS} FROM villages WHERE player_id = $1 ORDER BY created_at"
        ))
        .bind(player_id)
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        from_rows(rows)
    }

    async fn collect(
        &self,
        village_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Village, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut village = lock_village(conn, village_id).await?;
        village.collect(at);
        save_economy(conn, &village).await?;
        Ok(village)
    }

    // Read-modify-write under the row lock taken by `lock_village`: concurrent
    // deductions on the same village wait here, so the check always sees the latest stocks.
    async fn try_deduct(
        &self,
        village_id: Uuid,
        cost: &ResourceGroup,
    ) -> Result<Option<Village>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut village = lock_village(conn, village_id).await?;
        if village.deduct_resources(cost).is_err() {
            return Ok(None);
        }
        save_economy(conn, &village).await?;
        Ok(Some(village))
    }

    async fn add_resources(
        &self,
        village_id: Uuid,
        gain: &ResourceGroup,
    ) -> Result<Village, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut village = lock_village(conn, village_id).await?;
        village.store_resources(gain);
        save_economy(conn, &village).await?;
        Ok(village)
    }

    async fn increase_production(
        &self,
        village_id: Uuid,
        kind: ResourceKind,
        amount: u64,
    ) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut village = lock_village(conn, village_id).await?;
        village.increase_production(kind, amount);
        save_economy(conn, &village).await
    }
}
