use sqlx::{Postgres, Transaction, types::Json};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::repository::MovementRepository;
use stronghold_game::models::movement::ArmyMovement;
use stronghold_types::errors::ApplicationError;

use crate::{
    mapping::{db_error, from_rows},
    models as db_models,
};

#[derive(Clone)]
pub struct PostgresMovementRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresMovementRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl<'a> MovementRepository for PostgresMovementRepository<'a> {
    async fn create(&self, movement: &ArmyMovement) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(
            r#"
            INSERT INTO movements
                (id, village_id, battle_id, direction, origin, target, troops, departure_time, arrival_time, arrived)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(movement.id)
        .bind(movement.village_id)
        .bind(movement.battle_id)
        .bind(movement.direction.as_str())
        .bind(Json(&movement.origin))
        .bind(Json(&movement.target))
        .bind(Json(&movement.troops))
        .bind(movement.departure_time)
        .bind(movement.arrival_time)
        .bind(movement.arrived)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn list_active_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<ArmyMovement>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::Movement>(
            r#"
            SELECT id, village_id, battle_id, direction, origin, target, troops,
                   departure_time, arrival_time, arrived
            FROM movements
            WHERE village_id = $1 AND NOT arrived
            ORDER BY arrival_time
            "#,
        )
        .bind(village_id)
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        from_rows(rows)
    }

    async fn mark_arrived_for_battle(&self, battle_id: Uuid) -> Result<u64, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let result =
            sqlx::query("UPDATE movements SET arrived = TRUE WHERE battle_id = $1 AND NOT arrived")
                .bind(battle_id)
                .execute(&mut *tx_guard.as_mut())
                .await
                .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}
