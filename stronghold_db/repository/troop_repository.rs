use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::repository::TroopRepository;
use stronghold_game::models::troops::TroopGroup;
use stronghold_types::{
    errors::ApplicationError,
    troops::{TroopName, TroopStatus},
};

use crate::{
    mapping::{db_error, from_rows},
    models as db_models,
};

#[derive(Clone)]
pub struct PostgresTroopRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresTroopRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl<'a> TroopRepository for PostgresTroopRepository<'a> {
    async fn list_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<TroopGroup>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::TroopGroup>(
            "SELECT village_id, troop, status, quantity FROM troops WHERE village_id = $1 ORDER BY troop, status",
        )
        .bind(village_id)
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        from_rows(rows)
    }

    async fn get_quantity(
        &self,
        village_id: Uuid,
        troop: TroopName,
        status: TroopStatus,
    ) -> Result<u32, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM troops WHERE village_id = $1 AND troop = $2 AND status = $3",
        )
        .bind(village_id)
        .bind(troop.as_str())
        .bind(status.as_str())
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(quantity.unwrap_or(0).max(0) as u32)
    }

    async fn increment(
        &self,
        village_id: Uuid,
        troop: TroopName,
        status: TroopStatus,
        quantity: u32,
    ) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(
            r#"
            INSERT INTO troops (village_id, troop, status, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (village_id, troop, status)
            DO UPDATE SET quantity = troops.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(village_id)
        .bind(troop.as_str())
        .bind(status.as_str())
        .bind(quantity as i32)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn try_decrement(
        &self,
        village_id: Uuid,
        troop: TroopName,
        status: TroopStatus,
        quantity: u32,
    ) -> Result<bool, ApplicationError> {
        if quantity == 0 {
            return Ok(true);
        }
        let mut tx_guard = self.tx.lock().await;
        let result = sqlx::query(
            r#"
            UPDATE troops SET quantity = quantity - $4
            WHERE village_id = $1 AND troop = $2 AND status = $3 AND quantity >= $4
            "#,
        )
        .bind(village_id)
        .bind(troop.as_str())
        .bind(status.as_str())
        .bind(quantity as i32)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
