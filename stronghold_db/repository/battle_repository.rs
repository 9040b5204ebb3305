use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction, types::Json};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::repository::BattleRepository;
use stronghold_game::models::battle::{Battle, BattleResolution, BattleStatus};
use stronghold_types::errors::{ApplicationError, DbError};

use crate::{
    mapping::{db_error, from_rows},
    models as db_models,
};

const BATTLE_COLUMNS: &str = "id, attacker_village_id, defender_village_id, origin, target, troops, start_time, arrival_time, status, resolved_at";

#[derive(Clone)]
pub struct PostgresBattleRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresBattleRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl<'a> BattleRepository for PostgresBattleRepository<'a> {
    async fn create(&self, battle: &Battle) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(&format!(
            "INSERT INTO battles ({BATTLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(battle.id)
        .bind(battle.attacker_village_id)
        .bind(battle.defender_village_id)
        .bind(Json(&battle.origin))
        .bind(Json(&battle.target))
        .bind(Json(&battle.troops))
        .bind(battle.start_time)
        .bind(battle.arrival_time)
        .bind(battle.status.as_str())
        .bind(battle.resolved_at)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_by_id(&self, battle_id: Uuid) -> Result<Battle, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Battle>(&format!(
            "SELECT {BATTLE_COLUMNS} FROM battles WHERE id = $1"
        ))
        .bind(battle_id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?
        .ok_or(ApplicationError::Db(DbError::BattleNotFound(battle_id)))?;

        Ok(row.try_into()?)
    }

    async fn resolve(
        &self,
        battle_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Battle>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::Battle>(&format!(
            "SELECT {BATTLE_COLUMNS} FROM battles WHERE id = $1 FOR UPDATE"
        ))
        .bind(battle_id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?
        .ok_or(ApplicationError::Db(DbError::BattleNotFound(battle_id)))?;

        let mut battle = Battle::try_from(row)?;
        if battle.resolve(at) != BattleResolution::Resolved {
            return Ok(None);
        }

        sqlx::query("UPDATE battles SET status = $2, resolved_at = $3 WHERE id = $1")
            .bind(battle.id)
            .bind(battle.status.as_str())
            .bind(battle.resolved_at)
            .execute(&mut *tx_guard.as_mut())
            .await
            .map_err(db_error)?;

        Ok(Some(battle))
    }

    async fn list_due_for_village(
        &self,
        village_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Battle>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::Battle>(&format!(
            r#"
            SELECT {BATTLE_COLUMNS} FROM battles
            WHERE (attacker_village_id = $1 OR defender_village_id = $1)
              AND status = $2 AND arrival_time <= $3
            ORDER BY arrival_time
            "#
        ))
        .bind(village_id)
        .bind(BattleStatus::Pending.as_str())
        .bind(now)
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        from_rows(rows)
    }
}
