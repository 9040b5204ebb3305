use sqlx::{Postgres, Transaction, types::Json};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::repository::ConstructionTaskRepository;
use stronghold_game::models::construction::{ConstructionStatus, ConstructionTask};
use stronghold_types::errors::ApplicationError;

use crate::{
    mapping::{db_error, from_rows},
    models as db_models,
};

const TASK_COLUMNS: &str =
    "id, village_id, building_id, building_name, target_level, cost, status, start_time, end_time";

#[derive(Clone)]
pub struct PostgresConstructionTaskRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresConstructionTaskRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl<'a> ConstructionTaskRepository for PostgresConstructionTaskRepository<'a> {
    async fn create(&self, task: &ConstructionTask) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(
            r#"
            INSERT INTO construction_tasks
                (id, village_id, building_id, building_name, target_level, cost, status, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(task.id)
        .bind(task.village_id)
        .bind(task.building_id)
        .bind(task.building_name.as_str())
        .bind(i16::from(task.target_level))
        .bind(Json(&task.cost))
        .bind(task.status.as_str())
        .bind(task.start_time)
        .bind(task.end_time)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_in_progress(
        &self,
        building_id: Uuid,
    ) -> Result<Option<ConstructionTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::ConstructionTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM construction_tasks WHERE building_id = $1 AND status = $2"
        ))
        .bind(building_id)
        .bind(ConstructionStatus::InProgress.as_str())
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(row.map(ConstructionTask::try_from).transpose()?)
    }

    async fn list_in_progress_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<ConstructionTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::ConstructionTask>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM construction_tasks
            WHERE village_id = $1 AND status = $2
            ORDER BY end_time
            "#
        ))
        .bind(village_id)
        .bind(ConstructionStatus::InProgress.as_str())
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        from_rows(rows)
    }

    async fn complete(
        &self,
        building_id: Uuid,
        target_level: u8,
    ) -> Result<bool, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let result = sqlx::query(
            r#"
            UPDATE construction_tasks SET status = $3
            WHERE building_id = $1 AND target_level = $2 AND status = $4
            "#,
        )
        .bind(building_id)
        .bind(i16::from(target_level))
        .bind(ConstructionStatus::Completed.as_str())
        .bind(ConstructionStatus::InProgress.as_str())
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn cancel(
        &self,
        building_id: Uuid,
        target_level: u8,
    ) -> Result<Option<ConstructionTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::ConstructionTask>(&format!(
            r#"
            UPDATE construction_tasks SET status = $3
            WHERE building_id = $1 AND target_level = $2 AND status = $4
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(building_id)
        .bind(i16::from(target_level))
        .bind(ConstructionStatus::Cancelled.as_str())
        .bind(ConstructionStatus::InProgress.as_str())
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(row.map(ConstructionTask::try_from).transpose()?)
    }
}
