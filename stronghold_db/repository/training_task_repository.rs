use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, Transaction, types::Json};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use stronghold_app::repository::TrainingTaskRepository;
use stronghold_game::models::training::{TrainingStatus, TrainingTask};
use stronghold_types::{
    buildings::BuildingName,
    errors::{ApplicationError, DbError},
};

use crate::{
    mapping::{db_error, from_rows},
    models as db_models,
};

const TASK_COLUMNS: &str = "id, village_id, troop, building, count, remaining, unit_cost, unit_time_ms, status, start_time, end_time, created_at";

#[derive(Clone)]
pub struct PostgresTrainingTaskRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresTrainingTaskRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

async fn lock_task(conn: &mut PgConnection, task_id: Uuid) -> Result<TrainingTask, ApplicationError> {
    let row = sqlx::query_as::<_, db_models::TrainingTask>(&format!(
        "SELECT {TASK_COLUMNS} FROM training_tasks WHERE id = $1 FOR UPDATE"
    ))
    .bind(task_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?
    .ok_or(ApplicationError::Db(DbError::TrainingTaskNotFound(task_id)))?;

    Ok(row.try_into()?)
}

async fn save_progress(conn: &mut PgConnection, task: &TrainingTask) -> Result<(), ApplicationError> {
    sqlx::query(
        r#"
        UPDATE training_tasks
        SET remaining = $2, status = $3, start_time = $4, end_time = $5
        WHERE id = $1
        "#,
    )
    .bind(task.id)
    .bind(task.remaining as i32)
    .bind(task.status.as_str())
    .bind(task.start_time)
    .bind(task.end_time)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait::async_trait]
impl<'a> TrainingTaskRepository for PostgresTrainingTaskRepository<'a> {
    async fn create(&self, task: &TrainingTask) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(&format!(
            "INSERT INTO training_tasks ({TASK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(task.id)
        .bind(task.village_id)
        .bind(task.troop.as_str())
        .bind(task.building.as_str())
        .bind(task.count as i32)
        .bind(task.remaining as i32)
        .bind(Json(&task.unit_cost))
        .bind(task.unit_time_ms)
        .bind(task.status.as_str())
        .bind(task.start_time)
        .bind(task.end_time)
        .bind(task.created_at)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_by_id(&self, task_id: Uuid) -> Result<TrainingTask, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::TrainingTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM training_tasks WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?
        .ok_or(ApplicationError::Db(DbError::TrainingTaskNotFound(task_id)))?;

        Ok(row.try_into()?)
    }

    async fn find_in_progress(
        &self,
        village_id: Uuid,
        building: BuildingName,
    ) -> Result<Option<TrainingTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::TrainingTask>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM training_tasks
            WHERE village_id = $1 AND building = $2 AND status = $3
            "#
        ))
        .bind(village_id)
        .bind(building.as_str())
        .bind(TrainingStatus::InProgress.as_str())
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(row.map(TrainingTask::try_from).transpose()?)
    }

    async fn next_pending(
        &self,
        village_id: Uuid,
        building: BuildingName,
    ) -> Result<Option<TrainingTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let row = sqlx::query_as::<_, db_models::TrainingTask>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM training_tasks
            WHERE village_id = $1 AND building = $2 AND status = $3
            ORDER BY created_at, seq
            LIMIT 1
            "#
        ))
        .bind(village_id)
        .bind(building.as_str())
        .bind(TrainingStatus::Pending.as_str())
        .fetch_optional(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        Ok(row.map(TrainingTask::try_from).transpose()?)
    }

    async fn list_unfinished_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<TrainingTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let rows = sqlx::query_as::<_, db_models::TrainingTask>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM training_tasks
            WHERE village_id = $1 AND status IN ($2, $3)
            ORDER BY created_at, seq
            "#
        ))
        .bind(village_id)
        .bind(TrainingStatus::Pending.as_str())
        .bind(TrainingStatus::InProgress.as_str())
        .fetch_all(&mut *tx_guard.as_mut())
        .await
        .map_err(db_error)?;

        from_rows(rows)
    }

    async fn start(
        &self,
        task_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<TrainingTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut task = lock_task(conn, task_id).await?;
        if !task.start(at) {
            return Ok(None);
        }
        save_progress(conn, &task).await?;
        Ok(Some(task))
    }

    async fn record_unit(
        &self,
        task_id: Uuid,
        expected_remaining: u32,
    ) -> Result<Option<TrainingTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut task = lock_task(conn, task_id).await?;
        if !task.record_unit(expected_remaining) {
            return Ok(None);
        }
        save_progress(conn, &task).await?;
        Ok(Some(task))
    }

    async fn force_complete(&self, task_id: Uuid) -> Result<Option<u32>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut task = lock_task(conn, task_id).await?;
        let Some(granted) = task.force_complete() else {
            return Ok(None);
        };
        save_progress(conn, &task).await?;
        Ok(Some(granted))
    }

    async fn cancel(&self, task_id: Uuid) -> Result<Option<TrainingTask>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let conn = tx_guard.as_mut();
        let mut task = lock_task(conn, task_id).await?;
        let previous = task.clone();
        if task.cancel().is_err() {
            return Ok(None);
        }
        save_progress(conn, &task).await?;
        Ok(Some(previous))
    }
}
