use chrono::{DateTime, Utc};
use uuid::Uuid;

use stronghold_game::models::training::TrainingTask;
use stronghold_types::{buildings::BuildingName, errors::ApplicationError};

#[async_trait::async_trait]
pub trait TrainingTaskRepository: Send + Sync {
    async fn create(&self, task: &TrainingTask) -> Result<(), ApplicationError>;

    async fn get_by_id(&self, task_id: Uuid) -> Result<TrainingTask, ApplicationError>;

    async fn find_in_progress(
        &self,
        village_id: Uuid,
        building: BuildingName,
    ) -> Result<Option<TrainingTask>, ApplicationError>;

    /// Oldest pending task of the slot.
    async fn next_pending(
        &self,
        village_id: Uuid,
        building: BuildingName,
    ) -> Result<Option<TrainingTask>, ApplicationError>;

    /// Pending and in-progress tasks, oldest first.
    async fn list_unfinished_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<TrainingTask>, ApplicationError>;

    /// Pending to in-progress, with `end_time = at + unit_time × count`.
    async fn start(
        &self,
        task_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<TrainingTask>, ApplicationError>;

    /// Decrements `remaining` if it still equals `expected_remaining`,
    /// completing the task on the last unit.
    async fn record_unit(
        &self,
        task_id: Uuid,
        expected_remaining: u32,
    ) -> Result<Option<TrainingTask>, ApplicationError>;

    /// Completes an in-progress task at once, returning the units granted.
    async fn force_complete(&self, task_id: Uuid) -> Result<Option<u32>, ApplicationError>;

    /// Cancels a pending or in-progress task and returns it as it was before.
    async fn cancel(&self, task_id: Uuid) -> Result<Option<TrainingTask>, ApplicationError>;
}
