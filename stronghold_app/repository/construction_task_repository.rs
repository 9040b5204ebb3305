use uuid::Uuid;

use stronghold_game::models::construction::ConstructionTask;
use stronghold_types::errors::ApplicationError;

#[async_trait::async_trait]
pub trait ConstructionTaskRepository: Send + Sync {
    async fn create(&self, task: &ConstructionTask) -> Result<(), ApplicationError>;

    async fn get_in_progress(
        &self,
        building_id: Uuid,
    ) -> Result<Option<ConstructionTask>, ApplicationError>;

    async fn list_in_progress_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<ConstructionTask>, ApplicationError>;

    /// Marks the in-progress task for `target_level` completed.
    async fn complete(&self, building_id: Uuid, target_level: u8)
    -> Result<bool, ApplicationError>;

    /// Marks the in-progress task for `target_level` cancelled and returns it.
    async fn cancel(
        &self,
        building_id: Uuid,
        target_level: u8,
    ) -> Result<Option<ConstructionTask>, ApplicationError>;
}
