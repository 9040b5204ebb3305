use chrono::{DateTime, Utc};
use uuid::Uuid;

use stronghold_game::models::building::Building;
use stronghold_types::{buildings::BuildingName, errors::ApplicationError};

#[async_trait::async_trait]
pub trait BuildingRepository: Send + Sync {
    async fn create_many(&self, buildings: &[Building]) -> Result<(), ApplicationError>;

    async fn get_by_id(&self, building_id: Uuid) -> Result<Building, ApplicationError>;

    async fn get_by_name(
        &self,
        village_id: Uuid,
        name: BuildingName,
    ) -> Result<Option<Building>, ApplicationError>;

    async fn list_by_village_id(&self, village_id: Uuid)
    -> Result<Vec<Building>, ApplicationError>;

    /// Moves an idle building to queued. Returns false if it was already queued.
    async fn mark_queued(
        &self,
        building_id: Uuid,
        until: DateTime<Utc>,
    ) -> Result<bool, ApplicationError>;

    /// Raises the level to `target_level` if the building is queued one level below it.
    async fn complete_upgrade(
        &self,
        building_id: Uuid,
        target_level: u8,
    ) -> Result<Option<Building>, ApplicationError>;

    async fn cancel_upgrade(
        &self,
        building_id: Uuid,
        target_level: u8,
    ) -> Result<bool, ApplicationError>;
}
