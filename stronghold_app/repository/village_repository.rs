use chrono::{DateTime, Utc};
use uuid::Uuid;

use stronghold_game::models::village::Village;
use stronghold_types::{
    common::{ResourceGroup, ResourceKind},
    errors::ApplicationError,
    map::Position,
};

#[async_trait::async_trait]
pub trait VillageRepository: Send + Sync {
    async fn create(&self, village: &Village) -> Result<(), ApplicationError>;

    async fn get_by_id(&self, village_id: Uuid) -> Result<Village, ApplicationError>;

    async fn get_by_position(&self, position: &Position)
    -> Result<Option<Village>, ApplicationError>;

    async fn list_by_player_id(&self, player_id: Uuid) -> Result<Vec<Village>, ApplicationError>;

    /// Rolls stocks forward to `at` in a single read-modify-write and returns
    /// the updated village.
    async fn collect(&self, village_id: Uuid, at: DateTime<Utc>)
    -> Result<Village, ApplicationError>;

    /// Decrements all four counters only if every one of them covers `cost`.
    /// Returns `None` and leaves stocks untouched otherwise.
    async fn try_deduct(
        &self,
        village_id: Uuid,
        cost: &ResourceGroup,
    ) -> Result<Option<Village>, ApplicationError>;

    async fn add_resources(
        &self,
        village_id: Uuid,
        gain: &ResourceGroup,
    ) -> Result<Village, ApplicationError>;

    async fn increase_production(
        &self,
        village_id: Uuid,
        kind: ResourceKind,
        amount: u64,
    ) -> Result<(), ApplicationError>;
}
