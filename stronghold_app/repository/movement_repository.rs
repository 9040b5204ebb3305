use uuid::Uuid;

use stronghold_game::models::movement::ArmyMovement;
use stronghold_types::errors::ApplicationError;

#[async_trait::async_trait]
pub trait MovementRepository: Send + Sync {
    async fn create(&self, movement: &ArmyMovement) -> Result<(), ApplicationError>;

    async fn list_active_by_village_id(
        &self,
        village_id: Uuid,
    ) -> Result<Vec<ArmyMovement>, ApplicationError>;

    async fn mark_arrived_for_battle(&self, battle_id: Uuid) -> Result<u64, ApplicationError>;
}
