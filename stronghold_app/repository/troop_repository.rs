use uuid::Uuid;

use stronghold_game::models::troops::TroopGroup;
use stronghold_types::{
    errors::ApplicationError,
    troops::{TroopName, TroopStatus},
};

#[async_trait::async_trait]
pub trait TroopRepository: Send + Sync {
    async fn list_by_village_id(&self, village_id: Uuid)
    -> Result<Vec<TroopGroup>, ApplicationError>;

    async fn get_quantity(
        &self,
        village_id: Uuid,
        troop: TroopName,
        status: TroopStatus,
    ) -> Result<u32, ApplicationError>;

    /// Adds `quantity` to the group, creating it when missing.
    async fn increment(
        &self,
        village_id: Uuid,
        troop: TroopName,
        status: TroopStatus,
        quantity: u32,
    ) -> Result<(), ApplicationError>;

    /// Subtracts `quantity` only when the group holds at least that many.
    async fn try_decrement(
        &self,
        village_id: Uuid,
        troop: TroopName,
        status: TroopStatus,
        quantity: u32,
    ) -> Result<bool, ApplicationError>;
}
