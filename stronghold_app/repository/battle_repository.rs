use chrono::{DateTime, Utc};
use uuid::Uuid;

use stronghold_game::models::battle::Battle;
use stronghold_types::errors::ApplicationError;

#[async_trait::async_trait]
pub trait BattleRepository: Send + Sync {
    async fn create(&self, battle: &Battle) -> Result<(), ApplicationError>;

    async fn get_by_id(&self, battle_id: Uuid) -> Result<Battle, ApplicationError>;

    /// Pending to resolved, only once `arrival_time <= at`.
    async fn resolve(
        &self,
        battle_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Battle>, ApplicationError>;

    /// Pending battles with the village on either side that have arrived by `now`.
    async fn list_due_for_village(
        &self,
        village_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Battle>, ApplicationError>;
}
