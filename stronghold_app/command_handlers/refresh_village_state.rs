use std::sync::Arc;
use tracing::{debug, instrument};

use stronghold_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{
        CommandHandler,
        commands::{RefreshVillageState, VillageDetails},
    },
    helpers::reconcile::catch_up_village,
    uow::UnitOfWork,
};

/// Catches a village up with every timer that expired, in the order the
/// timers fired, then returns its projection.
pub struct RefreshVillageStateCommandHandler {}

impl RefreshVillageStateCommandHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl CommandHandler<RefreshVillageState> for RefreshVillageStateCommandHandler {
    #[instrument(skip_all, fields(village_id = %command.village_id))]
    async fn handle(
        &self,
        command: RefreshVillageState,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<VillageDetails, ApplicationError> {
        let village_id = command.village_id;
        catch_up_village(uow, village_id).await?;

        let details = VillageDetails {
            village: uow.villages().get_by_id(village_id).await?,
            buildings: uow.buildings().list_by_village_id(village_id).await?,
            troops: uow.troops().list_by_village_id(village_id).await?,
            training_queue: uow
                .training_tasks()
                .list_unfinished_by_village_id(village_id)
                .await?,
            construction_tasks: uow
                .construction_tasks()
                .list_in_progress_by_village_id(village_id)
                .await?,
            movements: uow.movements().list_active_by_village_id(village_id).await?,
        };
        debug!(
            queued_training = details.training_queue.len(),
            movements = details.movements.len(),
            "Village state refreshed"
        );

        Ok(details)
    }
}
