use async_trait::async_trait;
use tracing::{info, instrument};

use stronghold_types::errors::ApplicationError;

use crate::{
    helpers::construction::finish_building,
    jobs::{
        Job,
        handler::{JobHandler, JobHandlerContext},
        tasks::BuildingUpgradeTask,
    },
};

pub struct BuildingUpgradeJobHandler {
    payload: BuildingUpgradeTask,
}

impl BuildingUpgradeJobHandler {
    pub fn new(payload: BuildingUpgradeTask) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl JobHandler for BuildingUpgradeJobHandler {
    #[instrument(skip_all, fields(
        task_type = "BuildingUpgrade",
        building_id = %self.payload.building_id,
        name = ?self.payload.building_name,
        target_level = self.payload.target_level,
        village_id = %job.village_id,
    ))]
    async fn handle<'ctx, 'a>(
        &'ctx self,
        ctx: &'ctx JobHandlerContext<'a>,
        job: &'ctx Job,
    ) -> Result<(), ApplicationError> {
        info!("Executing BuildingUpgrade job");

        if let Some(building) = finish_building(
            &ctx.uow,
            self.payload.village_id,
            self.payload.building_id,
            self.payload.target_level,
        )
        .await?
        {
            info!(level = building.level, "Building upgraded");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::sync::Arc;

    use stronghold_types::{Result, buildings::BuildingName, common::ResourceGroup};

    use super::*;
    use crate::{
        config::Config,
        jobs::tasks::JobTask,
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, queue_upgrade, seed_village},
        uow::UnitOfWorkProvider,
    };

    #[tokio::test]
    async fn test_building_upgrade_raises_level_and_production() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let village = seed_village(&provider, &[(BuildingName::Sawmill, 1)]).await?;
        let building = queue_upgrade(&provider, village.id, BuildingName::Sawmill, 10_000).await?;

        clock.advance(Duration::seconds(10));
        let payload = BuildingUpgradeTask {
            village_id: village.id,
            building_id: building.id,
            building_name: BuildingName::Sawmill,
            target_level: 2,
        };
        let job = Job::new(
            village.id,
            JobTask::BuildingUpgrade(payload.clone()),
            &crate::helpers::construction::build_job_options(0),
            clock.now(),
        );
        let handler = BuildingUpgradeJobHandler::new(payload);
        let uow = provider.begin().await?;
        let ctx = JobHandlerContext {
            uow,
            config: Arc::new(Config::from_env()),
        };

        handler.handle(&ctx, &job).await?;
        handler.handle(&ctx, &job).await?;

        let upgraded = ctx.uow.buildings().get_by_id(building.id).await?;
        assert_eq!(upgraded.level, 2, "Level should rise exactly once");
        assert!(!upgraded.is_queued());

        let village = ctx.uow.villages().get_by_id(village.id).await?;
        assert_eq!(
            village.production,
            ResourceGroup::new(10, 11, 10, 8),
            "Sawmill level 2 adds 1 wood per second"
        );
        assert_eq!(
            ctx.uow.events().drain().len(),
            1,
            "Only the first run raises an event"
        );
        Ok(())
    }
}
