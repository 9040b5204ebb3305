use stronghold_types::errors::ApplicationError;

use crate::{
    job_handlers::{
        building_upgrade::BuildingUpgradeJobHandler, resolve_battle::ResolveBattleJobHandler,
        train_unit::TrainUnitJobHandler,
    },
    jobs::{
        handler::{JobHandler, JobRegistry},
        tasks::JobTask,
    },
};

/// This is the concrete implementation of the JobRegistry trait.
/// It maps every job payload to its handler.
#[derive(Default)]
pub struct AppJobRegistry;

impl AppJobRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl JobRegistry for AppJobRegistry {
    fn get_handler(&self, task: &JobTask) -> Result<Box<dyn JobHandler>, ApplicationError> {
        match task {
            JobTask::BuildingUpgrade(payload) => {
                Ok(Box::new(BuildingUpgradeJobHandler::new(payload.clone())))
            }
            JobTask::TrainUnit(payload) => Ok(Box::new(TrainUnitJobHandler::new(payload.clone()))),
            JobTask::ResolveBattle(payload) => {
                Ok(Box::new(ResolveBattleJobHandler::new(payload.clone())))
            }
        }
    }
}
