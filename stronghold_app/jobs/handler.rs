use async_trait::async_trait;
use std::sync::Arc;

use stronghold_types::errors::ApplicationError;

use crate::{
    config::Config,
    jobs::{Job, tasks::JobTask},
    uow::UnitOfWork,
};

/// Context which contains JobHandler dependencies.
pub struct JobHandlerContext<'a> {
    pub uow: Box<dyn UnitOfWork<'a> + 'a>,
    pub config: Arc<Config>,
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle<'ctx, 'a>(
        &'ctx self,
        ctx: &'ctx JobHandlerContext<'a>,
        job: &'ctx Job,
    ) -> Result<(), ApplicationError>;
}

/// Maps a job payload to the handler that executes it.
pub trait JobRegistry: Send + Sync {
    fn get_handler(&self, task: &JobTask) -> Result<Box<dyn JobHandler>, ApplicationError>;
}
