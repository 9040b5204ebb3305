use async_trait::async_trait;
use std::sync::Arc;

use stronghold_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{Query, QueryHandler, queries::GetJobStatus},
    jobs::scheduler,
    uow::UnitOfWork,
};

pub struct GetJobStatusHandler {}

impl GetJobStatusHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl QueryHandler<GetJobStatus> for GetJobStatusHandler {
    async fn handle(
        &self,
        query: GetJobStatus,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<<GetJobStatus as Query>::Output, ApplicationError> {
        scheduler::status(uow, &query.key).await
    }
}
