use async_trait::async_trait;
use std::sync::Arc;

use stronghold_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{Query, QueryHandler, queries::ListPlayerVillages},
    uow::UnitOfWork,
};

pub struct ListPlayerVillagesHandler {}

impl ListPlayerVillagesHandler {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl QueryHandler<ListPlayerVillages> for ListPlayerVillagesHandler {
    async fn handle(
        &self,
        query: ListPlayerVillages,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        _config: &Arc<Config>,
    ) -> Result<<ListPlayerVillages as Query>::Output, ApplicationError> {
        uow.villages().list_by_player_id(query.player_id).await
    }
}
