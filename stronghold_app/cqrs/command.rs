use async_trait::async_trait;
use std::sync::Arc;

use stronghold_types::errors::ApplicationError;

use crate::{config::Config, uow::UnitOfWork};

/// Commands are operations that change the state of the system.
pub trait Command: Send + Sync {
    /// What the caller gets back once the command is committed.
    type Output: Send + Sync;
}

/// A trait for handlers that execute Commands.
/// It receives the command and a Unit of Work (&Box<dyn UnitOfWork...>) to use.
/// It should NOT manage the transaction lifecycle (commit/rollback);
/// that is the job of the AppBus.
#[async_trait]
pub trait CommandHandler<C: Command> {
    async fn handle(
        &self,
        cmd: C,
        uow: &Box<dyn UnitOfWork<'_> + '_>,
        config: &Arc<Config>,
    ) -> Result<C::Output, ApplicationError>;
}
