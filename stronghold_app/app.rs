use std::sync::Arc;
use tracing::warn;

use stronghold_types::errors::ApplicationError;

use crate::{
    config::Config,
    cqrs::{Command, CommandHandler, Query, QueryHandler},
    events::{EventPublisher, publish_events},
    uow::UnitOfWorkProvider,
};

/// AppBus (Mediator)
/// This struct is the central entry point for all application logic.
/// It does not contain any business logic itself.
/// Its primary roles are:
/// 1. Managing Unit of Work (transaction) lifecycles.
/// 2. Dispatching Commands and Queries to their respective handlers.
/// 3. Publishing the events of committed commands.
pub struct AppBus {
    config: Arc<Config>,
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    publisher: Arc<dyn EventPublisher>,
}

impl AppBus {
    pub fn new(
        config: Arc<Config>,
        uow_provider: Arc<dyn UnitOfWorkProvider>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            config,
            uow_provider,
            publisher,
        }
    }

    /// Executes a command.
    /// A command is an operation that modifies the system state.
    /// This method manages the transaction:
    /// - It begins a Unit of Work.
    /// - It passes the UoW to the handler.
    /// - If the handler succeeds, it commits the UoW and publishes its events.
    /// - If the handler fails, it rolls back the UoW.
    ///
    /// Store conflicts re-run the whole command, up to `tx_retries` times.
    pub async fn execute<C, H>(&self, cmd: C, handler: H) -> Result<C::Output, ApplicationError>
    where
        C: Command + Clone,
        H: CommandHandler<C>,
    {
        let mut attempt = 0;
        loop {
            match self.try_execute(cmd.clone(), &handler).await {
                Err(e) if e.is_conflict() && attempt < self.config.tx_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Transaction conflict, retrying command");
                }
                result => return result,
            }
        }
    }

    async fn try_execute<C, H>(&self, cmd: C, handler: &H) -> Result<C::Output, ApplicationError>
    where
        C: Command,
        H: CommandHandler<C>,
    {
        let uow = self.uow_provider.begin().await?;

        match handler.handle(cmd, &uow, &self.config).await {
            Ok(output) => {
                let events = uow.events().drain();
                uow.commit().await?; // Commit on success
                publish_events(self.publisher.as_ref(), events);
                Ok(output)
            }
            Err(e) => {
                uow.rollback().await?; // Rollback on failure
                Err(e)
            }
        }
    }

    /// Executes a query.
    /// A query is an operation that reads system state and returns data.
    /// It should *never* modify the state.
    /// This method ensures the transaction is *always* rolled back.
    pub async fn query<Q, H>(&self, query: Q, handler: H) -> Result<Q::Output, ApplicationError>
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        let uow = self.uow_provider.begin().await?;

        let result = handler.handle(query, &uow, &self.config).await;

        // Always rollback a query, as it should never write data.
        uow.rollback().await?;

        result
    }
}
