use chrono::{DateTime, Utc};
use std::sync::Arc;

use stronghold_types::errors::ApplicationError;

use crate::{events::EventBuffer, repository::*};

/// A Unit of Work (UoW) works as a provider for repositories
/// that all operate within a single transaction.
#[async_trait::async_trait]
pub trait UnitOfWork<'a>: Send + Sync {
    // Methods to access transactional repositories
    fn villages(&self) -> Arc<dyn VillageRepository + 'a>;
    fn buildings(&self) -> Arc<dyn BuildingRepository + 'a>;
    fn construction_tasks(&self) -> Arc<dyn ConstructionTaskRepository + 'a>;
    fn troops(&self) -> Arc<dyn TroopRepository + 'a>;
    fn training_tasks(&self) -> Arc<dyn TrainingTaskRepository + 'a>;
    fn battles(&self) -> Arc<dyn BattleRepository + 'a>;
    fn movements(&self) -> Arc<dyn MovementRepository + 'a>;
    fn jobs(&self) -> Arc<dyn JobRepository + 'a>;

    /// The instant this transaction started. Every time-based decision
    /// taken inside the transaction uses it.
    fn now(&self) -> DateTime<Utc>;

    /// Events raised inside the transaction, published only after commit.
    fn events(&self) -> &EventBuffer;

    // Transaction control methods
    // Consume self to ensure the UoW is not used after commit/rollback
    async fn commit(self: Box<Self>) -> Result<(), ApplicationError>;
    async fn rollback(self: Box<Self>) -> Result<(), ApplicationError>;
}

/// A factory for creating Unit of Work instances.
#[async_trait::async_trait]
pub trait UnitOfWorkProvider: Send + Sync {
    /// Begin a new Unit of Work (transaction).
    async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError>;
}
