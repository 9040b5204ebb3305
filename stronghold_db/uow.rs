use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use stronghold_app::{
    events::EventBuffer,
    repository::*,
    uow::{UnitOfWork, UnitOfWorkProvider},
};
use stronghold_types::errors::{ApplicationError, DbError};

use crate::{mapping::db_error, repository::*};

#[derive(Debug, Clone)]
pub struct PostgresUnitOfWorkProvider {
    pool: PgPool,
}

impl PostgresUnitOfWorkProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UnitOfWorkProvider for PostgresUnitOfWorkProvider {
    async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Transaction start time, shared by every decision taken inside it.
        let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        Ok(Box::new(PostgresUnitOfWork {
            tx: Arc::new(Mutex::new(tx)),
            now,
            events: EventBuffer::default(),
        }))
    }
}

pub struct PostgresUnitOfWork<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
    now: DateTime<Utc>,
    events: EventBuffer,
}

#[async_trait::async_trait]
impl<'a> UnitOfWork<'a> for PostgresUnitOfWork<'a> {
    fn villages(&self) -> Arc<dyn VillageRepository + 'a> {
        Arc::new(PostgresVillageRepository::new(self.tx.clone()))
    }

    fn buildings(&self) -> Arc<dyn BuildingRepository + 'a> {
        Arc::new(PostgresBuildingRepository::new(self.tx.clone()))
    }

    fn construction_tasks(&self) -> Arc<dyn ConstructionTaskRepository + 'a> {
        Arc::new(PostgresConstructionTaskRepository::new(self.tx.clone()))
    }

    fn troops(&self) -> Arc<dyn TroopRepository + 'a> {
        Arc::new(PostgresTroopRepository::new(self.tx.clone()))
    }

    fn training_tasks(&self) -> Arc<dyn TrainingTaskRepository + 'a> {
        Arc::new(PostgresTrainingTaskRepository::new(self.tx.clone()))
    }

    fn battles(&self) -> Arc<dyn BattleRepository + 'a> {
        Arc::new(PostgresBattleRepository::new(self.tx.clone()))
    }

    fn movements(&self) -> Arc<dyn MovementRepository + 'a> {
        Arc::new(PostgresMovementRepository::new(self.tx.clone()))
    }

    fn jobs(&self) -> Arc<dyn JobRepository + 'a> {
        Arc::new(PostgresJobRepository::new(self.tx.clone()))
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn events(&self) -> &EventBuffer {
        &self.events
    }

    async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
        // Repositories handed out by this unit of work must be dropped by now,
        // otherwise the transaction has other owners and is rolled back on drop.
        if let Ok(mutex) = Arc::try_unwrap(self.tx) {
            mutex.into_inner().commit().await.map_err(db_error)?;
        } else {
            return Err(ApplicationError::Db(DbError::Transaction(
                "transaction still has multiple owners".to_string(),
            )));
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ApplicationError> {
        if let Ok(mutex) = Arc::try_unwrap(self.tx) {
            mutex.into_inner().rollback().await.map_err(db_error)?;
        }
        Ok(())
    }
}
