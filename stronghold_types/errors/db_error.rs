use thiserror::Error;
use uuid::Uuid;

/// Errors for db stuff.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Village with ID {0} not found")]
    VillageNotFound(Uuid),

    #[error("Building with ID {0} not found")]
    BuildingNotFound(Uuid),

    #[error("Training task with ID {0} not found")]
    TrainingTaskNotFound(Uuid),

    #[error("Battle with ID {0} not found")]
    BattleNotFound(Uuid),

    #[error("Job with ID {0} not found")]
    JobNotFound(Uuid),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),
}
