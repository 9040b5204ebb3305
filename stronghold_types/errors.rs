mod app_error;
mod db_error;
mod game_error;

pub use app_error::AppError;
pub use db_error::DbError;
pub use game_error::GameError;

use thiserror::Error;

pub type Result<T, E = ApplicationError> = std::result::Result<T, E>;

/// Top level error returned by commands, queries and job handlers.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ApplicationError {
    /// Transient failures worth another attempt: store errors, timeouts and
    /// effects that were delivered before they were due.
    /// Game rule violations are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApplicationError::Db(DbError::Database(_))
            | ApplicationError::Db(DbError::Conflict(_))
            | ApplicationError::Db(DbError::Transaction(_)) => true,
            ApplicationError::App(AppError::JobTimeout(_))
            | ApplicationError::App(AppError::BattleNotArrived(_)) => true,
            ApplicationError::Infrastructure(_) => true,
            _ => false,
        }
    }

    /// Serialization failures and deadlocks reported by the store.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApplicationError::Db(DbError::Conflict(_)))
    }
}

impl From<anyhow::Error> for ApplicationError {
    fn from(err: anyhow::Error) -> Self {
        ApplicationError::Unknown(err.to_string())
    }
}
