use thiserror::Error;
use uuid::Uuid;

/// Errors for app logic.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No job handler for {0}")]
    NoJobHandler(String),

    #[error("Job {0} timed out")]
    JobTimeout(String),

    #[error("Battle {0} has not arrived yet")]
    BattleNotArrived(Uuid),

    #[error("Construction of building {0} is already being completed")]
    ConstructionInProgress(Uuid),
}
