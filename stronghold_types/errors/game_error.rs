use thiserror::Error;

use crate::{buildings::BuildingName, map::Position, troops::TroopName};

/// Errors for domain logic (game rules).
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Not enough resources")]
    NotEnoughResources,

    #[error("Building {0} not found")]
    BuildingNotFound(BuildingName),

    #[error("Building has already reached max level")]
    BuildingMaxLevelReached,

    #[error("Building {0} already has an upgrade in progress")]
    BuildingAlreadyQueued(BuildingName),

    #[error("Building {0} has no upgrade in progress")]
    BuildingNotQueued(BuildingName),

    #[error("Building requirements not met: requires {building} at level {level}")]
    BuildingRequirementsNotMet { building: BuildingName, level: u8 },

    #[error("{0} is an invalid level for {1}")]
    InvalidBuildingLevel(u8, BuildingName),

    #[error("Invalid troop type: {0}")]
    InvalidTroopType(String),

    #[error("Quantity must be greater than zero and fit in 32 bits")]
    InvalidQuantity,

    #[error("Not enough {0} available to deploy")]
    NotEnoughUnits(TroopName),

    #[error("No units selected to deploy")]
    NoUnitsSelected,

    #[error("Origin {0} does not match the attacking village")]
    InvalidOrigin(Position),

    #[error("No village found at {0}")]
    NoTargetVillage(Position),

    #[error("A village cannot attack itself")]
    CannotAttackOwnVillage,

    #[error("Task can no longer be cancelled")]
    TaskNotCancellable,

    #[error("Position {0} is already occupied")]
    PositionOccupied(Position),
}
