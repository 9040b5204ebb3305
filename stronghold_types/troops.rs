use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::errors::GameError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum TroopName {
    Militia,
    Spearman,
    Swordsman,
    Archer,
    Scout,
    Knight,
    Ram,
    Catapult,
}

impl TroopName {
    pub const ALL: [TroopName; 8] = [
        TroopName::Militia,
        TroopName::Spearman,
        TroopName::Swordsman,
        TroopName::Archer,
        TroopName::Scout,
        TroopName::Knight,
        TroopName::Ram,
        TroopName::Catapult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TroopName::Militia => "Militia",
            TroopName::Spearman => "Spearman",
            TroopName::Swordsman => "Swordsman",
            TroopName::Archer => "Archer",
            TroopName::Scout => "Scout",
            TroopName::Knight => "Knight",
            TroopName::Ram => "Ram",
            TroopName::Catapult => "Catapult",
        }
    }
}

/// Parses user supplied troop identifiers, rejecting unknown ones as a game error.
impl FromStr for TroopName {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TroopName::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| GameError::InvalidTroopType(s.to_string()))
    }
}

impl fmt::Display for TroopName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum TroopStatus {
    Idle,
    OnRoute,
}

impl TroopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TroopStatus::Idle => "idle",
            TroopStatus::OnRoute => "on_route",
        }
    }
}

impl FromStr for TroopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(TroopStatus::Idle),
            "on_route" => Ok(TroopStatus::OnRoute),
            other => Err(format!("unknown troop status {other}")),
        }
    }
}

/// A quantity of a single troop type, as committed to a movement.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub struct TroopAmount {
    pub troop: TroopName,
    pub quantity: u32,
}

impl TroopAmount {
    pub fn new(troop: TroopName, quantity: u32) -> Self {
        Self { troop, quantity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_troop_name() {
        assert_eq!("knight".parse::<TroopName>().unwrap(), TroopName::Knight);
        assert_eq!("Ram".parse::<TroopName>().unwrap(), TroopName::Ram);

        let err = "Dragon".parse::<TroopName>().unwrap_err();
        assert!(matches!(err, GameError::InvalidTroopType(ref s) if s == "Dragon"));
    }
}
