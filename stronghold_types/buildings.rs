use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum BuildingGroup {
    Resources,
    Infrastructure,
    Military,
    Special,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum BuildingName {
    Sawmill,
    ClayPit,
    IronMine,
    Farm,
    Warehouse,
    Granary,
    Market,
    Barracks,
    Stable,
    Workshop,
    Wall,
    Tower,
    Smithy,
    Embassy,
    Academy,
    Shrine,
}

impl BuildingName {
    pub const ALL: [BuildingName; 16] = [
        BuildingName::Sawmill,
        BuildingName::ClayPit,
        BuildingName::IronMine,
        BuildingName::Farm,
        BuildingName::Warehouse,
        BuildingName::Granary,
        BuildingName::Market,
        BuildingName::Barracks,
        BuildingName::Stable,
        BuildingName::Workshop,
        BuildingName::Wall,
        BuildingName::Tower,
        BuildingName::Smithy,
        BuildingName::Embassy,
        BuildingName::Academy,
        BuildingName::Shrine,
    ];

    pub fn group(&self) -> BuildingGroup {
        match self {
            BuildingName::Sawmill
            | BuildingName::ClayPit
            | BuildingName::IronMine
            | BuildingName::Farm => BuildingGroup::Resources,
            BuildingName::Warehouse | BuildingName::Granary | BuildingName::Market => {
                BuildingGroup::Infrastructure
            }
            BuildingName::Barracks
            | BuildingName::Stable
            | BuildingName::Workshop
            | BuildingName::Wall
            | BuildingName::Tower
            | BuildingName::Smithy => BuildingGroup::Military,
            BuildingName::Embassy | BuildingName::Academy | BuildingName::Shrine => {
                BuildingGroup::Special
            }
        }
    }

    /// Stable identifier used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingName::Sawmill => "Sawmill",
            BuildingName::ClayPit => "ClayPit",
            BuildingName::IronMine => "IronMine",
            BuildingName::Farm => "Farm",
            BuildingName::Warehouse => "Warehouse",
            BuildingName::Granary => "Granary",
            BuildingName::Market => "Market",
            BuildingName::Barracks => "Barracks",
            BuildingName::Stable => "Stable",
            BuildingName::Workshop => "Workshop",
            BuildingName::Wall => "Wall",
            BuildingName::Tower => "Tower",
            BuildingName::Smithy => "Smithy",
            BuildingName::Embassy => "Embassy",
            BuildingName::Academy => "Academy",
            BuildingName::Shrine => "Shrine",
        }
    }
}

impl FromStr for BuildingName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildingName::ALL
            .iter()
            .find(|name| name.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown building {s}"))
    }
}

impl fmt::Display for BuildingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildingName::Sawmill => "Sawmill",
            BuildingName::ClayPit => "Clay Pit",
            BuildingName::IronMine => "Iron Mine",
            BuildingName::Farm => "Farm",
            BuildingName::Warehouse => "Warehouse",
            BuildingName::Granary => "Granary",
            BuildingName::Market => "Market",
            BuildingName::Barracks => "Barracks",
            BuildingName::Stable => "Stable",
            BuildingName::Workshop => "Workshop",
            BuildingName::Wall => "Wall",
            BuildingName::Tower => "Tower",
            BuildingName::Smithy => "Smithy",
            BuildingName::Embassy => "Embassy",
            BuildingName::Academy => "Academy",
            BuildingName::Shrine => "Shrine",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum BuildingStatus {
    Idle,
    Queued,
}

impl BuildingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingStatus::Idle => "idle",
            BuildingStatus::Queued => "queued",
        }
    }
}

impl FromStr for BuildingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(BuildingStatus::Idle),
            "queued" => Ok(BuildingStatus::Queued),
            other => Err(format!("unknown building status {other}")),
        }
    }
}
