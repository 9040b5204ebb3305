use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use stronghold_types::{buildings::BuildingName, common::ResourceGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl ConstructionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructionStatus::InProgress => "in_progress",
            ConstructionStatus::Completed => "completed",
            ConstructionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ConstructionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ConstructionStatus::InProgress),
            "completed" => Ok(ConstructionStatus::Completed),
            "cancelled" => Ok(ConstructionStatus::Cancelled),
            other => Err(format!("unknown construction status {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionTask {
    pub id: Uuid,
    pub village_id: Uuid,
    pub building_id: Uuid,
    pub building_name: BuildingName,
    pub target_level: u8,
    /// Resources paid when the upgrade was accepted.
    pub cost: ResourceGroup,
    pub status: ConstructionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ConstructionTask {
    pub fn new(
        village_id: Uuid,
        building_id: Uuid,
        building_name: BuildingName,
        target_level: u8,
        cost: ResourceGroup,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            village_id,
            building_id,
            building_name,
            target_level,
            cost,
            status: ConstructionStatus::InProgress,
            start_time,
            end_time,
        }
    }

    pub fn complete(&mut self) -> bool {
        self.finish(ConstructionStatus::Completed)
    }

    pub fn cancel(&mut self) -> bool {
        self.finish(ConstructionStatus::Cancelled)
    }

    fn finish(&mut self, status: ConstructionStatus) -> bool {
        if self.status != ConstructionStatus::InProgress {
            return false;
        }
        self.status = status;
        true
    }
}
