use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use stronghold_types::{
    buildings::BuildingName, common::ResourceGroup, errors::GameError, troops::TroopName,
};

use crate::balance::CANCEL_REFUND_PERCENT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TrainingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Pending => "pending",
            TrainingStatus::InProgress => "in_progress",
            TrainingStatus::Completed => "completed",
            TrainingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TrainingStatus::Completed | TrainingStatus::Cancelled)
    }
}

impl FromStr for TrainingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TrainingStatus::Pending),
            "in_progress" => Ok(TrainingStatus::InProgress),
            "completed" => Ok(TrainingStatus::Completed),
            "cancelled" => Ok(TrainingStatus::Cancelled),
            other => Err(format!("unknown training status {other}")),
        }
    }
}

/// A batch of units queued in a (village, building) slot.
///
/// Units come out one at a time: unit `k` (1-based) is due at
/// `start_time + k * unit_time_ms`, regardless of when the previous one was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTask {
    pub id: Uuid,
    pub village_id: Uuid,
    pub troop: TroopName,
    pub building: BuildingName,
    pub count: u32,
    pub remaining: u32,
    /// Per-unit cost at the time the batch was paid for.
    pub unit_cost: ResourceGroup,
    pub unit_time_ms: i64,
    pub status: TrainingStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TrainingTask {
    pub fn new(
        village_id: Uuid,
        troop: TroopName,
        building: BuildingName,
        count: u32,
        unit_cost: ResourceGroup,
        unit_time_ms: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            village_id,
            troop,
            building,
            count,
            remaining: count,
            unit_cost,
            unit_time_ms,
            status: TrainingStatus::Pending,
            start_time: None,
            end_time: None,
            created_at,
        }
    }

    pub fn units_trained(&self) -> u32 {
        self.count - self.remaining
    }

    pub fn total_cost(&self) -> ResourceGroup {
        self.unit_cost * self.count as u64
    }

    /// Moves a pending task in progress, starting at `at`.
    pub fn start(&mut self, at: DateTime<Utc>) -> bool {
        if self.status != TrainingStatus::Pending {
            return false;
        }
        self.status = TrainingStatus::InProgress;
        self.start_time = Some(at);
        self.end_time = Some(at + Duration::milliseconds(self.unit_time_ms * self.count as i64));
        true
    }

    /// When the next unit comes out, if the task is running.
    pub fn next_unit_due_at(&self) -> Option<DateTime<Utc>> {
        if self.status != TrainingStatus::InProgress || self.remaining == 0 {
            return None;
        }
        let start = self.start_time?;
        let next = (self.units_trained() + 1) as i64;
        Some(start + Duration::milliseconds(self.unit_time_ms * next))
    }

    /// Delivers one unit. Only applies when the task is running and `remaining`
    /// still equals the value the delivery was scheduled for.
    pub fn record_unit(&mut self, expected_remaining: u32) -> bool {
        if self.status != TrainingStatus::InProgress
            || self.remaining == 0
            || self.remaining != expected_remaining
        {
            return false;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.status = TrainingStatus::Completed;
        }
        true
    }

    /// Delivers every remaining unit at once, returning how many were granted.
    pub fn force_complete(&mut self) -> Option<u32> {
        if self.status != TrainingStatus::InProgress {
            return None;
        }
        let granted = self.remaining;
        self.remaining = 0;
        self.status = TrainingStatus::Completed;
        Some(granted)
    }

    pub fn cancel(&mut self) -> Result<(), GameError> {
        if self.status.is_finished() {
            return Err(GameError::TaskNotCancellable);
        }
        self.status = TrainingStatus::Cancelled;
        Ok(())
    }

    /// Resources returned for the units not yet trained.
    pub fn refund(&self) -> ResourceGroup {
        (self.unit_cost * self.remaining as u64).percent(CANCEL_REFUND_PERCENT)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TrainingStatus::InProgress && self.end_time.is_some_and(|end| end <= now)
    }
}
