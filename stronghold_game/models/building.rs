use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stronghold_types::{
    buildings::{BuildingName, BuildingStatus},
    errors::GameError,
};

use crate::balance::{UpgradeCost, building_spec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,
    pub village_id: Uuid,
    pub name: BuildingName,
    pub level: u8,
    pub status: BuildingStatus,
    pub queued_until: Option<DateTime<Utc>>,
}

impl Building {
    pub fn new(village_id: Uuid, name: BuildingName) -> Self {
        Self {
            id: Uuid::new_v4(),
            village_id,
            name,
            level: 0,
            status: BuildingStatus::Idle,
            queued_until: None,
        }
    }

    pub fn max_level(&self) -> u8 {
        building_spec(&self.name).max_level
    }

    pub fn is_queued(&self) -> bool {
        self.status == BuildingStatus::Queued
    }

    /// Target level and cost of the next upgrade.
    pub fn next_upgrade(&self) -> Result<(u8, UpgradeCost), GameError> {
        if self.is_queued() {
            return Err(GameError::BuildingAlreadyQueued(self.name));
        }
        let cost = building_spec(&self.name).upgrade_cost(self.level)?;
        Ok((self.level + 1, cost))
    }

    pub fn start_upgrade(&mut self, until: DateTime<Utc>) -> Result<(), GameError> {
        if self.is_queued() {
            return Err(GameError::BuildingAlreadyQueued(self.name));
        }
        self.status = BuildingStatus::Queued;
        self.queued_until = Some(until);
        Ok(())
    }

    /// Applies a finished upgrade. Returns false when the upgrade to `target_level`
    /// was already applied or is no longer queued.
    pub fn complete_upgrade(&mut self, target_level: u8) -> bool {
        if !self.is_queued() || self.level + 1 != target_level {
            return false;
        }
        self.level = target_level;
        self.status = BuildingStatus::Idle;
        self.queued_until = None;
        true
    }

    pub fn cancel_upgrade(&mut self, target_level: u8) -> bool {
        if !self.is_queued() || self.level + 1 != target_level {
            return false;
        }
        self.status = BuildingStatus::Idle;
        self.queued_until = None;
        true
    }

    pub fn is_upgrade_due(&self, now: DateTime<Utc>) -> bool {
        self.is_queued() && self.queued_until.is_some_and(|until| until <= now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_upgrade_lifecycle() {
        let now = Utc::now();
        let mut b = Building::new(Uuid::new_v4(), BuildingName::Sawmill);

        let (target, cost) = b.next_upgrade().unwrap();
        assert_eq!(target, 1);
        assert_eq!(cost.time_secs, 60);

        b.start_upgrade(now + Duration::seconds(60)).unwrap();
        assert!(b.is_queued());
        assert!(!b.is_upgrade_due(now));
        assert!(b.is_upgrade_due(now + Duration::seconds(60)));
        assert!(matches!(
            b.next_upgrade(),
            Err(GameError::BuildingAlreadyQueued(BuildingName::Sawmill))
        ));

        assert!(b.complete_upgrade(1));
        assert_eq!(b.level, 1);
        assert_eq!(b.status, BuildingStatus::Idle);
        assert_eq!(b.queued_until, None);

        assert!(!b.complete_upgrade(1), "second completion must be a no-op");
        assert_eq!(b.level, 1);
    }

    #[test]
    fn test_cancel_upgrade_keeps_level() {
        let mut b = Building::new(Uuid::new_v4(), BuildingName::Farm);
        b.start_upgrade(Utc::now()).unwrap();

        assert!(!b.cancel_upgrade(2));
        assert!(b.cancel_upgrade(1));
        assert_eq!(b.level, 0);
        assert!(!b.complete_upgrade(1), "cancelled upgrade must not complete");
    }

    #[test]
    fn test_max_level() {
        let mut b = Building::new(Uuid::new_v4(), BuildingName::Wall);
        b.level = b.max_level();
        assert!(matches!(
            b.next_upgrade(),
            Err(GameError::BuildingMaxLevelReached)
        ));
    }
}
