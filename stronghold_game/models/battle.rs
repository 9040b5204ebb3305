use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use stronghold_types::{map::Position, troops::TroopAmount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleStatus {
    Pending,
    Resolved,
}

impl BattleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattleStatus::Pending => "pending",
            BattleStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for BattleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BattleStatus::Pending),
            "resolved" => Ok(BattleStatus::Resolved),
            other => Err(format!("unknown battle status {other}")),
        }
    }
}

/// Outcome of trying to resolve a battle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleResolution {
    Resolved,
    AlreadyResolved,
    NotArrived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: Uuid,
    pub attacker_village_id: Uuid,
    pub defender_village_id: Uuid,
    pub origin: Position,
    pub target: Position,
    pub troops: Vec<TroopAmount>,
    pub start_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub status: BattleStatus,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Battle {
    pub fn new(
        attacker_village_id: Uuid,
        defender_village_id: Uuid,
        origin: Position,
        target: Position,
        troops: Vec<TroopAmount>,
        start_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            attacker_village_id,
            defender_village_id,
            origin,
            target,
            troops,
            start_time,
            arrival_time,
            status: BattleStatus::Pending,
            resolved_at: None,
        }
    }

    pub fn resolve(&mut self, at: DateTime<Utc>) -> BattleResolution {
        if self.status == BattleStatus::Resolved {
            return BattleResolution::AlreadyResolved;
        }
        if at < self.arrival_time {
            return BattleResolution::NotArrived;
        }
        self.status = BattleStatus::Resolved;
        self.resolved_at = Some(at);
        BattleResolution::Resolved
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == BattleStatus::Pending && self.arrival_time <= now
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use stronghold_types::troops::TroopName;

    #[test]
    fn test_battle_resolves_once_and_never_early() {
        let now = Utc::now();
        let mut battle = Battle::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Position::new(0, 0),
            Position::new(3, 4),
            vec![TroopAmount::new(TroopName::Spearman, 10)],
            now,
            now + Duration::minutes(30),
        );

        assert_eq!(battle.resolve(now), BattleResolution::NotArrived);
        assert_eq!(battle.status, BattleStatus::Pending);

        let arrival = battle.arrival_time;
        assert!(battle.is_due(arrival));
        assert_eq!(battle.resolve(arrival), BattleResolution::Resolved);
        assert_eq!(battle.resolved_at, Some(arrival));
        assert_eq!(
            battle.resolve(arrival + Duration::seconds(5)),
            BattleResolution::AlreadyResolved
        );
        assert_eq!(battle.resolved_at, Some(arrival));
    }
}
