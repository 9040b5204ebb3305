use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use stronghold_types::{map::Position, troops::TroopAmount};

use super::battle::Battle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementDirection {
    Outgoing,
    Incoming,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::Outgoing => "outgoing",
            MovementDirection::Incoming => "incoming",
        }
    }
}

impl FromStr for MovementDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outgoing" => Ok(MovementDirection::Outgoing),
            "incoming" => Ok(MovementDirection::Incoming),
            other => Err(format!("unknown movement direction {other}")),
        }
    }
}

/// Display record of a troop movement, derived from a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmyMovement {
    pub id: Uuid,
    pub village_id: Uuid,
    pub battle_id: Uuid,
    pub direction: MovementDirection,
    pub origin: Position,
    pub target: Position,
    /// Empty on incoming movements: defenders don't see the army composition.
    pub troops: Vec<TroopAmount>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub arrived: bool,
}

impl ArmyMovement {
    /// The attacker's outgoing record and the defender's incoming one.
    pub fn for_battle(battle: &Battle) -> [ArmyMovement; 2] {
        let outgoing = ArmyMovement {
            id: Uuid::new_v4(),
            village_id: battle.attacker_village_id,
            battle_id: battle.id,
            direction: MovementDirection::Outgoing,
            origin: battle.origin,
            target: battle.target,
            troops: battle.troops.clone(),
            departure_time: battle.start_time,
            arrival_time: battle.arrival_time,
            arrived: false,
        };
        let incoming = ArmyMovement {
            id: Uuid::new_v4(),
            village_id: battle.defender_village_id,
            direction: MovementDirection::Incoming,
            troops: vec![],
            ..outgoing.clone()
        };
        [outgoing, incoming]
    }
}
