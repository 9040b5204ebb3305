use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use stronghold_types::{
    buildings::BuildingName, common::ResourceGroup, map::Position, troops::TroopName,
};

/// Notifications for observers of a village. Fire-and-forget: nothing
/// in the core reads them back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GameEvent {
    VillageFounded {
        village_id: Uuid,
        player_id: Uuid,
        position: Position,
    },
    BuildingUpgradeStarted {
        village_id: Uuid,
        building_id: Uuid,
        name: BuildingName,
        target_level: u8,
        finish_at: DateTime<Utc>,
    },
    BuildingUpgraded {
        village_id: Uuid,
        building_id: Uuid,
        name: BuildingName,
        level: u8,
    },
    BuildingUpgradeCancelled {
        village_id: Uuid,
        building_id: Uuid,
        name: BuildingName,
        refund: ResourceGroup,
    },
    TrainingQueued {
        village_id: Uuid,
        task_id: Uuid,
        troop: TroopName,
        count: u32,
    },
    UnitTrained {
        village_id: Uuid,
        task_id: Uuid,
        troop: TroopName,
        remaining: u32,
    },
    TrainingCompleted {
        village_id: Uuid,
        task_id: Uuid,
        troop: TroopName,
        count: u32,
    },
    TrainingCancelled {
        village_id: Uuid,
        task_id: Uuid,
        refund: ResourceGroup,
    },
    AttackLaunched {
        battle_id: Uuid,
        attacker_village_id: Uuid,
        defender_village_id: Uuid,
        arrival_time: DateTime<Utc>,
    },
    BattleResolved {
        battle_id: Uuid,
        attacker_village_id: Uuid,
        defender_village_id: Uuid,
        resolved_at: DateTime<Utc>,
    },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::VillageFounded { .. } => "village.founded",
            GameEvent::BuildingUpgradeStarted { .. } => "building.upgrade_started",
            GameEvent::BuildingUpgraded { .. } => "building.upgraded",
            GameEvent::BuildingUpgradeCancelled { .. } => "building.upgrade_cancelled",
            GameEvent::TrainingQueued { .. } => "training.queued",
            GameEvent::UnitTrained { .. } => "training.unit_trained",
            GameEvent::TrainingCompleted { .. } => "training.completed",
            GameEvent::TrainingCancelled { .. } => "training.cancelled",
            GameEvent::AttackLaunched { .. } => "attack.launched",
            GameEvent::BattleResolved { .. } => "battle.resolved",
        }
    }

    /// Rooms the event is delivered to, one per village involved.
    pub fn rooms(&self) -> Vec<String> {
        match self {
            GameEvent::AttackLaunched {
                attacker_village_id,
                defender_village_id,
                ..
            }
            | GameEvent::BattleResolved {
                attacker_village_id,
                defender_village_id,
                ..
            } => vec![village_room(attacker_village_id), village_room(defender_village_id)],
            GameEvent::VillageFounded { village_id, .. }
            | GameEvent::BuildingUpgradeStarted { village_id, .. }
            | GameEvent::BuildingUpgraded { village_id, .. }
            | GameEvent::BuildingUpgradeCancelled { village_id, .. }
            | GameEvent::TrainingQueued { village_id, .. }
            | GameEvent::UnitTrained { village_id, .. }
            | GameEvent::TrainingCompleted { village_id, .. }
            | GameEvent::TrainingCancelled { village_id, .. } => vec![village_room(village_id)],
        }
    }

    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub fn village_room(village_id: &Uuid) -> String {
    format!("village:{village_id}")
}

/// Realtime push to observers. Implementations must not fail the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, room: &str, event: &str, payload: Value);
}

pub fn publish_events(publisher: &dyn EventPublisher, events: Vec<GameEvent>) {
    for event in events {
        let payload = event.payload();
        for room in event.rooms() {
            publisher.publish(&room, event.name(), payload.clone());
        }
    }
}

/// Publisher that only logs, for deployments without a push transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, room: &str, event: &str, payload: Value) {
        debug!(room, event, %payload, "Publishing event");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub room: String,
    pub event: String,
    pub payload: Value,
}

/// Fans events out to in-process subscribers (a push gateway, tests).
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, room: &str, event: &str, payload: Value) {
        let message = PublishedEvent {
            room: room.to_string(),
            event: event.to_string(),
            payload,
        };
        if self.sender.send(message).is_err() {
            debug!(room, event, "No subscribers for event");
        }
    }
}

/// Events collected during a unit of work.
#[derive(Debug, Default, Clone)]
pub struct EventBuffer(Arc<Mutex<Vec<GameEvent>>>);

impl EventBuffer {
    pub fn push(&self, event: GameEvent) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    pub fn drain(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_events_reach_both_villages() {
        let attacker = Uuid::new_v4();
        let defender = Uuid::new_v4();
        let event = GameEvent::BattleResolved {
            battle_id: Uuid::new_v4(),
            attacker_village_id: attacker,
            defender_village_id: defender,
            resolved_at: Utc::now(),
        };

        assert_eq!(event.name(), "battle.resolved");
        assert_eq!(
            event.rooms(),
            vec![village_room(&attacker), village_room(&defender)]
        );
        assert_eq!(event.payload()["attacker_village_id"], attacker.to_string());
    }

    #[tokio::test]
    async fn test_broadcast_publisher_delivers_to_subscribers() {
        let publisher = BroadcastEventPublisher::new(16);
        let mut rx = publisher.subscribe();
        let village_id = Uuid::new_v4();

        publish_events(
            &publisher,
            vec![GameEvent::BuildingUpgraded {
                village_id,
                building_id: Uuid::new_v4(),
                name: BuildingName::Farm,
                level: 2,
            }],
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.room, village_room(&village_id));
        assert_eq!(received.event, "building.upgraded");
        assert_eq!(received.payload["level"], 2);
    }

    #[test]
    fn test_event_buffer_drains_once() {
        let buffer = EventBuffer::default();
        buffer.push(GameEvent::TrainingCancelled {
            village_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            refund: ResourceGroup::default(),
        });

        assert_eq!(buffer.drain().len(), 1);
        assert!(buffer.drain().is_empty());
    }
}
