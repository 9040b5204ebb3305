use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stronghold_types::buildings::BuildingName;

use crate::jobs::JobKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingUpgradeTask {
    pub village_id: Uuid,
    pub building_id: Uuid,
    pub building_name: BuildingName,
    pub target_level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainUnitTask {
    pub village_id: Uuid,
    pub task_id: Uuid,
    pub building: BuildingName,
    /// Value of `remaining` the tick was scheduled for.
    pub expected_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveBattleTask {
    pub battle_id: Uuid,
}

/// Every kind of deferred work. Stored as `{ "task_type": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task_type", content = "data")]
pub enum JobTask {
    BuildingUpgrade(BuildingUpgradeTask),
    TrainUnit(TrainUnitTask),
    ResolveBattle(ResolveBattleTask),
}

impl JobTask {
    pub fn key(&self) -> JobKey {
        match self {
            JobTask::BuildingUpgrade(t) => JobKey::building(t.building_id, t.target_level),
            JobTask::TrainUnit(t) => JobKey::training(t.task_id, t.expected_remaining),
            JobTask::ResolveBattle(t) => JobKey::battle(t.battle_id),
        }
    }

    pub fn task_type(&self) -> &'static str {
        match self {
            JobTask::BuildingUpgrade(_) => "BuildingUpgrade",
            JobTask::TrainUnit(_) => "TrainUnit",
            JobTask::ResolveBattle(_) => "ResolveBattle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_serializes_with_type_tag() {
        let battle_id = Uuid::new_v4();
        let task = JobTask::ResolveBattle(ResolveBattleTask { battle_id });

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({ "task_type": "ResolveBattle", "data": { "battle_id": battle_id } })
        );
        assert_eq!(task.task_type(), "ResolveBattle");
    }

    #[test]
    fn test_unknown_task_type_is_rejected() {
        let raw = json!({ "task_type": "Teleport", "data": {} });
        assert!(serde_json::from_value::<JobTask>(raw).is_err());
    }
}
