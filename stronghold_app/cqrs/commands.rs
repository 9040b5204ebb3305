use uuid::Uuid;

use stronghold_game::models::{
    battle::Battle, building::Building, construction::ConstructionTask, movement::ArmyMovement,
    training::TrainingTask, troops::TroopGroup, village::Village,
};
use stronghold_types::{
    buildings::BuildingName,
    common::ResourceGroup,
    map::Position,
    troops::{TroopAmount, TroopName},
};

use crate::cqrs::Command;

/// Allocates the starting village of a newly created player.
#[derive(Debug, Clone)]
pub struct FoundVillage {
    pub player_id: Uuid,
    pub name: String,
    pub position: Position,
}

impl Command for FoundVillage {
    type Output = Village;
}

#[derive(Debug, Clone)]
pub struct UpgradeBuilding {
    pub village_id: Uuid,
    pub building: BuildingName,
}

impl Command for UpgradeBuilding {
    type Output = ConstructionTask;
}

#[derive(Debug, Clone)]
pub struct CancelConstruction {
    pub village_id: Uuid,
    pub building: BuildingName,
}

impl Command for CancelConstruction {
    /// Resources given back.
    type Output = ResourceGroup;
}

#[derive(Debug, Clone)]
pub struct TrainUnits {
    pub village_id: Uuid,
    pub troop: TroopName,
    pub count: u32,
}

impl Command for TrainUnits {
    type Output = TrainingTask;
}

#[derive(Debug, Clone)]
pub struct CancelTraining {
    pub village_id: Uuid,
    pub task_id: Uuid,
}

impl Command for CancelTraining {
    /// Resources given back.
    type Output = ResourceGroup;
}

#[derive(Debug, Clone)]
pub struct AttackVillage {
    pub village_id: Uuid,
    pub origin: Position,
    pub target: Position,
    pub troops: Vec<TroopAmount>,
}

impl Command for AttackVillage {
    type Output = Battle;
}

/// Brings a village up to date with everything that should have happened by
/// now, then returns it. Runs on every authoritative read.
#[derive(Debug, Clone)]
pub struct RefreshVillageState {
    pub village_id: Uuid,
}

impl Command for RefreshVillageState {
    type Output = VillageDetails;
}

/// Consistent projection of a village.
#[derive(Debug, Clone)]
pub struct VillageDetails {
    pub village: Village,
    pub buildings: Vec<Building>,
    pub troops: Vec<TroopGroup>,
    /// Pending and in-progress training tasks, oldest first.
    pub training_queue: Vec<TrainingTask>,
    pub construction_tasks: Vec<ConstructionTask>,
    pub movements: Vec<ArmyMovement>,
}
