use stronghold_types::{
    buildings::BuildingName, common::ResourceGroup, errors::GameError, troops::TroopName,
};

#[derive(Debug, Clone)]
pub struct TroopSpec {
    pub name: TroopName,
    pub cost: ResourceGroup,
    pub training_secs: u64,
    pub building: BuildingName,
    pub required_level: u8,
    /// Tiles per hour.
    pub speed: u32,
}

impl TroopSpec {
    /// Per-unit training time in milliseconds, shortened by the server speed.
    pub fn unit_time_ms(&self, server_speed: u8) -> i64 {
        (self.training_secs * 1000 / server_speed.max(1) as u64) as i64
    }
}

static TROOPS: [TroopSpec; 8] = [
    TroopSpec {
        name: TroopName::Militia,
        cost: ResourceGroup::new(30, 20, 10, 5),
        training_secs: 10,
        building: BuildingName::Barracks,
        required_level: 1,
        speed: 6,
    },
    TroopSpec {
        name: TroopName::Spearman,
        cost: ResourceGroup::new(40, 60, 20, 10),
        training_secs: 20,
        building: BuildingName::Barracks,
        required_level: 1,
        speed: 7,
    },
    TroopSpec {
        name: TroopName::Swordsman,
        cost: ResourceGroup::new(60, 50, 80, 30),
        training_secs: 30,
        building: BuildingName::Barracks,
        required_level: 3,
        speed: 6,
    },
    TroopSpec {
        name: TroopName::Archer,
        cost: ResourceGroup::new(50, 90, 30, 40),
        training_secs: 35,
        building: BuildingName::Barracks,
        required_level: 5,
        speed: 6,
    },
    TroopSpec {
        name: TroopName::Scout,
        cost: ResourceGroup::new(60, 70, 40, 50),
        training_secs: 40,
        building: BuildingName::Stable,
        required_level: 1,
        speed: 16,
    },
    TroopSpec {
        name: TroopName::Knight,
        cost: ResourceGroup::new(140, 160, 180, 120),
        training_secs: 70,
        building: BuildingName::Stable,
        required_level: 5,
        speed: 12,
    },
    TroopSpec {
        name: TroopName::Ram,
        cost: ResourceGroup::new(80, 250, 200, 60),
        training_secs: 90,
        building: BuildingName::Workshop,
        required_level: 1,
        speed: 3,
    },
    TroopSpec {
        name: TroopName::Catapult,
        cost: ResourceGroup::new(100, 300, 320, 150),
        training_secs: 120,
        building: BuildingName::Workshop,
        required_level: 5,
        speed: 3,
    },
];

pub fn troop_spec(name: &TroopName) -> Result<&'static TroopSpec, GameError> {
    TROOPS
        .iter()
        .find(|t| &t.name == name)
        .ok_or_else(|| GameError::InvalidTroopType(name.to_string()))
}
