use stronghold_types::{
    buildings::{BuildingGroup, BuildingName},
    common::{ResourceGroup, ResourceKind},
    errors::GameError,
};

#[derive(Debug, Clone)]
pub struct BuildingSpec {
    pub base_cost: ResourceGroup,
    pub base_time_secs: u64,
    pub cost_scale: f64,
    pub time_scale: f64,
    pub max_level: u8,
}

/// Cost and duration of a single upgrade step.
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeCost {
    pub resources: ResourceGroup,
    pub time_secs: u64,
}

impl UpgradeCost {
    /// Upgrade duration in milliseconds, shortened by the server speed.
    pub fn duration_ms(&self, server_speed: u8) -> i64 {
        (self.time_secs * 1000 / server_speed.max(1) as u64) as i64
    }
}

const fn spec(
    food: u64,
    wood: u64,
    stone: u64,
    gold: u64,
    base_time_secs: u64,
    cost_scale: f64,
    time_scale: f64,
    max_level: u8,
) -> BuildingSpec {
    BuildingSpec {
        base_cost: ResourceGroup::new(food, wood, stone, gold),
        base_time_secs,
        cost_scale,
        time_scale,
        max_level,
    }
}

static SAWMILL: BuildingSpec = spec(20, 100, 50, 30, 60, 1.8, 1.4, 20);
static CLAY_PIT: BuildingSpec = spec(10, 80, 40, 20, 45, 1.8, 1.4, 20);
static IRON_MINE: BuildingSpec = spec(15, 90, 45, 25, 50, 1.8, 1.4, 20);
static FARM: BuildingSpec = spec(10, 70, 35, 15, 40, 1.8, 1.4, 20);
static WAREHOUSE: BuildingSpec = spec(30, 120, 100, 60, 90, 1.7, 1.3, 20);
static GRANARY: BuildingSpec = spec(30, 110, 90, 50, 90, 1.7, 1.3, 20);
static MARKET: BuildingSpec = spec(60, 100, 100, 80, 100, 1.7, 1.3, 20);
static BARRACKS: BuildingSpec = spec(50, 150, 100, 80, 100, 1.9, 1.5, 10);
static STABLE: BuildingSpec = spec(60, 160, 110, 90, 110, 1.9, 1.5, 10);
static WORKSHOP: BuildingSpec = spec(70, 170, 130, 100, 120, 1.9, 1.5, 10);
static WALL: BuildingSpec = spec(40, 100, 130, 80, 90, 1.9, 1.5, 10);
static TOWER: BuildingSpec = spec(50, 120, 140, 90, 100, 1.9, 1.5, 10);
static SMITHY: BuildingSpec = spec(70, 140, 120, 110, 100, 1.9, 1.5, 10);
static EMBASSY: BuildingSpec = spec(40, 130, 80, 50, 90, 1.75, 1.45, 10);
static ACADEMY: BuildingSpec = spec(60, 150, 100, 90, 100, 1.75, 1.45, 10);
static SHRINE: BuildingSpec = spec(70, 140, 110, 100, 100, 1.75, 1.45, 10);

pub fn building_spec(name: &BuildingName) -> &'static BuildingSpec {
    match name {
        BuildingName::Sawmill => &SAWMILL,
        BuildingName::ClayPit => &CLAY_PIT,
        BuildingName::IronMine => &IRON_MINE,
        BuildingName::Farm => &FARM,
        BuildingName::Warehouse => &WAREHOUSE,
        BuildingName::Granary => &GRANARY,
        BuildingName::Market => &MARKET,
        BuildingName::Barracks => &BARRACKS,
        BuildingName::Stable => &STABLE,
        BuildingName::Workshop => &WORKSHOP,
        BuildingName::Wall => &WALL,
        BuildingName::Tower => &TOWER,
        BuildingName::Smithy => &SMITHY,
        BuildingName::Embassy => &EMBASSY,
        BuildingName::Academy => &ACADEMY,
        BuildingName::Shrine => &SHRINE,
    }
}

impl BuildingSpec {
    /// Cost of upgrading from `current_level` to `current_level + 1`.
    pub fn upgrade_cost(&self, current_level: u8) -> Result<UpgradeCost, GameError> {
        if current_level >= self.max_level {
            return Err(GameError::BuildingMaxLevelReached);
        }
        let factor = self.cost_scale.powi(current_level as i32);
        let scale = |base: u64| (base as f64 * factor).round() as u64;

        Ok(UpgradeCost {
            resources: ResourceGroup::new(
                scale(self.base_cost.food()),
                scale(self.base_cost.wood()),
                scale(self.base_cost.stone()),
                scale(self.base_cost.gold()),
            ),
            time_secs: (self.base_time_secs as f64 * self.time_scale.powi(current_level as i32))
                .round() as u64,
        })
    }
}

/// Resource produced by a building type, if any.
pub fn produced_resource(name: &BuildingName) -> Option<ResourceKind> {
    match name {
        BuildingName::Sawmill => Some(ResourceKind::Wood),
        BuildingName::ClayPit => Some(ResourceKind::Stone),
        BuildingName::IronMine => Some(ResourceKind::Gold),
        BuildingName::Farm => Some(ResourceKind::Food),
        _ => None,
    }
}

/// Production rate gained (units per second) when a resource building reaches `level`.
/// The first level only unlocks the building.
pub fn production_increase(name: &BuildingName, level: u8) -> Option<(ResourceKind, u64)> {
    if name.group() != BuildingGroup::Resources || level == 0 {
        return None;
    }
    let kind = produced_resource(name)?;
    let amount = (level - 1) as u64;

    (amount > 0).then_some((kind, amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_zero_sawmill_cost() {
        let cost = building_spec(&BuildingName::Sawmill)
            .upgrade_cost(0)
            .unwrap();
        assert_eq!(cost.resources, ResourceGroup::new(20, 100, 50, 30));
        assert_eq!(cost.time_secs, 60);
        assert_eq!(cost.duration_ms(1), 60_000);
        assert_eq!(cost.duration_ms(3), 20_000);
    }

    #[test]
    fn test_costs_scale_with_level() {
        let cost = building_spec(&BuildingName::Sawmill)
            .upgrade_cost(2)
            .unwrap();
        // 100 * 1.8^2 = 324, 60 * 1.4^2 = 117.6
        assert_eq!(cost.resources.wood(), 324);
        assert_eq!(cost.time_secs, 118);
    }

    #[test]
    fn test_level_caps() {
        let barracks = building_spec(&BuildingName::Barracks);
        assert_eq!(barracks.max_level, 10);
        assert!(barracks.upgrade_cost(9).is_ok());
        assert!(matches!(
            barracks.upgrade_cost(10),
            Err(GameError::BuildingMaxLevelReached)
        ));
        assert_eq!(building_spec(&BuildingName::Warehouse).max_level, 20);
    }

    #[test]
    fn test_production_increase() {
        assert_eq!(production_increase(&BuildingName::Sawmill, 1), None);
        assert_eq!(
            production_increase(&BuildingName::Sawmill, 2),
            Some((ResourceKind::Wood, 1))
        );
        assert_eq!(
            production_increase(&BuildingName::IronMine, 5),
            Some((ResourceKind::Gold, 4))
        );
        assert_eq!(
            production_increase(&BuildingName::Farm, 20),
            Some((ResourceKind::Food, 19))
        );
        assert_eq!(production_increase(&BuildingName::Barracks, 3), None);
    }
}
