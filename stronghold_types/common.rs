use serde::{Deserialize, Serialize};

/// The four resources a village accumulates.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum ResourceKind {
    Food,
    Wood,
    Stone,
    Gold,
}

/// Amounts of food, wood, stone and gold, in this order.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup(pub u64, pub u64, pub u64, pub u64);

impl ResourceGroup {
    pub const fn new(food: u64, wood: u64, stone: u64, gold: u64) -> Self {
        Self(food, wood, stone, gold)
    }

    pub fn food(&self) -> u64 {
        self.0
    }
    pub fn wood(&self) -> u64 {
        self.1
    }
    pub fn stone(&self) -> u64 {
        self.2
    }
    pub fn gold(&self) -> u64 {
        self.3
    }

    pub fn total(&self) -> u64 {
        self.0 + self.1 + self.2 + self.3
    }

    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Food => self.0,
            ResourceKind::Wood => self.1,
            ResourceKind::Stone => self.2,
            ResourceKind::Gold => self.3,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Food => &mut self.0,
            ResourceKind::Wood => &mut self.1,
            ResourceKind::Stone => &mut self.2,
            ResourceKind::Gold => &mut self.3,
        }
    }

    /// Returns `None` when any of the four amounts would go below zero.
    pub fn checked_sub(&self, rhs: &ResourceGroup) -> Option<ResourceGroup> {
        Some(ResourceGroup(
            self.0.checked_sub(rhs.0)?,
            self.1.checked_sub(rhs.1)?,
            self.2.checked_sub(rhs.2)?,
            self.3.checked_sub(rhs.3)?,
        ))
    }

    pub fn covers(&self, cost: &ResourceGroup) -> bool {
        self.checked_sub(cost).is_some()
    }

    /// Integer percentage of every amount, rounded down.
    pub fn percent(&self, pct: u64) -> ResourceGroup {
        ResourceGroup(
            self.0.saturating_mul(pct) / 100,
            self.1.saturating_mul(pct) / 100,
            self.2.saturating_mul(pct) / 100,
            self.3.saturating_mul(pct) / 100,
        )
    }
}

impl core::ops::Add for ResourceGroup {
    type Output = ResourceGroup;

    fn add(self, rhs: ResourceGroup) -> Self::Output {
        ResourceGroup(
            self.0.saturating_add(rhs.0),
            self.1.saturating_add(rhs.1),
            self.2.saturating_add(rhs.2),
            self.3.saturating_add(rhs.3),
        )
    }
}

impl core::ops::AddAssign for ResourceGroup {
    fn add_assign(&mut self, rhs: ResourceGroup) {
        *self = *self + rhs;
    }
}

impl core::ops::Mul<u64> for ResourceGroup {
    type Output = ResourceGroup;

    fn mul(self, rhs: u64) -> Self::Output {
        ResourceGroup(
            self.0.saturating_mul(rhs),
            self.1.saturating_mul(rhs),
            self.2.saturating_mul(rhs),
            self.3.saturating_mul(rhs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sub_is_all_or_nothing() {
        let stocks = ResourceGroup::new(20, 100, 50, 30);

        assert_eq!(
            stocks.checked_sub(&ResourceGroup::new(20, 100, 50, 30)),
            Some(ResourceGroup::default())
        );
        assert_eq!(stocks.checked_sub(&ResourceGroup::new(0, 101, 0, 0)), None);
        assert!(!stocks.covers(&ResourceGroup::new(21, 0, 0, 0)));
    }

    #[test]
    fn test_scaling() {
        let unit_cost = ResourceGroup::new(30, 20, 10, 5);
        assert_eq!(unit_cost * 3, ResourceGroup::new(90, 60, 30, 15));
        assert_eq!((unit_cost * 3).percent(80), ResourceGroup::new(72, 48, 24, 12));
        assert_eq!(ResourceGroup::new(5, 6, 7, 1).percent(80), ResourceGroup::new(4, 4, 5, 0));
    }

    #[test]
    fn test_get_by_kind() {
        let mut group = ResourceGroup::new(1, 2, 3, 4);
        *group.get_mut(ResourceKind::Gold) += 6;
        assert_eq!(group.get(ResourceKind::Gold), 10);
        assert_eq!(group.get(ResourceKind::Food), 1);
        assert_eq!(group.total(), 16);
    }
}
