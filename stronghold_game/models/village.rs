use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stronghold_types::{
    common::{ResourceGroup, ResourceKind},
    errors::GameError,
    map::Position,
};

pub const STARTING_STOCKS: ResourceGroup = ResourceGroup::new(500, 500, 500, 500);
pub const STARTING_PRODUCTION: ResourceGroup = ResourceGroup::new(10, 10, 10, 8);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub id: Uuid,
    pub player_id: Uuid,
    pub name: String,
    pub position: Position,
    /// Stocks as of `last_collected_at`.
    pub stocks: ResourceGroup,
    /// Units per second.
    pub production: ResourceGroup,
    pub last_collected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Village {
    pub fn new(player_id: Uuid, name: String, position: Position, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            name,
            position,
            stocks: STARTING_STOCKS,
            production: STARTING_PRODUCTION,
            last_collected_at: now,
            created_at: now,
        }
    }

    /// Stocks rolled forward to `at`, together with the instant they are valid for.
    ///
    /// Only whole elapsed seconds are accounted; the returned instant advances by
    /// exactly those seconds, so the remainder carries over to the next collection.
    pub fn accrued(&self, at: DateTime<Utc>) -> (ResourceGroup, DateTime<Utc>) {
        if at <= self.last_collected_at {
            return (self.stocks, self.last_collected_at);
        }
        let elapsed_secs = (at - self.last_collected_at).num_seconds();
        let gained = self.production * elapsed_secs as u64;

        (
            self.stocks + gained,
            self.last_collected_at + Duration::seconds(elapsed_secs),
        )
    }

    pub fn collect(&mut self, at: DateTime<Utc>) {
        let (stocks, collected_at) = self.accrued(at);
        self.stocks = stocks;
        self.last_collected_at = collected_at;
    }

    /// Deducts all four amounts or none of them.
    pub fn deduct_resources(&mut self, cost: &ResourceGroup) -> Result<(), GameError> {
        self.stocks = self
            .stocks
            .checked_sub(cost)
            .ok_or(GameError::NotEnoughResources)?;
        Ok(())
    }

    pub fn store_resources(&mut self, gain: &ResourceGroup) {
        self.stocks += *gain;
    }

    pub fn increase_production(&mut self, kind: ResourceKind, amount: u64) {
        *self.production.get_mut(kind) += amount;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::test_utils::{VillageFactoryOptions, village_factory};

    #[test]
    fn test_new_village_starting_state() {
        let now = Utc::now();
        let v = Village::new(Uuid::new_v4(), "Home".to_string(), Position::new(1, 2), now);

        assert_eq!(v.stocks, ResourceGroup::new(500, 500, 500, 500));
        assert_eq!(v.production, ResourceGroup::new(10, 10, 10, 8));
        assert_eq!(v.last_collected_at, now);
    }

    #[test]
    fn test_collect_after_thirty_seconds() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut v = village_factory(VillageFactoryOptions {
            last_collected_at: Some(t0),
            ..Default::default()
        });

        v.collect(t0 + Duration::seconds(30));

        assert_eq!(v.stocks.food(), 800, "500 + 10 * 30");
        assert_eq!(v.stocks.gold(), 740, "500 + 8 * 30");
        assert_eq!(v.last_collected_at, t0 + Duration::seconds(30));
    }

    #[test]
    fn test_accrual_is_linear_and_keeps_sub_second_remainders() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut stepped = village_factory(VillageFactoryOptions {
            last_collected_at: Some(t0),
            ..Default::default()
        });
        let mut single = stepped.clone();

        for step in 1..=10 {
            stepped.collect(t0 + Duration::milliseconds(1500 * step));
        }
        single.collect(t0 + Duration::milliseconds(15_000));

        assert_eq!(stepped.stocks, single.stocks);
        assert_eq!(stepped.last_collected_at, single.last_collected_at);
        assert_eq!(single.stocks.food(), 650);
    }

    #[test]
    fn test_collect_in_the_past_is_a_noop() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut v = village_factory(VillageFactoryOptions {
            last_collected_at: Some(t0),
            ..Default::default()
        });
        let before = v.clone();

        v.collect(t0 - Duration::seconds(10));
        assert_eq!(v, before);
    }

    #[test]
    fn test_deduct_is_all_or_nothing() {
        let mut v = village_factory(VillageFactoryOptions {
            stocks: Some(ResourceGroup::new(20, 99, 50, 30)),
            ..Default::default()
        });

        let result = v.deduct_resources(&ResourceGroup::new(20, 100, 50, 30));
        assert!(matches!(result, Err(GameError::NotEnoughResources)));
        assert_eq!(v.stocks, ResourceGroup::new(20, 99, 50, 30));

        v.store_resources(&ResourceGroup::new(0, 1, 0, 0));
        v.deduct_resources(&ResourceGroup::new(20, 100, 50, 30)).unwrap();
        assert_eq!(v.stocks, ResourceGroup::default());
    }
}
