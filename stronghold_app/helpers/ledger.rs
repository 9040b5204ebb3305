use chrono::{DateTime, Utc};
use uuid::Uuid;

use stronghold_game::models::village::Village;
use stronghold_types::{
    common::ResourceGroup,
    errors::{ApplicationError, GameError},
};

use crate::uow::UnitOfWork;

/// Rolls the village stocks forward to the transaction time.
pub async fn collect(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
) -> Result<Village, ApplicationError> {
    uow.villages().collect(village_id, uow.now()).await
}

/// Rolls the village stocks forward to `at`. A no-op when `at` is not after
/// the last collection.
pub async fn collect_at(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
    at: DateTime<Utc>,
) -> Result<Village, ApplicationError> {
    uow.villages().collect(village_id, at.min(uow.now())).await
}

/// Collects, then takes `cost` out of the stocks. Nothing changes when any
/// resource falls short.
pub async fn deduct(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
    cost: &ResourceGroup,
) -> Result<Village, ApplicationError> {
    collect(uow, village_id).await?;
    uow.villages()
        .try_deduct(village_id, cost)
        .await?
        .ok_or_else(|| ApplicationError::Game(GameError::NotEnoughResources))
}

pub async fn add(
    uow: &Box<dyn UnitOfWork<'_> + '_>,
    village_id: Uuid,
    gain: &ResourceGroup,
) -> Result<Village, ApplicationError> {
    uow.villages().add_resources(village_id, gain).await
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::sync::Arc;

    use stronghold_types::Result;

    use super::*;
    use crate::{
        test_utils::tests::{InMemoryUnitOfWorkProvider, MockClock, seed_village},
        uow::UnitOfWorkProvider,
    };

    #[tokio::test]
    async fn test_collect_after_thirty_seconds() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let village = seed_village(&provider, &[]).await?;

        clock.advance(Duration::seconds(30));
        let uow = provider.begin().await?;
        let collected = collect(&uow, village.id).await?;
        uow.commit().await?;

        assert_eq!(collected.stocks.food(), 800, "500 + 10 × 30");
        assert_eq!(collected.stocks.gold(), 740, "500 + 8 × 30");
        assert_eq!(collected.last_collected_at, clock.now());
        Ok(())
    }

    #[tokio::test]
    async fn test_deduct_is_all_or_nothing() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let village = seed_village(&provider, &[]).await?;

        let uow = provider.begin().await?;
        let result = deduct(&uow, village.id, &ResourceGroup::new(100, 100, 100, 501)).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Game(GameError::NotEnoughResources))
        ));

        let unchanged = uow.villages().get_by_id(village.id).await?;
        assert_eq!(unchanged.stocks, ResourceGroup::new(500, 500, 500, 500));

        let paid = deduct(&uow, village.id, &ResourceGroup::new(100, 200, 300, 500)).await?;
        assert_eq!(paid.stocks, ResourceGroup::new(400, 300, 200, 0));
        uow.commit().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_collect_at_past_instant_is_noop() -> Result<()> {
        let clock = Arc::new(MockClock::default());
        let provider = InMemoryUnitOfWorkProvider::new(clock.clone());
        let village = seed_village(&provider, &[]).await?;
        let start = clock.now();

        clock.advance(Duration::seconds(10));
        let uow = provider.begin().await?;
        collect(&uow, village.id).await?;
        let again = collect_at(&uow, village.id, start + Duration::seconds(5)).await?;
        uow.commit().await?;

        assert_eq!(again.stocks.food(), 600);
        assert_eq!(again.last_collected_at, start + Duration::seconds(10));
        Ok(())
    }
}
