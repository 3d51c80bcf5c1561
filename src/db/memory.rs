use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    core::{parameters::ChargingControlParameters, price::ElectricityPrice, store::Store},
    ops::Interval,
    prelude::*,
};

/// Same contract as [`crate::db::Db`], without the persistence.
#[derive(Default)]
pub struct MemoryStore(Mutex<State>);

#[derive(Default)]
struct State {
    parameters: Vec<ChargingControlParameters>,
    prices: Vec<ElectricityPrice>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_charging_parameters(&self) -> Result<ChargingControlParameters> {
        Ok(self.0.lock().await.parameters.last().copied().unwrap_or_default())
    }

    async fn save_charging_parameters(&self, parameters: &ChargingControlParameters) -> Result {
        self.0.lock().await.parameters.push(*parameters);
        Ok(())
    }

    async fn get_price(&self, at: DateTime<Utc>) -> Result<Option<ElectricityPrice>> {
        let state = self.0.lock().await;
        let mut prices = state.prices.iter().filter(|price| price.interval().contains(at));
        let price = prices.next().copied();
        ensure!(prices.next().is_none(), "integrity error: several prices cover {at}");
        Ok(price)
    }

    async fn get_prices(&self, interval: Interval) -> Result<Vec<ElectricityPrice>> {
        let state = self.0.lock().await;
        let mut prices: Vec<_> =
            state.prices.iter().filter(|price| price.interval().overlaps(interval)).copied().collect();
        prices.sort_by_key(|price| price.interval().start);
        Ok(prices)
    }

    async fn save_prices(&self, prices: &[ElectricityPrice]) -> Result {
        let mut state = self.0.lock().await;
        let mut saved = state.prices.clone();
        for price in prices {
            if let Some(existing) =
                saved.iter().find(|existing| existing.interval().overlaps(price.interval()))
            {
                bail!(
                    "price interval `{:?}` overlaps the existing `{:?}`",
                    price.interval(),
                    existing.interval(),
                );
            }
            saved.push(*price);
        }
        state.prices = saved;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::quantity::price::EurocentsPerMegawattHour;

    #[tokio::test]
    async fn rejected_batch_leaves_prices_untouched() -> Result {
        let store = MemoryStore::default();
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let hour = |offset: i64, value: i64| {
            ElectricityPrice::try_new(
                Interval::from_std(
                    (start + TimeDelta::hours(offset))..(start + TimeDelta::hours(offset + 1)),
                ),
                EurocentsPerMegawattHour(value),
            )
        };
        store.save_prices(&[hour(0, 100)?]).await?;
        assert!(store.save_prices(&[hour(1, 200)?, hour(0, 300)?]).await.is_err());
        let day = Interval::from_std(start..(start + TimeDelta::days(1)));
        assert_eq!(store.get_prices(day).await?, [hour(0, 100)?]);
        Ok(())
    }
}
