use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    core::{parameters::ChargingControlParameters, price::ElectricityPrice},
    ops::Interval,
    prelude::*,
};

/// Persistent charging parameters and day-ahead prices.
#[async_trait]
pub trait Store: Send + Sync {
    /// The most recently saved parameters, zeroes if there are none.
    async fn get_charging_parameters(&self) -> Result<ChargingControlParameters>;

    async fn save_charging_parameters(&self, parameters: &ChargingControlParameters) -> Result;

    /// The price covering the instant.
    ///
    /// Fails if more than one price covers it.
    async fn get_price(&self, at: DateTime<Utc>) -> Result<Option<ElectricityPrice>>;

    /// Prices overlapping the interval, ordered by start.
    async fn get_prices(&self, interval: Interval) -> Result<Vec<ElectricityPrice>>;

    /// Save all prices or none: any overlap with a stored price or within the batch is an error.
    async fn save_prices(&self, prices: &[ElectricityPrice]) -> Result;
}
