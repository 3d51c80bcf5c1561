pub mod capacity_tariff;
pub mod price;
pub mod quarter_hour;
pub mod wire_capacity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use self::{
    capacity_tariff::CapacityTariffPolicy,
    price::PricePolicy,
    quarter_hour::QuarterHourCapacityTariffPolicy,
    wire_capacity::WireCapacityPolicy,
};
use crate::{
    core::{meter::MeterData, station::ChargingStationData},
    prelude::*,
    quantity::current::Amperes,
};

/// One policy's opinion on the charging current.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyResult {
    /// May be infinite, meaning no constraint.
    pub current_limit: Amperes,

    pub message: String,
}

impl PolicyResult {
    pub fn new(current_limit: Amperes, message: impl Into<String>) -> Self {
        Self { current_limit, message: message.into() }
    }
}

#[async_trait]
pub trait Policy: Send {
    /// Propose a current limit for the readings taken at `now`.
    async fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        charging_station: &ChargingStationData,
        meter: &MeterData,
    ) -> Result<PolicyResult>;
}

/// Pick the most restrictive result, the earliest one on a tie.
#[must_use]
pub fn arbitrate(results: Vec<PolicyResult>) -> Option<PolicyResult> {
    results.into_iter().min_by_key(|result| result.current_limit)
}
