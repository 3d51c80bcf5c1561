use async_trait::async_trait;
use bon::Builder;
use serde::Serialize;

use crate::{
    prelude::*,
    quantity::{current::Amperes, power::Watts},
};

/// Instantaneous readings from the charging station.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize, Builder)]
pub struct ChargingStationData {
    pub real_power_sum: Watts,
    pub currents: [Amperes; 3],

    /// Setpoint the station is currently applying, if it reports one.
    pub current_limit: Option<Amperes>,
}

impl ChargingStationData {
    /// The smallest phase current, used as the per-phase charging current estimate.
    pub fn min_phase_current(&self) -> Amperes {
        self.currents.into_iter().min().unwrap_or_default()
    }
}

#[async_trait]
pub trait ChargingStation: Send + Sync {
    async fn get_charging_station_data(&self) -> Result<ChargingStationData>;

    async fn set_current_limit(&self, current_limit: Amperes) -> Result;
}
