use async_trait::async_trait;
use bon::Builder;
use serde::Serialize;

use crate::{
    prelude::*,
    quantity::{current::Amperes, energy::KilowattHours, power::Watts, voltage::Volts},
};

/// Instantaneous readings from the main meter.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize, Builder)]
pub struct MeterData {
    /// Total active power, negative when exporting.
    pub total_active_power: Watts,

    pub currents: [Amperes; 3],
    pub voltages: [Volts; 3],

    /// Cumulative energy import.
    pub total_import: KilowattHours,
}

impl MeterData {
    pub fn voltage_sum(&self) -> Volts {
        self.voltages.into_iter().sum()
    }
}

#[async_trait]
pub trait MeterDataProvider: Send + Sync {
    async fn get_meter_data(&self) -> Result<MeterData>;
}
