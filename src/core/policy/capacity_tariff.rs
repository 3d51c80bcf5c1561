use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    core::{
        meter::MeterData,
        policy::{Policy, PolicyResult},
        station::ChargingStationData,
        store::Store,
    },
    prelude::*,
    quantity::power::Watts,
};

/// Keeps the instantaneous meter power under the configured maximum.
pub struct CapacityTariffPolicy {
    store: Arc<dyn Store>,
}

impl CapacityTariffPolicy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Policy for CapacityTariffPolicy {
    #[instrument(skip_all, name = "capacity_tariff")]
    async fn evaluate(
        &mut self,
        _now: DateTime<Utc>,
        charging_station: &ChargingStationData,
        meter: &MeterData,
    ) -> Result<PolicyResult> {
        let max_total_power = self.store.get_charging_parameters().await?.max_total_power;
        let mut non_charger = meter.total_active_power - charging_station.real_power_sum;
        if non_charger < Watts::ZERO {
            warn!(
                total_active_power = ?meter.total_active_power,
                real_power_sum = ?charging_station.real_power_sum,
                "meter does not show the charging yet, the result may be unreliable",
            );
            non_charger = meter.total_active_power;
        }
        let current_limit = (max_total_power - non_charger) / meter.voltage_sum();
        debug!(?non_charger, ?current_limit);
        Ok(PolicyResult::new(current_limit, format!("limiting the meter power to {max_total_power}")))
    }
}
