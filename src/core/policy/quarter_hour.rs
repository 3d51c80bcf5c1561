use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};

use crate::{
    core::{
        meter::MeterData,
        policy::{Policy, PolicyResult},
        station::ChargingStationData,
        store::Store,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Keeps the average meter power over each UTC quarter hour under the configured maximum.
///
/// The remaining energy budget of the current quarter hour is spread evenly over its remaining time,
/// so the limit tightens as the budget is consumed and loosens when early consumption was low.
pub struct QuarterHourCapacityTariffPolicy {
    store: Arc<dyn Store>,
    baseline: Option<Baseline>,
}

/// Estimated cumulative import at the start of a quarter hour.
#[derive(Copy, Clone, Debug)]
struct Baseline {
    quarter_start: DateTime<Utc>,
    import: KilowattHours,
}

impl QuarterHourCapacityTariffPolicy {
    const QUARTER_HOUR: TimeDelta = TimeDelta::minutes(15);

    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, baseline: None }
    }
}

#[async_trait]
impl Policy for QuarterHourCapacityTariffPolicy {
    #[instrument(skip_all, name = "quarter_hour_capacity_tariff")]
    async fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        _charging_station: &ChargingStationData,
        meter: &MeterData,
    ) -> Result<PolicyResult> {
        let max_total_power = self.store.get_charging_parameters().await?.max_total_power;
        let quarter_start = now.duration_trunc(Self::QUARTER_HOUR)?;

        let baseline = match self.baseline {
            Some(baseline) if baseline.quarter_start >= quarter_start => baseline,
            _ => {
                // The import at the boundary itself is not observed, assume the maximum power since.
                let baseline = Baseline {
                    quarter_start,
                    import: meter.total_import - max_total_power * (now - quarter_start),
                };
                info!(?baseline.quarter_start, ?baseline.import, "entered a new quarter hour");
                *self.baseline.insert(baseline)
            }
        };

        let budget = max_total_power * Self::QUARTER_HOUR;
        let consumed = meter.total_import - baseline.import;
        let remaining_time = baseline.quarter_start + Self::QUARTER_HOUR - now;
        let power_limit = (budget - consumed) / remaining_time;
        let current_limit = power_limit / meter.voltage_sum();
        debug!(?consumed, ?remaining_time, ?power_limit, ?current_limit);

        Ok(PolicyResult::new(
            current_limit,
            format!("limiting the meter power to {power_limit} to stay within the quarter-hour budget"),
        ))
    }
}
