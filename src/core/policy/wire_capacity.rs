use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    core::{
        meter::MeterData,
        policy::{Policy, PolicyResult},
        station::ChargingStationData,
    },
    prelude::*,
    quantity::current::Amperes,
};

/// Keeps every phase of the household wiring under its safe current.
///
/// Phases of the meter and the station are not mapped onto each other, so the smallest station phase
/// current is taken as the charging current on every phase.
pub struct WireCapacityPolicy {
    max_safe_current: Amperes,
}

impl WireCapacityPolicy {
    pub const fn new(max_safe_current: Amperes) -> Self {
        Self { max_safe_current }
    }
}

#[async_trait]
impl Policy for WireCapacityPolicy {
    #[instrument(skip_all, name = "wire_capacity")]
    async fn evaluate(
        &mut self,
        _now: DateTime<Utc>,
        charging_station: &ChargingStationData,
        meter: &MeterData,
    ) -> Result<PolicyResult> {
        let charging_current = charging_station.min_phase_current();
        let current_limit = meter
            .currents
            .into_iter()
            .map(|phase_current| {
                let non_charger = phase_current - charging_current;
                if non_charger < Amperes::ZERO {
                    // Meter lag, the consistency check catches the worse cases.
                    debug!(
                        ?phase_current,
                        ?charging_current,
                        "meter does not show the charging yet",
                    );
                }
                self.max_safe_current - non_charger
            })
            .min()
            .unwrap_or(self.max_safe_current);
        debug!(?current_limit);
        Ok(PolicyResult::new(
            current_limit,
            format!("limiting the phase current to {}", self.max_safe_current),
        ))
    }
}
