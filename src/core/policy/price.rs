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
    quantity::current::Amperes,
};

/// Forbids charging unless the current price is known and acceptable.
pub struct PricePolicy {
    store: Arc<dyn Store>,
}

impl PricePolicy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Policy for PricePolicy {
    #[instrument(skip_all, name = "price")]
    async fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        _charging_station: &ChargingStationData,
        _meter: &MeterData,
    ) -> Result<PolicyResult> {
        let max_price = self.store.get_charging_parameters().await?.max_price;
        let result = match self.store.get_price(now).await? {
            None => PolicyResult::new(Amperes::ZERO, "price is unknown"),
            Some(price) if price.value() > max_price => PolicyResult::new(
                Amperes::ZERO,
                format!("price is too high: {} > {max_price}", price.value()),
            ),
            Some(price) => PolicyResult::new(
                Amperes::INFINITY,
                format!("price is acceptable: {} <= {max_price}", price.value()),
            ),
        };
        debug!(current_limit = ?result.current_limit, reason = %result.message);
        Ok(result)
    }
}
