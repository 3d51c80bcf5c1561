use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    core::meter::{MeterData, MeterDataProvider},
    prelude::*,
    quantity::{current::Amperes, energy::KilowattHours, power::Watts, voltage::Volts},
};

/// HomeWizard P1 meter local API.
pub struct Client {
    inner: reqwest::Client,
    url: Url,
}

impl Client {
    #[instrument(skip_all, fields(url = %url))]
    pub fn new(url: Url) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { inner, url })
    }
}

#[async_trait]
impl MeterDataProvider for Client {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn get_meter_data(&self) -> Result<MeterData> {
        let measurement: Measurement = self
            .inner
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("failed to request a measurement from `{}`", self.url))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("failed to deserialize the response from `{}`", self.url))?;
        let meter_data = MeterData::from(measurement);
        debug!(power = ?meter_data.total_active_power, currents = ?meter_data.currents);
        Ok(meter_data)
    }
}

/// Single-phase meters omit the second and third phase.
#[derive(Copy, Clone, Deserialize)]
struct Measurement {
    #[serde(rename = "active_power_w")]
    power: Watts,

    #[serde(rename = "active_current_l1_a")]
    current_1: Amperes,

    #[serde(rename = "active_current_l2_a", default)]
    current_2: Amperes,

    #[serde(rename = "active_current_l3_a", default)]
    current_3: Amperes,

    #[serde(rename = "active_voltage_l1_v")]
    voltage_1: Volts,

    #[serde(rename = "active_voltage_l2_v", default)]
    voltage_2: Volts,

    #[serde(rename = "active_voltage_l3_v", default)]
    voltage_3: Volts,

    #[serde(rename = "total_power_import_kwh")]
    import: KilowattHours,
}

impl From<Measurement> for MeterData {
    fn from(measurement: Measurement) -> Self {
        Self::builder()
            .total_active_power(measurement.power)
            .currents([measurement.current_1, measurement.current_2, measurement.current_3])
            .voltages([measurement.voltage_1, measurement.voltage_2, measurement.voltage_3])
            .total_import(measurement.import)
            .build()
    }
}
