use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    core::{meter::MeterData, parameters::ChargingControlParameters, station::ChargingStationData},
    prelude::*,
    quantity::{current::Amperes, price::EurocentsPerMegawattHour},
};

/// Full context of one control loop iteration.
#[must_use]
#[derive(Clone, Debug, Serialize, Builder)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    pub parameters: ChargingControlParameters,
    pub price: Option<EurocentsPerMegawattHour>,
    pub charging_station: Option<ChargingStationData>,
    pub meter: Option<MeterData>,

    /// Binding limit sent (or, in shadow mode, not sent) to the station.
    pub current_limit: Amperes,

    #[builder(into)]
    pub message: String,
}

impl Display for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.current_limit, self.message)?;
        write!(f, " | {}", self.parameters)?;
        match self.price {
            Some(price) => write!(f, " | price {price}")?,
            None => write!(f, " | price unknown")?,
        }
        if let Some(station) = &self.charging_station {
            write!(f, " | station {} {:?}", station.real_power_sum, station.currents)?;
        }
        if let Some(meter) = &self.meter {
            write!(f, " | meter {} {:?}", meter.total_active_power, meter.currents)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result;
}

/// Writes every notification to the debug log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, notification: &Notification) -> Result {
        debug!(%notification, "notified");
        Ok(())
    }
}
