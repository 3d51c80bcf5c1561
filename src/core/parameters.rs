use std::fmt::{Display, Formatter};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::quantity::{power::Watts, price::EurocentsPerMegawattHour};

/// Operator-configured ceilings, never changed by the control loop.
#[must_use]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Builder)]
pub struct ChargingControlParameters {
    pub max_total_power: Watts,
    pub max_price: EurocentsPerMegawattHour,
}

impl Display for ChargingControlParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "max power {}, max price {}", self.max_total_power, self.max_price)
    }
}
