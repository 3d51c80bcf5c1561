use std::ops::{Div, Mul};

use chrono::TimeDelta;

use crate::quantity::{current::Amperes, energy::KilowattHours, voltage::Volts};

quantity!(Watts, via: f64, suffix: "W", precision: 0);

impl Div<Volts> for Watts {
    type Output = Amperes;

    fn div(self, rhs: Volts) -> Self::Output {
        Amperes(self.0 / rhs.0)
    }
}

impl Mul<TimeDelta> for Watts {
    type Output = KilowattHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        KilowattHours(self.0 * rhs.as_seconds_f64() / 3_600_000.0)
    }
}
