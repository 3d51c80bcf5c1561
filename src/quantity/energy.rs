use std::ops::Div;

use chrono::TimeDelta;

use crate::quantity::power::Watts;

quantity!(KilowattHours, via: f64, suffix: "kWh", precision: 3);

impl Div<TimeDelta> for KilowattHours {
    type Output = Watts;

    /// Average power needed to transfer the energy within the duration.
    fn div(self, rhs: TimeDelta) -> Self::Output {
        Watts(self.0 * 3_600_000.0 / rhs.as_seconds_f64())
    }
}
