use crate::{ops::Interval, prelude::*, quantity::price::EurocentsPerMegawattHour};

/// Day-ahead price valid over a non-empty half-open interval.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ElectricityPrice {
    interval: Interval,
    value: EurocentsPerMegawattHour,
}

impl ElectricityPrice {
    pub fn try_new(interval: Interval, value: EurocentsPerMegawattHour) -> Result<Self> {
        ensure!(interval.end > interval.start, "price interval `{interval:?}` is empty");
        Ok(Self { interval, value })
    }

    pub const fn interval(&self) -> Interval {
        self.interval
    }

    pub const fn value(&self) -> EurocentsPerMegawattHour {
        self.value
    }
}
