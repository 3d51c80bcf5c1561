use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Utc};

pub type Interval<Tz = Utc> = RangeExclusive<DateTime<Tz>>;

#[must_use]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct RangeExclusive<T: Copy> {
    /// Inclusive.
    pub start: T,

    /// Exclusive.
    pub end: T,
}

impl<T: Copy + Debug> Debug for RangeExclusive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl<T: Copy> RangeExclusive<T> {
    pub const fn from_std(range: std::ops::Range<T>) -> Self {
        Self { start: range.start, end: range.end }
    }
}

impl<T: Copy + PartialOrd> RangeExclusive<T> {
    #[must_use]
    pub fn contains(self, other: T) -> bool {
        (self.start <= other) && (other < self.end)
    }

    /// Whether the two half-open ranges share at least one point.
    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        (self.start < other.end) && (other.start < self.end)
    }
}
