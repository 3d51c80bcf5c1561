use std::fmt::{Debug, Display, Formatter};

/// Ratio rendered as a percentage, `n/a` when it is not finite.
pub struct FormattedPercentage(pub f64);

impl Debug for FormattedPercentage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for FormattedPercentage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_finite() { write!(f, "{:.1}%", self.0 * 100.0) } else { f.write_str("n/a") }
    }
}
