quantity!(Amperes, via: f64, suffix: "A", precision: 2);

impl Amperes {
    /// No constraint at all.
    pub const INFINITY: Self = Self(f64::INFINITY);

    /// Relative change from `previous` to `self`.
    ///
    /// `NaN` when both are zero, infinite when only `previous` is zero.
    #[must_use]
    pub fn relative_change_from(self, previous: Self) -> f64 {
        (self.0 - previous.0).abs() / previous.0.abs()
    }
}
