//! # Solver configuration
//!
//! All ambient choices are made explicit here and read once when a solver is
//! created; nothing consults global state mid-solve.
use crate::data::rational::{
    div, ArithmeticError, FloatPolicy, FromFloatError, NumericPolicy, Rational,
};

/// Configuration a [`Solver`](crate::algorithm::solver::Solver) is created
/// with.
///
/// The policies govern how values enter the model: explicit division through
/// [`SolverConfig::div`] and float conversion through
/// [`SolverConfig::rational_from_f64`]. They do not relax the solver's own
/// input contract: constraint and flow rates must be NaN-free under every
/// policy, the pivot arithmetic cannot compare NaN.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SolverConfig {
    /// Numeric semantics for division by zero and NaN handling. Problem input
    /// should be built under the same policy the solver runs with.
    pub numeric: NumericPolicy,
    /// How floating point rates entering the model are made exact.
    pub float_conv: FloatPolicy,
}

impl SolverConfig {
    /// The default configuration: strict arithmetic, no floating point input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the numeric policy.
    #[must_use]
    pub fn with_numeric(mut self, numeric: NumericPolicy) -> Self {
        self.numeric = numeric;
        self
    }

    /// Replace the float conversion policy.
    #[must_use]
    pub fn with_float_conv(mut self, float_conv: FloatPolicy) -> Self {
        self.float_conv = float_conv;
        self
    }

    /// Divide two rationals under this configuration's numeric policy.
    ///
    /// # Errors
    ///
    /// See [`div`].
    pub fn div(&self, num: &Rational, den: &Rational) -> Result<Rational, ArithmeticError> {
        div(num, den, &self.numeric)
    }

    /// Convert a floating point rate to an exact rational under this
    /// configuration's float conversion policy.
    ///
    /// # Errors
    ///
    /// See [`Rational::from_f64`].
    pub fn rational_from_f64(&self, value: f64) -> Result<Rational, FromFloatError> {
        Rational::from_f64(value, self.float_conv)
    }
}

#[cfg(test)]
mod test {
    use super::SolverConfig;
    use crate::data::rational::{FloatPolicy, NumericPolicy, Rational, ZeroDivision};
    use crate::rat;

    #[test]
    fn defaults_are_strict() {
        let config = SolverConfig::new();
        assert_eq!(config.numeric.zero_division, ZeroDivision::Error);
        assert!(!config.numeric.allow_nan);
        assert_eq!(config.float_conv, FloatPolicy::Disallow);
    }

    #[test]
    fn builders() {
        let config = SolverConfig::new()
            .with_numeric(NumericPolicy::extended())
            .with_float_conv(FloatPolicy::Round);
        assert!(config.numeric.allow_nan);
        assert_eq!(config.float_conv, FloatPolicy::Round);
    }

    #[test]
    fn division_follows_the_numeric_policy() {
        let strict = SolverConfig::new();
        assert!(strict.div(&rat!(1), &rat!(0)).is_err());

        let extended = SolverConfig::new().with_numeric(NumericPolicy::extended());
        assert_eq!(extended.div(&rat!(1), &rat!(0)), Ok(Rational::infinity()));
    }

    #[test]
    fn float_conversion_follows_the_float_policy() {
        let strict = SolverConfig::new();
        assert!(strict.rational_from_f64(0.5).is_err());

        let rounding = SolverConfig::new().with_float_conv(FloatPolicy::Round);
        assert_eq!(rounding.rational_from_f64(0.5), Ok(rat!(1, 2)));
    }
}
