//! Unit helpers for working with `uom` quantities.

use uom::si::{
    f64::{TemperatureInterval, ThermodynamicTemperature},
    temperature_interval::kelvin as delta_kelvin,
    thermodynamic_temperature::kelvin as abs_kelvin,
};

/// Extension trait for computing temperature differences.
///
/// `uom` deliberately does not implement `Sub` between two
/// [`ThermodynamicTemperature`] values, because the result is a
/// [`TemperatureInterval`] rather than another absolute temperature. Pinch
/// analysis subtracts temperatures constantly (segment gaps, interpolation
/// spans), so this trait provides the missing operation as
/// [`minus`](Self::minus).
///
/// [`TemperatureInterval`]: uom::si::f64::TemperatureInterval
/// [`ThermodynamicTemperature`]: uom::si::f64::ThermodynamicTemperature
pub trait TemperatureDifference {
    /// Returns the temperature difference `self - other`.
    fn minus(self, other: Self) -> TemperatureInterval;
}

impl TemperatureDifference for ThermodynamicTemperature {
    fn minus(self, other: Self) -> TemperatureInterval {
        TemperatureInterval::new::<delta_kelvin>(
            self.get::<abs_kelvin>() - other.get::<abs_kelvin>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::thermodynamic_temperature::degree_celsius;

    #[test]
    fn difference_between_absolute_temperatures() {
        let hot = ThermodynamicTemperature::new::<degree_celsius>(100.0);
        let cold = ThermodynamicTemperature::new::<degree_celsius>(50.0);

        assert_relative_eq!(hot.minus(cold).get::<delta_kelvin>(), 50.0);
        assert_relative_eq!(cold.minus(hot).get::<delta_kelvin>(), -50.0);
    }
}
