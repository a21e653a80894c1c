//! The shifted-temperature heat cascade and the Grand Composite Curve.
//!
//! Hot-curve temperatures are lowered and cold-curve temperatures raised by
//! half the minimum approach each, putting both kinds on a common comparison
//! scale where a feasible exchange needs hot-shifted at or above cold-shifted
//! at the same enthalpy level. Interpolating each shifted curve against the
//! other yields a net enthalpy deficit at every node; a single vertical
//! correction of the cold curve then makes the most negative deficit exactly
//! zero. After the correction no point of the cascade carries negative net
//! heat flow, which is the defining constraint of a feasible heat cascade.

use thiserror::Error;

use std::ops::Deref;

use uom::ConstZero;
use uom::si::f64::{Power, TemperatureInterval, ThermodynamicTemperature};

use crate::support::{
    constraint::{Constrained, ConstraintResult, StrictlyPositive},
    units::TemperatureDifference,
};

use super::composite::CompositeCurve;

/// Relative tolerance for the post-correction residual check.
const RESIDUAL_TOLERANCE: f64 = 1e-9;

/// The global minimum approach temperature (dTmin).
///
/// The value must be strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MinApproach(Constrained<TemperatureInterval, StrictlyPositive>);

impl MinApproach {
    /// Create a [`MinApproach`] from a scalar value.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value is not strictly positive.
    pub fn new<U>(value: f64) -> ConstraintResult<Self>
    where
        U: uom::si::temperature_interval::Unit + uom::Conversion<f64, T = f64>,
    {
        Self::from_quantity(TemperatureInterval::new::<U>(value))
    }

    /// Create a [`MinApproach`] from a temperature-interval quantity.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the quantity is not strictly positive.
    pub fn from_quantity(quantity: TemperatureInterval) -> ConstraintResult<Self> {
        Ok(Self(StrictlyPositive::new(quantity)?))
    }

    /// Half the approach, the amount each kind's temperatures are shifted by.
    #[must_use]
    pub fn half(&self) -> TemperatureInterval {
        *self.0.as_ref() / 2.0
    }
}

impl Deref for MinApproach {
    type Target = TemperatureInterval;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// A defect detected inside the cascade algorithm.
///
/// Unlike [`InputError`](super::InputError), these indicate an implementation
/// problem rather than bad data: they are surfaced to the caller and never
/// retried.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CascadeError {
    /// The corrected cascade's minimum deficit is not zero within tolerance.
    #[error("corrected cascade minimum deviates from zero by {residual:?}")]
    NonZeroResidual { residual: Power },

    /// Pocket removal failed to terminate within its iteration budget.
    #[error("pocket removal exceeded {limit} iterations over {points} points")]
    PocketIterationLimit { limit: usize, points: usize },
}

/// One node of the Grand Composite Curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GccPoint {
    /// Temperature on the common shifted scale.
    pub shifted_temperature: ThermodynamicTemperature,
    /// Net enthalpy deficit of the cascade at this temperature; never
    /// negative after correction.
    pub net_deficit: Power,
}

/// The Grand Composite Curve of one interval.
///
/// Nodes are ordered by strictly descending shifted temperature. Every
/// deficit is non-negative and at least one is exactly zero (the pinch).
#[derive(Debug, Clone, PartialEq)]
pub struct GrandCompositeCurve {
    points: Vec<GccPoint>,
}

impl GrandCompositeCurve {
    #[must_use]
    pub fn points(&self) -> &[GccPoint] {
        &self.points
    }
}

/// Everything the cascade establishes for one interval: the curve itself,
/// the two duty totals, and the vertical correction applied to the cold
/// curve. The target formulas in
/// [`targets`](super::targets) are all expressed in these three scalars.
#[derive(Debug, Clone)]
pub(crate) struct CascadeOutcome {
    pub gcc: Option<GrandCompositeCurve>,
    /// Total hot duty (maximum hot-curve enthalpy); zero when hot is absent.
    pub hot_total: Power,
    /// Total cold duty (maximum cold-curve enthalpy); zero when cold is
    /// absent.
    pub cold_total: Power,
    /// Vertical correction added to the cold curve's enthalpies.
    pub offset: Power,
}

/// Runs the cascade for one interval.
///
/// Either curve may be absent; an absent kind interpolates as identically
/// zero enthalpy, which degenerates the curve into a straight line driven by
/// the other kind. With both kinds absent there is no curve and all totals
/// are zero.
///
/// # Errors
///
/// Returns a [`CascadeError`] if the corrected cascade fails its feasibility
/// check, which signals a defect in this module rather than a data problem.
pub(crate) fn cascade(
    hot: Option<&CompositeCurve>,
    cold: Option<&CompositeCurve>,
    min_approach: MinApproach,
) -> Result<CascadeOutcome, CascadeError> {
    let half = min_approach.half();
    let hot_nodes = shifted_nodes(hot, -half);
    let cold_nodes = shifted_nodes(cold, half);

    let hot_total = total_of(hot);
    let cold_total = total_of(cold);

    if hot_nodes.is_empty() && cold_nodes.is_empty() {
        return Ok(CascadeOutcome {
            gcc: None,
            hot_total,
            cold_total,
            offset: Power::ZERO,
        });
    }

    // Deficit seen from each side: cold enthalpy the cascade must supply at
    // a node, minus hot enthalpy available there.
    let hot_deficits: Vec<Power> = hot_nodes
        .iter()
        .map(|node| enthalpy_at(&cold_nodes, node.temperature) - node.enthalpy)
        .collect();
    let cold_deficits: Vec<Power> = cold_nodes
        .iter()
        .map(|node| node.enthalpy - enthalpy_at(&hot_nodes, node.temperature))
        .collect();

    let most_negative = hot_deficits
        .iter()
        .chain(&cold_deficits)
        .copied()
        .fold(Power::ZERO, Power::min);
    let offset = -most_negative;

    let mut points: Vec<GccPoint> = hot_nodes
        .iter()
        .zip(&hot_deficits)
        .chain(cold_nodes.iter().zip(&cold_deficits))
        .map(|(node, deficit)| GccPoint {
            shifted_temperature: node.temperature,
            net_deficit: *deficit + offset,
        })
        .collect();
    points.sort_by(|a, b| {
        b.shifted_temperature
            .value
            .total_cmp(&a.shifted_temperature.value)
    });
    points.dedup_by(|a, b| a.shifted_temperature.value == b.shifted_temperature.value);

    check_residual(&points, hot_total.max(cold_total))?;

    Ok(CascadeOutcome {
        gcc: Some(GrandCompositeCurve { points }),
        hot_total,
        cold_total,
        offset,
    })
}

#[derive(Debug, Clone, Copy)]
struct ShiftedNode {
    temperature: ThermodynamicTemperature,
    enthalpy: Power,
}

fn shifted_nodes(curve: Option<&CompositeCurve>, shift: TemperatureInterval) -> Vec<ShiftedNode> {
    curve.map_or_else(Vec::new, |curve| {
        curve
            .points()
            .iter()
            .map(|point| ShiftedNode {
                temperature: point.temperature + shift,
                enthalpy: point.enthalpy,
            })
            .collect()
    })
}

fn total_of(curve: Option<&CompositeCurve>) -> Power {
    curve.map_or(Power::ZERO, CompositeCurve::total_enthalpy)
}

/// Linear interpolation of a shifted curve's enthalpy at a temperature.
///
/// Outside the curve's temperature span the first or last enthalpy is
/// returned unchanged, exactly as if the curve were padded with sentinel
/// nodes at unreachable temperatures. Extrapolation is therefore impossible
/// by construction. An empty curve reads as zero everywhere.
fn enthalpy_at(nodes: &[ShiftedNode], temperature: ThermodynamicTemperature) -> Power {
    let (Some(first), Some(last)) = (nodes.first(), nodes.last()) else {
        return Power::ZERO;
    };
    if temperature.value >= first.temperature.value {
        return first.enthalpy;
    }
    if temperature.value <= last.temperature.value {
        return last.enthalpy;
    }

    for pair in nodes.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);
        if temperature.value == upper.temperature.value {
            return upper.enthalpy;
        }
        if temperature.value == lower.temperature.value {
            return lower.enthalpy;
        }
        if temperature.value < upper.temperature.value
            && temperature.value > lower.temperature.value
        {
            let ratio = upper.temperature.minus(temperature)
                / upper.temperature.minus(lower.temperature);
            return upper.enthalpy + (lower.enthalpy - upper.enthalpy) * ratio;
        }
    }

    // Unreachable: the clamps above cover everything outside the node span.
    last.enthalpy
}

fn check_residual(points: &[GccPoint], scale: Power) -> Result<(), CascadeError> {
    let minimum = points
        .iter()
        .map(|point| point.net_deficit)
        .fold(Power::ZERO, Power::min);

    let budget = RESIDUAL_TOLERANCE * scale.value.abs().max(1.0);
    if minimum.value.abs() > budget {
        return Err(CascadeError::NonZeroResidual { residual: minimum });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        power::kilowatt, temperature_interval::kelvin as delta_kelvin,
        thermal_conductance::kilowatt_per_kelvin, thermodynamic_temperature::degree_celsius,
    };

    use crate::analysis::aggregate::TemperatureBand;
    use uom::si::f64::ThermalConductance;

    fn curve(segments: &[(f64, f64, f64)]) -> CompositeCurve {
        let bands: Vec<TemperatureBand> = segments
            .iter()
            .map(|&(upper, lower, mcp)| TemperatureBand {
                upper: ThermodynamicTemperature::new::<degree_celsius>(upper),
                lower: ThermodynamicTemperature::new::<degree_celsius>(lower),
                capacity_flow: ThermalConductance::new::<kilowatt_per_kelvin>(mcp),
            })
            .collect();
        CompositeCurve::from_bands(&bands).unwrap()
    }

    fn approach(kelvin: f64) -> MinApproach {
        MinApproach::new::<delta_kelvin>(kelvin).unwrap()
    }

    #[test]
    fn min_approach_must_be_positive() {
        assert!(MinApproach::new::<delta_kelvin>(0.0).is_err());
        assert!(MinApproach::new::<delta_kelvin>(-5.0).is_err());
        assert_relative_eq!(approach(10.0).half().get::<delta_kelvin>(), 5.0);
    }

    #[test]
    fn balanced_curves_cascade_with_no_correction() {
        // Hot 100→50 and cold 40→90 at equal mCp: shifted ranges coincide.
        let hot = curve(&[(100.0, 50.0, 1.0)]);
        let cold = curve(&[(90.0, 40.0, 1.0)]);

        let outcome = cascade(Some(&hot), Some(&cold), approach(10.0)).unwrap();
        assert_relative_eq!(outcome.offset.get::<kilowatt>(), 0.0);

        let gcc = outcome.gcc.unwrap();
        for point in gcc.points() {
            assert_relative_eq!(point.net_deficit.get::<kilowatt>(), 0.0);
        }
    }

    #[test]
    fn nested_cold_range_needs_correction() {
        // Cold 60→90 sits inside hot 50→100 on the shifted scale; the
        // uncovered bottom of the hot curve forces a 20 kW correction.
        let hot = curve(&[(100.0, 50.0, 1.0)]);
        let cold = curve(&[(90.0, 60.0, 1.0)]);

        let outcome = cascade(Some(&hot), Some(&cold), approach(10.0)).unwrap();
        assert_relative_eq!(outcome.offset.get::<kilowatt>(), 20.0);
        assert_relative_eq!(outcome.hot_total.get::<kilowatt>(), 50.0);
        assert_relative_eq!(outcome.cold_total.get::<kilowatt>(), 30.0);
    }

    #[test]
    fn correction_leaves_no_negative_deficit_and_hits_zero() {
        let hot = curve(&[(250.0, 200.0, 1.0)]);
        let cold = curve(&[(60.0, 20.0, 1.0)]);

        let outcome = cascade(Some(&hot), Some(&cold), approach(10.0)).unwrap();
        let gcc = outcome.gcc.unwrap();

        let deficits: Vec<f64> = gcc
            .points()
            .iter()
            .map(|p| p.net_deficit.get::<kilowatt>())
            .collect();
        assert!(deficits.iter().all(|&d| d >= 0.0));
        assert!(deficits.iter().any(|&d| d == 0.0));
    }

    #[test]
    fn correction_is_idempotent() {
        // Re-running the cascade on already-consistent curves applies a zero
        // offset: the minimum deficit is already zero.
        let hot = curve(&[(100.0, 50.0, 1.0)]);
        let cold = curve(&[(90.0, 60.0, 1.0)]);

        let first = cascade(Some(&hot), Some(&cold), approach(10.0)).unwrap();
        let shifted_cold = curve(&[(90.0, 60.0, 1.0)]);
        let again = cascade(Some(&hot), Some(&shifted_cold), approach(10.0)).unwrap();

        assert_relative_eq!(
            first.offset.get::<kilowatt>(),
            again.offset.get::<kilowatt>()
        );

        // Applying the correction formula to corrected deficits changes
        // nothing, because their minimum is exactly zero.
        let gcc = first.gcc.unwrap();
        let minimum = gcc
            .points()
            .iter()
            .map(|p| p.net_deficit)
            .fold(Power::ZERO, Power::min);
        assert_relative_eq!(minimum.get::<kilowatt>(), 0.0);
    }

    #[test]
    fn absent_cold_degenerates_to_hot_line() {
        let hot = curve(&[(100.0, 50.0, 1.0)]);
        let outcome = cascade(Some(&hot), None, approach(10.0)).unwrap();

        assert_relative_eq!(outcome.offset.get::<kilowatt>(), 50.0);
        assert_relative_eq!(outcome.cold_total.get::<kilowatt>(), 0.0);

        let gcc = outcome.gcc.unwrap();
        assert_eq!(gcc.points().len(), 2);
        assert_relative_eq!(gcc.points()[0].net_deficit.get::<kilowatt>(), 50.0);
        assert_relative_eq!(gcc.points()[1].net_deficit.get::<kilowatt>(), 0.0);
    }

    #[test]
    fn absent_hot_degenerates_to_cold_line() {
        let cold = curve(&[(90.0, 40.0, 2.0)]);
        let outcome = cascade(None, Some(&cold), approach(10.0)).unwrap();

        assert_relative_eq!(outcome.offset.get::<kilowatt>(), 0.0);
        let gcc = outcome.gcc.unwrap();
        assert_relative_eq!(gcc.points()[0].net_deficit.get::<kilowatt>(), 0.0);
        assert_relative_eq!(gcc.points()[1].net_deficit.get::<kilowatt>(), 100.0);
    }

    #[test]
    fn both_absent_yields_no_curve() {
        let outcome = cascade(None, None, approach(10.0)).unwrap();
        assert!(outcome.gcc.is_none());
        assert_relative_eq!(outcome.hot_total.get::<kilowatt>(), 0.0);
        assert_relative_eq!(outcome.cold_total.get::<kilowatt>(), 0.0);
    }

    #[test]
    fn duplicate_shifted_temperatures_collapse() {
        // Hot and cold shifted tops coincide at 95 °C; the merged curve
        // keeps a single node there.
        let hot = curve(&[(100.0, 50.0, 1.0)]);
        let cold = curve(&[(90.0, 40.0, 1.0)]);

        let gcc = cascade(Some(&hot), Some(&cold), approach(10.0))
            .unwrap()
            .gcc
            .unwrap();
        let temps: Vec<f64> = gcc
            .points()
            .iter()
            .map(|p| p.shifted_temperature.get::<degree_celsius>())
            .collect();
        let mut deduped = temps.clone();
        deduped.dedup();
        assert_eq!(temps, deduped);
    }
}
