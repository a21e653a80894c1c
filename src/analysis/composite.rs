//! Composite curves: cumulative enthalpy versus temperature for one kind.

use uom::ConstZero;
use uom::si::f64::{Power, ThermodynamicTemperature};

use crate::support::units::TemperatureDifference;

use super::aggregate::TemperatureBand;

/// One vertex of a composite curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    /// Cumulative enthalpy, measured from the curve's highest temperature.
    pub enthalpy: Power,
    pub temperature: ThermodynamicTemperature,
}

/// The aggregated temperature-enthalpy profile of all hot or all cold
/// requirements active in one interval.
///
/// Points are ordered by strictly descending temperature. The first point
/// carries zero enthalpy and enthalpy never decreases from there, so the
/// final point carries the kind's total duty for the interval.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCurve {
    points: Vec<CurvePoint>,
}

impl CompositeCurve {
    /// Integrates a band ladder into a curve.
    ///
    /// Returns `None` for an empty ladder: a kind with no active
    /// requirements has no curve for the interval, and downstream stages
    /// treat it as contributing nothing. This is the degenerate-interval
    /// case, not an error.
    pub(crate) fn from_bands(bands: &[TemperatureBand]) -> Option<Self> {
        let first = bands.first()?;

        let mut points = Vec::with_capacity(bands.len() + 1);
        points.push(CurvePoint {
            enthalpy: Power::ZERO,
            temperature: first.upper,
        });

        let mut enthalpy = Power::ZERO;
        for band in bands {
            enthalpy += band.capacity_flow * band.upper.minus(band.lower);
            points.push(CurvePoint {
                enthalpy,
                temperature: band.lower,
            });
        }

        Some(Self { points })
    }

    /// Curve vertices in descending temperature order.
    #[must_use]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Total duty of the kind in this interval.
    #[must_use]
    pub fn total_enthalpy(&self) -> Power {
        self.points
            .last()
            .map_or(Power::ZERO, |point| point.enthalpy)
    }
}
