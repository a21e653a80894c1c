//! Pinch location, segment splitting, and pocket removal.
//!
//! The pinch is the highest-temperature node of the corrected Grand
//! Composite Curve whose net deficit is zero; the correction step guarantees
//! one exists. Splitting there yields a heat-source segment above the pinch
//! (hot-stream heat still available for recovery against cold utility) and a
//! heat-sink segment below it (cold-stream demand still to be met). Each
//! segment is returned to physical temperatures and has its pockets removed,
//! leaving the monotone modified Grand Composite Curves that downstream
//! sizing consumers interpolate.

use uom::ConstZero;
use uom::si::f64::{Power, ThermodynamicTemperature};

use crate::support::units::TemperatureDifference;

use super::{
    cascade::{CascadeError, GrandCompositeCurve, MinApproach},
    composite::CurvePoint,
};

/// One monotone segment of the modified Grand Composite Curve.
///
/// Points are ordered from the pinch outward: the first point sits at the
/// pinch with zero enthalpy and enthalpy never decreases from there.
#[derive(Debug, Clone, PartialEq)]
pub struct MgccSegment {
    points: Vec<CurvePoint>,
}

impl MgccSegment {
    #[must_use]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Linear interpolation of the segment's enthalpy at a physical
    /// temperature, clamped to the segment's ends.
    ///
    /// This is the query the storage-size estimator evaluates at two
    /// temperatures to obtain a target duty.
    #[must_use]
    pub fn duty_at(&self, temperature: ThermodynamicTemperature) -> Power {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return Power::ZERO;
        };
        if self.points.len() == 1 {
            return first.enthalpy;
        }

        let ascending = first.temperature.value < last.temperature.value;
        let (low_end, high_end) = if ascending { (first, last) } else { (last, first) };
        if temperature.value <= low_end.temperature.value {
            return low_end.enthalpy;
        }
        if temperature.value >= high_end.temperature.value {
            return high_end.enthalpy;
        }

        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (lo, hi) = if a.temperature.value <= b.temperature.value {
                (a, b)
            } else {
                (b, a)
            };
            if temperature.value >= lo.temperature.value
                && temperature.value <= hi.temperature.value
            {
                if lo.temperature.value == hi.temperature.value {
                    return b.enthalpy;
                }
                let ratio =
                    temperature.minus(lo.temperature) / hi.temperature.minus(lo.temperature);
                return lo.enthalpy + (hi.enthalpy - lo.enthalpy) * ratio;
            }
        }

        high_end.enthalpy
    }
}

/// The pocket-free modified Grand Composite Curve of one interval, split at
/// the pinch and returned to physical temperatures.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedGcc {
    pinch: ThermodynamicTemperature,
    source: MgccSegment,
    sink: MgccSegment,
}

impl ModifiedGcc {
    /// Pinch temperature on the shifted scale.
    #[must_use]
    pub fn pinch_temperature(&self) -> ThermodynamicTemperature {
        self.pinch
    }

    /// The above-pinch segment in physical hot-stream temperatures:
    /// heat the hot streams still hold at and above each temperature.
    #[must_use]
    pub fn source(&self) -> &MgccSegment {
        &self.source
    }

    /// The below-pinch segment in physical cold-stream temperatures:
    /// heating demand still unmet at and below each temperature.
    #[must_use]
    pub fn sink(&self) -> &MgccSegment {
        &self.sink
    }
}

/// Splits a corrected Grand Composite Curve at its pinch and removes the
/// pockets from both segments.
///
/// # Errors
///
/// Returns a [`CascadeError`] if pocket removal overruns its iteration
/// budget, which signals a defect in this module.
pub(crate) fn split_at_pinch(
    gcc: &GrandCompositeCurve,
    min_approach: MinApproach,
) -> Result<ModifiedGcc, CascadeError> {
    let points = gcc.points();
    let minimum = points
        .iter()
        .map(|point| point.net_deficit)
        .fold(Power::ZERO, Power::min);
    let pinch_index = points
        .iter()
        .position(|point| point.net_deficit == minimum)
        .unwrap_or(0);
    let pinch = points[pinch_index].shifted_temperature;

    let half = min_approach.half();

    // Above the pinch the surplus belongs to the hot streams, whose
    // temperatures were shifted down; walking the slice backwards orders it
    // from the pinch outward (rising temperature).
    let source: Vec<CurvePoint> = points[..=pinch_index]
        .iter()
        .rev()
        .map(|point| CurvePoint {
            enthalpy: point.net_deficit,
            temperature: point.shifted_temperature + half,
        })
        .collect();

    // Below the pinch the demand belongs to the cold streams, whose
    // temperatures were shifted up; the slice is already ordered from the
    // pinch outward (falling temperature).
    let sink: Vec<CurvePoint> = points[pinch_index..]
        .iter()
        .map(|point| CurvePoint {
            enthalpy: point.net_deficit,
            temperature: point.shifted_temperature - half,
        })
        .collect();

    Ok(ModifiedGcc {
        pinch,
        source: MgccSegment {
            points: remove_pockets(source)?,
        },
        sink: MgccSegment {
            points: remove_pockets(sink)?,
        },
    })
}

/// Collapses the pockets of a segment ordered from the pinch outward.
///
/// A pocket is a stretch where enthalpy falls back below an earlier value:
/// heat that recovers internally without helping the external target. The
/// segment is folded through a stack: a point that undercuts the stack top
/// pops every covered point, records the boundary of the popped run, and
/// replaces it with the interpolated crossing of the rising edge at the
/// undercut enthalpy. Equal enthalpies never pop, so plateaus survive and a
/// monotone segment passes through untouched.
fn remove_pockets(points: Vec<CurvePoint>) -> Result<Vec<CurvePoint>, CascadeError> {
    let limit = 2 * points.len();
    let mut iters = 0usize;
    let mut kept: Vec<CurvePoint> = Vec::with_capacity(points.len());

    for point in points {
        iters += 1;
        if iters > limit {
            return Err(CascadeError::PocketIterationLimit {
                limit,
                points: kept.len(),
            });
        }

        let mut boundary: Option<CurvePoint> = None;
        while kept
            .last()
            .is_some_and(|top| top.enthalpy > point.enthalpy)
        {
            iters += 1;
            if iters > limit {
                return Err(CascadeError::PocketIterationLimit {
                    limit,
                    points: kept.len(),
                });
            }
            boundary = kept.pop();
        }

        if let (Some(anchor), Some(boundary)) = (kept.last().copied(), boundary) {
            if anchor.enthalpy < point.enthalpy {
                let ratio = (point.enthalpy - anchor.enthalpy)
                    / (boundary.enthalpy - anchor.enthalpy);
                kept.push(CurvePoint {
                    enthalpy: point.enthalpy,
                    temperature: anchor.temperature
                        + boundary.temperature.minus(anchor.temperature) * ratio,
                });
            }
        }

        kept.push(point);
    }

    Ok(kept)
}
