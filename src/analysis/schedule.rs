//! Scheduling intervals and per-interval stream activity.

use uom::si::f64::Time;
use uom::ConstZero;

use crate::support::constraint::{Constrained, StrictlyPositive, UnitInterval};

use super::{
    catalogue::{InputError, StreamCatalogue},
    stream::StreamRequirement,
};

/// Fractional intensity with which a requirement is active in an interval.
pub type ActivityFraction = Constrained<f64, UnitInterval>;

/// One interval of the scheduling horizon.
///
/// Intervals partition the horizon back to back: interval `i` starts where
/// interval `i - 1` ends and the first interval starts at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub index: usize,
    start: Time,
    duration: Time,
}

impl Interval {
    /// Offset of the interval from the beginning of the horizon.
    #[must_use]
    pub fn start(&self) -> Time {
        self.start
    }

    #[must_use]
    pub fn duration(&self) -> Time {
        self.duration
    }

    #[must_use]
    pub fn end(&self) -> Time {
        self.start + self.duration
    }
}

/// The ordered list of scheduling intervals.
#[derive(Debug, Clone)]
pub struct Schedule {
    intervals: Vec<Interval>,
}

impl Schedule {
    /// Builds a schedule from consecutive interval durations.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] naming the first interval whose duration is
    /// not strictly positive.
    pub fn new(durations: impl IntoIterator<Item = Time>) -> Result<Self, InputError> {
        let mut intervals = Vec::new();
        let mut start = Time::ZERO;

        for (index, duration) in durations.into_iter().enumerate() {
            StrictlyPositive::new(duration)
                .map_err(|source| InputError::InvalidDuration { index, source })?;
            intervals.push(Interval {
                index,
                start,
                duration,
            });
            start += duration;
        }

        Ok(Self { intervals })
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Activity fractions for every (requirement, interval) pair.
///
/// Computed once per analysis from the activation windows. A requirement
/// without windows is active everywhere; otherwise its fraction in an
/// interval is the window overlap divided by the interval duration, clamped
/// to the unit interval so that overlapping windows cannot push it past one.
#[derive(Debug, Clone)]
pub(crate) struct ActivityMap {
    /// Indexed `[requirement][interval]`, requirement order matching the
    /// catalogue's id-sorted order.
    fractions: Vec<Vec<ActivityFraction>>,
}

impl ActivityMap {
    pub(crate) fn new(catalogue: &StreamCatalogue, schedule: &Schedule) -> Self {
        let fractions = catalogue
            .requirements()
            .iter()
            .map(|requirement| {
                schedule
                    .intervals()
                    .iter()
                    .map(|interval| fraction_of(requirement, interval))
                    .collect()
            })
            .collect();

        Self { fractions }
    }

    /// An activity map that pins every pair to full activity, used when the
    /// interval machinery is deliberately ignored (the `qmax` query).
    pub(crate) fn always_active(requirement_count: usize) -> Self {
        let one = UnitInterval::new(1.0).expect("one is within the unit interval");
        Self {
            fractions: vec![vec![one]; requirement_count],
        }
    }

    pub(crate) fn fraction(&self, requirement_index: usize, interval_index: usize) -> f64 {
        self.fractions[requirement_index][interval_index].into_inner()
    }
}

fn fraction_of(requirement: &StreamRequirement, interval: &Interval) -> ActivityFraction {
    let raw = if requirement.windows.is_empty() {
        1.0
    } else {
        let overlap: Time = requirement
            .windows
            .iter()
            .map(|window| {
                let lo = window.start.max(interval.start());
                let hi = window.end().min(interval.end());
                (hi - lo).max(Time::ZERO)
            })
            .sum();
        (overlap / interval.duration()).value
    };

    UnitInterval::new(raw.min(1.0)).expect("clamped fraction is within the unit interval")
}
