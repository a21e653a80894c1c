//! Aggregation of stream requirements into temperature bands.
//!
//! For one kind and one interval, the active requirements are merged into a
//! ladder of temperature bands. Band boundaries are the union of the active
//! requirements' endpoint temperatures; within a band the heat-capacity flow
//! rates of every requirement spanning it add up, each scaled by its activity
//! fraction. The bands are what the composite-curve builder integrates.

use uom::si::f64::{ThermalConductance, ThermodynamicTemperature};

use super::{
    catalogue::StreamCatalogue,
    schedule::ActivityMap,
    stream::{StreamKind, StreamRequirement},
};

/// One temperature band with the summed capacity flow of the requirements
/// covering it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TemperatureBand {
    pub upper: ThermodynamicTemperature,
    pub lower: ThermodynamicTemperature,
    pub capacity_flow: ThermalConductance,
}

/// Builds the descending band ladder for one kind in one interval.
///
/// Requirements with zero activity are treated as absent; this is how
/// intermittent streams drop out of an interval without leaving the
/// catalogue. Returns an empty ladder when fewer than two distinct
/// temperature nodes remain.
pub(crate) fn temperature_bands(
    catalogue: &StreamCatalogue,
    activity: &ActivityMap,
    interval_index: usize,
    kind: StreamKind,
) -> Vec<TemperatureBand> {
    let active: Vec<(&StreamRequirement, f64)> = catalogue
        .requirements()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.kind() == kind)
        .map(|(i, r)| (r, activity.fraction(i, interval_index)))
        .filter(|(_, fraction)| *fraction > 0.0)
        .collect();

    let mut nodes: Vec<ThermodynamicTemperature> = active
        .iter()
        .flat_map(|(r, _)| {
            let (low, high) = r.temperature_span();
            [low, high]
        })
        .collect();
    nodes.sort_by(|a, b| b.value.total_cmp(&a.value));
    nodes.dedup_by(|a, b| a.value == b.value);

    nodes
        .windows(2)
        .map(|pair| {
            let (upper, lower) = (pair[0], pair[1]);
            let capacity_flow = active
                .iter()
                .filter(|(r, _)| {
                    let (low, high) = r.temperature_span();
                    low.value <= lower.value && high.value >= upper.value
                })
                .map(|(r, fraction)| *fraction * *r.capacity_flow)
                .sum();
            TemperatureBand {
                upper,
                lower,
                capacity_flow,
            }
        })
        .collect()
}
