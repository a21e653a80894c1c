//! Utility and recovery targets, per interval and aggregated.

use thiserror::Error;

use uom::ConstZero;
use uom::si::f64::{Energy, Power, TemperatureInterval, Time};

use super::{
    aggregate::temperature_bands,
    cascade::{cascade, CascadeError, GrandCompositeCurve, MinApproach},
    catalogue::{InputError, StreamCatalogue},
    composite::CompositeCurve,
    pinch::{split_at_pinch, ModifiedGcc},
    schedule::{ActivityMap, Interval, Schedule},
    stream::{RequirementId, StreamKind, StreamRequirement},
};

/// Any failure of a pinch analysis run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The caller-supplied data is invalid.
    #[error("invalid input data")]
    Input(#[from] InputError),

    /// The cascade violated one of its own invariants.
    #[error("cascade algorithm defect")]
    Cascade(#[from] CascadeError),
}

/// Scalar targets of one interval.
///
/// All three values are non-negative, and
/// `hot_utility - cold_utility` equals the interval's cold duty minus its hot
/// duty exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTargets {
    /// External heating demand left after maximum recovery.
    pub hot_utility: Power,
    /// External cooling demand left after maximum recovery.
    pub cold_utility: Power,
    /// Heat transferred internally from hot to cold streams.
    pub heat_recovery: Power,
}

/// Duration-weighted totals over the whole schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateTargets {
    pub hot_utility: Energy,
    pub cold_utility: Energy,
    pub heat_recovery: Energy,
}

impl AggregateTargets {
    fn zero() -> Self {
        Self {
            hot_utility: Energy::ZERO,
            cold_utility: Energy::ZERO,
            heat_recovery: Energy::ZERO,
        }
    }

    fn accumulate(&mut self, targets: &IntervalTargets, duration: Time) {
        self.hot_utility += targets.hot_utility * duration;
        self.cold_utility += targets.cold_utility * duration;
        self.heat_recovery += targets.heat_recovery * duration;
    }
}

/// Everything derived for one interval.
#[derive(Debug, Clone)]
pub struct IntervalAnalysis {
    pub interval: Interval,
    /// `None` when the interval has no active hot requirement.
    pub hot_composite: Option<CompositeCurve>,
    /// `None` when the interval has no active cold requirement.
    pub cold_composite: Option<CompositeCurve>,
    /// `None` when both kinds are absent.
    pub grand_composite: Option<GrandCompositeCurve>,
    /// `None` when both kinds are absent.
    pub modified: Option<ModifiedGcc>,
    pub targets: IntervalTargets,
}

/// The full output of a pinch analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisResults {
    /// Per-interval curves and targets, in schedule order.
    pub intervals: Vec<IntervalAnalysis>,
    /// Duration-weighted totals over all intervals.
    pub totals: AggregateTargets,
}

/// A configured pinch analysis over a catalogue and a schedule.
///
/// The analysis is a pure function of its three inputs: it holds no state of
/// its own and recomputes every derived quantity on each call. Intervals are
/// mutually independent; each is cascaded on its own and only the
/// duration-weighted reduction ties them together.
///
/// # Example
///
/// ```
/// use pinch_cascade::analysis::{
///     PinchAnalysis, Schedule, StreamCatalogue,
///     stream::{CapacityFlowRate, RequirementId, StreamId, StreamRequirement},
/// };
/// use uom::si::{
///     f64::{TemperatureInterval, ThermodynamicTemperature, Time},
///     temperature_interval::kelvin,
///     thermal_conductance::kilowatt_per_kelvin,
///     thermodynamic_temperature::degree_celsius,
///     time::hour,
/// };
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let catalogue = StreamCatalogue::new(vec![
///         StreamRequirement {
///             id: RequirementId::new("h1"),
///             stream: StreamId::new("reactor"),
///             supply_temperature: ThermodynamicTemperature::new::<degree_celsius>(100.0),
///             target_temperature: ThermodynamicTemperature::new::<degree_celsius>(50.0),
///             capacity_flow: CapacityFlowRate::new::<kilowatt_per_kelvin>(1.0)?,
///             windows: Vec::new(),
///         },
///         StreamRequirement {
///             id: RequirementId::new("c1"),
///             stream: StreamId::new("feed"),
///             supply_temperature: ThermodynamicTemperature::new::<degree_celsius>(40.0),
///             target_temperature: ThermodynamicTemperature::new::<degree_celsius>(90.0),
///             capacity_flow: CapacityFlowRate::new::<kilowatt_per_kelvin>(1.0)?,
///             windows: Vec::new(),
///         },
///     ])?;
///     let schedule = Schedule::new([Time::new::<hour>(1.0)])?;
///
///     let analysis = PinchAnalysis::new(
///         &catalogue,
///         &schedule,
///         TemperatureInterval::new::<kelvin>(10.0),
///     )?;
///     let results = analysis.solve()?;
///
///     let targets = &results.intervals[0].targets;
///     assert!(targets.heat_recovery > targets.hot_utility);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PinchAnalysis<'a> {
    catalogue: &'a StreamCatalogue,
    schedule: &'a Schedule,
    min_approach: MinApproach,
}

impl<'a> PinchAnalysis<'a> {
    /// Configures an analysis.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] if the minimum approach temperature is not
    /// strictly positive.
    pub fn new(
        catalogue: &'a StreamCatalogue,
        schedule: &'a Schedule,
        min_approach: TemperatureInterval,
    ) -> Result<Self, InputError> {
        let min_approach = MinApproach::from_quantity(min_approach)
            .map_err(|source| InputError::InvalidMinApproach { source })?;
        Ok(Self {
            catalogue,
            schedule,
            min_approach,
        })
    }

    /// Runs the full pipeline for every interval.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalysisError`] if the cascade detects a violated
    /// invariant. Input data was already validated when the catalogue and
    /// schedule were constructed.
    pub fn solve(&self) -> Result<AnalysisResults, AnalysisError> {
        let activity = ActivityMap::new(self.catalogue, self.schedule);

        let mut intervals = Vec::with_capacity(self.schedule.len());
        let mut totals = AggregateTargets::zero();

        for interval in self.schedule.intervals() {
            let analysis =
                analyse_interval(self.catalogue, &activity, *interval, self.min_approach)?;
            totals.accumulate(&analysis.targets, interval.duration());
            intervals.push(analysis);
        }

        Ok(AnalysisResults { intervals, totals })
    }

    /// Maximum heat exchangeable between two requirement subsets.
    ///
    /// Subset `sources` contributes its hot requirements and subset `sinks`
    /// its cold requirements; the interval and activity machinery is ignored
    /// (every requirement counts at full intensity). External linearization
    /// routines use this scalar to bound auxiliary approximations.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalysisError`] naming the first id that is not in the
    /// catalogue.
    pub fn qmax(
        &self,
        sources: &[RequirementId],
        sinks: &[RequirementId],
    ) -> Result<Power, AnalysisError> {
        let hot = self.subset_curve(sources, StreamKind::Hot)?;
        let cold = self.subset_curve(sinks, StreamKind::Cold)?;

        let outcome = cascade(hot.as_ref(), cold.as_ref(), self.min_approach)?;
        Ok(outcome.hot_total - outcome.offset)
    }

    fn subset_curve(
        &self,
        ids: &[RequirementId],
        kind: StreamKind,
    ) -> Result<Option<CompositeCurve>, AnalysisError> {
        let requirements: Vec<StreamRequirement> = ids
            .iter()
            .map(|id| self.catalogue.get(id).cloned())
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|r| r.kind() == kind)
            .collect();

        let subset = StreamCatalogue::new(requirements).map_err(AnalysisError::Input)?;
        let activity = ActivityMap::always_active(subset.len());
        let bands = temperature_bands(&subset, &activity, 0, kind);
        Ok(CompositeCurve::from_bands(&bands))
    }
}

fn analyse_interval(
    catalogue: &StreamCatalogue,
    activity: &ActivityMap,
    interval: Interval,
    min_approach: MinApproach,
) -> Result<IntervalAnalysis, AnalysisError> {
    let hot_composite = CompositeCurve::from_bands(&temperature_bands(
        catalogue,
        activity,
        interval.index,
        StreamKind::Hot,
    ));
    let cold_composite = CompositeCurve::from_bands(&temperature_bands(
        catalogue,
        activity,
        interval.index,
        StreamKind::Cold,
    ));

    let outcome = cascade(
        hot_composite.as_ref(),
        cold_composite.as_ref(),
        min_approach,
    )?;

    let targets = IntervalTargets {
        hot_utility: outcome.cold_total + outcome.offset - outcome.hot_total,
        cold_utility: outcome.offset,
        heat_recovery: outcome.hot_total - outcome.offset,
    };

    let modified = outcome
        .gcc
        .as_ref()
        .map(|gcc| split_at_pinch(gcc, min_approach))
        .transpose()?;

    Ok(IntervalAnalysis {
        interval,
        hot_composite,
        cold_composite,
        grand_composite: outcome.gcc,
        modified,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        energy::megawatt_hour, f64::ThermodynamicTemperature, power::megawatt,
        temperature_interval::kelvin as delta_kelvin, thermal_conductance::kilowatt_per_kelvin,
        thermodynamic_temperature::degree_celsius, time::hour,
    };

    use crate::analysis::stream::{ActivationWindow, CapacityFlowRate, StreamId};

    /// A requirement with mCp given in MW/K.
    fn requirement(id: &str, supply: f64, target: f64, mcp_mw_per_k: f64) -> StreamRequirement {
        StreamRequirement {
            id: RequirementId::new(id),
            stream: StreamId::new(id),
            supply_temperature: ThermodynamicTemperature::new::<degree_celsius>(supply),
            target_temperature: ThermodynamicTemperature::new::<degree_celsius>(target),
            capacity_flow: CapacityFlowRate::new::<kilowatt_per_kelvin>(mcp_mw_per_k * 1000.0)
                .unwrap(),
            windows: Vec::new(),
        }
    }

    fn solve(
        requirements: Vec<StreamRequirement>,
        durations: &[f64],
        approach_kelvin: f64,
    ) -> AnalysisResults {
        let catalogue = StreamCatalogue::new(requirements).unwrap();
        let schedule =
            Schedule::new(durations.iter().map(|&h| Time::new::<hour>(h))).unwrap();
        PinchAnalysis::new(
            &catalogue,
            &schedule,
            TemperatureInterval::new::<delta_kelvin>(approach_kelvin),
        )
        .unwrap()
        .solve()
        .unwrap()
    }

    #[test]
    fn balanced_ranges_need_no_utility() {
        // Hot 100→50 °C and cold 40→90 °C at 1 MW/K with a 10 K approach:
        // the shifted ranges coincide and all 50 MW recovers internally.
        let results = solve(
            vec![
                requirement("h1", 100.0, 50.0, 1.0),
                requirement("c1", 40.0, 90.0, 1.0),
            ],
            &[1.0],
            10.0,
        );

        let targets = &results.intervals[0].targets;
        assert_relative_eq!(targets.hot_utility.get::<megawatt>(), 0.0);
        assert_relative_eq!(targets.cold_utility.get::<megawatt>(), 0.0);
        assert_relative_eq!(targets.heat_recovery.get::<megawatt>(), 50.0);
        assert_relative_eq!(results.totals.heat_recovery.get::<megawatt_hour>(), 50.0);
    }

    #[test]
    fn nested_cold_range_needs_cold_utility_only() {
        // The cold range 60→90 °C nests inside the hot range on the shifted
        // scale: all 30 MW of cold duty recovers, the uncovered 20 MW of hot
        // duty goes to cold utility.
        let results = solve(
            vec![
                requirement("h1", 100.0, 50.0, 1.0),
                requirement("c1", 60.0, 90.0, 1.0),
            ],
            &[1.0],
            10.0,
        );

        let targets = &results.intervals[0].targets;
        assert_relative_eq!(targets.hot_utility.get::<megawatt>(), 0.0);
        assert_relative_eq!(targets.cold_utility.get::<megawatt>(), 20.0);
        assert_relative_eq!(targets.heat_recovery.get::<megawatt>(), 30.0);
    }

    #[test]
    fn disjoint_ranges_recover_nothing() {
        let results = solve(
            vec![
                requirement("h1", 250.0, 200.0, 1.0),
                requirement("c1", 20.0, 60.0, 1.0),
            ],
            &[1.0],
            10.0,
        );

        let targets = &results.intervals[0].targets;
        assert_relative_eq!(targets.heat_recovery.get::<megawatt>(), 0.0);
        assert_relative_eq!(targets.hot_utility.get::<megawatt>(), 40.0);
        assert_relative_eq!(targets.cold_utility.get::<megawatt>(), 50.0);
    }

    #[test]
    fn totals_weight_intervals_by_duration() {
        // Two intervals of 2 h and 1 h with identical activity: recovery
        // aggregates linearly in duration.
        let results = solve(
            vec![
                requirement("h1", 100.0, 50.0, 1.0),
                requirement("c1", 60.0, 90.0, 1.0),
            ],
            &[2.0, 1.0],
            10.0,
        );

        assert_relative_eq!(results.totals.heat_recovery.get::<megawatt_hour>(), 90.0);
        assert_relative_eq!(results.totals.cold_utility.get::<megawatt_hour>(), 60.0);
    }

    #[test]
    fn utility_difference_balances_duty_difference() {
        // hotUtility - coldUtility = coldDuty - hotDuty, exactly, whatever
        // the stream population looks like.
        let requirements = vec![
            requirement("h1", 180.0, 60.0, 0.7),
            requirement("h2", 120.0, 40.0, 1.3),
            requirement("c1", 30.0, 130.0, 0.9),
            requirement("c2", 70.0, 150.0, 1.1),
        ];
        let hot_duty: f64 = (180.0 - 60.0) * 0.7 + (120.0 - 40.0) * 1.3;
        let cold_duty: f64 = (130.0 - 30.0) * 0.9 + (150.0 - 70.0) * 1.1;

        let results = solve(requirements, &[1.0], 10.0);
        let targets = &results.intervals[0].targets;

        assert_relative_eq!(
            targets.hot_utility.get::<megawatt>() - targets.cold_utility.get::<megawatt>(),
            cold_duty - hot_duty,
            epsilon = 1e-9
        );
    }

    #[test]
    fn interval_without_active_streams_targets_zero() {
        // The single requirement's window misses the second interval
        // entirely, leaving it fully degenerate.
        let mut hot = requirement("h1", 100.0, 50.0, 1.0);
        hot.windows
            .push(ActivationWindow::new(Time::new::<hour>(0.0), Time::new::<hour>(1.0)));

        let results = solve(vec![hot], &[1.0, 1.0], 10.0);

        let idle = &results.intervals[1];
        assert!(idle.hot_composite.is_none());
        assert!(idle.grand_composite.is_none());
        assert_relative_eq!(idle.targets.hot_utility.get::<megawatt>(), 0.0);
        assert_relative_eq!(idle.targets.cold_utility.get::<megawatt>(), 0.0);
        assert_relative_eq!(idle.targets.heat_recovery.get::<megawatt>(), 0.0);
    }

    #[test]
    fn hot_only_interval_needs_cold_utility_for_all_duty() {
        let results = solve(vec![requirement("h1", 100.0, 50.0, 1.0)], &[1.0], 10.0);

        let targets = &results.intervals[0].targets;
        assert_relative_eq!(targets.hot_utility.get::<megawatt>(), 0.0);
        assert_relative_eq!(targets.cold_utility.get::<megawatt>(), 50.0);
        assert_relative_eq!(targets.heat_recovery.get::<megawatt>(), 0.0);
        assert!(results.intervals[0].grand_composite.is_some());
    }

    #[test]
    fn curves_are_published_per_interval() {
        let results = solve(
            vec![
                requirement("h1", 100.0, 50.0, 1.0),
                requirement("c1", 40.0, 90.0, 1.0),
            ],
            &[1.0],
            10.0,
        );

        let interval = &results.intervals[0];
        assert!(interval.hot_composite.is_some());
        assert!(interval.cold_composite.is_some());
        assert!(interval.grand_composite.is_some());
        assert!(interval.modified.is_some());
    }

    #[test]
    fn qmax_matches_recoverable_heat_between_subsets() {
        let catalogue = StreamCatalogue::new(vec![
            requirement("h1", 100.0, 50.0, 1.0),
            requirement("c1", 60.0, 90.0, 1.0),
        ])
        .unwrap();
        let schedule = Schedule::new([Time::new::<hour>(1.0)]).unwrap();
        let analysis = PinchAnalysis::new(
            &catalogue,
            &schedule,
            TemperatureInterval::new::<delta_kelvin>(10.0),
        )
        .unwrap();

        let q = analysis
            .qmax(
                &[RequirementId::new("h1")],
                &[RequirementId::new("c1")],
            )
            .unwrap();
        assert_relative_eq!(q.get::<megawatt>(), 30.0);
    }

    #[test]
    fn qmax_with_empty_subset_is_zero() {
        let catalogue =
            StreamCatalogue::new(vec![requirement("h1", 100.0, 50.0, 1.0)]).unwrap();
        let schedule = Schedule::new([Time::new::<hour>(1.0)]).unwrap();
        let analysis = PinchAnalysis::new(
            &catalogue,
            &schedule,
            TemperatureInterval::new::<delta_kelvin>(10.0),
        )
        .unwrap();

        let q = analysis.qmax(&[RequirementId::new("h1")], &[]).unwrap();
        assert_relative_eq!(q.get::<megawatt>(), 0.0);
    }

    #[test]
    fn qmax_rejects_unknown_ids() {
        let catalogue =
            StreamCatalogue::new(vec![requirement("h1", 100.0, 50.0, 1.0)]).unwrap();
        let schedule = Schedule::new([Time::new::<hour>(1.0)]).unwrap();
        let analysis = PinchAnalysis::new(
            &catalogue,
            &schedule,
            TemperatureInterval::new::<delta_kelvin>(10.0),
        )
        .unwrap();

        let result = analysis.qmax(&[RequirementId::new("nope")], &[]);
        assert!(matches!(
            result,
            Err(AnalysisError::Input(InputError::UnknownRequirement { .. }))
        ));
    }

    #[test]
    fn rejects_non_positive_approach() {
        let catalogue = StreamCatalogue::new(Vec::new()).unwrap();
        let schedule = Schedule::new([Time::new::<hour>(1.0)]).unwrap();
        let result = PinchAnalysis::new(
            &catalogue,
            &schedule,
            TemperatureInterval::new::<delta_kelvin>(0.0),
        );
        assert!(matches!(
            result,
            Err(InputError::InvalidMinApproach { .. })
        ));
    }
}
