//! Process stream requirements and their identifying types.

use std::{fmt, ops::Deref};

use uom::si::f64::{Power, ThermalConductance, Time};
use uom::si::f64::ThermodynamicTemperature;

use crate::support::{
    constraint::{Constrained, ConstraintResult, NonNegative},
    units::TemperatureDifference,
};

/// Identifies a physical process stream.
///
/// Several requirements may share a stream id, for example when one stream
/// must be cooled through two temperature ranges with different `mCp`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(String);

impl StreamId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a single heating or cooling requirement within the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequirementId(String);

impl RequirementId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a requirement releases heat (hot) or absorbs it (cold).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// The stream must be cooled; it supplies heat.
    Hot,
    /// The stream must be heated; it absorbs heat.
    Cold,
}

/// Heat-capacity flow rate (`m_dot` * `c_p`) of a process stream.
///
/// The value must not be negative; a zero rate is allowed and simply
/// contributes no enthalpy.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CapacityFlowRate(Constrained<ThermalConductance, NonNegative>);

impl CapacityFlowRate {
    /// Create a [`CapacityFlowRate`] from a scalar value.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the value is negative or not a number.
    pub fn new<U>(value: f64) -> ConstraintResult<Self>
    where
        U: uom::si::thermal_conductance::Unit + uom::Conversion<f64, T = f64>,
    {
        Self::from_quantity(ThermalConductance::new::<U>(value))
    }

    /// Create a [`CapacityFlowRate`] from a quantity with thermal-conductance
    /// units.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the quantity is negative or not a number.
    pub fn from_quantity(quantity: ThermalConductance) -> ConstraintResult<Self> {
        Ok(Self(NonNegative::new(quantity)?))
    }
}

impl Deref for CapacityFlowRate {
    type Target = ThermalConductance;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// One contiguous span of time during which a requirement is active.
///
/// Windows share the time axis of the schedule: `start` is measured from the
/// beginning of the scheduling horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationWindow {
    pub start: Time,
    pub duration: Time,
}

impl ActivationWindow {
    #[must_use]
    pub fn new(start: Time, duration: Time) -> Self {
        Self { start, duration }
    }

    pub(crate) fn end(&self) -> Time {
        self.start + self.duration
    }
}

/// A single heating or cooling requirement of a process stream.
///
/// The requirement states that the stream must move from its supply
/// temperature to its target temperature at a given heat-capacity flow rate.
/// Whether the requirement is hot or cold is derived from the two
/// temperatures, never stated separately.
///
/// Requirements are immutable once collected into a
/// [`StreamCatalogue`](super::StreamCatalogue).
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequirement {
    pub id: RequirementId,
    pub stream: StreamId,
    /// Temperature at which the stream enters the recovery system.
    pub supply_temperature: ThermodynamicTemperature,
    /// Temperature the stream must reach.
    pub target_temperature: ThermodynamicTemperature,
    pub capacity_flow: CapacityFlowRate,
    /// Spans during which the requirement applies. Empty means always active.
    pub windows: Vec<ActivationWindow>,
}

impl StreamRequirement {
    /// Whether this requirement supplies or absorbs heat.
    ///
    /// A falling temperature (supply above target) marks a hot stream;
    /// anything else is cold. Equal supply and target temperatures are
    /// rejected during catalogue validation before this distinction matters.
    #[must_use]
    pub fn kind(&self) -> StreamKind {
        if self.supply_temperature > self.target_temperature {
            StreamKind::Hot
        } else {
            StreamKind::Cold
        }
    }

    /// Lower and upper bounds of the temperature range this requirement
    /// spans, regardless of direction.
    #[must_use]
    pub fn temperature_span(&self) -> (ThermodynamicTemperature, ThermodynamicTemperature) {
        if self.supply_temperature > self.target_temperature {
            (self.target_temperature, self.supply_temperature)
        } else {
            (self.supply_temperature, self.target_temperature)
        }
    }

    /// Heat duty of the requirement at full activity: `mCp * |T_in - T_out|`.
    #[must_use]
    pub fn duty(&self) -> Power {
        let (low, high) = self.temperature_span();
        *self.capacity_flow * high.minus(low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{
        power::kilowatt, thermal_conductance::kilowatt_per_kelvin,
        thermodynamic_temperature::degree_celsius,
    };

    fn requirement(supply: f64, target: f64) -> StreamRequirement {
        StreamRequirement {
            id: RequirementId::new("r1"),
            stream: StreamId::new("s1"),
            supply_temperature: ThermodynamicTemperature::new::<degree_celsius>(supply),
            target_temperature: ThermodynamicTemperature::new::<degree_celsius>(target),
            capacity_flow: CapacityFlowRate::new::<kilowatt_per_kelvin>(2.0).unwrap(),
            windows: Vec::new(),
        }
    }

    #[test]
    fn kind_follows_temperature_direction() {
        assert_eq!(requirement(100.0, 50.0).kind(), StreamKind::Hot);
        assert_eq!(requirement(40.0, 90.0).kind(), StreamKind::Cold);
    }

    #[test]
    fn span_is_direction_independent() {
        let hot = requirement(100.0, 50.0);
        let cold = requirement(50.0, 100.0);
        assert_eq!(hot.temperature_span(), cold.temperature_span());
    }

    #[test]
    fn duty_is_rate_times_span() {
        let hot = requirement(100.0, 50.0);
        assert_relative_eq!(hot.duty().get::<kilowatt>(), 100.0);
    }

    #[test]
    fn capacity_flow_rejects_negative_rates() {
        assert!(CapacityFlowRate::new::<kilowatt_per_kelvin>(-1.0).is_err());
        assert!(CapacityFlowRate::new::<kilowatt_per_kelvin>(0.0).is_ok());
    }
}
