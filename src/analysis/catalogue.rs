//! The validated collection of stream requirements.

use thiserror::Error;

use crate::support::constraint::{ConstraintError, NonNegative};

use super::stream::{RequirementId, StreamRequirement};

/// An error in caller-supplied input data.
///
/// Input errors are never recovered from internally: the offending
/// requirement or interval is named and the caller must fix the data. No
/// partial results are produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Two requirements share the same id.
    #[error("requirement `{id}` is listed more than once")]
    DuplicateRequirement { id: RequirementId },

    /// A requirement's supply and target temperatures are equal, so its kind
    /// and duty are undefined.
    #[error("requirement `{id}` has equal supply and target temperatures")]
    ZeroTemperatureSpan { id: RequirementId },

    /// A requirement carries a NaN or infinite temperature.
    #[error("requirement `{id}` has a non-finite temperature")]
    NonFiniteTemperature { id: RequirementId },

    /// An activation window has a negative start or duration.
    #[error("requirement `{id}` has an invalid activation window")]
    InvalidWindow {
        id: RequirementId,
        source: ConstraintError,
    },

    /// A scheduling interval's duration is not strictly positive.
    #[error("interval {index} has a non-positive duration")]
    InvalidDuration {
        index: usize,
        source: ConstraintError,
    },

    /// The minimum approach temperature is not strictly positive.
    #[error("minimum approach temperature must be strictly positive")]
    InvalidMinApproach { source: ConstraintError },

    /// A requirement id referenced by the caller is not in the catalogue.
    #[error("requirement `{id}` is not in the catalogue")]
    UnknownRequirement { id: RequirementId },
}

/// The immutable catalogue of all stream requirements under analysis.
///
/// Construction validates every requirement and fixes a deterministic
/// iteration order (ascending requirement id), so that repeated runs on
/// identical input produce identical curves. The catalogue is passed by
/// reference into every stage of the pipeline; nothing in the crate holds
/// stream state of its own.
#[derive(Debug, Clone)]
pub struct StreamCatalogue {
    requirements: Vec<StreamRequirement>,
}

impl StreamCatalogue {
    /// Validates and collects the given requirements.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] naming the first requirement with a
    /// duplicate id, equal supply and target temperatures, a non-finite
    /// temperature, or a negative activation window.
    pub fn new(mut requirements: Vec<StreamRequirement>) -> Result<Self, InputError> {
        requirements.sort_by(|a, b| a.id.cmp(&b.id));

        for pair in requirements.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(InputError::DuplicateRequirement {
                    id: pair[0].id.clone(),
                });
            }
        }

        for requirement in &requirements {
            validate(requirement)?;
        }

        Ok(Self { requirements })
    }

    /// All requirements in ascending id order.
    #[must_use]
    pub fn requirements(&self) -> &[StreamRequirement] {
        &self.requirements
    }

    /// Looks up a requirement by id.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::UnknownRequirement`] if the id is absent.
    pub fn get(&self, id: &RequirementId) -> Result<&StreamRequirement, InputError> {
        self.requirements
            .binary_search_by(|r| r.id.cmp(id))
            .map(|index| &self.requirements[index])
            .map_err(|_| InputError::UnknownRequirement { id: id.clone() })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

fn validate(requirement: &StreamRequirement) -> Result<(), InputError> {
    let supply = requirement.supply_temperature.value;
    let target = requirement.target_temperature.value;

    if !supply.is_finite() || !target.is_finite() {
        return Err(InputError::NonFiniteTemperature {
            id: requirement.id.clone(),
        });
    }
    if supply == target {
        return Err(InputError::ZeroTemperatureSpan {
            id: requirement.id.clone(),
        });
    }

    for window in &requirement.windows {
        for value in [window.start, window.duration] {
            NonNegative::new(value).map_err(|source| InputError::InvalidWindow {
                id: requirement.id.clone(),
                source,
            })?;
        }
    }

    Ok(())
}
