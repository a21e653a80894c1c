//! Pinch analysis of time-varying stream populations.
//!
//! The pipeline runs once per schedule interval: active requirements are
//! aggregated into hot and cold [composite curves](CompositeCurve), the
//! curves are cascaded on a shifted temperature scale into a
//! [`GrandCompositeCurve`], and the cascade's correction offset yields the
//! interval's utility and recovery targets. The curve is then split at the
//! pinch and pocket-removed into a [`ModifiedGcc`] for downstream sizing.
//!
//! [`PinchAnalysis`] is the entry point; the submodules expose the
//! intermediate artifacts for callers that want to inspect or plot them.

mod aggregate;

pub mod cascade;
pub mod catalogue;
pub mod composite;
pub mod pinch;
pub mod schedule;
pub mod stream;
pub mod targets;

pub use cascade::{CascadeError, GccPoint, GrandCompositeCurve, MinApproach};
pub use catalogue::{InputError, StreamCatalogue};
pub use composite::{CompositeCurve, CurvePoint};
pub use pinch::{MgccSegment, ModifiedGcc};
pub use schedule::{ActivityFraction, Interval, Schedule};
pub use targets::{
    AggregateTargets, AnalysisError, AnalysisResults, IntervalAnalysis, IntervalTargets,
    PinchAnalysis,
};
