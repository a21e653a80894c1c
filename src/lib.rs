//! # Pinch Cascade
//!
//! Pinch-analysis targeting for heat-recovery studies: composite curves,
//! the shifted-temperature heat cascade, Grand Composite Curves, and
//! utility/recovery targets for stream populations that vary over a
//! multi-interval operating schedule.
//!
//! ## Crate layout
//!
//! - [`analysis`]: The targeting pipeline, entered through
//!   [`analysis::PinchAnalysis`].
//! - [`support`]: Supporting utilities used by the analysis.
//!
//! ## Utility code lifecycle
//!
//! Modules in [`support`] are part of the public API because they're useful,
//! but their APIs are not stable. Breaking changes may occur as needed.

pub mod analysis;
pub mod support;
