//! Core vocabulary for the `cloudcull` toolbox.
//!
//! This crate contains:
//! - the per-point quality metrics a reconstruction engine can filter on
//!   ([`PointMetric`]),
//! - the camera fit mask with its two presets ([`CameraFitMask`]),
//! - the engine contract the refinement core drives ([`SparseCloudEngine`]),
//! - a deterministic in-memory engine for tests and demos ([`synthetic`]).
//!
//! The sparse cloud itself always belongs to the engine. Code in this
//! workspace never holds point data; it reads aggregate counts and issues
//! select/delete/optimize commands through the trait.

/// Engine contract consumed by the search and pipeline crates.
pub mod engine;
/// Camera parameter fit masks and their presets.
pub mod fit;
/// Per-point quality metrics.
pub mod metric;
/// Deterministic synthetic sparse clouds.
pub mod synthetic;

pub use engine::SparseCloudEngine;
pub use fit::CameraFitMask;
pub use metric::PointMetric;
pub use synthetic::{SyntheticChunk, SyntheticScenario};
