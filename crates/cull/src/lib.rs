//! High-level entry crate for the `cloudcull` toolbox.
//!
//! Photogrammetry suites leave a sparse cloud full of weak tie points after
//! alignment. This workspace refines such clouds by gradual selection:
//! search for the quality threshold that selects a chosen share of the
//! points, cull them, re-optimize the cameras, and repeat until the
//! reprojection-error threshold settles under a convergence gate.
//!
//! The reconstruction engine stays behind the
//! [`SparseCloudEngine`] trait; a deterministic synthetic implementation
//! ships in [`engine::synthetic`] for tests and demos.
//!
//! ```no_run
//! use cull::engine::SyntheticScenario;
//! use cull::pipeline::{optimize_sparse_cloud, RefineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut chunk = SyntheticScenario::default().build()?;
//! let report = optimize_sparse_cloud(&mut chunk, &RefineConfig::default())?;
//! println!(
//!     "kept {} of {} points over {} passes",
//!     report.points_remaining,
//!     report.points_initial,
//!     report.passes.len()
//! );
//! # Ok(())
//! # }
//! ```

/// Engine contract, fit masks, metrics, and the synthetic chunk.
pub mod engine {
    pub use cull_core::*;
}

/// Threshold search and ramp/elbow scan.
pub mod search {
    pub use cull_search::*;
}

/// The sparse-cloud refinement pipeline.
pub mod pipeline {
    pub use cull_pipeline::*;
}

pub use cull_core::{CameraFitMask, PointMetric, SparseCloudEngine};
pub use cull_pipeline::{optimize_sparse_cloud, RefineConfig, RefineReport};
pub use cull_search::{search_threshold, ConvergenceResult, SelectionTarget};
