use anyhow::Result;

use crate::{CameraFitMask, PointMetric};

/// Contract between the refinement core and a reconstruction engine.
///
/// The engine owns one chunk's sparse cloud and camera set. The core never
/// sees point data; it reads aggregate counts and drives the cloud through
/// selection, deletion, and camera-optimization commands. Every call blocks
/// until the engine answers.
///
/// Two guarantees implementations must provide:
/// - [`select_points`](SparseCloudEngine::select_points) replaces the prior
///   selection, it never accumulates;
/// - the count reported by
///   [`selected_point_count`](SparseCloudEngine::selected_point_count)
///   reflects the most recent selection.
///
/// Methods return `anyhow::Result` so adapters can surface arbitrary engine
/// failures. Callers in this workspace propagate those errors without
/// retrying; an unavailable engine or an empty cloud aborts the whole run.
pub trait SparseCloudEngine {
    /// Number of tie points currently in the cloud.
    fn total_point_count(&self) -> Result<usize>;

    /// Mark every point whose `metric` value exceeds `threshold` as
    /// selected, replacing any prior selection.
    fn select_points(&mut self, metric: PointMetric, threshold: f64) -> Result<()>;

    /// Number of points in the current selection.
    fn selected_point_count(&self) -> Result<usize>;

    /// Remove the selected points from the cloud.
    fn delete_selected_points(&mut self) -> Result<()>;

    /// Re-run camera optimization over the surviving points, refining only
    /// the parameters enabled in `fit`.
    fn optimize_cameras(&mut self, fit: &CameraFitMask) -> Result<()>;

    /// Override the chunk's tie-point accuracy setting, reweighting tie
    /// points in subsequent optimizations.
    fn set_tie_point_accuracy(&mut self, accuracy: f64) -> Result<()>;
}
