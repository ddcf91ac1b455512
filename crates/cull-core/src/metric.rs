use serde::{Deserialize, Serialize};

/// Per-point quality metric reported by the reconstruction engine.
///
/// Both metrics grow with point unreliability: a higher value means a worse
/// point, so selecting above a threshold picks the points to cull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointMetric {
    /// Geometric uncertainty of the triangulated position, driven by the
    /// intersection angles of the observing rays.
    ReconstructionUncertainty,
    /// Image-space residual of the point across the cameras that observe it.
    ReprojectionError,
}

impl std::fmt::Display for PointMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointMetric::ReconstructionUncertainty => write!(f, "reconstruction uncertainty"),
            PointMetric::ReprojectionError => write!(f, "reprojection error"),
        }
    }
}
