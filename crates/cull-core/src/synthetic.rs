//! Deterministic synthetic sparse clouds.
//!
//! [`SyntheticChunk`] implements [`SparseCloudEngine`] entirely in memory so
//! the search and pipeline crates can be exercised without a reconstruction
//! engine. Camera optimization is modelled as a uniform relaxation of every
//! quality score; a factor below one makes repeated refinement rounds
//! converge the way a real bundle adjustment tightens a cloud.
//!
//! Score generation avoids RNG crates: samples come from a splitmix64 hash
//! of `(seed, point index, stream)`, which keeps fixtures stable across
//! platforms and library versions.

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::{CameraFitMask, PointMetric, SparseCloudEngine};

#[derive(Debug, Clone, Copy)]
struct TiePoint {
    uncertainty: f64,
    reprojection_error: f64,
    selected: bool,
}

impl TiePoint {
    fn score(&self, metric: PointMetric) -> f64 {
        match metric {
            PointMetric::ReconstructionUncertainty => self.uncertainty,
            PointMetric::ReprojectionError => self.reprojection_error,
        }
    }
}

/// In-memory sparse cloud with per-point quality scores.
#[derive(Debug, Clone)]
pub struct SyntheticChunk {
    points: Vec<TiePoint>,
    relax_factor: f64,
    tie_point_accuracy: Option<f64>,
    optimize_calls: usize,
}

impl SyntheticChunk {
    /// Build a chunk from explicit `(uncertainty, reprojection error)` score
    /// pairs. Each call to
    /// [`optimize_cameras`](SparseCloudEngine::optimize_cameras) multiplies
    /// every score by `relax_factor`, expected in `(0, 1]`.
    pub fn from_scores(scores: &[(f64, f64)], relax_factor: f64) -> Self {
        let points = scores
            .iter()
            .map(|&(uncertainty, reprojection_error)| TiePoint {
                uncertainty,
                reprojection_error,
                selected: false,
            })
            .collect();
        Self {
            points,
            relax_factor,
            tie_point_accuracy: None,
            optimize_calls: 0,
        }
    }

    /// Number of camera optimizations run so far.
    pub fn optimize_calls(&self) -> usize {
        self.optimize_calls
    }

    /// Tie-point accuracy applied through the engine, if any.
    pub fn tie_point_accuracy(&self) -> Option<f64> {
        self.tie_point_accuracy
    }
}

impl SparseCloudEngine for SyntheticChunk {
    fn total_point_count(&self) -> Result<usize> {
        Ok(self.points.len())
    }

    fn select_points(&mut self, metric: PointMetric, threshold: f64) -> Result<()> {
        if self.points.is_empty() {
            bail!("synthetic chunk has no tie points to select from");
        }
        for point in &mut self.points {
            point.selected = point.score(metric) > threshold;
        }
        Ok(())
    }

    fn selected_point_count(&self) -> Result<usize> {
        Ok(self.points.iter().filter(|p| p.selected).count())
    }

    fn delete_selected_points(&mut self) -> Result<()> {
        if self.points.is_empty() {
            bail!("synthetic chunk has no tie points to delete");
        }
        self.points.retain(|p| !p.selected);
        Ok(())
    }

    fn optimize_cameras(&mut self, _fit: &CameraFitMask) -> Result<()> {
        if self.points.is_empty() {
            bail!("cannot optimize cameras over an empty cloud");
        }
        for point in &mut self.points {
            point.uncertainty *= self.relax_factor;
            point.reprojection_error *= self.relax_factor;
        }
        self.optimize_calls += 1;
        Ok(())
    }

    fn set_tie_point_accuracy(&mut self, accuracy: f64) -> Result<()> {
        self.tie_point_accuracy = Some(accuracy);
        Ok(())
    }
}

/// Serializable description of a synthetic chunk.
///
/// Scores for point `i` are drawn by hash from the given inclusive ranges,
/// so two scenarios with equal fields always build identical chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticScenario {
    /// Number of tie points in the cloud.
    pub point_count: usize,
    /// Range for reconstruction-uncertainty scores, `[lo, hi]`.
    pub uncertainty_range: [f64; 2],
    /// Range for reprojection-error scores, `[lo, hi]`.
    pub reprojection_range: [f64; 2],
    /// Seed for the score hash.
    pub seed: u64,
    /// Factor applied to every score by each camera optimization.
    pub relax_factor: f64,
}

impl Default for SyntheticScenario {
    fn default() -> Self {
        Self {
            point_count: 20_000,
            uncertainty_range: [0.0, 200.0],
            reprojection_range: [0.0, 2.0],
            seed: 0,
            relax_factor: 0.7,
        }
    }
}

impl SyntheticScenario {
    /// Build the chunk this scenario describes.
    ///
    /// # Errors
    ///
    /// Rejects empty clouds, inverted score ranges, and relaxation factors
    /// outside `(0, 1]`.
    pub fn build(&self) -> Result<SyntheticChunk> {
        ensure!(self.point_count > 0, "scenario needs at least one tie point");
        ensure!(
            self.uncertainty_range[0] <= self.uncertainty_range[1],
            "uncertainty range is inverted: [{}, {}]",
            self.uncertainty_range[0],
            self.uncertainty_range[1]
        );
        ensure!(
            self.reprojection_range[0] <= self.reprojection_range[1],
            "reprojection range is inverted: [{}, {}]",
            self.reprojection_range[0],
            self.reprojection_range[1]
        );
        ensure!(
            self.relax_factor > 0.0 && self.relax_factor <= 1.0,
            "relax factor must lie in (0, 1], got {}",
            self.relax_factor
        );

        let scores: Vec<(f64, f64)> = (0..self.point_count)
            .map(|idx| {
                (
                    sample_in_range(self.seed, idx, 0, self.uncertainty_range),
                    sample_in_range(self.seed, idx, 1, self.reprojection_range),
                )
            })
            .collect();
        Ok(SyntheticChunk::from_scores(&scores, self.relax_factor))
    }
}

fn sample_in_range(seed: u64, point_idx: usize, stream: u64, range: [f64; 2]) -> f64 {
    let key = seed
        ^ (point_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ stream.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    let unit = u64_to_unit_f64(splitmix64(key));
    range[0] + unit * (range[1] - range[0])
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Top 53 bits as a double in `[0, 1)`, deterministic across platforms.
fn u64_to_unit_f64(x: u64) -> f64 {
    let mantissa = x >> 11;
    (mantissa as f64) * (1.0 / ((1u64 << 53) as f64))
}
