//! Ramp scan with elbow detection.
//!
//! An alternative to the damped search for clouds where no fixed selection
//! fraction makes sense: sweep the threshold upward by a fixed step,
//! recording how many points each stop selects, until the count drops to a
//! floor. The recorded curve is rescaled onto the sweep's index range and
//! each sample converted to a slope angle; the sample nearest 45 degrees is
//! reported as the elbow, the threshold where the curve turns from steep to
//! flat.

use cull_core::{PointMetric, SparseCloudEngine};
use serde::{Deserialize, Serialize};

use crate::{SearchError, SearchSeed};

/// Options for a ramp scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampOptions {
    /// Start threshold and sweep step.
    pub seed: SearchSeed,
    /// The sweep stops once the selected count is at or below this floor.
    pub floor: usize,
    /// Maximum number of samples before the sweep gives up.
    pub max_samples: usize,
}

impl Default for RampOptions {
    fn default() -> Self {
        Self {
            seed: SearchSeed {
                threshold: 1.0,
                step: 1.0,
            },
            floor: 50_000,
            max_samples: 10_000,
        }
    }
}

/// Result of a ramp scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampScan {
    /// Selected count at each sweep stop, first stop at the seed threshold.
    pub curve: Vec<usize>,
    /// Index of the elbow sample within `curve`.
    pub elbow_index: usize,
    /// Threshold at the elbow sample.
    pub elbow_threshold: f64,
}

/// Sweep the selection threshold and locate the curve's elbow.
///
/// # Errors
///
/// Fails fast on a non-positive step, a sweep that exhausts `max_samples`
/// before reaching the floor, a curve too short to carry an elbow, or a
/// flat curve. Engine failures propagate.
pub fn ramp_scan(
    engine: &mut dyn SparseCloudEngine,
    metric: PointMetric,
    options: RampOptions,
) -> Result<RampScan, SearchError> {
    if options.seed.step <= 0.0 {
        return Err(SearchError::NonPositiveStep(options.seed.step));
    }

    let total = engine.total_point_count()?;
    let mut threshold = options.seed.threshold;
    let mut selected = total;
    let mut curve = Vec::new();

    while selected > options.floor {
        if curve.len() == options.max_samples {
            return Err(SearchError::RampExhausted(options.max_samples));
        }
        engine.select_points(metric, threshold)?;
        selected = engine.selected_point_count()?;
        threshold += options.seed.step;
        curve.push(selected);
    }

    let elbow_index = locate_elbow(&curve)?;
    let elbow_threshold = options.seed.threshold + elbow_index as f64 * options.seed.step;
    log::debug!(
        "{metric} ramp scan: {} samples, elbow at index {elbow_index} (threshold {elbow_threshold})",
        curve.len()
    );

    Ok(RampScan {
        curve,
        elbow_index,
        elbow_threshold,
    })
}

/// Index of the sample whose rescaled slope angle is nearest 45 degrees.
fn locate_elbow(curve: &[usize]) -> Result<usize, SearchError> {
    if curve.len() < 3 {
        return Err(SearchError::RampTooShort(curve.len()));
    }

    let lo = curve.iter().copied().min().unwrap_or(0) as f64;
    let hi = curve.iter().copied().max().unwrap_or(0) as f64;
    if hi <= lo {
        return Err(SearchError::FlatRamp);
    }

    // Rescale each count onto [0, len - 2] and read it as a rise over a
    // unit run; the elbow sits where that slope passes 45 degrees.
    let out_span = (curve.len() - 2) as f64;
    let mut elbow = 0usize;
    let mut best = f64::INFINITY;
    for (index, &count) in curve[..curve.len() - 2].iter().enumerate() {
        let rise = ((count as f64 - lo) * (out_span / (hi - lo))).abs();
        let angle = rise.atan().to_degrees();
        let distance = (angle - 45.0).abs();
        if distance < best {
            best = distance;
            elbow = index;
        }
    }
    Ok(elbow)
}
