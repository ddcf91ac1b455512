use cull_core::{PointMetric, SparseCloudEngine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seed values for a threshold search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSeed {
    /// First threshold handed to the engine.
    pub threshold: f64,
    /// Initial step size. The step only ever shrinks.
    pub step: f64,
}

impl SearchSeed {
    /// Seed for reprojection-error searches.
    pub const REPROJECTION: Self = Self {
        threshold: 1.0,
        step: 1.0,
    };

    /// Seed for reconstruction-uncertainty searches, whose scores live on a
    /// much larger scale.
    pub const UNCERTAINTY: Self = Self {
        threshold: 100.0,
        step: 100.0,
    };
}

/// Bounds on a single search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of engine selections before the search gives up and
    /// reports a non-converged result.
    pub max_iterations: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

/// Outcome of a threshold search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    /// Final threshold. When `converged` is set, selecting at this
    /// threshold yields exactly the requested count, and the engine's
    /// selection state already reflects it.
    pub threshold: f64,
    /// Whether the selected count reached the target within the iteration
    /// budget.
    pub converged: bool,
    /// Number of engine selections performed.
    pub iterations: usize,
}

/// Errors from the search entry points.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("target of {target} points exceeds the cloud's {total}")]
    TargetExceedsTotal { target: usize, total: usize },
    #[error("initial step must be strictly positive, got {0}")]
    NonPositiveStep(f64),
    #[error("fraction divisor must be non-zero")]
    ZeroDivisor,
    #[error("ramp scan collected {0} samples; at least 3 are needed to locate an elbow")]
    RampTooShort(usize),
    #[error("ramp scan curve is flat; no elbow to locate")]
    FlatRamp,
    #[error("ramp scan exceeded {0} samples without reaching the floor")]
    RampExhausted(usize),
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Find a threshold whose selection matches `target` points.
///
/// The search walks the threshold in fixed steps, raising it while the
/// selection is too large and lowering it while too small. Once it has
/// overshot in both directions the step shrinks tenfold and both direction
/// flags clear, so the walk closes in on the target count. The engine's
/// reported count is authoritative at every iteration; nothing is
/// recomputed locally.
///
/// This is not a bisection. If the selection-count function is non-monotone
/// in the threshold, or plateaus over an interval wider than the current
/// step, the walk can fail to land on the target at all, and the shrinking
/// step can underflow to zero. `options.max_iterations` bounds that case:
/// the result then carries `converged: false` together with the last
/// threshold tried.
///
/// A `target` equal to the current cloud size needs no culling; the search
/// returns the seed threshold untouched without consulting the engine.
///
/// # Errors
///
/// Fails fast on a target larger than the cloud or a non-positive seed
/// step, and propagates any engine failure.
pub fn search_threshold(
    engine: &mut dyn SparseCloudEngine,
    metric: PointMetric,
    target: usize,
    seed: SearchSeed,
    options: SearchOptions,
) -> Result<ConvergenceResult, SearchError> {
    if seed.step <= 0.0 {
        return Err(SearchError::NonPositiveStep(seed.step));
    }
    let total = engine.total_point_count()?;
    if target > total {
        return Err(SearchError::TargetExceedsTotal { target, total });
    }

    let mut threshold = seed.threshold;
    let mut step = seed.step;
    let mut selected = total;
    let mut overshot = false;
    let mut undershot = false;
    let mut iterations = 0usize;

    while selected != target {
        if iterations == options.max_iterations {
            log::debug!(
                "{metric} search stopped after {iterations} iterations at threshold {threshold}"
            );
            return Ok(ConvergenceResult {
                threshold,
                converged: false,
                iterations,
            });
        }

        engine.select_points(metric, threshold)?;
        selected = engine.selected_point_count()?;
        iterations += 1;
        log::trace!("{metric} search: threshold {threshold} selects {selected} (target {target})");

        if selected == target {
            break;
        }
        if selected > target {
            overshot = true;
            threshold += step;
        } else {
            undershot = true;
            threshold -= step;
        }
        if overshot && undershot {
            overshot = false;
            undershot = false;
            step /= 10.0;
        }
    }

    log::debug!("{metric} search converged to threshold {threshold} in {iterations} iterations");
    Ok(ConvergenceResult {
        threshold,
        converged: true,
        iterations,
    })
}

/// Selection goal for a culling pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionTarget {
    /// Select at a fixed metric threshold; no search.
    FixedThreshold {
        /// Threshold handed to the engine as-is.
        threshold: f64,
    },
    /// Search for the threshold that selects `total / divisor` points.
    ///
    /// The divisor is applied as written: `divisor = 10` targets one tenth
    /// of the cloud. It is not a percentage.
    FractionOfCloud {
        /// Divisor applied to the total point count, integer division.
        divisor: u32,
    },
}

/// Run a selection pass toward the given goal.
///
/// The fixed-threshold mode issues a single selection and reports it as
/// converged; the fraction mode delegates to [`search_threshold`] with a
/// target derived from the engine's current point count.
///
/// # Errors
///
/// A zero divisor fails fast; everything else follows [`search_threshold`].
pub fn select_by_target(
    engine: &mut dyn SparseCloudEngine,
    metric: PointMetric,
    target: SelectionTarget,
    seed: SearchSeed,
    options: SearchOptions,
) -> Result<ConvergenceResult, SearchError> {
    match target {
        SelectionTarget::FixedThreshold { threshold } => {
            engine.select_points(metric, threshold)?;
            Ok(ConvergenceResult {
                threshold,
                converged: true,
                iterations: 1,
            })
        }
        SelectionTarget::FractionOfCloud { divisor } => {
            if divisor == 0 {
                return Err(SearchError::ZeroDivisor);
            }
            let total = engine.total_point_count()?;
            search_threshold(engine, metric, total / divisor as usize, seed, options)
        }
    }
}
