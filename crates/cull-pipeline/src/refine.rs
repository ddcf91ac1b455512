use anyhow::{ensure, Result};
use cull_core::{CameraFitMask, PointMetric, SparseCloudEngine};
use cull_search::{
    search_threshold, select_by_target, ConvergenceResult, SearchOptions, SearchSeed,
    SelectionTarget,
};
use serde::{Deserialize, Serialize};

/// Which stage of the refinement produced a pass record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinePhase {
    /// Reconstruction-uncertainty cull ahead of the reprojection rounds.
    UncertaintyCull,
    /// Reprojection-error cull while the threshold sits above the coarse
    /// gate.
    CoarseReprojectionCull,
    /// Reprojection-error cull while the threshold sits above the fine
    /// gate.
    FineReprojectionCull,
}

impl std::fmt::Display for RefinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefinePhase::UncertaintyCull => write!(f, "uncertainty cull"),
            RefinePhase::CoarseReprojectionCull => write!(f, "coarse reprojection cull"),
            RefinePhase::FineReprojectionCull => write!(f, "fine reprojection cull"),
        }
    }
}

/// Which optimization preset ran after a cull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitPreset {
    /// [`CameraFitMask::PARTIAL`].
    Partial,
    /// [`CameraFitMask::FULL`].
    Full,
}

impl FitPreset {
    /// The concrete mask this preset names.
    pub fn mask(self) -> CameraFitMask {
        match self {
            FitPreset::Partial => CameraFitMask::PARTIAL,
            FitPreset::Full => CameraFitMask::FULL,
        }
    }
}

/// One cull-and-optimize round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassRecord {
    /// Stage that produced this record.
    pub phase: RefinePhase,
    /// Threshold search behind the selection that was culled.
    pub search: ConvergenceResult,
    /// Cloud size before the cull.
    pub points_before: usize,
    /// Points removed by the cull.
    pub points_deleted: usize,
    /// Optimization preset run after the cull.
    pub fit: FitPreset,
}

/// Summary of one [`optimize_sparse_cloud`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineReport {
    /// Cloud size when the run started.
    pub points_initial: usize,
    /// Cloud size when the run finished.
    pub points_remaining: usize,
    /// Tie-point accuracy applied through the engine, if the run reached
    /// that stage.
    pub tie_point_accuracy: Option<f64>,
    /// Every cull-and-optimize round, in execution order.
    pub passes: Vec<PassRecord>,
}

/// Configuration for the refinement loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Goal of the leading reconstruction-uncertainty culls.
    pub uncertainty_target: SelectionTarget,
    /// How many uncertainty culls run before the reprojection rounds.
    pub uncertainty_passes: usize,
    /// Seed for uncertainty-threshold searches.
    pub uncertainty_seed: SearchSeed,
    /// Divisor for the reprojection target count, applied as written:
    /// `10` targets one tenth of the cloud, not 10 percent.
    pub reprojection_divisor: u32,
    /// Seed for reprojection-threshold searches.
    pub reprojection_seed: SearchSeed,
    /// Reprojection threshold above which the coarse loop keeps culling
    /// with partial optimization.
    pub coarse_gate: f64,
    /// Reprojection threshold above which the fine loop keeps culling with
    /// full optimization.
    pub fine_gate: f64,
    /// Tie-point accuracy applied once the threshold passes the coarse
    /// gate.
    pub tie_point_accuracy: f64,
    /// Bounds on each individual threshold search.
    pub search: SearchOptions,
    /// Bound on the number of rounds in each gated loop.
    pub max_gate_passes: usize,
}

impl RefineConfig {
    /// The original recipe: cull everything above a fixed uncertainty
    /// threshold of 10, twice, before the reprojection rounds.
    pub fn fixed_uncertainty() -> Self {
        Self {
            uncertainty_target: SelectionTarget::FixedThreshold { threshold: 10.0 },
            ..Self::fraction_uncertainty()
        }
    }

    /// The later recipe: search for the uncertainty threshold that selects
    /// one tenth of the cloud instead of trusting a fixed value.
    pub fn fraction_uncertainty() -> Self {
        Self {
            uncertainty_target: SelectionTarget::FractionOfCloud { divisor: 10 },
            uncertainty_passes: 2,
            uncertainty_seed: SearchSeed::UNCERTAINTY,
            reprojection_divisor: 10,
            reprojection_seed: SearchSeed::REPROJECTION,
            coarse_gate: 1.0,
            fine_gate: 0.3,
            tie_point_accuracy: 0.1,
            search: SearchOptions::default(),
            max_gate_passes: 64,
        }
    }
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self::fraction_uncertainty()
    }
}

/// Refine a chunk's sparse cloud in place.
///
/// The sequence is fixed:
/// 1. `uncertainty_passes` rounds of uncertainty cull, each followed by a
///    partial camera optimization;
/// 2. a reprojection-error threshold search whose result acts as the
///    convergence value;
/// 3. while that value sits at or above `coarse_gate`: search again, cull,
///    partial optimization;
/// 4. once the value is at or below `coarse_gate`, the tie-point accuracy
///    override is applied;
/// 5. while the value sits at or above `fine_gate`: search again, cull,
///    full optimization.
///
/// The search in step 2 leaves a selection behind; if the coarse loop never
/// runs, nothing deletes that selection. Engines treat selection as
/// transient state.
///
/// # Errors
///
/// Engine failures abort immediately. A threshold search that fails to
/// converge within its iteration budget aborts with a descriptive error, as
/// does a gated loop exceeding `max_gate_passes` rounds.
pub fn optimize_sparse_cloud(
    engine: &mut dyn SparseCloudEngine,
    config: &RefineConfig,
) -> Result<RefineReport> {
    ensure!(
        config.reprojection_divisor != 0,
        "reprojection divisor must be non-zero"
    );

    let points_initial = engine.total_point_count()?;
    let mut passes = Vec::new();
    let mut tie_point_accuracy = None;

    for _ in 0..config.uncertainty_passes {
        let search = select_by_target(
            engine,
            PointMetric::ReconstructionUncertainty,
            config.uncertainty_target,
            config.uncertainty_seed,
            config.search,
        )?;
        require_converged(&search, PointMetric::ReconstructionUncertainty)?;
        passes.push(cull_and_optimize(
            engine,
            RefinePhase::UncertaintyCull,
            search,
            FitPreset::Partial,
        )?);
    }

    let mut var = reprojection_threshold(engine, config)?;

    let mut rounds = 0usize;
    while var.threshold >= config.coarse_gate {
        ensure!(
            rounds < config.max_gate_passes,
            "coarse reprojection loop still at threshold {} after {} rounds",
            var.threshold,
            rounds
        );
        rounds += 1;
        var = reprojection_threshold(engine, config)?;
        passes.push(cull_and_optimize(
            engine,
            RefinePhase::CoarseReprojectionCull,
            var,
            FitPreset::Partial,
        )?);
    }

    if var.threshold <= config.coarse_gate {
        engine.set_tie_point_accuracy(config.tie_point_accuracy)?;
        tie_point_accuracy = Some(config.tie_point_accuracy);
        log::info!(
            "tie-point accuracy set to {} at reprojection threshold {:.4}",
            config.tie_point_accuracy,
            var.threshold
        );
    }

    rounds = 0;
    while var.threshold >= config.fine_gate {
        ensure!(
            rounds < config.max_gate_passes,
            "fine reprojection loop still at threshold {} after {} rounds",
            var.threshold,
            rounds
        );
        rounds += 1;
        var = reprojection_threshold(engine, config)?;
        passes.push(cull_and_optimize(
            engine,
            RefinePhase::FineReprojectionCull,
            var,
            FitPreset::Full,
        )?);
    }

    let points_remaining = engine.total_point_count()?;
    log::info!(
        "sparse cloud refined: {points_initial} -> {points_remaining} points over {} passes",
        passes.len()
    );

    Ok(RefineReport {
        points_initial,
        points_remaining,
        tie_point_accuracy,
        passes,
    })
}

/// Search for the reprojection-error threshold that selects one
/// `reprojection_divisor`-th of the current cloud.
fn reprojection_threshold(
    engine: &mut dyn SparseCloudEngine,
    config: &RefineConfig,
) -> Result<ConvergenceResult> {
    let total = engine.total_point_count()?;
    let target = total / config.reprojection_divisor as usize;
    let result = search_threshold(
        engine,
        PointMetric::ReprojectionError,
        target,
        config.reprojection_seed,
        config.search,
    )?;
    require_converged(&result, PointMetric::ReprojectionError)?;
    Ok(result)
}

fn require_converged(result: &ConvergenceResult, metric: PointMetric) -> Result<()> {
    ensure!(
        result.converged,
        "{metric} threshold search did not converge after {} iterations (last threshold {})",
        result.iterations,
        result.threshold
    );
    Ok(())
}

/// Delete the current selection and re-optimize the cameras.
fn cull_and_optimize(
    engine: &mut dyn SparseCloudEngine,
    phase: RefinePhase,
    search: ConvergenceResult,
    fit: FitPreset,
) -> Result<PassRecord> {
    let points_before = engine.total_point_count()?;
    engine.delete_selected_points()?;
    let points_after = engine.total_point_count()?;
    engine.optimize_cameras(&fit.mask())?;

    let points_deleted = points_before - points_after;
    log::info!(
        "{phase}: threshold {:.4} removed {points_deleted} of {points_before} points",
        search.threshold
    );

    Ok(PassRecord {
        phase,
        search,
        points_before,
        points_deleted,
        fit,
    })
}
