//! End-to-end refinement runs against the synthetic engine.
//!
//! The fixtures use hand-picked score ladders so every threshold search has
//! a known landing spot: point `i` of twenty carries an uncertainty of
//! `10 i` and a reprojection error proportional to `i`, and each camera
//! optimization halves all scores.

use anyhow::Result;
use cull_core::{CameraFitMask, PointMetric, SparseCloudEngine, SyntheticChunk};
use cull_pipeline::{optimize_sparse_cloud, FitPreset, RefineConfig, RefinePhase};

fn ladder_chunk(reprojection_scale: f64) -> SyntheticChunk {
    let scores: Vec<(f64, f64)> = (1..=20)
        .map(|i| (10.0 * i as f64, reprojection_scale * i as f64))
        .collect();
    SyntheticChunk::from_scores(&scores, 0.5)
}

#[test]
fn fraction_recipe_runs_all_three_stages() {
    let mut chunk = ladder_chunk(0.4);
    let report = optimize_sparse_cloud(&mut chunk, &RefineConfig::fraction_uncertainty()).unwrap();

    assert_eq!(report.points_initial, 20);
    assert_eq!(report.points_remaining, 13);
    assert_eq!(report.tie_point_accuracy, Some(0.1));

    let phases: Vec<RefinePhase> = report.passes.iter().map(|p| p.phase).collect();
    assert_eq!(
        phases,
        vec![
            RefinePhase::UncertaintyCull,
            RefinePhase::UncertaintyCull,
            RefinePhase::CoarseReprojectionCull,
            RefinePhase::CoarseReprojectionCull,
            RefinePhase::FineReprojectionCull,
            RefinePhase::FineReprojectionCull,
        ]
    );

    let fits: Vec<FitPreset> = report.passes.iter().map(|p| p.fit).collect();
    assert_eq!(
        fits,
        vec![
            FitPreset::Partial,
            FitPreset::Partial,
            FitPreset::Partial,
            FitPreset::Partial,
            FitPreset::Full,
            FitPreset::Full,
        ]
    );

    let deleted: Vec<usize> = report.passes.iter().map(|p| p.points_deleted).collect();
    assert_eq!(deleted, vec![2, 1, 1, 1, 1, 1]);

    assert!(report.passes.iter().all(|p| p.search.converged));
    // The uncertainty searches walk integer thresholds, so their landing
    // spots are exact: two tenths of the cloud sit above 180, and after
    // one cull and relaxation a single point sits above 89.
    assert_eq!(report.passes[0].search.threshold, 180.0);
    assert_eq!(report.passes[1].search.threshold, 89.0);

    // The reprojection thresholds decay through the gates in order.
    let coarse = &report.passes[2].search;
    assert!(coarse.threshold >= 1.0 && coarse.threshold < 1.8);
    let last = &report.passes[5].search;
    assert!(last.threshold < 0.3);

    assert_eq!(chunk.optimize_calls(), 6);
    assert_eq!(chunk.tie_point_accuracy(), Some(0.1));
}

#[test]
fn fixed_recipe_skips_the_gated_loops_on_a_clean_cloud() {
    // Uncertainties of 0.6 i put four points above the fixed threshold of
    // 10; after one relaxation none remain, so the second cull removes
    // nothing. Reprojection errors are small enough that both gated loops
    // are skipped entirely.
    let scores: Vec<(f64, f64)> = (1..=20)
        .map(|i| (0.6 * i as f64, 0.05 * i as f64))
        .collect();
    let mut chunk = SyntheticChunk::from_scores(&scores, 0.5);

    let report = optimize_sparse_cloud(&mut chunk, &RefineConfig::fixed_uncertainty()).unwrap();

    assert_eq!(report.points_initial, 20);
    assert_eq!(report.points_remaining, 16);
    assert_eq!(report.passes.len(), 2);
    assert!(report
        .passes
        .iter()
        .all(|p| p.phase == RefinePhase::UncertaintyCull && p.fit == FitPreset::Partial));
    assert_eq!(report.passes[0].search.threshold, 10.0);
    assert_eq!(report.passes[0].search.iterations, 1);
    assert_eq!(report.passes[0].points_deleted, 4);
    assert_eq!(report.passes[1].points_deleted, 0);
    assert_eq!(report.tie_point_accuracy, Some(0.1));
    assert_eq!(chunk.optimize_calls(), 2);

    // The convergence search that ends the run leaves its selection in
    // place; nothing deletes it once both gates are already satisfied.
    assert_eq!(chunk.selected_point_count().unwrap(), 1);
}

#[test]
fn refinement_fails_cleanly_when_a_search_cannot_converge() {
    // Twenty points share one uncertainty value, so no threshold selects
    // exactly two of them and the fraction search must give up.
    let scores: Vec<(f64, f64)> = (1..=20).map(|i| (100.0, 0.1 * i as f64)).collect();
    let mut chunk = SyntheticChunk::from_scores(&scores, 0.5);

    let mut config = RefineConfig::fraction_uncertainty();
    config.search.max_iterations = 50;

    let err = optimize_sparse_cloud(&mut chunk, &config).unwrap_err();
    assert!(err.to_string().contains("did not converge"));
}

#[test]
fn zero_divisor_is_rejected_before_touching_the_engine() {
    let mut chunk = ladder_chunk(0.4);
    let mut config = RefineConfig::fraction_uncertainty();
    config.reprojection_divisor = 0;

    let err = optimize_sparse_cloud(&mut chunk, &config).unwrap_err();
    assert!(err.to_string().contains("divisor"));
    assert_eq!(chunk.optimize_calls(), 0);
}

/// Engine decorator recording the call sequence the pipeline issues.
#[derive(Debug)]
struct CallLog<E> {
    inner: E,
    calls: Vec<EngineCall>,
}

#[derive(Debug, Clone, PartialEq)]
enum EngineCall {
    Select(PointMetric),
    Delete,
    Optimize(FitPreset),
    SetAccuracy(f64),
}

impl<E: SparseCloudEngine> SparseCloudEngine for CallLog<E> {
    fn total_point_count(&self) -> Result<usize> {
        self.inner.total_point_count()
    }

    fn select_points(&mut self, metric: PointMetric, threshold: f64) -> Result<()> {
        self.calls.push(EngineCall::Select(metric));
        self.inner.select_points(metric, threshold)
    }

    fn selected_point_count(&self) -> Result<usize> {
        self.inner.selected_point_count()
    }

    fn delete_selected_points(&mut self) -> Result<()> {
        self.calls.push(EngineCall::Delete);
        self.inner.delete_selected_points()
    }

    fn optimize_cameras(&mut self, fit: &CameraFitMask) -> Result<()> {
        let preset = if *fit == CameraFitMask::FULL {
            FitPreset::Full
        } else {
            FitPreset::Partial
        };
        self.calls.push(EngineCall::Optimize(preset));
        self.inner.optimize_cameras(fit)
    }

    fn set_tie_point_accuracy(&mut self, accuracy: f64) -> Result<()> {
        self.calls.push(EngineCall::SetAccuracy(accuracy));
        self.inner.set_tie_point_accuracy(accuracy)
    }
}

#[test]
fn engine_sees_the_fixed_stage_order() {
    let mut engine = CallLog {
        inner: ladder_chunk(0.4),
        calls: Vec::new(),
    };
    optimize_sparse_cloud(&mut engine, &RefineConfig::fraction_uncertainty()).unwrap();

    // Exactly one tie-point accuracy override, set to 0.1.
    let accuracy_calls: Vec<usize> = engine
        .calls
        .iter()
        .enumerate()
        .filter_map(|(i, c)| matches!(c, EngineCall::SetAccuracy(_)).then_some(i))
        .collect();
    assert_eq!(accuracy_calls.len(), 1);
    assert_eq!(
        engine.calls[accuracy_calls[0]],
        EngineCall::SetAccuracy(0.1)
    );

    // Partial optimization after each of the four leading culls, full
    // optimization on the fine rounds, in that order.
    let optimizes: Vec<FitPreset> = engine
        .calls
        .iter()
        .filter_map(|c| match c {
            EngineCall::Optimize(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(
        optimizes,
        vec![
            FitPreset::Partial,
            FitPreset::Partial,
            FitPreset::Partial,
            FitPreset::Partial,
            FitPreset::Full,
            FitPreset::Full,
        ]
    );

    // No partial optimization may follow the accuracy override.
    assert!(engine.calls[accuracy_calls[0]..]
        .iter()
        .all(|c| !matches!(c, EngineCall::Optimize(FitPreset::Partial))));

    // Every delete is chased by an optimization.
    for (i, call) in engine.calls.iter().enumerate() {
        if *call == EngineCall::Delete {
            assert!(matches!(engine.calls[i + 1], EngineCall::Optimize(_)));
        }
    }

    // The first two culls select on uncertainty, every later one on
    // reprojection error.
    let mut deletes_seen = 0;
    for call in &engine.calls {
        match call {
            EngineCall::Select(metric) => {
                if deletes_seen < 2 {
                    assert_eq!(*metric, PointMetric::ReconstructionUncertainty);
                } else {
                    assert_eq!(*metric, PointMetric::ReprojectionError);
                }
            }
            EngineCall::Delete => deletes_seen += 1,
            _ => {}
        }
    }
}
