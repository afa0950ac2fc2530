//! # Analysis Pipeline
//!
//! [`BridgeAnalysis`] owns a project snapshot and runs the full pass over it:
//!
//! ```text
//! validate ──► POIs ──► sections ──► structural analysis ──► losses ──► checks
//! ```
//!
//! A pass either completes and publishes an immutable [`AnalysisOutput`], or
//! fails and leaves the previously published output untouched. Any mutation
//! of the project or of the design overrides discards the cached output; the
//! next pass recomputes everything.
//!
//! Progress is advisory and reported to a [`ProgressSink`]. Cancellation is
//! cooperative: a [`CancellationToken`] is polled at interval boundaries and
//! between checks.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::pipeline::{BridgeAnalysis, NullProgress};
//! use bridge_core::project::Project;
//!
//! let mut analysis = BridgeAnalysis::new(Project::minimal_example());
//! let output = analysis.run(&NullProgress, None).unwrap();
//! assert_eq!(output.results.interval_count, 2);
//! assert!(analysis.results().is_some());
//!
//! analysis.project_mut().bridge.overlay = 1000.0;
//! assert!(analysis.results().is_none());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::analysis::{analyze, AnalysisContext, AnalysisResults, DirectStiffnessSolver, LineGirderSolver};
use crate::artifacts::{run_checks, CheckContext, CheckSelection, GirderArtifact};
use crate::errors::{BridgeError, BridgeResult};
use crate::losses::{strategy_for, LossContext, LossTable};
use crate::overrides::DesignOverrides;
use crate::poi::PoiRegistry;
use crate::project::Project;
use crate::provisions::{CodeProvisions, LrfdProvisions};
use crate::sections::SectionEngine;

const STAGE: &str = "analysis pass";

// =============================================================================
// Progress and cancellation
// =============================================================================

/// Receives advisory progress from long loops
pub trait ProgressSink: Send + Sync {
    /// `fraction` is the completed share of `stage`, in [0, 1]
    fn report(&self, stage: &str, fraction: f64);
}

/// Discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _stage: &str, _fraction: f64) {}
}

/// Forwards progress to the `tracing` subscriber at trace level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, stage: &str, fraction: f64) {
        tracing::trace!(stage, percent = (fraction * 100.0).round(), "progress");
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&str, f64) + Send + Sync,
{
    fn report(&self, stage: &str, fraction: f64) {
        self(stage, fraction)
    }
}

/// Cooperative cancellation flag shared between the caller and a pass
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint: `ComputationAborted` once cancelled
    pub fn check(&self, stage: &str, interval: Option<usize>) -> BridgeResult<()> {
        if self.is_cancelled() {
            tracing::info!(stage, ?interval, "analysis cancelled");
            Err(BridgeError::aborted(stage, interval))
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Everything one successful pass produced
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// Project revision the output was computed from
    pub revision: u64,
    pub overrides: DesignOverrides,
    pub pois: PoiRegistry,
    pub results: AnalysisResults,
    pub losses: LossTable,
    pub artifacts: GirderArtifact,
}

/// A project snapshot, the services that analyze it and its published results
#[derive(Debug)]
pub struct BridgeAnalysis {
    project: Project,
    overrides: DesignOverrides,
    provisions: Option<Arc<dyn CodeProvisions>>,
    solver: Arc<dyn LineGirderSolver>,
    selection: CheckSelection,
    revision: u64,
    output: Option<Arc<AnalysisOutput>>,
}

impl BridgeAnalysis {
    /// Analysis with the LRFD edition from the project criteria and the
    /// direct stiffness line-girder solver
    pub fn new(project: Project) -> Self {
        BridgeAnalysis {
            project,
            overrides: DesignOverrides::default(),
            provisions: None,
            solver: Arc::new(DirectStiffnessSolver),
            selection: CheckSelection::all(),
            revision: 0,
            output: None,
        }
    }

    pub fn with_provisions(mut self, provisions: Arc<dyn CodeProvisions>) -> Self {
        self.provisions = Some(provisions);
        self.invalidate();
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn LineGirderSolver>) -> Self {
        self.solver = solver;
        self.invalidate();
        self
    }

    pub fn with_selection(mut self, selection: CheckSelection) -> Self {
        self.selection = selection;
        self.invalidate();
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Mutable access to the project. Discards the published results.
    pub fn project_mut(&mut self) -> &mut Project {
        self.invalidate();
        &mut self.project
    }

    pub fn overrides(&self) -> DesignOverrides {
        self.overrides
    }

    /// Replace the design overrides. Discards the published results.
    pub fn set_overrides(&mut self, overrides: DesignOverrides) {
        self.overrides = overrides;
        self.invalidate();
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Published results, if a pass completed since the last change
    pub fn results(&self) -> Option<Arc<AnalysisOutput>> {
        self.output.as_ref().filter(|o| o.revision == self.revision).cloned()
    }

    /// Output of the last successful pass even when it is stale
    pub fn last_valid_results(&self) -> Option<Arc<AnalysisOutput>> {
        self.output.clone()
    }

    fn invalidate(&mut self) {
        self.revision += 1;
        tracing::debug!(revision = self.revision, "cached results invalidated");
    }

    /// Run the full pass. On failure the previous output stays available
    /// through [`BridgeAnalysis::last_valid_results`].
    pub fn run(
        &mut self,
        progress: &dyn ProgressSink,
        cancel: Option<&CancellationToken>,
    ) -> BridgeResult<Arc<AnalysisOutput>> {
        if let Some(output) = self.results() {
            return Ok(output);
        }
        let output = Arc::new(compute(
            &self.project,
            self.overrides,
            self.provisions.clone(),
            self.solver.as_ref(),
            &self.selection,
            self.revision,
            progress,
            cancel,
        )?);
        self.output = Some(Arc::clone(&output));
        Ok(output)
    }
}

#[allow(clippy::too_many_arguments)]
fn compute(
    project: &Project,
    overrides: DesignOverrides,
    provisions: Option<Arc<dyn CodeProvisions>>,
    solver: &dyn LineGirderSolver,
    selection: &CheckSelection,
    revision: u64,
    progress: &dyn ProgressSink,
    cancel: Option<&CancellationToken>,
) -> BridgeResult<AnalysisOutput> {
    let checkpoint = || match cancel {
        Some(token) => token.check(STAGE, None),
        None => Ok(()),
    };
    tracing::info!(stage = STAGE, revision, "analysis pass started");

    project.bridge.validate()?;
    project.timeline.ensure_valid(&project.bridge)?;
    if project.timeline.interval_count() == 0 {
        return Err(BridgeError::validation(STAGE, "the timeline has no intervals"));
    }
    checkpoint()?;

    let provisions: Arc<dyn CodeProvisions> = match provisions {
        Some(provisions) => provisions,
        None => Arc::new(LrfdProvisions::new(project.settings.criteria.edition)),
    };
    let settings = &project.settings;
    let pois = PoiRegistry::for_bridge(&project.bridge)?;
    let sections = SectionEngine::new(&project.bridge, &project.timeline, &pois, settings, &overrides);

    progress.report("structural analysis", 0.0);
    let mut actx = AnalysisContext::new(&sections, settings, provisions.as_ref(), solver).with_progress(progress);
    if let Some(token) = cancel {
        actx = actx.with_cancellation(token);
    }
    let results = analyze(&actx)?;
    checkpoint()?;

    progress.report("prestress losses", 0.0);
    let mut lctx = LossContext::new(&sections, settings, provisions.as_ref(), &results).with_progress(progress);
    if let Some(token) = cancel {
        lctx = lctx.with_cancellation(token);
    }
    let losses = strategy_for(settings.loss_method).compute(&lctx)?;
    checkpoint()?;

    progress.report("specification checks", 0.0);
    let mut cctx = CheckContext::new(&sections, settings, provisions.as_ref(), &results, &losses).with_progress(progress);
    if let Some(token) = cancel {
        cctx = cctx.with_cancellation(token);
    }
    let artifacts = run_checks(&cctx, selection)?;
    progress.report("specification checks", 1.0);

    tracing::info!(
        stage = STAGE,
        revision,
        intervals = results.interval_count,
        pois = pois.len(),
        passed = artifacts.passed(),
        "analysis pass complete"
    );
    Ok(AnalysisOutput {
        revision,
        overrides,
        pois,
        results,
        losses,
        artifacts,
    })
}

// =============================================================================
// Background worker
// =============================================================================

/// A pass running on a worker thread
pub struct AnalysisHandle {
    cancel: CancellationToken,
    thread: JoinHandle<BridgeResult<Arc<AnalysisOutput>>>,
}

impl AnalysisHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the pass to end
    pub fn join(self) -> BridgeResult<Arc<AnalysisOutput>> {
        self.thread
            .join()
            .map_err(|_| BridgeError::internal("analysis worker panicked"))?
    }
}

/// Run a pass on a background thread. At most one pass runs per analysis:
/// the worker holds the lock for the whole pass.
pub fn spawn_analysis(
    analysis: Arc<Mutex<BridgeAnalysis>>,
    progress: Arc<dyn ProgressSink>,
) -> BridgeResult<AnalysisHandle> {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let thread = thread::Builder::new()
        .name("bridge-analysis".to_string())
        .spawn(move || {
            let mut analysis = analysis
                .lock()
                .map_err(|_| BridgeError::internal("analysis lock poisoned"))?;
            analysis.run(progress.as_ref(), Some(&token))
        })
        .map_err(|e| BridgeError::internal(format!("cannot start analysis worker: {}", e)))?;
    Ok(AnalysisHandle { cancel, thread })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{CheckKind, CheckStatus};
    use crate::bridge::TransverseReinforcement;
    use crate::timeline::TimelineManager;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_run_publishes_results() {
        let mut analysis = BridgeAnalysis::new(Project::minimal_example());
        let output = analysis.run(&NullProgress, None).unwrap();
        assert_eq!(output.revision, analysis.revision());
        assert!(output.pois.len() > 0);
        assert!(!output.losses.is_empty());
        assert!(output.artifacts.status(CheckKind::FlexuralCapacity).is_final());
        // A second run with nothing changed reuses the output
        let again = analysis.run(&NullProgress, None).unwrap();
        assert!(Arc::ptr_eq(&output, &again));
    }

    #[test]
    fn test_single_span_example_passes_every_check() {
        let mut analysis = BridgeAnalysis::new(Project::single_span_example());
        let output = analysis.run(&NullProgress, None).unwrap();
        let failures: Vec<String> = output
            .artifacts
            .failures()
            .iter()
            .map(|a| format!("{:?} {} {:?}", a.kind, a.label, a.location))
            .collect();
        assert!(output.artifacts.passed(), "{:?}", failures);
        assert_eq!(output.artifacts.status(CheckKind::ShearCapacity), CheckStatus::Passed);
        assert_eq!(output.artifacts.status(CheckKind::LiftingStability), CheckStatus::Passed);
        assert_eq!(output.artifacts.status(CheckKind::HaulingStability), CheckStatus::Passed);
    }

    #[test]
    fn test_under_designed_girder_reports_its_failures() {
        let mut project = Project::single_span_example();
        let segment = &mut project.bridge.segments[0];
        // Light stirrups and no top flange bars
        segment.reinforcement.stirrups = TransverseReinforcement::default().stirrups;
        segment.longitudinal.layers.clear();
        let mut analysis = BridgeAnalysis::new(project);
        let output = analysis.run(&NullProgress, None).unwrap();
        assert!(!output.artifacts.passed());
        let failed: std::collections::BTreeSet<CheckKind> =
            output.artifacts.failures().iter().map(|a| a.kind).collect();
        assert_eq!(
            failed,
            [CheckKind::FlexuralStress, CheckKind::ShearCapacity].into_iter().collect()
        );
        assert!(output
            .artifacts
            .artifacts(CheckKind::FlexuralStress)
            .iter()
            .filter(|a| a.status == CheckStatus::Failed)
            .all(|a| a.label == "Release tension"));
        assert!(output
            .artifacts
            .artifacts(CheckKind::ShearCapacity)
            .iter()
            .filter(|a| a.status == CheckStatus::Failed)
            .all(|a| a.label == "Vertical shear"));
    }

    #[test]
    fn test_mutation_invalidates_everything() {
        let mut analysis = BridgeAnalysis::new(Project::minimal_example());
        analysis.run(&NullProgress, None).unwrap();
        let before = analysis.revision();
        analysis.project_mut().settings.relative_humidity = 50.0;
        assert!(analysis.revision() > before);
        assert!(analysis.results().is_none());
        assert!(analysis.last_valid_results().is_some());
        analysis.run(&NullProgress, None).unwrap();
        assert!(analysis.results().is_some());
    }

    #[test]
    fn test_failed_pass_keeps_previous_results() {
        let mut analysis = BridgeAnalysis::new(Project::minimal_example());
        let first = analysis.run(&NullProgress, None).unwrap();
        analysis.project_mut().timeline = TimelineManager::new();
        let err = analysis.run(&NullProgress, None).unwrap_err();
        assert_eq!(err.error_code(), "TIMELINE_CONSISTENCY");
        assert!(analysis.results().is_none());
        let kept = analysis.last_valid_results().unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
    }

    #[test]
    fn test_cancellation_aborts_and_keeps_previous_results() {
        let mut analysis = BridgeAnalysis::new(Project::single_span_example());
        let first = analysis.run(&NullProgress, None).unwrap();
        analysis.project_mut().bridge.overlay = 2.0e3;
        let token = CancellationToken::new();
        token.cancel();
        let err = analysis.run(&NullProgress, Some(&token)).unwrap_err();
        assert!(matches!(err, BridgeError::ComputationAborted { .. }));
        assert!(err.is_recoverable());
        assert!(analysis.results().is_none());
        assert!(Arc::ptr_eq(&first, &analysis.last_valid_results().unwrap()));
    }

    #[test]
    fn test_progress_is_reported() {
        let calls = AtomicUsize::new(0);
        let sink = |_: &str, fraction: f64| {
            assert!((0.0..=1.0).contains(&fraction));
            calls.fetch_add(1, Ordering::Relaxed);
        };
        let mut analysis = BridgeAnalysis::new(Project::minimal_example());
        analysis.run(&sink, None).unwrap();
        assert!(calls.load(Ordering::Relaxed) > 3);
    }

    #[test]
    fn test_selected_checks_only() {
        let mut analysis = BridgeAnalysis::new(Project::minimal_example())
            .with_selection(CheckSelection::only(&[CheckKind::StrandSlope]));
        let output = analysis.run(&NullProgress, None).unwrap();
        assert_eq!(output.artifacts.status(CheckKind::Deflection), CheckStatus::NotRun);
        assert!(output.artifacts.status(CheckKind::StrandSlope).is_final());
    }

    #[test]
    fn test_injected_provisions() {
        let provisions: Arc<dyn CodeProvisions> = Arc::new(LrfdProvisions::new(Default::default()));
        let mut analysis = BridgeAnalysis::new(Project::minimal_example()).with_provisions(provisions);
        assert!(analysis.run(&NullProgress, None).is_ok());
    }

    #[test]
    fn test_spawn_analysis() {
        let analysis = Arc::new(Mutex::new(BridgeAnalysis::new(Project::minimal_example())));
        let handle = spawn_analysis(Arc::clone(&analysis), Arc::new(NullProgress)).unwrap();
        let output = handle.join().unwrap();
        let guard = analysis.lock().unwrap();
        assert!(Arc::ptr_eq(&output, &guard.results().unwrap()));
    }

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(token.check("test", Some(1)).is_ok());
        other.cancel();
        let err = token.check("test", Some(1)).unwrap_err();
        assert_eq!(err, BridgeError::aborted("test", Some(1)));
    }
}
