//! # Analysis Results
//!
//! Force, displacement and stress responses at every POI for every interval,
//! load case and structural model, plus the live load envelopes and the
//! limit-state combinations built on them.
//!
//! The structural model is rebuilt for each interval: segments in the
//! casting yard are simply supported at their ends, erected segments rest
//! on the supports standing in the interval and closures connect segments
//! only for loads applied after they are cast. Each load case is applied in
//! the interval in which it first acts and its effects are stored as
//! increments; cumulative results are the sum of increments up to an
//! interval.
//!
//! Stresses are computed from the incremental moment on the section that
//! resists it (see [`SectionEngine::applied_section`]). Tension is positive.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::analysis::{analyze, AnalysisContext, LoadCase, ModelKind, ResponseType, ResultsMode};
//! use bridge_core::analysis::fem::DirectStiffnessSolver;
//! use bridge_core::overrides::DesignOverrides;
//! use bridge_core::poi::{PoiAttributes, PoiRegistry};
//! use bridge_core::project::Project;
//! use bridge_core::provisions::LrfdProvisions;
//! use bridge_core::sections::SectionEngine;
//!
//! let project = Project::minimal_example();
//! let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
//! let sections = SectionEngine::new(&project.bridge, &project.timeline, &pois, &project.settings, &DesignOverrides::default());
//! let provisions = LrfdProvisions::default();
//! let ctx = AnalysisContext::new(&sections, &project.settings, &provisions, &DirectStiffnessSolver);
//! let results = analyze(&ctx).unwrap();
//!
//! let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
//! let deck = results
//!     .value(ModelKind::Simple, mid, 1, LoadCase::Deck, ResponseType::Moment, ResultsMode::Cumulative)
//!     .unwrap();
//! assert!(deck > 0.0);
//! ```

pub mod combinations;
pub mod fem;
pub mod live_load;
pub mod model;
pub mod product_loads;
pub mod reactions;

pub use combinations::{combined_response, ControllingCase, Extreme, LimitState, LoadFactors};
pub use fem::{DirectStiffnessSolver, LineGirderSolver};
pub use live_load::{LiveLoadEnvelope, LiveLoadResults};
pub use model::{build_interval_model, build_yard_model, ModelKind, StructuralModel};
pub use reactions::{ReactionAdapter, SupportLocation};

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::losses::ExternalMoments;
use crate::pipeline::{CancellationToken, NullProgress, ProgressSink};
use crate::poi::PoiId;
use crate::provisions::CodeProvisions;
use crate::sections::{SectionEngine, SectionPropertyType};
use crate::settings::{AnalysisSettings, AnalysisType};
use crate::timeline::CastComponent;

const STAGE: &str = "analysis results";

// =============================================================================
// Load cases and response types
// =============================================================================

/// A product or user load case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoadCase {
    GirderSelfWeight,
    ClosureJoint,
    Deck,
    LongitudinalJoint,
    TrafficBarrier,
    Overlay,
    UserDc,
    UserDw,
    UserLlIm,
    /// Secondary effects of post-tensioning
    SecondaryPt,
}

impl LoadCase {
    pub const ALL: [LoadCase; 10] = [
        LoadCase::GirderSelfWeight,
        LoadCase::ClosureJoint,
        LoadCase::Deck,
        LoadCase::LongitudinalJoint,
        LoadCase::TrafficBarrier,
        LoadCase::Overlay,
        LoadCase::UserDc,
        LoadCase::UserDw,
        LoadCase::UserLlIm,
        LoadCase::SecondaryPt,
    ];

    pub fn category(self) -> LoadCategory {
        match self {
            LoadCase::GirderSelfWeight
            | LoadCase::ClosureJoint
            | LoadCase::Deck
            | LoadCase::LongitudinalJoint
            | LoadCase::TrafficBarrier
            | LoadCase::UserDc => LoadCategory::Dc,
            LoadCase::Overlay | LoadCase::UserDw => LoadCategory::Dw,
            LoadCase::UserLlIm => LoadCategory::Ll,
            LoadCase::SecondaryPt => LoadCategory::Ps,
        }
    }
}

/// Load factor category of a load case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoadCategory {
    /// Structural components and attachments
    Dc,
    /// Wearing surfaces and utilities
    Dw,
    /// Secondary forces from post-tensioning
    Ps,
    /// Vehicular live load with dynamic allowance
    Ll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResponseType {
    Moment,
    Shear,
    Deflection,
    Rotation,
    TopGirderStress,
    BottomGirderStress,
    TopDeckStress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultsMode {
    /// Effect of loads applied at the start of the interval
    Incremental,
    /// Sum of increments up to and including the interval
    Cumulative,
}

/// All responses at one POI (SI units, tension and sagging positive)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointResponse {
    pub moment: f64,
    pub shear: f64,
    pub deflection: f64,
    pub rotation: f64,
    pub top_girder: f64,
    pub bottom_girder: f64,
    pub top_deck: f64,
}

impl PointResponse {
    pub fn value(&self, response: ResponseType) -> f64 {
        match response {
            ResponseType::Moment => self.moment,
            ResponseType::Shear => self.shear,
            ResponseType::Deflection => self.deflection,
            ResponseType::Rotation => self.rotation,
            ResponseType::TopGirderStress => self.top_girder,
            ResponseType::BottomGirderStress => self.bottom_girder,
            ResponseType::TopDeckStress => self.top_deck,
        }
    }
}

impl Add for PointResponse {
    type Output = PointResponse;

    fn add(self, rhs: PointResponse) -> PointResponse {
        PointResponse {
            moment: self.moment + rhs.moment,
            shear: self.shear + rhs.shear,
            deflection: self.deflection + rhs.deflection,
            rotation: self.rotation + rhs.rotation,
            top_girder: self.top_girder + rhs.top_girder,
            bottom_girder: self.bottom_girder + rhs.bottom_girder,
            top_deck: self.top_deck + rhs.top_deck,
        }
    }
}

impl AddAssign for PointResponse {
    fn add_assign(&mut self, rhs: PointResponse) {
        *self = *self + rhs;
    }
}

impl Sub for PointResponse {
    type Output = PointResponse;

    fn sub(self, rhs: PointResponse) -> PointResponse {
        self + rhs * -1.0
    }
}

impl Mul<f64> for PointResponse {
    type Output = PointResponse;

    fn mul(self, k: f64) -> PointResponse {
        PointResponse {
            moment: self.moment * k,
            shear: self.shear * k,
            deflection: self.deflection * k,
            rotation: self.rotation * k,
            top_girder: self.top_girder * k,
            bottom_girder: self.bottom_girder * k,
            top_deck: self.top_deck * k,
        }
    }
}

// =============================================================================
// Stresses
// =============================================================================

/// Stress per unit moment at the girder top, girder bottom and deck top (1/m³)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StressFactors {
    pub top_girder: f64,
    pub bottom_girder: f64,
    pub top_deck: f64,
}

impl StressFactors {
    pub fn stresses(&self, moment: f64) -> PointResponse {
        PointResponse {
            moment,
            top_girder: self.top_girder * moment,
            bottom_girder: self.bottom_girder * moment,
            top_deck: self.top_deck * moment,
            ..PointResponse::default()
        }
    }
}

/// Stress factors of the section resisting loads applied at the start of `interval`
pub fn stress_factors(
    sections: &SectionEngine<'_>,
    poi: PoiId,
    interval: usize,
    ptype: SectionPropertyType,
) -> BridgeResult<StressFactors> {
    let section = sections.applied_section(poi, interval, ptype)?;
    if section.ix <= 0.0 {
        return Ok(StressFactors::default());
    }
    let deck_ratio = if section.y_top_deck > 0.0 && section.reference_modulus > 0.0 {
        sections
            .component_concrete(CastComponent::Deck, interval)?
            .map(|deck| deck.ec / section.reference_modulus)
            .unwrap_or(0.0)
    } else {
        0.0
    };
    Ok(StressFactors {
        top_girder: -section.y_top_girder / section.ix,
        bottom_girder: section.y_bottom / section.ix,
        top_deck: -deck_ratio * section.y_top_deck / section.ix,
    })
}

/// Stresses from a moment applied at the start of `interval`
pub fn flexural_stresses(
    sections: &SectionEngine<'_>,
    poi: PoiId,
    interval: usize,
    ptype: SectionPropertyType,
    moment: f64,
) -> BridgeResult<PointResponse> {
    Ok(stress_factors(sections, poi, interval, ptype)?.stresses(moment))
}

// =============================================================================
// Results store
// =============================================================================

/// Incremental product load results of one structural model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelResults {
    increments: BTreeMap<(usize, LoadCase), BTreeMap<PoiId, PointResponse>>,
    reactions: BTreeMap<(usize, LoadCase), BTreeMap<SupportLocation, f64>>,
}

impl ModelResults {
    pub(crate) fn add_response(&mut self, interval: usize, case: LoadCase, poi: PoiId, response: PointResponse) {
        *self
            .increments
            .entry((interval, case))
            .or_default()
            .entry(poi)
            .or_default() += response;
    }

    pub(crate) fn add_reaction(&mut self, interval: usize, case: LoadCase, support: SupportLocation, reaction: f64) {
        *self
            .reactions
            .entry((interval, case))
            .or_default()
            .entry(support)
            .or_insert(0.0) += reaction;
    }

    pub fn increment(&self, poi: PoiId, interval: usize, case: LoadCase) -> PointResponse {
        self.increments
            .get(&(interval, case))
            .and_then(|m| m.get(&poi))
            .copied()
            .unwrap_or_default()
    }

    pub fn cumulative(&self, poi: PoiId, interval: usize, case: LoadCase) -> PointResponse {
        (0..=interval).fold(PointResponse::default(), |acc, k| acc + self.increment(poi, k, case))
    }

    pub fn reaction_increment(&self, support: SupportLocation, interval: usize, case: LoadCase) -> f64 {
        self.reactions
            .get(&(interval, case))
            .and_then(|m| m.get(&support))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn cumulative_reaction(&self, support: SupportLocation, interval: usize, case: LoadCase) -> f64 {
        (0..=interval).map(|k| self.reaction_increment(support, k, case)).sum()
    }

    /// Reaction increments at every support
    pub fn reactions_at(&self, interval: usize, case: LoadCase) -> BTreeMap<SupportLocation, f64> {
        self.reactions.get(&(interval, case)).cloned().unwrap_or_default()
    }
}

/// Published results of the structural analysis
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisResults {
    pub analysis_type: AnalysisType,
    pub interval_count: usize,
    models: BTreeMap<ModelKind, ModelResults>,
    live_load: BTreeMap<ModelKind, LiveLoadResults>,
}

impl AnalysisResults {
    /// Models analyzed, simple span first
    pub fn model_kinds(&self) -> impl Iterator<Item = ModelKind> + '_ {
        self.models.keys().copied()
    }

    /// The model used where a single answer is needed
    pub fn primary_kind(&self) -> ModelKind {
        match self.analysis_type {
            AnalysisType::Simple => ModelKind::Simple,
            AnalysisType::Continuous | AnalysisType::Envelope => ModelKind::Continuous,
        }
    }

    pub fn model(&self, kind: ModelKind) -> BridgeResult<&ModelResults> {
        self.models
            .get(&kind)
            .ok_or_else(|| BridgeError::validation(STAGE, format!("the {} model was not analyzed", kind)))
    }

    fn check_interval(&self, interval: usize) -> BridgeResult<()> {
        if interval >= self.interval_count {
            return Err(BridgeError::validation(
                STAGE,
                format!("interval {} is outside the timeline ({} intervals)", interval, self.interval_count),
            ));
        }
        Ok(())
    }

    pub fn response(
        &self,
        kind: ModelKind,
        poi: PoiId,
        interval: usize,
        case: LoadCase,
        mode: ResultsMode,
    ) -> BridgeResult<PointResponse> {
        self.check_interval(interval)?;
        let model = self.model(kind)?;
        Ok(match mode {
            ResultsMode::Incremental => model.increment(poi, interval, case),
            ResultsMode::Cumulative => model.cumulative(poi, interval, case),
        })
    }

    pub fn value(
        &self,
        kind: ModelKind,
        poi: PoiId,
        interval: usize,
        case: LoadCase,
        response: ResponseType,
        mode: ResultsMode,
    ) -> BridgeResult<f64> {
        Ok(self.response(kind, poi, interval, case, mode)?.value(response))
    }

    /// Sum over the load cases of one category
    pub fn category_response(
        &self,
        kind: ModelKind,
        poi: PoiId,
        interval: usize,
        category: LoadCategory,
        mode: ResultsMode,
    ) -> BridgeResult<PointResponse> {
        let mut total = PointResponse::default();
        for case in LoadCase::ALL.into_iter().filter(|c| c.category() == category) {
            total += self.response(kind, poi, interval, case, mode)?;
        }
        Ok(total)
    }

    pub fn reaction(
        &self,
        kind: ModelKind,
        support: SupportLocation,
        interval: usize,
        case: LoadCase,
        mode: ResultsMode,
    ) -> BridgeResult<f64> {
        self.check_interval(interval)?;
        let model = self.model(kind)?;
        Ok(match mode {
            ResultsMode::Incremental => model.reaction_increment(support, interval, case),
            ResultsMode::Cumulative => model.cumulative_reaction(support, interval, case),
        })
    }

    /// Live load results, when the timeline applies live load
    pub fn live_load(&self, kind: ModelKind) -> Option<&LiveLoadResults> {
        self.live_load.get(&kind)
    }

    /// Live load envelope acting in `interval`, zero before live load is applied
    pub fn live_load_at(&self, kind: ModelKind, poi: PoiId, interval: usize, fatigue: bool) -> LiveLoadEnvelope {
        match self.live_load.get(&kind) {
            Some(ll) if interval >= ll.interval => {
                if fatigue {
                    ll.fatigue(poi)
                } else {
                    ll.design(poi)
                }
            }
            _ => LiveLoadEnvelope::default(),
        }
    }
}

impl ExternalMoments for AnalysisResults {
    fn incremental_moment(&self, poi: PoiId, interval: usize) -> f64 {
        let Some(model) = self.models.get(&self.primary_kind()) else {
            return 0.0;
        };
        LoadCase::ALL
            .into_iter()
            .filter(|c| c.category() != LoadCategory::Ll)
            .map(|c| model.increment(poi, interval, c).moment)
            .sum()
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Everything the structural analysis reads
pub struct AnalysisContext<'a> {
    pub sections: &'a SectionEngine<'a>,
    pub settings: &'a AnalysisSettings,
    pub provisions: &'a dyn CodeProvisions,
    pub solver: &'a dyn LineGirderSolver,
    pub progress: &'a dyn ProgressSink,
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        sections: &'a SectionEngine<'a>,
        settings: &'a AnalysisSettings,
        provisions: &'a dyn CodeProvisions,
        solver: &'a dyn LineGirderSolver,
    ) -> Self {
        AnalysisContext {
            sections,
            settings,
            provisions,
            solver,
            progress: &NullProgress,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn checkpoint(&self, interval: usize) -> BridgeResult<()> {
        match self.cancel {
            Some(token) => token.check(STAGE, Some(interval)),
            None => Ok(()),
        }
    }

    /// Structural models required by the analysis type
    pub fn model_kinds(&self) -> Vec<ModelKind> {
        match self.settings.analysis_type {
            AnalysisType::Simple => vec![ModelKind::Simple],
            AnalysisType::Continuous => vec![ModelKind::Continuous],
            AnalysisType::Envelope => vec![ModelKind::Simple, ModelKind::Continuous],
        }
    }
}

/// Product loads for every interval and model, then live load
pub fn analyze(ctx: &AnalysisContext<'_>) -> BridgeResult<AnalysisResults> {
    let timeline = ctx.sections.timeline();
    let mut results = AnalysisResults {
        analysis_type: ctx.settings.analysis_type,
        interval_count: timeline.interval_count(),
        ..AnalysisResults::default()
    };
    tracing::info!(
        stage = STAGE,
        intervals = results.interval_count,
        pois = ctx.sections.pois().len(),
        "structural analysis started"
    );

    for kind in ctx.model_kinds() {
        let model_results = product_loads::analyze_product_loads(ctx, kind)?;
        results.models.insert(kind, model_results);

        if let Some(interval) = timeline.live_load_interval() {
            let model = build_interval_model(ctx.sections, kind, interval, ctx.settings.section_properties)?;
            let ll_ctx = live_load::LiveLoadContext {
                sections: ctx.sections,
                provisions: ctx.provisions,
                solver: ctx.solver,
                settings: &ctx.settings.live_load,
                section_type: ctx.settings.section_properties,
            };
            results.live_load.insert(kind, live_load::analyze_live_load(&ll_ctx, &model)?);
        }
    }

    tracing::info!(stage = STAGE, models = results.models.len(), "structural analysis complete");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::DesignOverrides;
    use crate::poi::{PoiAttributes, PoiRegistry};
    use crate::project::Project;
    use crate::provisions::LrfdProvisions;
    use approx::assert_relative_eq;

    fn run(project: &Project) -> (PoiRegistry, AnalysisResults) {
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let results = {
            let sections = SectionEngine::new(
                &project.bridge,
                &project.timeline,
                &pois,
                &project.settings,
                &DesignOverrides::default(),
            );
            let provisions = LrfdProvisions::default();
            let ctx = AnalysisContext::new(&sections, &project.settings, &provisions, &DirectStiffnessSolver);
            analyze(&ctx).unwrap()
        };
        (pois, results)
    }

    #[test]
    fn test_self_weight_at_release() {
        let project = Project::single_span_example();
        let (pois, results) = run(&project);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let w = project.bridge.segments[0].weight_per_length();
        let m = results
            .value(ModelKind::Simple, mid, 0, LoadCase::GirderSelfWeight, ResponseType::Moment, ResultsMode::Incremental)
            .unwrap();
        assert_relative_eq!(m, w * 30.0 * 30.0 / 8.0, max_relative = 1e-9);

        let r = results
            .reaction(ModelKind::Simple, SupportLocation::Pier(0), 0, LoadCase::GirderSelfWeight, ResultsMode::Cumulative)
            .unwrap();
        assert_relative_eq!(r, w * 15.0, max_relative = 1e-9);
    }

    #[test]
    fn test_cumulative_is_sum_of_increments() {
        let project = Project::single_span_example();
        let (pois, results) = run(&project);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        for case in LoadCase::ALL {
            let mut sum = 0.0;
            for k in 0..results.interval_count {
                sum += results
                    .value(ModelKind::Continuous, mid, k, case, ResponseType::Moment, ResultsMode::Incremental)
                    .unwrap();
                let cumulative = results
                    .value(ModelKind::Continuous, mid, k, case, ResponseType::Moment, ResultsMode::Cumulative)
                    .unwrap();
                assert_relative_eq!(cumulative, sum, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_deck_stress_on_noncomposite_girder() {
        let project = Project::single_span_example();
        let (pois, results) = run(&project);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let deck = results
            .response(ModelKind::Simple, mid, 1, LoadCase::Deck, ResultsMode::Incremental)
            .unwrap();
        assert!(deck.moment > 0.0);
        assert!(deck.bottom_girder > 0.0);
        assert!(deck.top_girder < 0.0);
        // Wet deck carries no stress
        assert_eq!(deck.top_deck, 0.0);

        // Barrier acts on the composite section
        let barrier = results
            .response(ModelKind::Simple, mid, 2, LoadCase::TrafficBarrier, ResultsMode::Incremental)
            .unwrap();
        assert!(barrier.top_deck < 0.0);
    }

    #[test]
    fn test_live_load_only_after_its_interval() {
        let project = Project::single_span_example();
        let (pois, results) = run(&project);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let before = results.live_load_at(ModelKind::Simple, mid, 1, false);
        let after = results.live_load_at(ModelKind::Simple, mid, 2, false);
        assert_eq!(before.max.moment, 0.0);
        assert!(after.max.moment > 0.0);
        assert!(after.min.deflection < 0.0);
    }

    #[test]
    fn test_interval_out_of_range() {
        let project = Project::minimal_example();
        let (pois, results) = run(&project);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let err = results
            .response(ModelKind::Simple, mid, 5, LoadCase::Deck, ResultsMode::Cumulative)
            .unwrap_err();
        assert_eq!(err.error_code(), "AGENT_VALIDATION_FAILURE");
    }

    #[test]
    fn test_spliced_tower_removal_transfers_reaction() {
        let project = Project::spliced_example();
        let (_, results) = run(&project);
        let removal = project.timeline.temporary_support_removal_interval(0).unwrap();
        let kind = ModelKind::Continuous;
        let tower = SupportLocation::TemporarySupport(0);
        for case in [LoadCase::GirderSelfWeight, LoadCase::ClosureJoint] {
            let before = results.reaction(kind, tower, removal - 1, case, ResultsMode::Cumulative).unwrap();
            let after = results.reaction(kind, tower, removal, case, ResultsMode::Cumulative).unwrap();
            assert!(before > 0.0);
            assert!(after.abs() < 1.0e-6 * before);
        }
        // Total girder weight ends on the permanent piers
        let w: f64 = project.bridge.segments.iter().map(|s| s.weight_per_length() * s.length).sum();
        let piers: f64 = (0..3)
            .map(|i| {
                results
                    .reaction(kind, SupportLocation::Pier(i), removal, LoadCase::GirderSelfWeight, ResultsMode::Cumulative)
                    .unwrap()
            })
            .sum();
        assert_relative_eq!(piers, w, max_relative = 1e-9);
    }

    #[test]
    fn test_secondary_moment_with_redundant_supports() {
        let project = Project::spliced_example();
        let (pois, results) = run(&project);
        let stressing = project.timeline.tendon_stressing_interval(0).unwrap();
        let pier = pois
            .by_attribute(PoiAttributes::SUPPORT)
            .into_iter()
            .find(|id| (pois.get(*id).unwrap().station - 40.0).abs() < 1e-6)
            .unwrap();
        // Towers still stand when the tendon is stressed
        let secondary = results
            .value(ModelKind::Continuous, pier, stressing, LoadCase::SecondaryPt, ResponseType::Moment, ResultsMode::Incremental)
            .unwrap();
        assert!(secondary.abs() > 1.0);
        let reactions: f64 = results
            .model(ModelKind::Continuous)
            .unwrap()
            .reactions_at(stressing, LoadCase::SecondaryPt)
            .values()
            .sum();
        // Secondary reactions are self-equilibrating
        assert!(reactions.abs() < 1.0e-6 * secondary.abs());
    }
}
