//! # Limit State Combinations
//!
//! LRFD load combinations with minimum and maximum load factors. For each
//! load category the factor producing the extreme is chosen separately, and
//! the choice is reported with the result as the controlling case.
//!
//! ```text
//!               DC          DW          PS    LL
//! Service I     1.00        1.00        1.00  1.00
//! Service III   1.00        1.00        1.00  0.80
//! Strength I    0.90/1.25   0.65/1.50   1.00  1.75
//! Strength II   0.90/1.25   0.65/1.50   1.00  1.35
//! Fatigue I     -           -           -     1.75 (fatigue truck)
//! ```
//!
//! ## Ties
//!
//! When a category contributes exactly zero both factors give the same
//! result; the maximum factor is reported. When the simple-span and
//! continuous models give exactly the same extreme, the simple-span model is
//! reported.
//!
//! ## Reference
//!
//! AASHTO LRFD Table 3.4.1-1 and Table 3.4.1-2

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{AnalysisResults, LoadCategory, ModelKind, ResponseType, ResultsMode};
use crate::errors::{BridgeError, BridgeResult};
use crate::poi::PoiId;

const STAGE: &str = "load combinations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LimitState {
    ServiceI,
    ServiceIII,
    StrengthI,
    StrengthII,
    FatigueI,
}

impl LimitState {
    pub const ALL: [LimitState; 5] = [
        LimitState::ServiceI,
        LimitState::ServiceIII,
        LimitState::StrengthI,
        LimitState::StrengthII,
        LimitState::FatigueI,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            LimitState::ServiceI => "Service I",
            LimitState::ServiceIII => "Service III",
            LimitState::StrengthI => "Strength I",
            LimitState::StrengthII => "Strength II",
            LimitState::FatigueI => "Fatigue I",
        }
    }

    pub fn factors(&self) -> &'static LoadFactors {
        &LOAD_FACTORS[self]
    }

    /// Uses the fatigue truck instead of HL-93
    pub fn is_fatigue(&self) -> bool {
        matches!(self, LimitState::FatigueI)
    }
}

/// Minimum and maximum factors of one limit state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadFactors {
    pub dc: (f64, f64),
    pub dw: (f64, f64),
    pub ps: (f64, f64),
    pub ll: (f64, f64),
}

impl LoadFactors {
    pub fn range(&self, category: LoadCategory) -> (f64, f64) {
        match category {
            LoadCategory::Dc => self.dc,
            LoadCategory::Dw => self.dw,
            LoadCategory::Ps => self.ps,
            LoadCategory::Ll => self.ll,
        }
    }
}

static LOAD_FACTORS: Lazy<BTreeMap<LimitState, LoadFactors>> = Lazy::new(|| {
    let strength = |ll: f64| LoadFactors {
        dc: (0.90, 1.25),
        dw: (0.65, 1.50),
        ps: (1.0, 1.0),
        ll: (ll, ll),
    };
    let mut table = BTreeMap::new();
    table.insert(
        LimitState::ServiceI,
        LoadFactors {
            dc: (1.0, 1.0),
            dw: (1.0, 1.0),
            ps: (1.0, 1.0),
            ll: (1.0, 1.0),
        },
    );
    table.insert(
        LimitState::ServiceIII,
        LoadFactors {
            dc: (1.0, 1.0),
            dw: (1.0, 1.0),
            ps: (1.0, 1.0),
            ll: (0.8, 0.8),
        },
    );
    table.insert(LimitState::StrengthI, strength(1.75));
    table.insert(LimitState::StrengthII, strength(1.35));
    table.insert(
        LimitState::FatigueI,
        LoadFactors {
            dc: (0.0, 0.0),
            dw: (0.0, 0.0),
            ps: (0.0, 0.0),
            ll: (1.75, 1.75),
        },
    );
    table
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extreme {
    Min,
    Max,
}

/// A combined response and how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllingCase {
    pub value: f64,
    pub limit_state: LimitState,
    pub extreme: Extreme,
    pub model: ModelKind,
    /// Factor applied to each load category
    pub factors: BTreeMap<LoadCategory, f64>,
}

/// Pick the factor of `range` that drives `value` toward `extreme`. On a tie
/// (zero contribution) the larger factor is taken.
fn choose_factor(range: (f64, f64), value: f64, extreme: Extreme) -> f64 {
    let (min, max) = range;
    let lo = min * value;
    let hi = max * value;
    match extreme {
        Extreme::Max if lo > hi => min,
        Extreme::Min if lo < hi => min,
        _ => max,
    }
}

/// Extreme factored response at a POI in `interval`
pub fn combined_response(
    results: &AnalysisResults,
    poi: PoiId,
    interval: usize,
    limit_state: LimitState,
    response: ResponseType,
    extreme: Extreme,
) -> BridgeResult<ControllingCase> {
    let factors = limit_state.factors();
    let mut best: Option<ControllingCase> = None;

    for kind in results.model_kinds() {
        let mut value = 0.0;
        let mut chosen = BTreeMap::new();
        for category in [LoadCategory::Dc, LoadCategory::Dw, LoadCategory::Ps, LoadCategory::Ll] {
            let mut effect = results
                .category_response(kind, poi, interval, category, ResultsMode::Cumulative)?
                .value(response);
            if category == LoadCategory::Ll {
                let envelope = results.live_load_at(kind, poi, interval, limit_state.is_fatigue());
                effect += envelope.value(response, extreme == Extreme::Max);
            }
            let factor = choose_factor(factors.range(category), effect, extreme);
            value += factor * effect;
            chosen.insert(category, factor);
        }

        let better = match (&best, extreme) {
            (None, _) => true,
            (Some(b), Extreme::Max) => value > b.value,
            (Some(b), Extreme::Min) => value < b.value,
        };
        if better {
            best = Some(ControllingCase {
                value,
                limit_state,
                extreme,
                model: kind,
                factors: chosen,
            });
        }
    }

    best.ok_or_else(|| BridgeError::validation(STAGE, "no structural model was analyzed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fem::DirectStiffnessSolver;
    use crate::analysis::{analyze, AnalysisContext};
    use crate::overrides::DesignOverrides;
    use crate::poi::{PoiAttributes, PoiRegistry};
    use crate::project::Project;
    use crate::provisions::LrfdProvisions;
    use crate::sections::SectionEngine;
    use approx::assert_relative_eq;

    #[test]
    fn test_factor_choice() {
        let range = (0.9, 1.25);
        assert_eq!(choose_factor(range, 10.0, Extreme::Max), 1.25);
        assert_eq!(choose_factor(range, 10.0, Extreme::Min), 0.9);
        assert_eq!(choose_factor(range, -10.0, Extreme::Max), 0.9);
        assert_eq!(choose_factor(range, -10.0, Extreme::Min), 1.25);
    }

    #[test]
    fn test_zero_effect_reports_max_factor() {
        assert_eq!(choose_factor((0.65, 1.5), 0.0, Extreme::Max), 1.5);
        assert_eq!(choose_factor((0.65, 1.5), 0.0, Extreme::Min), 1.5);
    }

    #[test]
    fn test_tables() {
        assert_eq!(LimitState::StrengthI.factors().ll, (1.75, 1.75));
        assert_eq!(LimitState::ServiceIII.factors().ll, (0.8, 0.8));
        assert_eq!(LimitState::FatigueI.factors().dc, (0.0, 0.0));
        assert_eq!(LimitState::ALL.len(), 5);
    }

    #[test]
    fn test_strength_moment_on_single_span() {
        let project = Project::single_span_example();
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let sections = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        let provisions = LrfdProvisions::default();
        let ctx = AnalysisContext::new(&sections, &project.settings, &provisions, &DirectStiffnessSolver);
        let results = analyze(&ctx).unwrap();
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let last = results.interval_count - 1;

        let mu = combined_response(&results, mid, last, LimitState::StrengthI, ResponseType::Moment, Extreme::Max).unwrap();
        assert_eq!(mu.factors[&LoadCategory::Dc], 1.25);
        assert_eq!(mu.factors[&LoadCategory::Dw], 1.5);
        // Single span: both models are identical, simple span reported
        assert_eq!(mu.model, ModelKind::Simple);

        let service =
            combined_response(&results, mid, last, LimitState::ServiceI, ResponseType::Moment, Extreme::Max).unwrap();
        assert!(mu.value > service.value);

        let dc = results
            .category_response(ModelKind::Simple, mid, last, LoadCategory::Dc, ResultsMode::Cumulative)
            .unwrap()
            .moment;
        let dw = results
            .category_response(ModelKind::Simple, mid, last, LoadCategory::Dw, ResultsMode::Cumulative)
            .unwrap()
            .moment;
        let ll = results.live_load_at(ModelKind::Simple, mid, last, false).max.moment;
        assert_relative_eq!(mu.value, 1.25 * dc + 1.5 * dw + 1.75 * ll, max_relative = 1e-12);
    }
}
