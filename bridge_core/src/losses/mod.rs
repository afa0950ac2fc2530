//! # Prestress Losses
//!
//! Elastic and time-dependent losses in the pretensioned strands and the
//! post-tensioning tendons at every POI and interval.
//!
//! Two interchangeable strategies implement [`LossStrategy`]:
//!
//! - [`LumpSumLosses`]: closed-form LRFD approximate estimates evaluated
//!   once per POI and spread over time with the LRFD time development
//!   function.
//! - [`TimeStepLosses`]: incremental losses carried interval by interval
//!   with the age-adjusted effective modulus method. Interval `i` depends on
//!   interval `i - 1`; evaluation out of order is rejected.
//!
//! Losses are positive when they reduce the steel stress. Elastic gains from
//! loads applied after transfer are reported separately and are not part of
//! the total.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::losses::{strategy_for, LossContext, PrestressSource};
//! use bridge_core::overrides::DesignOverrides;
//! use bridge_core::poi::{PoiAttributes, PoiId, PoiRegistry};
//! use bridge_core::project::Project;
//! use bridge_core::provisions::LrfdProvisions;
//! use bridge_core::sections::SectionEngine;
//!
//! let project = Project::minimal_example();
//! let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
//! let sections = SectionEngine::new(&project.bridge, &project.timeline, &pois, &project.settings, &DesignOverrides::default());
//! let provisions = LrfdProvisions::default();
//! let no_loads = |_: PoiId, _: usize| 0.0;
//! let ctx = LossContext::new(&sections, &project.settings, &provisions, &no_loads);
//!
//! let table = strategy_for(project.settings.loss_method).compute(&ctx).unwrap();
//! let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
//! let early = table.get(mid, 0, PrestressSource::Pretension).unwrap();
//! let late = table.get(mid, 1, PrestressSource::Pretension).unwrap();
//! assert!(late.total > early.total);
//! ```

pub mod friction;
pub mod lump_sum;
pub mod time_step;

pub use friction::TendonForceProfile;
pub use lump_sum::LumpSumLosses;
pub use time_step::{TimeStepLosses, TimeStepRun};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bridge::MemberId;
use crate::errors::{BridgeError, BridgeResult};
use crate::pipeline::{CancellationToken, NullProgress, ProgressSink};
use crate::poi::{Poi, PoiId};
use crate::provisions::CodeProvisions;
use crate::sections::{SectionEngine, SectionProperties, SectionPropertyType};
use crate::settings::{AnalysisSettings, LossMethod};
use crate::timeline::CastComponent;

const STAGE: &str = "prestress losses";

/// Steel whose losses are tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrestressSource {
    /// All bonded pretensioned strands at the POI
    Pretension,
    /// Post-tensioning tendon by index
    Tendon(usize),
}

/// Loss components in one steel source at a POI, cumulative to the end of an interval (Pa)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LossBreakdown {
    pub elastic_shortening: f64,
    pub creep: f64,
    /// Girder shrinkage, less any gain from deck shrinkage
    pub shrinkage: f64,
    pub relaxation: f64,
    /// Tendons only
    pub friction_and_anchor_set: f64,
    /// Stress increase from loads applied after transfer (not in `total`)
    pub elastic_gain: f64,
    pub total: f64,
    /// Jacking stress less the total loss
    pub effective_stress: f64,
    /// Effective stress times the developed steel area (N)
    pub effective_force: f64,
}

impl LossBreakdown {
    fn finish(mut self, fpj: f64, developed_area: f64) -> Self {
        self.total =
            self.elastic_shortening + self.creep + self.shrinkage + self.relaxation + self.friction_and_anchor_set;
        self.effective_stress = fpj - self.total;
        self.effective_force = self.effective_stress * developed_area;
        self
    }

    /// Effective stress including elastic gains (Pa)
    pub fn stress_with_gains(&self) -> f64 {
        self.effective_stress + self.elastic_gain
    }

    pub fn time_dependent(&self) -> f64 {
        self.creep + self.shrinkage + self.relaxation
    }
}

/// Incremental moments from the product loads, used for elastic effects on the steel.
pub trait ExternalMoments {
    /// Sum of the permanent-load moments (N·m, sagging positive) applied at
    /// the start of `interval`.
    fn incremental_moment(&self, poi: PoiId, interval: usize) -> f64;
}

impl<F> ExternalMoments for F
where
    F: Fn(PoiId, usize) -> f64,
{
    fn incremental_moment(&self, poi: PoiId, interval: usize) -> f64 {
        self(poi, interval)
    }
}

/// Losses for every POI, interval and steel source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossTable {
    method: Option<LossMethod>,
    entries: BTreeMap<PoiId, BTreeMap<(usize, PrestressSource), LossBreakdown>>,
    tendons: Vec<TendonForceProfile>,
}

impl LossTable {
    pub fn new(method: LossMethod, tendons: Vec<TendonForceProfile>) -> Self {
        LossTable {
            method: Some(method),
            entries: BTreeMap::new(),
            tendons,
        }
    }

    pub fn method(&self) -> Option<LossMethod> {
        self.method
    }

    pub fn insert(&mut self, poi: PoiId, interval: usize, source: PrestressSource, losses: LossBreakdown) {
        self.entries.entry(poi).or_default().insert((interval, source), losses);
    }

    /// Losses in `source` at the end of `interval`; `None` before the steel is stressed
    pub fn get(&self, poi: PoiId, interval: usize, source: PrestressSource) -> Option<&LossBreakdown> {
        self.entries.get(&poi).and_then(|m| m.get(&(interval, source)))
    }

    /// Like [`LossTable::get`], failing for steel that is not stressed yet
    pub fn losses(&self, poi: PoiId, interval: usize, source: PrestressSource) -> BridgeResult<&LossBreakdown> {
        self.get(poi, interval, source).ok_or_else(|| {
            BridgeError::validation(
                STAGE,
                format!("no {:?} losses at POI {} in interval {}", source, poi.0, interval),
            )
        })
    }

    /// Every stressed source at a POI in `interval`
    pub fn sources(&self, poi: PoiId, interval: usize) -> impl Iterator<Item = (PrestressSource, &LossBreakdown)> {
        self.entries
            .get(&poi)
            .into_iter()
            .flat_map(|m| m.iter())
            .filter(move |((k, _), _)| *k == interval)
            .map(|((_, s), l)| (*s, l))
    }

    pub fn tendon_profile(&self, tendon: usize) -> Option<&TendonForceProfile> {
        self.tendons.get(tendon)
    }

    pub fn tendon_profiles(&self) -> &[TendonForceProfile] {
        &self.tendons
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a loss strategy reads.
pub struct LossContext<'a> {
    pub sections: &'a SectionEngine<'a>,
    pub settings: &'a AnalysisSettings,
    pub provisions: &'a dyn CodeProvisions,
    pub moments: &'a dyn ExternalMoments,
    pub progress: &'a dyn ProgressSink,
    pub cancel: Option<&'a CancellationToken>,
}

impl<'a> LossContext<'a> {
    pub fn new(
        sections: &'a SectionEngine<'a>,
        settings: &'a AnalysisSettings,
        provisions: &'a dyn CodeProvisions,
        moments: &'a dyn ExternalMoments,
    ) -> Self {
        LossContext {
            sections,
            settings,
            provisions,
            moments,
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

    fn checkpoint(&self, interval: usize) -> BridgeResult<()> {
        match self.cancel {
            Some(token) => token.check(STAGE, Some(interval)),
            None => Ok(()),
        }
    }

    fn tendon_profiles(&self) -> Vec<TendonForceProfile> {
        self.sections.bridge().tendons.iter().map(TendonForceProfile::new).collect()
    }
}

/// A loss computation method
pub trait LossStrategy {
    fn method(&self) -> LossMethod;

    fn compute(&self, ctx: &LossContext<'_>) -> BridgeResult<LossTable>;
}

/// The strategy selected by the project settings
pub fn strategy_for(method: LossMethod) -> Box<dyn LossStrategy> {
    match method {
        LossMethod::Approximate => Box::new(LumpSumLosses),
        LossMethod::TimeStep => Box::new(TimeStepLosses),
    }
}

// =============================================================================
// Steel at a POI
// =============================================================================

/// One prestressing source as seen from a POI
#[derive(Debug, Clone, Copy)]
pub(crate) struct SteelAtPoi {
    pub source: PrestressSource,
    /// Steel area (m²)
    pub area: f64,
    /// Fraction of the force developed (transfer length)
    pub developed: f64,
    /// Height above the girder bottom (m)
    pub y: f64,
    pub fpj: f64,
    /// Stress immediately after friction and anchor set, before elastic losses (Pa)
    pub initial: f64,
    pub fpy: f64,
    pub ep: f64,
    pub relaxation_constant: f64,
    pub approximate_relaxation: f64,
    /// Interval in which the steel is stressed into the concrete
    pub interval: usize,
    /// Day the steel was jacked
    pub jacking_day: f64,
}

impl SteelAtPoi {
    pub fn developed_area(&self) -> f64 {
        self.area * self.developed
    }
}

/// Prestressing steel acting at a POI
pub(crate) fn steel_at(
    ctx: &LossContext<'_>,
    poi: &Poi,
    profiles: &[TendonForceProfile],
) -> BridgeResult<Vec<SteelAtPoi>> {
    let sections = ctx.sections;
    let bridge = sections.bridge();
    let timeline = sections.timeline();
    let mut steel = Vec::new();

    if let MemberId::Segment(i) = poi.location.member {
        let segment = &bridge.segments[i];
        if let Some((area, y)) = sections.strands_at(poi) {
            if area > 0.0 {
                let (interval, placed) = timeline
                    .casting(CastComponent::Segment(i))
                    .ok_or_else(|| BridgeError::validation(STAGE, format!("{} is never constructed", poi.location.member)))?;
                let strand = &segment.strands.material;
                let lt = ctx.provisions.transfer_length(strand);
                steel.push(SteelAtPoi {
                    source: PrestressSource::Pretension,
                    area,
                    developed: segment.strands.transfer_factor(poi.location.distance, segment.length, lt),
                    y,
                    fpj: segment.strands.jacking_stress(),
                    initial: segment.strands.jacking_stress(),
                    fpy: strand.fpy,
                    ep: strand.ep,
                    relaxation_constant: strand.relaxation_constant(),
                    approximate_relaxation: strand.approximate_relaxation_loss(),
                    interval,
                    jacking_day: placed,
                });
            }
        }
    }

    for (index, y) in sections.tendons_at(poi) {
        let tendon = &bridge.tendons[index];
        let Some(interval) = timeline.tendon_stressing_interval(index) else {
            continue;
        };
        let jacking_day = timeline
            .interval(interval)
            .map(|i| i.start)
            .ok_or_else(|| BridgeError::validation(STAGE, format!("interval {} does not exist", interval)))?;
        let profile = profiles
            .get(index)
            .ok_or_else(|| BridgeError::validation(STAGE, format!("no force profile for tendon {}", index)))?;
        let initial = if ctx.settings.use_average_tendon_force {
            profile.average()
        } else {
            profile.stress(poi.station)
        };
        steel.push(SteelAtPoi {
            source: PrestressSource::Tendon(index),
            area: tendon.area(),
            developed: 1.0,
            y,
            fpj: tendon.jacking_stress(),
            initial,
            fpy: tendon.strand.fpy,
            ep: tendon.strand.ep,
            relaxation_constant: tendon.strand.relaxation_constant(),
            approximate_relaxation: tendon.strand.approximate_relaxation_loss(),
            interval,
            jacking_day,
        });
    }
    Ok(steel)
}

/// Gross section resisting a load applied at the start of `interval`
pub(crate) fn applied_section(
    sections: &SectionEngine<'_>,
    poi: &Poi,
    interval: usize,
) -> BridgeResult<SectionProperties> {
    sections.applied_section(poi.id, interval, SectionPropertyType::Gross)
}

/// Relaxation between `t_start` and `t_end` days after jacking for steel at
/// stress `fpt`, log-time form. Zero below 0.55 fpy.
pub(crate) fn relaxation_increment(fpt: f64, fpy: f64, kl: f64, t_start: f64, t_end: f64) -> f64 {
    let hours = |t: f64| (24.0 * t).max(1.0);
    let ratio = fpt / fpy - 0.55;
    if ratio <= 0.0 || t_end <= t_start || kl <= 0.0 {
        return 0.0;
    }
    (fpt / kl * (hours(t_end) / hours(t_start)).log10() * ratio).max(0.0)
}

/// Elastic shortening of pretensioning at transfer, closed form
///
/// `fpbt` is the steel stress just before transfer and `mg` the girder
/// self-weight moment acting at transfer.
pub(crate) fn pretension_elastic_shortening(
    aps: f64,
    fpbt: f64,
    girder: &SectionProperties,
    y: f64,
    mg: f64,
    eci: f64,
    ep: f64,
) -> f64 {
    let (ag, ig) = (girder.area, girder.ix);
    if aps <= 0.0 || ag <= 0.0 || ep <= 0.0 {
        return 0.0;
    }
    let e = girder.eccentricity(y);
    let k = ig + e * e * ag;
    (aps * fpbt * k - e * mg * ag) / (aps * k + ag * ig * eci / ep)
}

/// Average elastic shortening of N tendons stressed one after another
pub(crate) fn tendon_elastic_shortening(
    steel: &SteelAtPoi,
    all: &[SteelAtPoi],
    section: &SectionProperties,
    tendon_count: usize,
    ec: f64,
) -> f64 {
    let n = tendon_count as f64;
    if n <= 1.0 || section.is_zero() || ec <= 0.0 {
        return 0.0;
    }
    let fcgp: f64 = all
        .iter()
        .filter(|s| matches!(s.source, PrestressSource::Tendon(_)) && s.interval == steel.interval)
        .map(|s| {
            let p = s.area * s.initial;
            p / section.area + p * section.eccentricity(s.y) * section.eccentricity(steel.y) / section.ix
        })
        .sum();
    (n - 1.0) / (2.0 * n) * steel.ep / ec * fcgp
}

/// Deck shrinkage state driving the composite-section restraint
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeckShrinkage {
    /// Free shrinkage strain of the deck (positive = shortening)
    pub strain: f64,
    pub modulus: f64,
    pub creep: f64,
}

/// Stress change at the steel from deck shrinkage on the composite section.
/// Negative values are gains.
pub(crate) fn deck_shrinkage_effect(
    sections: &SectionEngine<'_>,
    poi: &Poi,
    steel: &SteelAtPoi,
    composite_interval: usize,
    deck_state: DeckShrinkage,
    girder_modulus: f64,
) -> BridgeResult<f64> {
    let Some(deck) = &sections.bridge().deck else {
        return Ok(0.0);
    };
    let Some(deck_top) = sections.deck_top(poi)? else {
        return Ok(0.0);
    };
    let composite = sections.section_properties(poi.id, composite_interval, SectionPropertyType::Gross)?;
    if composite.is_zero() || girder_modulus <= 0.0 {
        return Ok(0.0);
    }
    let ad = deck.effective_width * deck.thickness;
    let epc = composite.eccentricity(steel.y);
    let ed = deck_top - deck.thickness / 2.0 - composite.y_bottom;
    let dfcdf = deck_state.strain * ad * deck_state.modulus / (1.0 + 0.7 * deck_state.creep)
        * (1.0 / composite.area - epc * ed / composite.ix);
    Ok(steel.ep / girder_modulus * dfcdf)
}

/// Deck shrinkage state at the end of `interval`, `None` before the deck is composite
pub(crate) fn deck_state(sections: &SectionEngine<'_>, interval: usize) -> BridgeResult<Option<(usize, DeckShrinkage)>> {
    let timeline = sections.timeline();
    let (Some(composite), Some((cast, placed))) = (timeline.composite_deck_interval(), timeline.casting(CastComponent::Deck))
    else {
        return Ok(None);
    };
    if interval < composite {
        return Ok(None);
    }
    let (Some(cast_day), Some(end)) = (
        timeline.interval(cast).map(|i| i.start),
        timeline.interval(interval).map(|i| i.end),
    ) else {
        return Ok(None);
    };
    let concrete = sections.maturing(CastComponent::Deck)?;
    let drying_start = cast_day - placed;
    let age = end - placed;
    Ok(Some((
        composite,
        DeckShrinkage {
            strain: concrete.shrinkage_strain(age, drying_start)?,
            modulus: concrete.modulus(age)?,
            creep: concrete.creep_coefficient(age, drying_start)?,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::DesignOverrides;
    use crate::poi::{PoiAttributes, PoiRegistry};
    use crate::project::Project;
    use crate::provisions::LrfdProvisions;
    use approx::assert_relative_eq;

    #[test]
    fn test_breakdown_totals() {
        let losses = LossBreakdown {
            elastic_shortening: 100.0e6,
            creep: 50.0e6,
            shrinkage: 30.0e6,
            relaxation: 10.0e6,
            elastic_gain: 20.0e6,
            ..LossBreakdown::default()
        }
        .finish(1400.0e6, 1.0e-3);
        assert_relative_eq!(losses.total, 190.0e6);
        assert_relative_eq!(losses.effective_stress, 1210.0e6);
        assert_relative_eq!(losses.effective_force, 1.21e6);
        assert_relative_eq!(losses.stress_with_gains(), 1230.0e6);
        assert_relative_eq!(losses.time_dependent(), 90.0e6);
    }

    #[test]
    fn test_relaxation_increment() {
        assert_eq!(relaxation_increment(0.5 * 1674.0e6, 1674.0e6, 45.0, 1.0, 100.0), 0.0);
        let fpt = 1300.0e6;
        let r = relaxation_increment(fpt, 1674.0e6, 45.0, 1.0, 10.0);
        assert_relative_eq!(r, fpt / 45.0 * (240.0f64 / 24.0).log10() * (fpt / 1674.0e6 - 0.55), max_relative = 1e-12);
        assert_eq!(relaxation_increment(fpt, 1674.0e6, 45.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn test_steel_at_midspan_and_closure() {
        let project = Project::spliced_example();
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let sections = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        let provisions = LrfdProvisions::default();
        let no_loads = |_: PoiId, _: usize| 0.0;
        let ctx = LossContext::new(&sections, &project.settings, &provisions, &no_loads);
        let profiles = ctx.tendon_profiles();

        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let steel = steel_at(&ctx, pois.get(mid).unwrap(), &profiles).unwrap();
        assert_eq!(steel.len(), 2);
        assert_eq!(steel[0].source, PrestressSource::Pretension);
        assert_eq!(steel[1].source, PrestressSource::Tendon(0));
        assert!(steel[1].initial < steel[1].fpj);
        assert_eq!(steel[1].interval, 3);

        let closure = pois.by_attribute(PoiAttributes::CLOSURE)[0];
        let steel = steel_at(&ctx, pois.get(closure).unwrap(), &profiles).unwrap();
        assert_eq!(steel.len(), 1);
        assert_eq!(steel[0].source, PrestressSource::Tendon(0));
    }

    #[test]
    fn test_average_tendon_force_switch() {
        let mut project = Project::spliced_example();
        project.settings.use_average_tendon_force = true;
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let sections = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        let provisions = LrfdProvisions::default();
        let no_loads = |_: PoiId, _: usize| 0.0;
        let ctx = LossContext::new(&sections, &project.settings, &provisions, &no_loads);
        let profiles = ctx.tendon_profiles();
        let average = profiles[0].average();
        for poi in pois.iter().filter(|p| project.bridge.tendons[0].covers(p.station)) {
            for steel in steel_at(&ctx, poi, &profiles).unwrap() {
                if steel.source == PrestressSource::Tendon(0) {
                    assert_relative_eq!(steel.initial, average);
                }
            }
        }
    }
}
