//! Time-step losses.
//!
//! Every concrete stress change (prestress transfer, tendon stressing,
//! external loads) is recorded with the time it was applied. Over each
//! interval the steel loses
//!
//! ```text
//! Δf_cr = Ep · Σ fc_i / Ec_i · [φ(te, ti) - φ(ts, ti)] · Kid
//! Δf_sh = Ep · [εsh(te) - εsh(ts)] · Kid
//! Δf_r  = fpt / KL · log(te / ts) · (fpt / fpy - 0.55)
//! Kid   = 1 / (1 + n·ρ·(1 + e²·A / I)·(1 + 0.7·φ))
//! ```
//!
//! so interval `k` needs the state at the end of interval `k - 1`.
//! [`TimeStepRun`] carries that state and refuses to step out of order.

use tracing::{debug, trace};

use super::{
    applied_section, deck_shrinkage_effect, deck_state, pretension_elastic_shortening, relaxation_increment, steel_at,
    tendon_elastic_shortening, LossBreakdown, LossContext, LossStrategy, LossTable, PrestressSource, SteelAtPoi,
    TendonForceProfile, STAGE,
};
use crate::errors::{BridgeError, BridgeResult};
use crate::poi::{Poi, PoiId};
use crate::sections::{SectionProperties, SectionPropertyType};
use crate::settings::LossMethod;
use crate::timeline::CastComponent;

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeStepLosses;

impl LossStrategy for TimeStepLosses {
    fn method(&self) -> LossMethod {
        LossMethod::TimeStep
    }

    fn compute(&self, ctx: &LossContext<'_>) -> BridgeResult<LossTable> {
        let mut run = TimeStepRun::new(ctx)?;
        let intervals = ctx.sections.timeline().interval_count();
        for k in 0..intervals {
            ctx.checkpoint(k)?;
            ctx.progress.report(STAGE, k as f64 / intervals as f64);
            run.step(k)?;
        }
        Ok(run.finish())
    }
}

/// A concrete stress change applied at one time
#[derive(Debug, Clone, Copy)]
struct StressIncrement {
    /// Compressive axial force (N)
    axial: f64,
    /// Sagging moment (N·m)
    moment: f64,
    section: SectionProperties,
    /// Age of the girder concrete when applied (days)
    age: f64,
}

impl StressIncrement {
    /// Concrete compressive stress at height `y` (Pa)
    fn compression_at(&self, y: f64) -> f64 {
        if self.section.is_zero() {
            return 0.0;
        }
        self.axial / self.section.area - self.moment * self.section.eccentricity(y) / self.section.ix
    }
}

#[derive(Debug, Clone)]
struct SteelState {
    steel: SteelAtPoi,
    losses: LossBreakdown,
    /// Section and age at transfer, for the restraint factor
    transfer_section: SectionProperties,
    transfer_age: f64,
}

#[derive(Debug, Clone)]
struct PoiHistory {
    id: PoiId,
    component: CastComponent,
    placed: f64,
    steel: Vec<SteelState>,
    increments: Vec<StressIncrement>,
}

/// Incremental evaluation of time-step losses, one interval at a time.
pub struct TimeStepRun<'c, 'a> {
    ctx: &'c LossContext<'a>,
    profiles: Vec<TendonForceProfile>,
    table: LossTable,
    histories: Vec<PoiHistory>,
    next: usize,
}

impl<'c, 'a> TimeStepRun<'c, 'a> {
    pub fn new(ctx: &'c LossContext<'a>) -> BridgeResult<Self> {
        let sections = ctx.sections;
        let profiles = ctx.tendon_profiles();
        let mut histories = Vec::new();
        for poi in sections.pois().iter() {
            let component = sections.girder_component(poi);
            let Some((_, placed)) = sections.timeline().casting(component) else {
                continue;
            };
            histories.push(PoiHistory {
                id: poi.id,
                component,
                placed,
                steel: Vec::new(),
                increments: Vec::new(),
            });
        }
        Ok(TimeStepRun {
            ctx,
            table: LossTable::new(LossMethod::TimeStep, profiles.clone()),
            profiles,
            histories,
            next: 0,
        })
    }

    /// The interval the next call to [`TimeStepRun::step`] must evaluate
    pub fn next_interval(&self) -> usize {
        self.next
    }

    pub fn table(&self) -> &LossTable {
        &self.table
    }

    pub fn finish(self) -> LossTable {
        self.table
    }

    /// Evaluate losses to the end of `interval`.
    pub fn step(&mut self, interval: usize) -> BridgeResult<()> {
        if interval != self.next {
            return Err(BridgeError::validation(
                STAGE,
                format!(
                    "time-step losses must be evaluated in order: expected interval {}, got {}",
                    self.next, interval
                ),
            ));
        }
        let sections = self.ctx.sections;
        let timeline = sections.timeline();
        let window = timeline
            .interval(interval)
            .ok_or_else(|| BridgeError::validation(STAGE, format!("interval {} does not exist", interval)))?;
        let deck = deck_state(sections, interval)?;

        for index in 0..self.histories.len() {
            let poi = sections.poi(self.histories[index].id)?;
            if !timeline.is_cast(self.histories[index].component, interval) {
                continue;
            }
            self.apply_loads(index, poi, interval, window.start)?;
            self.accumulate(index, poi, window.start, window.end)?;

            let history = &self.histories[index];
            for state in &history.steel {
                let mut losses = state.losses;
                if let Some((composite, deck)) = deck {
                    let ec = sections.concrete_properties(history.id, interval)?.ec;
                    losses.shrinkage += deck_shrinkage_effect(sections, poi, &state.steel, composite, deck, ec)?;
                }
                let finished = losses.finish(state.steel.fpj, state.steel.developed_area());
                self.table.insert(history.id, interval, state.steel.source, finished);
            }
        }
        debug!(interval, "time-step losses evaluated");
        self.next += 1;
        Ok(())
    }

    /// Record the stress changes applied at the start of `interval` and the
    /// elastic response of the steel to them.
    fn apply_loads(&mut self, index: usize, poi: &Poi, interval: usize, start: f64) -> BridgeResult<()> {
        let ctx = self.ctx;
        let sections = ctx.sections;
        let history = &self.histories[index];
        let age = start - history.placed;
        let concrete = sections.concrete_properties(history.id, interval)?;

        // Steel stressed into the concrete now
        let all = steel_at(ctx, poi, &self.profiles)?;
        let mut transferred = Vec::new();
        for steel in all.iter().filter(|s| s.interval == interval) {
            let (es, relaxation) = match steel.source {
                PrestressSource::Pretension => {
                    let relax = relaxation_increment(
                        steel.fpj,
                        steel.fpy,
                        steel.relaxation_constant,
                        0.0,
                        start - steel.jacking_day,
                    );
                    let girder = sections.component_properties(
                        history.id,
                        interval,
                        sections.girder_section_component(poi),
                        SectionPropertyType::Gross,
                    )?;
                    let mg = ctx.moments.incremental_moment(history.id, interval);
                    let es = pretension_elastic_shortening(
                        steel.developed_area(),
                        steel.fpj - relax,
                        &girder,
                        steel.y,
                        mg,
                        concrete.ec,
                        steel.ep,
                    );
                    (es, relax)
                }
                PrestressSource::Tendon(_) => {
                    let section = sections.section_properties(history.id, interval, SectionPropertyType::Net)?;
                    let count = sections.bridge().tendons.len();
                    (tendon_elastic_shortening(steel, &all, &section, count, concrete.ec), 0.0)
                }
            };
            let losses = LossBreakdown {
                elastic_shortening: es,
                relaxation,
                friction_and_anchor_set: steel.fpj - steel.initial,
                ..LossBreakdown::default()
            };
            transferred.push(SteelState {
                steel: *steel,
                losses,
                transfer_section: SectionProperties::ZERO,
                transfer_age: age,
            });
        }

        let section = applied_section(sections, poi, interval)?;
        let mut increment = StressIncrement {
            axial: 0.0,
            moment: ctx.moments.incremental_moment(history.id, interval),
            section,
            age,
        };
        for state in &mut transferred {
            state.transfer_section = section;
            let stress = state.steel.initial - state.losses.elastic_shortening - state.losses.relaxation;
            let force = state.steel.developed_area() * stress;
            increment.axial += force;
            increment.moment -= force * section.eccentricity(state.steel.y);
        }

        // Elastic response of steel already bonded
        let external = StressIncrement {
            axial: 0.0,
            moment: ctx.moments.incremental_moment(history.id, interval),
            section,
            age,
        };
        let history = &mut self.histories[index];
        for state in &mut history.steel {
            let n = state.steel.ep / concrete.ec;
            let total = n * increment.compression_at(state.steel.y);
            let from_loads = n * external.compression_at(state.steel.y);
            // Load moments show as gains; other concrete shortening adds to elastic losses
            state.losses.elastic_gain -= from_loads;
            state.losses.elastic_shortening += total - from_loads;
        }
        if increment.axial != 0.0 || increment.moment != 0.0 {
            history.increments.push(increment);
        }
        history.steel.extend(transferred);
        Ok(())
    }

    /// Creep, shrinkage and relaxation over `[start, end]`
    fn accumulate(&mut self, index: usize, poi: &Poi, start: f64, end: f64) -> BridgeResult<()> {
        let sections = self.ctx.sections;
        let history = &mut self.histories[index];
        if end <= start || history.steel.is_empty() {
            return Ok(());
        }
        let concrete = sections.maturing(history.component)?;
        let (age_start, age_end) = (start - history.placed, end - history.placed);
        let drying_start = sections
            .timeline()
            .casting(history.component)
            .and_then(|(cast, placed)| sections.timeline().interval(cast).map(|i| i.start - placed))
            .unwrap_or(age_start);
        let shrinkage = concrete.shrinkage_strain(age_end, drying_start)? - concrete.shrinkage_strain(age_start, drying_start)?;

        for state in &mut history.steel {
            let y = state.steel.y;
            let mut creep_strain = 0.0;
            for inc in &history.increments {
                let ec = concrete.modulus(inc.age)?;
                let dphi =
                    concrete.creep_coefficient(age_end, inc.age)? - concrete.creep_coefficient(age_start, inc.age)?;
                creep_strain += inc.compression_at(y) / ec * dphi;
            }

            let phi = concrete.creep_coefficient(age_end, state.transfer_age)?;
            let kid = restraint_factor(state, concrete.modulus(state.transfer_age)?, phi);
            let ep = state.steel.ep;
            state.losses.creep += ep * creep_strain * kid;
            state.losses.shrinkage += ep * shrinkage * kid;

            let jacked = state.steel.jacking_day;
            let fpt = state.steel.fpj
                - state.losses.elastic_shortening
                - state.losses.friction_and_anchor_set
                - state.losses.time_dependent();
            state.losses.relaxation += relaxation_increment(
                fpt,
                state.steel.fpy,
                state.steel.relaxation_constant,
                start - jacked,
                end - jacked,
            );
            trace!(poi = poi.id.0, source = ?state.steel.source, creep = state.losses.creep, "time step");
        }
        Ok(())
    }
}

/// Restraint of the concrete by the bonded steel
fn restraint_factor(state: &SteelState, eci: f64, phi: f64) -> f64 {
    let section = &state.transfer_section;
    if section.is_zero() || eci <= 0.0 {
        return 1.0;
    }
    let n = state.steel.ep / eci;
    let rho = state.steel.area / section.area;
    let e = section.eccentricity(state.steel.y);
    1.0 / (1.0 + n * rho * (1.0 + e * e * section.area / section.ix) * (1.0 + 0.7 * phi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::losses::LumpSumLosses;
    use crate::overrides::DesignOverrides;
    use crate::poi::{PoiAttributes, PoiRegistry};
    use crate::project::Project;
    use crate::provisions::LrfdProvisions;
    use crate::sections::SectionEngine;

    fn no_loads(_: PoiId, _: usize) -> f64 {
        0.0
    }

    #[test]
    fn test_out_of_order_step_rejected() {
        let project = Project::minimal_example();
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let sections = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        let provisions = LrfdProvisions::default();
        let ctx = LossContext::new(&sections, &project.settings, &provisions, &no_loads);
        let mut run = TimeStepRun::new(&ctx).unwrap();

        let err = run.step(1).unwrap_err();
        assert_eq!(err.error_code(), "AGENT_VALIDATION_FAILURE");
        run.step(0).unwrap();
        assert_eq!(run.next_interval(), 1);
        assert!(run.step(0).is_err());
        run.step(1).unwrap();
        assert!(!run.table().is_empty());
    }

    #[test]
    fn test_time_dependent_losses_accumulate() {
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
        let ctx = LossContext::new(&sections, &project.settings, &provisions, &no_loads);
        let table = TimeStepLosses.compute(&ctx).unwrap();
        assert_eq!(table.method(), Some(LossMethod::TimeStep));

        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let creep: Vec<f64> = (0..2)
            .map(|k| table.losses(mid, k, PrestressSource::Pretension).unwrap().creep)
            .collect();
        assert!(creep[0] > 0.0);
        assert!(creep[1] > creep[0]);
        let first = table.losses(mid, 0, PrestressSource::Pretension).unwrap();
        assert!(first.elastic_shortening > 0.0);
        assert!(first.relaxation > 0.0);
    }

    #[test]
    fn test_external_moment_is_a_gain() {
        let project = Project::minimal_example();
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let sections = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        let provisions = LrfdProvisions::default();
        let deck = |_: PoiId, k: usize| if k == 1 { 1.0e6 } else { 0.0 };
        let ctx = LossContext::new(&sections, &project.settings, &provisions, &deck);
        let table = TimeStepLosses.compute(&ctx).unwrap();
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        assert_eq!(table.losses(mid, 0, PrestressSource::Pretension).unwrap().elastic_gain, 0.0);
        assert!(table.losses(mid, 1, PrestressSource::Pretension).unwrap().elastic_gain > 0.0);
    }

    #[test]
    fn test_same_order_as_lump_sum() {
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
        let ctx = LossContext::new(&sections, &project.settings, &provisions, &no_loads);
        let refined = TimeStepLosses.compute(&ctx).unwrap();
        let approximate = LumpSumLosses.compute(&ctx).unwrap();
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let last = project.timeline.interval_count() - 1;
        let a = refined.losses(mid, last, PrestressSource::Pretension).unwrap().total;
        let b = approximate.losses(mid, last, PrestressSource::Pretension).unwrap().total;
        assert!(a > 0.3 * b && a < 3.0 * b, "time-step {} vs lump-sum {}", a, b);
    }

    #[test]
    fn test_tendon_enters_at_stressing() {
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
        let ctx = LossContext::new(&sections, &project.settings, &provisions, &no_loads);
        let table = TimeStepLosses.compute(&ctx).unwrap();
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        assert!(table.get(mid, 2, PrestressSource::Tendon(0)).is_none());
        let tendon = table.losses(mid, 3, PrestressSource::Tendon(0)).unwrap();
        assert!(tendon.friction_and_anchor_set > 0.0);

        // Tendon force shortens the pretensioned girder
        let before = table.losses(mid, 2, PrestressSource::Pretension).unwrap();
        let after = table.losses(mid, 3, PrestressSource::Pretension).unwrap();
        assert!(after.elastic_shortening > before.elastic_shortening);
    }
}
