//! LRFD approximate (lump-sum) losses.
//!
//! Elastic shortening uses the closed form of LRFD C5.9.3.2.3a for
//! pretensioning and (N-1)/2N for sequentially stressed tendons. The
//! long-term loss is the LRFD approximate estimate
//!
//! ```text
//! ΔfpLT = 10·fpi·Aps/Ag·γh·γst + 83 MPa·γh·γst + ΔfpR
//! γh  = 1.7 - 0.01·H
//! γst = 35 / (7 + f'ci[MPa])
//! ```
//!
//! spread over time with ktd(t)/ktd(tf), t counted from transfer and tf the
//! later of the final event and 2000 days.

use tracing::{debug, warn};

use super::{
    applied_section, deck_shrinkage_effect, deck_state, pretension_elastic_shortening, relaxation_increment, steel_at,
    tendon_elastic_shortening, LossBreakdown, LossContext, LossStrategy, LossTable, PrestressSource, SteelAtPoi, TendonForceProfile, STAGE,
};
use crate::errors::BridgeResult;
use crate::poi::Poi;
use crate::sections::{SectionEngine, SectionPropertyType};
use crate::settings::LossMethod;
use crate::units::to_mpa;

/// Shrinkage term of the approximate long-term loss (Pa)
const SHRINKAGE_TERM: f64 = 83.0e6;

/// Minimum final time for the time development function (days)
const MIN_FINAL_TIME: f64 = 2000.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct LumpSumLosses;

/// Per-POI, per-source values that do not depend on the interval
#[derive(Debug, Clone)]
struct Fixed {
    steel: SteelAtPoi,
    elastic_shortening: f64,
    /// Elastic shortening of pretensioning from tendons stressed later
    tendon_shortening: Vec<(usize, f64)>,
    relaxation_before_transfer: f64,
    creep: f64,
    shrinkage: f64,
    relaxation: f64,
    friction: f64,
    transfer_day: f64,
    fci_ksi: f64,
    /// Elastic gain from the loads applied in each interval after transfer
    gains: Vec<f64>,
}

/// LRFD time development of long-term losses, f'ci in ksi
fn ktd(t: f64, fci_ksi: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    t / (12.0 * (100.0 - 4.0 * fci_ksi) / (fci_ksi + 20.0) + t)
}

impl LossStrategy for LumpSumLosses {
    fn method(&self) -> LossMethod {
        LossMethod::Approximate
    }

    fn compute(&self, ctx: &LossContext<'_>) -> BridgeResult<LossTable> {
        let sections = ctx.sections;
        let timeline = sections.timeline();
        let profiles = ctx.tendon_profiles();
        let mut table = LossTable::new(LossMethod::Approximate, profiles.clone());
        let intervals = timeline.interval_count();
        let final_day = timeline.final_day();

        let mut fixed = Vec::new();
        for poi in sections.pois().iter() {
            let all = steel_at(ctx, poi, &profiles)?;
            for steel in &all {
                let values = fixed_losses(ctx, poi, steel, &all, &profiles, intervals)?;
                if values.elastic_shortening < 0.0 {
                    warn!(
                        poi = poi.id.0,
                        source = ?steel.source,
                        loss_mpa = to_mpa(values.elastic_shortening),
                        "negative elastic shortening loss"
                    );
                }
                fixed.push((poi, values));
            }
        }

        let mut largest_gain: f64 = 0.0;
        for k in 0..intervals {
            ctx.checkpoint(k)?;
            ctx.progress.report(STAGE, k as f64 / intervals as f64);
            let end = timeline.interval(k).map(|i| i.end).unwrap_or(final_day);
            let deck = deck_state(sections, k)?;

            for (poi, f) in &fixed {
                if k < f.steel.interval {
                    continue;
                }
                let tf = (final_day - f.transfer_day).max(MIN_FINAL_TIME);
                let fraction = (ktd(end - f.transfer_day, f.fci_ksi) / ktd(tf, f.fci_ksi)).clamp(0.0, 1.0);

                let mut deck_effect = 0.0;
                if let Some((composite, state)) = deck {
                    let ec = sections.concrete_properties(poi.id, k)?.ec;
                    deck_effect = deck_shrinkage_effect(sections, poi, &f.steel, composite, state, ec)?;
                    largest_gain = largest_gain.max(-deck_effect);
                }

                let losses = LossBreakdown {
                    elastic_shortening: f.elastic_shortening
                        + f.tendon_shortening
                            .iter()
                            .filter(|(i, _)| *i <= k)
                            .map(|(_, loss)| loss)
                            .sum::<f64>(),
                    creep: f.creep * fraction,
                    shrinkage: f.shrinkage * fraction + deck_effect,
                    relaxation: f.relaxation_before_transfer + f.relaxation * fraction,
                    friction_and_anchor_set: f.friction,
                    elastic_gain: f.gains[..=k].iter().sum(),
                    ..LossBreakdown::default()
                }
                .finish(f.steel.fpj, f.steel.developed_area());
                table.insert(poi.id, k, f.steel.source, losses);
            }
            debug!(interval = k, "lump-sum losses evaluated");
        }

        if largest_gain > 0.0 {
            warn!(
                gain_mpa = to_mpa(largest_gain),
                "deck shrinkage produces a prestress gain in the lump-sum losses"
            );
        }
        Ok(table)
    }
}

fn fixed_losses(
    ctx: &LossContext<'_>,
    poi: &Poi,
    steel: &SteelAtPoi,
    all: &[SteelAtPoi],
    profiles: &[TendonForceProfile],
    intervals: usize,
) -> BridgeResult<Fixed> {
    let sections = ctx.sections;
    let timeline = sections.timeline();
    let transfer = steel.interval;
    let transfer_day = timeline.interval(transfer).map(|i| i.start).unwrap_or(steel.jacking_day);
    let concrete = sections.concrete_properties(poi.id, transfer)?;
    let girder = sections.component_properties(
        poi.id,
        transfer,
        sections.girder_section_component(poi),
        SectionPropertyType::Gross,
    )?;
    let ag = girder.area;
    let aps = steel.developed_area();

    let (elastic_shortening, relaxation_before_transfer, fpi) = match steel.source {
        PrestressSource::Pretension => {
            let relax = relaxation_increment(
                steel.fpj,
                steel.fpy,
                steel.relaxation_constant,
                0.0,
                transfer_day - steel.jacking_day,
            );
            let fpbt = steel.fpj - relax;
            let mg = ctx.moments.incremental_moment(poi.id, transfer);
            let es = pretension_elastic_shortening(aps, fpbt, &girder, steel.y, mg, concrete.ec, steel.ep);
            (es, relax, fpbt)
        }
        PrestressSource::Tendon(_) => {
            let section = sections.section_properties(poi.id, transfer, SectionPropertyType::Net)?;
            let count = sections.bridge().tendons.len();
            let es = tendon_elastic_shortening(steel, all, &section, count, concrete.ec);
            (es, 0.0, steel.initial)
        }
    };

    // Pretensioning shortens further when tendons are stressed
    let mut tendon_shortening = Vec::new();
    if steel.source == PrestressSource::Pretension {
        for (index, tendon) in sections.bridge().tendons.iter().enumerate() {
            let Some(stress) = timeline.tendon_stressing_interval(index) else {
                continue;
            };
            let Some(y) = tendon.y_at(poi.station) else {
                continue;
            };
            if stress <= transfer {
                continue;
            }
            let section = applied_section(sections, poi, stress)?;
            if section.is_zero() {
                continue;
            }
            let ec = sections.concrete_properties(poi.id, stress)?.ec;
            let fp = profiles
                .get(index)
                .map(|p| p.stress(poi.station))
                .unwrap_or_else(|| tendon.jacking_stress());
            let p = tendon.area() * fp;
            let fc = p / section.area + p * section.eccentricity(y) * section.eccentricity(steel.y) / section.ix;
            tendon_shortening.push((stress, steel.ep / ec * fc));
        }
    }

    let fci_mpa = to_mpa(concrete.fc);
    let gamma_h = 1.7 - 0.01 * ctx.settings.relative_humidity;
    let gamma_st = 35.0 / (7.0 + fci_mpa);
    let creep = if ag > 0.0 {
        10.0 * fpi * steel.area / ag * gamma_h * gamma_st
    } else {
        0.0
    };

    let gains = elastic_gains(sections, ctx, poi, steel, intervals)?;

    Ok(Fixed {
        steel: *steel,
        elastic_shortening,
        tendon_shortening,
        relaxation_before_transfer,
        creep,
        shrinkage: SHRINKAGE_TERM * gamma_h * gamma_st,
        relaxation: steel.approximate_relaxation,
        friction: match steel.source {
            PrestressSource::Pretension => 0.0,
            PrestressSource::Tendon(_) => steel.fpj - steel.initial,
        },
        transfer_day,
        fci_ksi: fci_mpa / 6.895,
        gains,
    })
}

/// Elastic stress change in the steel from the loads of each interval after transfer
fn elastic_gains(
    sections: &SectionEngine<'_>,
    ctx: &LossContext<'_>,
    poi: &Poi,
    steel: &SteelAtPoi,
    intervals: usize,
) -> BridgeResult<Vec<f64>> {
    let mut gains = vec![0.0; intervals];
    for (k, gain) in gains.iter_mut().enumerate().skip(steel.interval + 1) {
        let moment = ctx.moments.incremental_moment(poi.id, k);
        if moment == 0.0 {
            continue;
        }
        let section = applied_section(sections, poi, k)?;
        if section.is_zero() || section.reference_modulus <= 0.0 {
            continue;
        }
        *gain = steel.ep / section.reference_modulus * moment * section.eccentricity(steel.y) / section.ix;
    }
    Ok(gains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::DesignOverrides;
    use crate::poi::{PoiAttributes, PoiId, PoiRegistry};
    use crate::project::Project;
    use crate::provisions::LrfdProvisions;
    use approx::assert_relative_eq;

    fn run(project: &Project, moments: &dyn crate::losses::ExternalMoments) -> (PoiRegistry, LossTable) {
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let table = {
            let sections = SectionEngine::new(
                &project.bridge,
                &project.timeline,
                &pois,
                &project.settings,
                &DesignOverrides::default(),
            );
            let provisions = LrfdProvisions::default();
            let ctx = LossContext::new(&sections, &project.settings, &provisions, moments);
            LumpSumLosses.compute(&ctx).unwrap()
        };
        (pois, table)
    }

    fn no_loads(_: PoiId, _: usize) -> f64 {
        0.0
    }

    #[test]
    fn test_ktd_limits() {
        assert_eq!(ktd(0.0, 5.0), 0.0);
        assert!(ktd(10.0, 5.0) < ktd(100.0, 5.0));
        assert!(ktd(1.0e9, 5.0) > 0.999);
    }

    #[test]
    fn test_three_event_losses_grow() {
        let project = Project::minimal_example();
        let (pois, table) = run(&project, &no_loads);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let first = table.losses(mid, 0, PrestressSource::Pretension).unwrap();
        let second = table.losses(mid, 1, PrestressSource::Pretension).unwrap();
        assert!(second.total > first.total);
        assert_relative_eq!(first.elastic_shortening, second.elastic_shortening);
        assert!(first.elastic_shortening > 0.0);
        assert_eq!(first.friction_and_anchor_set, 0.0);
    }

    #[test]
    fn test_long_term_follows_time_development() {
        let project = Project::minimal_example();
        let (pois, table) = run(&project, &no_loads);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let sections = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        let fci = to_mpa(sections.concrete_properties(mid, 0).unwrap().fc);
        let gamma_h = 1.7 - 0.01 * project.settings.relative_humidity;
        let gamma_st = 35.0 / (7.0 + fci);
        let fci_ksi = fci / 6.895;
        let end = project.timeline.interval(1).unwrap().end;
        let fraction = ktd(end, fci_ksi) / ktd(MIN_FINAL_TIME, fci_ksi);

        let losses = table.losses(mid, 1, PrestressSource::Pretension).unwrap();
        assert_relative_eq!(losses.shrinkage, SHRINKAGE_TERM * gamma_h * gamma_st * fraction, max_relative = 1e-9);
        assert!(fraction > 0.0 && fraction < 1.0);
    }

    #[test]
    fn test_elastic_gain_reported_separately() {
        let project = Project::minimal_example();
        let (pois, table_without) = run(&project, &no_loads);
        // 1 MN·m sagging moment when the deck is cast
        let deck = |_: PoiId, k: usize| if k == 1 { 1.0e6 } else { 0.0 };
        let (_, table_with) = run(&project, &deck);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let a = table_without.losses(mid, 1, PrestressSource::Pretension).unwrap();
        let b = table_with.losses(mid, 1, PrestressSource::Pretension).unwrap();
        assert!(b.elastic_gain > 0.0);
        assert_eq!(a.elastic_gain, 0.0);
        assert_relative_eq!(a.total, b.total);
    }

    #[test]
    fn test_deck_shrinkage_gain_after_composite() {
        let project = Project::single_span_example();
        let (pois, table) = run(&project, &no_loads);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let sections = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        // Deck composite from interval 2; its shrinkage compresses the bottom strands
        assert!(deck_state(&sections, 1).unwrap().is_none());
        let (composite, state) = deck_state(&sections, 2).unwrap().unwrap();
        assert_eq!(composite, 2);
        assert!(state.strain > 0.0);

        let fci = to_mpa(sections.concrete_properties(mid, 0).unwrap().fc);
        let girder_only = SHRINKAGE_TERM * (1.7 - 0.01 * project.settings.relative_humidity) * 35.0 / (7.0 + fci);
        let losses = table.losses(mid, 2, PrestressSource::Pretension).unwrap();
        assert!(losses.shrinkage < girder_only);
    }

    #[test]
    fn test_self_weight_reduces_elastic_shortening() {
        let project = Project::minimal_example();
        let (pois, plain) = run(&project, &no_loads);
        let weight = |_: PoiId, k: usize| if k == 0 { 2.0e6 } else { 0.0 };
        let (_, loaded) = run(&project, &weight);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        let a = plain.losses(mid, 0, PrestressSource::Pretension).unwrap();
        let b = loaded.losses(mid, 0, PrestressSource::Pretension).unwrap();
        assert!(b.elastic_shortening < a.elastic_shortening);
    }

    #[test]
    fn test_tendon_losses_in_spliced_girder() {
        let project = Project::spliced_example();
        let (pois, table) = run(&project, &no_loads);
        let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
        assert!(table.get(mid, 2, PrestressSource::Tendon(0)).is_none());
        let at_stress = table.losses(mid, 3, PrestressSource::Tendon(0)).unwrap();
        assert!(at_stress.friction_and_anchor_set > 0.0);
        // Single tendon: no sequential stressing loss
        assert_eq!(at_stress.elastic_shortening, 0.0);

        let before = table.losses(mid, 2, PrestressSource::Pretension).unwrap();
        let after = table.losses(mid, 3, PrestressSource::Pretension).unwrap();
        assert!(after.elastic_shortening > before.elastic_shortening);
    }
}
