//! # Serviceability Checks
//!
//! Concrete stresses at release and in service, principal tension in the
//! webs, and live load deflection.
//!
//! | Stage   | Loads                         | Limit                      |
//! |---------|-------------------------------|----------------------------|
//! | release | prestress + self weight       | 0.65 f'ci, 0.25λ√f'ci      |
//! | release | with bonded bars              | 0.63λ√f'ci tension         |
//! | service | effective prestress + DC + DW | 0.45 f'c                   |
//! | service | Service I                     | 0.60 f'c                   |
//! | service | Service III                   | 0.50λ√f'c tension          |
//!
//! Tension limits are in MPa. The basic release tension limit is capped at
//! 1.38 MPa. The 0.63λ√f'ci limit applies where the girder's longitudinal
//! bars in the tension zone can carry the whole tensile force at a stress of
//! 0.5 fy, at most 206.8 MPa (LRFD 5.9.2.3.1b).

use super::{capacity_check, prestress_stresses, Artifact, CheckContext, CheckKind, CheckLocation};
use crate::analysis::{Extreme, LimitState, LoadCategory, ResponseType, ResultsMode};
use crate::bridge::Segment;
use crate::errors::BridgeResult;
use crate::poi::PoiId;
use crate::settings::SpecCriteria;
use crate::units::to_mpa;

/// Girder face stresses (Pa, tension positive)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct FaceStresses {
    top: f64,
    bottom: f64,
}

impl FaceStresses {
    fn most_compressive(&self) -> f64 {
        self.top.min(self.bottom)
    }

    fn most_tensile(&self) -> f64 {
        self.top.max(self.bottom)
    }
}

/// Tension limit `coefficient·λ·√f'c` with the coefficient in MPa units (Pa)
fn sqrt_fc_limit(coefficient: f64, lambda: f64, fc: f64) -> f64 {
    coefficient * lambda * to_mpa(fc).max(0.0).sqrt() * 1.0e6
}

/// Governing release tension limit and the bar demand behind it
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReleaseTensionLimit {
    limit: f64,
    /// Tensile force in the uncracked section (N)
    force: f64,
    /// Bar area needed to carry `force` (m²)
    required: f64,
    /// Bonded bar area within the tension zone (m²)
    provided: f64,
    with_bars: bool,
}

fn release_tension_limit(
    criteria: &SpecCriteria,
    segment: &Segment,
    stresses: FaceStresses,
    lambda: f64,
    fci: f64,
) -> ReleaseTensionLimit {
    let shape = &segment.section;
    let bars = &segment.longitudinal;
    let force = shape.tension_force(stresses.bottom, stresses.top);
    let fs = (0.5 * bars.material.fy).min(criteria.release_bar_stress_max);
    let required = if fs > 0.0 { force / fs } else { f64::INFINITY };
    let provided = shape
        .tension_zone(stresses.bottom, stresses.top)
        .map(|(lo, hi)| bars.layers.iter().filter(|l| l.y >= lo && l.y <= hi).map(|l| l.area).sum())
        .unwrap_or(0.0);
    let with_bars = force > 0.0 && provided >= required;
    let limit = if with_bars {
        sqrt_fc_limit(criteria.release_tension_with_bars, lambda, fci)
    } else {
        sqrt_fc_limit(criteria.release_tension, lambda, fci).min(criteria.release_tension_max)
    };
    ReleaseTensionLimit {
        limit,
        force,
        required,
        provided,
        with_bars,
    }
}

fn segment_of<'a>(ctx: &CheckContext<'a>, id: PoiId) -> BridgeResult<&'a Segment> {
    let poi = ctx.sections.poi(id)?;
    let bridge = ctx.sections.bridge();
    let index = bridge.host_segment(poi.location.member);
    bridge.segments.get(index).ok_or_else(|| {
        crate::errors::BridgeError::validation("specification checks", format!("POI {} has no segment", id.0))
    })
}

/// Stresses from a limit state combination at the extreme `extreme`
fn load_stresses(ctx: &CheckContext<'_>, id: PoiId, k: usize, limit_state: LimitState, extreme: Extreme) -> BridgeResult<FaceStresses> {
    Ok(FaceStresses {
        top: ctx.combined(id, k, limit_state, ResponseType::TopGirderStress, extreme)?,
        bottom: ctx.combined(id, k, limit_state, ResponseType::BottomGirderStress, extreme)?,
    })
}

/// Stresses from permanent loads only, most compressive over the models
fn permanent_stresses(ctx: &CheckContext<'_>, id: PoiId, k: usize) -> BridgeResult<FaceStresses> {
    let mut result: Option<FaceStresses> = None;
    for kind in ctx.results.model_kinds() {
        let mut stresses = FaceStresses::default();
        for category in [LoadCategory::Dc, LoadCategory::Dw, LoadCategory::Ps] {
            let response = ctx.results.category_response(kind, id, k, category, ResultsMode::Cumulative)?;
            stresses.top += response.top_girder;
            stresses.bottom += response.bottom_girder;
        }
        result = Some(match result {
            Some(r) => FaceStresses {
                top: r.top.min(stresses.top),
                bottom: r.bottom.min(stresses.bottom),
            },
            None => stresses,
        });
    }
    Ok(result.unwrap_or_default())
}

fn add(a: FaceStresses, b: FaceStresses) -> FaceStresses {
    FaceStresses {
        top: a.top + b.top,
        bottom: a.bottom + b.bottom,
    }
}

fn compression_artifact(location: CheckLocation, label: &str, stresses: FaceStresses, limit: f64, k: usize) -> Artifact {
    let demand = (-stresses.most_compressive()).max(0.0);
    capacity_check(CheckKind::FlexuralStress, location, label, demand, limit)
        .with_interval(k)
        .with_detail("f_top", stresses.top)
        .with_detail("f_bottom", stresses.bottom)
}

fn tension_artifact(location: CheckLocation, label: &str, stresses: FaceStresses, limit: f64, k: usize) -> Artifact {
    let demand = stresses.most_tensile().max(0.0);
    capacity_check(CheckKind::FlexuralStress, location, label, demand, limit)
        .with_interval(k)
        .with_detail("f_top", stresses.top)
        .with_detail("f_bottom", stresses.bottom)
}

/// Girder stresses at release and at the end of the timeline
pub(crate) fn check_flexural_stress(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let criteria = ctx.criteria();
    let timeline = ctx.sections.timeline();
    let last = ctx.last_interval();
    let mut artifacts = Vec::new();

    for id in ctx.segment_pois() {
        let poi = ctx.sections.poi(id)?;
        let location = ctx.poi_location(id)?;
        let host = segment_of(ctx, id)?;
        let lambda = host.concrete.concrete_type.lambda();
        let segment = ctx.sections.bridge().host_segment(poi.location.member);

        if let Some(release) = timeline.segment_construction_interval(segment) {
            let fci = ctx.sections.concrete_properties(id, release)?.fc;
            let ps = prestress_stresses(ctx, id, release, true)?;
            let ps = FaceStresses {
                top: ps.top,
                bottom: ps.bottom,
            };
            let min = add(ps, load_stresses(ctx, id, release, LimitState::ServiceI, Extreme::Min)?);
            let max = add(ps, load_stresses(ctx, id, release, LimitState::ServiceI, Extreme::Max)?);
            let tension = release_tension_limit(criteria, host, max, lambda, fci);
            artifacts.push(
                compression_artifact(location, "Release compression", min, criteria.release_compression * fci, release)
                    .with_detail("fci", fci),
            );
            artifacts.push(
                tension_artifact(location, "Release tension", max, tension.limit, release)
                    .with_detail("fci", fci)
                    .with_detail("T", tension.force)
                    .with_detail("As_required", tension.required)
                    .with_detail("As_provided", tension.provided)
                    .with_detail("bonded_bar_limit", if tension.with_bars { 1.0 } else { 0.0 }),
            );
        }

        let fc = ctx.sections.concrete_properties(id, last)?.fc;
        let ps = prestress_stresses(ctx, id, last, false)?;
        let ps = FaceStresses {
            top: ps.top,
            bottom: ps.bottom,
        };
        let permanent = add(ps, permanent_stresses(ctx, id, last)?);
        artifacts.push(
            compression_artifact(
                location,
                "Service compression, permanent loads",
                permanent,
                criteria.service_compression_permanent * fc,
                last,
            )
            .with_detail("fc", fc),
        );
        let total = add(ps, load_stresses(ctx, id, last, LimitState::ServiceI, Extreme::Min)?);
        artifacts.push(
            compression_artifact(
                location,
                "Service I compression",
                total,
                criteria.service_compression_total * fc,
                last,
            )
            .with_detail("fc", fc),
        );
        let tension = add(ps, load_stresses(ctx, id, last, LimitState::ServiceIII, Extreme::Max)?);
        artifacts.push(
            tension_artifact(
                location,
                "Service III tension",
                tension,
                sqrt_fc_limit(criteria.service_tension, lambda, fc),
                last,
            )
            .with_detail("fc", fc),
        );
    }
    Ok(artifacts)
}

/// Principal tension at the composite centroid, f1 = fx/2 + √((fx/2)² + τ²)
pub fn principal_tension(fx: f64, tau: f64) -> f64 {
    let half = fx / 2.0;
    half + (half * half + tau * tau).sqrt()
}

/// Principal tension in the webs under Service III
pub(crate) fn check_principal_web_stress(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let criteria = ctx.criteria();
    let bridge = ctx.sections.bridge();
    let high_strength = bridge
        .segments
        .iter()
        .any(|s| s.concrete.fc > criteria.principal_tension_fc_threshold);
    if !bridge.has_tendons() && !high_strength {
        return Ok(vec![Artifact::inapplicable(
            CheckKind::PrincipalWebStress,
            CheckLocation::Girder,
            "girder is not post-tensioned and f'c does not exceed the threshold",
        )]);
    }

    let last = ctx.last_interval();
    let ptype = ctx.settings.section_properties;
    let mut artifacts = Vec::new();
    for id in ctx.segment_pois() {
        let poi = ctx.sections.poi(id)?;
        let shape = &segment_of(ctx, id)?.section;
        if ctx.distance_to_pier(poi.station) < shape.height / 2.0 {
            continue;
        }
        let location = ctx.poi_location(id)?;
        let section = ctx.sections.section_properties(id, last, ptype)?;
        if section.ix <= 0.0 {
            continue;
        }
        let yc = section.y_bottom.min(shape.height);
        let ducts: f64 = ctx
            .sections
            .tendons_at(poi)
            .iter()
            .filter_map(|(i, _)| bridge.tendons.get(*i))
            .map(|t| 0.25 * t.duct.outer_diameter)
            .sum();
        let bv = (shape.width_at(yc) - ducts).max(f64::EPSILON);
        let q = shape.first_moment_below(yc);

        let ps = prestress_stresses(ctx, id, last, false)?;
        let shear = ctx.combined_magnitude(id, last, LimitState::ServiceIII, ResponseType::Shear)?;
        let v = (shear - ps.vertical).max(0.0);
        let tau = v * q / (section.ix * bv);
        let f1 = principal_tension(ps.centroid, tau);

        let segment = segment_of(ctx, id)?;
        let fc = ctx.sections.concrete_properties(id, last)?.fc;
        let limit = sqrt_fc_limit(criteria.principal_tension, segment.concrete.concrete_type.lambda(), fc);
        artifacts.push(
            capacity_check(CheckKind::PrincipalWebStress, location, "Principal tension", f1.max(0.0), limit)
                .with_interval(last)
                .with_detail("fx", ps.centroid)
                .with_detail("tau", tau)
                .with_detail("V", shear)
                .with_detail("Vp", ps.vertical)
                .with_detail("bv", bv)
                .with_detail("Q", q),
        );
    }
    Ok(artifacts)
}

/// Live load deflection against L/n in each span
pub(crate) fn check_deflection(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let Some(ll_interval) = ctx.sections.timeline().live_load_interval() else {
        return Ok(vec![Artifact::inapplicable(
            CheckKind::Deflection,
            CheckLocation::Girder,
            "no live load is applied",
        )]);
    };
    let ratio = ctx.criteria().deflection_ratio;
    let last = ctx.last_interval().max(ll_interval);
    let pois = ctx.sections.pois();
    let sorted = pois.sorted();
    let mut artifacts = Vec::new();

    for (span, w) in ctx.sections.bridge().pier_stations().windows(2).enumerate() {
        let (start, end) = (w[0], w[1]);
        let mut governing = 0.0_f64;
        let mut station = start;
        for id in &sorted {
            let Some(poi) = pois.get(*id) else { continue };
            if poi.station < start || poi.station > end {
                continue;
            }
            for kind in ctx.results.model_kinds() {
                let envelope = ctx.results.live_load_at(kind, *id, last, false);
                let delta = envelope.max.deflection.abs().max(envelope.min.deflection.abs());
                if delta > governing {
                    governing = delta;
                    station = poi.station;
                }
            }
        }
        let length = end - start;
        artifacts.push(
            capacity_check(
                CheckKind::Deflection,
                CheckLocation::Span(span),
                format!("Span {}", span + 1),
                governing,
                length / ratio,
            )
            .with_interval(last)
            .with_detail("span_length", length)
            .with_detail("station", station),
        );
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tests::with_context;
    use crate::artifacts::CheckStatus;
    use crate::project::Project;
    use approx::assert_relative_eq;

    #[test]
    fn test_principal_tension_formula() {
        // Pure shear
        assert_relative_eq!(principal_tension(0.0, 2.0), 2.0);
        // Uniaxial tension
        assert_relative_eq!(principal_tension(3.0, 0.0), 3.0);
        // Precompression reduces principal tension
        assert!(principal_tension(-5.0e6, 1.0e6) < 1.0e6);
        assert!(principal_tension(-5.0e6, 1.0e6) > 0.0);
    }

    #[test]
    fn test_sqrt_limit() {
        assert_relative_eq!(sqrt_fc_limit(0.25, 1.0, 36.0e6), 1.5e6, max_relative = 1e-12);
        assert_relative_eq!(sqrt_fc_limit(0.5, 0.85, 49.0e6), 2.975e6, max_relative = 1e-12);
    }

    #[test]
    fn test_stress_stages_on_single_span() {
        let project = Project::single_span_example();
        with_context(&project, |ctx| {
            let artifacts = check_flexural_stress(ctx).unwrap();
            let labels: std::collections::BTreeSet<&str> = artifacts.iter().map(|a| a.label.as_str()).collect();
            assert!(labels.contains("Release compression"));
            assert!(labels.contains("Service III tension"));
            assert_eq!(artifacts.len() % 5, 0);
            let release: Vec<_> = artifacts.iter().filter(|a| a.label == "Release tension").collect();
            assert!(release.iter().all(|a| a.detail("bonded_bar_limit").is_some()));
            assert!(artifacts.iter().all(|a| a.passed()), "{:?}", artifacts.iter().find(|a| !a.passed()));
        });
    }

    fn release_stresses() -> FaceStresses {
        FaceStresses {
            top: 2.0e6,
            bottom: -20.0e6,
        }
    }

    #[test]
    fn test_release_tension_limit_without_bars_is_capped() {
        let criteria = SpecCriteria::default();
        let mut segment = Project::single_span_example().bridge.segments[0].clone();
        segment.longitudinal.layers.clear();
        let fci = 37.93e6;
        let limit = release_tension_limit(&criteria, &segment, release_stresses(), 1.0, fci);
        assert!(!limit.with_bars);
        assert_eq!(limit.provided, 0.0);
        assert!(limit.force > 0.0);
        assert_relative_eq!(limit.limit, 1.38e6);
    }

    #[test]
    fn test_release_tension_limit_with_bonded_bars() {
        let criteria = SpecCriteria::default();
        let segment = Project::single_span_example().bridge.segments[0].clone();
        let fci = 37.93e6;
        let stresses = release_stresses();
        let limit = release_tension_limit(&criteria, &segment, stresses, 1.0, fci);
        let force = segment.section.tension_force(stresses.bottom, stresses.top);
        assert_relative_eq!(limit.force, force);
        // Bars work at 0.5 fy = 210 MPa, capped at 206.8 MPa
        assert_relative_eq!(limit.required, force / 206.8e6, max_relative = 1e-12);
        assert!(limit.provided >= limit.required);
        assert!(limit.with_bars);
        assert_relative_eq!(limit.limit, 0.63 * fci.sqrt() * 1.0e3, max_relative = 1e-9);
        assert!(limit.limit > 3.8e6);
    }

    #[test]
    fn test_bars_outside_tension_zone_do_not_count() {
        let criteria = SpecCriteria::default();
        let mut segment = Project::single_span_example().bridge.segments[0].clone();
        for layer in &mut segment.longitudinal.layers {
            layer.y = 0.1;
        }
        let limit = release_tension_limit(&criteria, &segment, release_stresses(), 1.0, 37.93e6);
        assert_eq!(limit.provided, 0.0);
        assert!(!limit.with_bars);
    }

    #[test]
    fn test_release_tension_reports_governing_limit() {
        let project = Project::single_span_example();
        with_context(&project, |ctx| {
            let artifacts = check_flexural_stress(ctx).unwrap();
            let governing = artifacts
                .iter()
                .filter(|a| a.label == "Release tension")
                .max_by(|a, b| a.demand.total_cmp(&b.demand))
                .unwrap();
            // Top tension near the harp point exceeds 1.38 MPa; the top flange bars carry it
            assert!(governing.demand > 1.38e6);
            assert_eq!(governing.detail("bonded_bar_limit"), Some(1.0));
            assert!(governing.capacity > 3.0e6);
            assert!(governing.passed());
        });

        let mut project = Project::single_span_example();
        project.bridge.segments[0].longitudinal.layers.clear();
        with_context(&project, |ctx| {
            let artifacts = check_flexural_stress(ctx).unwrap();
            let failed: Vec<_> = artifacts.iter().filter(|a| !a.passed()).collect();
            assert!(!failed.is_empty());
            assert!(failed.iter().all(|a| a.label == "Release tension"));
            assert!(failed.iter().all(|a| a.detail("bonded_bar_limit") == Some(0.0)));
        });
    }

    #[test]
    fn test_principal_stress_inapplicable_for_pretensioned() {
        let project = Project::single_span_example();
        with_context(&project, |ctx| {
            let artifacts = check_principal_web_stress(ctx).unwrap();
            assert_eq!(artifacts.len(), 1);
            assert_eq!(artifacts[0].status, CheckStatus::Inapplicable);
        });
    }

    #[test]
    fn test_principal_stress_applies_to_spliced() {
        let project = Project::spliced_example();
        with_context(&project, |ctx| {
            let artifacts = check_principal_web_stress(ctx).unwrap();
            assert!(!artifacts.is_empty());
            assert!(artifacts.iter().all(|a| a.is_applicable()));
        });
    }

    #[test]
    fn test_deflection_per_span() {
        let project = Project::spliced_example();
        with_context(&project, |ctx| {
            let artifacts = check_deflection(ctx).unwrap();
            assert_eq!(artifacts.len(), 2);
            assert_relative_eq!(artifacts[0].capacity, 40.0 / 800.0, max_relative = 1e-12);
            assert!(artifacts[0].demand > 0.0);
        });
    }

    #[test]
    fn test_deflection_inapplicable_without_live_load() {
        let project = Project::minimal_example();
        with_context(&project, |ctx| {
            let artifacts = check_deflection(ctx).unwrap();
            assert_eq!(artifacts[0].status, CheckStatus::Inapplicable);
        });
    }
}
