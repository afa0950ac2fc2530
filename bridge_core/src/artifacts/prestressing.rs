//! Checks on the prestressing steel and the end zones that anchor it.

use super::{capacity_check, prestress_stresses, Artifact, CheckContext, CheckKind, CheckLocation};
use crate::errors::BridgeResult;
use crate::losses::PrestressSource;
use crate::materials::StrandType;

/// Steel stress in splitting reinforcement (Pa)
const SPLITTING_STRESS: f64 = 140.0e6;

/// Splitting force as a fraction of the force at transfer
const SPLITTING_FRACTION: f64 = 0.04;

/// Smallest confinement bar, No. 10 (m)
const MIN_CONFINEMENT_BAR: f64 = 0.0095;
const MAX_CONFINEMENT_SPACING: f64 = 0.15;

/// Confinement extends this many girder heights from each end
const CONFINEMENT_ZONE: f64 = 1.5;

/// 15.2 mm strand, with a small tolerance on the nominal diameter
const LARGE_STRAND: f64 = 0.0152 - 1.0e-4;

/// Stress limits on pretensioned strands and tendons
pub(crate) fn check_strand_stress(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let bridge = ctx.sections.bridge();
    let last = ctx.last_interval();
    let mut artifacts = Vec::new();

    for (i, segment) in bridge.segments.iter().enumerate() {
        let strands = &segment.strands;
        if strands.total_strands() == 0 {
            continue;
        }
        let location = CheckLocation::Segment(i);
        let material = &strands.material;
        let jacking_limit = match material.strand_type {
            StrandType::LowRelaxation => 0.75,
            StrandType::StressRelieved => 0.70,
        } * material.fpu;
        artifacts.push(capacity_check(
            CheckKind::StrandStress,
            location,
            "Pretension at jacking",
            strands.jacking_stress(),
            jacking_limit,
        ));
        if let Some(mid) = ctx.segment_midpoint(i) {
            if let Some(losses) = ctx.losses.get(mid, last, PrestressSource::Pretension) {
                artifacts.push(
                    capacity_check(
                        CheckKind::StrandStress,
                        location,
                        "Pretension after all losses",
                        losses.stress_with_gains(),
                        0.80 * material.fpy,
                    )
                    .with_interval(last)
                    .with_detail("total_loss", losses.total),
                );
            }
        }
    }

    for (i, tendon) in bridge.tendons.iter().enumerate() {
        let location = CheckLocation::Tendon(i);
        let strand = &tendon.strand;
        artifacts.push(capacity_check(
            CheckKind::StrandStress,
            location,
            "Tendon at jacking",
            tendon.jacking_stress(),
            0.90 * strand.fpy,
        ));
        if let Some(profile) = ctx.losses.tendon_profile(i) {
            artifacts.push(capacity_check(
                CheckKind::StrandStress,
                location,
                "Tendon at anchorages after seating",
                profile.anchorage_stress(),
                0.70 * strand.fpu,
            ));
            artifacts.push(capacity_check(
                CheckKind::StrandStress,
                location,
                "Tendon after seating",
                profile.max_stress(),
                0.74 * strand.fpu,
            ));
        }
        let mut final_stress = 0.0_f64;
        for id in ctx.sections.pois().sorted() {
            if let Some(losses) = ctx.losses.get(id, last, PrestressSource::Tendon(i)) {
                final_stress = final_stress.max(losses.stress_with_gains());
            }
        }
        artifacts.push(
            capacity_check(
                CheckKind::StrandStress,
                location,
                "Tendon after all losses",
                final_stress,
                0.80 * strand.fpy,
            )
            .with_interval(last),
        );
    }
    Ok(artifacts)
}

/// Harped strand slope against 1:n
pub(crate) fn check_strand_slope(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let criteria = ctx.criteria();
    let mut artifacts = Vec::new();
    for (i, segment) in ctx.sections.bridge().segments.iter().enumerate() {
        let location = CheckLocation::Segment(i);
        let Some(slope) = segment.strands.harped_slope(segment.length) else {
            artifacts.push(Artifact::inapplicable(CheckKind::StrandSlope, location, "no harped strands"));
            continue;
        };
        let n = if segment.strands.material.diameter >= LARGE_STRAND {
            criteria.strand_slope_15_2
        } else {
            criteria.strand_slope_12_7
        };
        artifacts.push(
            capacity_check(CheckKind::StrandSlope, location, "Harped strands", slope, 1.0 / n).with_detail("n", n),
        );
    }
    Ok(artifacts)
}

/// Vertical force on each hold-down device
pub(crate) fn check_hold_down(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let limit = ctx.criteria().hold_down_limit;
    let mut artifacts = Vec::new();
    for (i, segment) in ctx.sections.bridge().segments.iter().enumerate() {
        let location = CheckLocation::Segment(i);
        let strands = &segment.strands;
        let (Some(harped), Some(slope)) = (strands.harped.as_ref(), strands.harped_slope(segment.length)) else {
            artifacts.push(Artifact::inapplicable(CheckKind::HoldDownForce, location, "no harped strands"));
            continue;
        };
        let force = strands.jacking_stress() * f64::from(harped.count) * strands.material.area;
        let vertical = force * slope.atan().sin();
        artifacts.push(
            capacity_check(CheckKind::HoldDownForce, location, "Harp point", vertical, limit)
                .with_detail("strand_force", force)
                .with_detail("slope", slope),
        );
    }
    Ok(artifacts)
}

/// Duct diameter against the web and tendon area against the duct
pub(crate) fn check_duct_size(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let bridge = ctx.sections.bridge();
    if bridge.tendons.is_empty() {
        return Ok(vec![Artifact::inapplicable(CheckKind::DuctSize, CheckLocation::Girder, "no tendons")]);
    }
    let criteria = ctx.criteria();
    let web = bridge
        .segments
        .iter()
        .map(|s| s.section.web_thickness)
        .fold(f64::INFINITY, f64::min);
    let mut artifacts = Vec::new();
    for (i, tendon) in bridge.tendons.iter().enumerate() {
        let location = CheckLocation::Tendon(i);
        artifacts.push(
            capacity_check(
                CheckKind::DuctSize,
                location,
                "Duct diameter",
                tendon.duct.outer_diameter,
                criteria.duct_to_web_ratio * web,
            )
            .with_detail("web_thickness", web),
        );
        artifacts.push(
            capacity_check(
                CheckKind::DuctSize,
                location,
                "Tendon area",
                tendon.area(),
                criteria.duct_area_ratio * tendon.duct.inner_area(),
            )
            .with_detail("duct_area", tendon.duct.inner_area()),
        );
    }
    Ok(artifacts)
}

/// Confinement bars around the bottom flange strands at each end
pub(crate) fn check_confinement(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    for (i, segment) in ctx.sections.bridge().segments.iter().enumerate() {
        let location = CheckLocation::Segment(i);
        if !segment.section.has_bottom_flange() {
            artifacts.push(Artifact::inapplicable(CheckKind::Confinement, location, "section has no bottom flange"));
            continue;
        }
        let zone = CONFINEMENT_ZONE * segment.section.height;
        let Some(bars) = &segment.reinforcement.confinement else {
            artifacts.push(capacity_check(CheckKind::Confinement, location, "Confinement zone length", zone, 0.0));
            continue;
        };
        artifacts.push(Artifact::evaluate(
            CheckKind::Confinement,
            location,
            "Bar size",
            MIN_CONFINEMENT_BAR,
            bars.bar_diameter,
            bars.bar_diameter >= MIN_CONFINEMENT_BAR,
        ));
        artifacts.push(capacity_check(
            CheckKind::Confinement,
            location,
            "Bar spacing",
            bars.spacing,
            MAX_CONFINEMENT_SPACING,
        ));
        artifacts.push(Artifact::evaluate(
            CheckKind::Confinement,
            location,
            "Confinement zone length",
            zone,
            bars.zone_length,
            bars.zone_length >= zone,
        ));
    }
    Ok(artifacts)
}

/// Vertical steel near each end against 4% of the force at transfer
pub(crate) fn check_splitting(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let timeline = ctx.sections.timeline();
    let mut artifacts = Vec::new();
    for (i, segment) in ctx.sections.bridge().segments.iter().enumerate() {
        let location = CheckLocation::Segment(i);
        let (Some(mid), Some(release)) = (ctx.segment_midpoint(i), timeline.segment_construction_interval(i)) else {
            artifacts.push(Artifact::inapplicable(CheckKind::Splitting, location, "segment is never released"));
            continue;
        };
        let force = prestress_stresses(ctx, mid, release, true)?.force;
        if force <= 0.0 {
            artifacts.push(Artifact::inapplicable(CheckKind::Splitting, location, "segment is not pretensioned"));
            continue;
        }
        let reinforcement = &segment.reinforcement;
        artifacts.push(
            capacity_check(
                CheckKind::Splitting,
                location,
                "End zone",
                SPLITTING_FRACTION * force,
                SPLITTING_STRESS * reinforcement.splitting_area,
            )
            .with_interval(release)
            .with_detail("Ps", force)
            .with_detail("As", reinforcement.splitting_area)
            .with_detail("zone_length", segment.section.height / 4.0),
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
    fn test_pretensioned_girder_end_zones() {
        let project = Project::single_span_example();
        with_context(&project, |ctx| {
            let confinement = check_confinement(ctx).unwrap();
            assert_eq!(confinement.len(), 3);
            // 2.5 m provided, 1.5 h = 2.4 m required
            assert!(confinement.iter().all(|a| a.passed()));

            let splitting = check_splitting(ctx).unwrap();
            assert_eq!(splitting.len(), 1);
            assert!(splitting[0].passed(), "{:?}", splitting[0]);
            assert_relative_eq!(splitting[0].capacity, 140.0e6 * 2.4e-3, max_relative = 1e-12);
        });
    }

    #[test]
    fn test_confinement_inapplicable_without_bottom_flange() {
        let mut project = Project::single_span_example();
        let section = &mut project.bridge.segments[0].section;
        section.bottom_flange_width = section.web_thickness;
        with_context(&project, |ctx| {
            let artifacts = check_confinement(ctx).unwrap();
            assert_eq!(artifacts[0].status, CheckStatus::Inapplicable);
        });
    }

    #[test]
    fn test_slope_and_hold_down() {
        let project = Project::single_span_example();
        with_context(&project, |ctx| {
            let slope = check_strand_slope(ctx).unwrap();
            assert_relative_eq!(slope[0].demand, 1.15 / 12.0, max_relative = 1e-12);
            assert_relative_eq!(slope[0].capacity, 1.0 / 8.0, max_relative = 1e-12);
            assert!(slope[0].passed());

            let hold_down = check_hold_down(ctx).unwrap();
            let force = 0.75 * 1860.0e6 * 6.0 * 140.0e-6;
            assert_relative_eq!(hold_down[0].detail("strand_force").unwrap(), force, max_relative = 1e-12);
            assert!(hold_down[0].demand < force * 0.1);
        });
    }

    #[test]
    fn test_tendon_checks_on_spliced_girder() {
        let project = Project::spliced_example();
        with_context(&project, |ctx| {
            let slope = check_strand_slope(ctx).unwrap();
            assert!(slope.iter().all(|a| a.status == CheckStatus::Inapplicable));

            let ducts = check_duct_size(ctx).unwrap();
            assert_eq!(ducts.len(), 2);
            assert!(ducts.iter().all(|a| a.passed()));

            let stress = check_strand_stress(ctx).unwrap();
            let labels: Vec<&str> = stress
                .iter()
                .filter(|a| a.location == CheckLocation::Tendon(0))
                .map(|a| a.label.as_str())
                .collect();
            assert_eq!(labels.len(), 4);
            let jacking = stress.iter().find(|a| a.label == "Tendon at jacking").unwrap();
            // 0.80 fpu = 0.889 fpy
            assert!(jacking.passed());
        });
    }

    #[test]
    fn test_duct_size_inapplicable_without_tendons() {
        let project = Project::single_span_example();
        with_context(&project, |ctx| {
            let artifacts = check_duct_size(ctx).unwrap();
            assert_eq!(artifacts[0].status, CheckStatus::Inapplicable);
        });
    }
}
