//! # Lateral Stability During Handling
//!
//! Factors of safety against cracking and failure of a segment hanging from
//! its lifting loops, and against cracking and rollover while it rides on a
//! truck. The girder is treated as a rigid body rotating about the roll axis
//! with lateral sweep, support placement error and the lateral deflection of
//! the weak axis all adding to the eccentricity of its weight.
//!
//! ```text
//!          lift/bunk                         lift/bunk
//!     a ◄──►  ▲                                 ▲  ◄──► a
//!   ══════════╪═════════════════════════════════╪══════════
//!             ◄────────────── l1 = L − 2a ──────►
//! ```

use std::f64::consts::FRAC_PI_2;

use super::{prestress_stresses, Artifact, CheckContext, CheckKind, CheckLocation};
use crate::bridge::Segment;
use crate::errors::BridgeResult;
use crate::poi::PoiId;

/// Ratio of the failure tilt to the cracking deflection amplification
const FAILURE_AMPLIFICATION: f64 = 2.5;

/// Weak-axis deflection of a member of length `length` supported `overhang`
/// from each end under its own weight `w` (N/m), as though the full weight
/// acted laterally.
pub fn lateral_deflection(w: f64, length: f64, overhang: f64, ec: f64, iy: f64) -> f64 {
    if ec <= 0.0 || iy <= 0.0 || length <= 0.0 {
        return 0.0;
    }
    let a = overhang;
    let l1 = length - 2.0 * a;
    w / (12.0 * ec * iy * length)
        * (l1.powi(5) / 10.0 - a.powi(2) * l1.powi(3) + 3.0 * a.powi(4) * l1 + 1.2 * a.powi(5))
}

/// Vertical moment at mid-length between the supports (sagging positive)
pub fn midspan_moment(w: f64, length: f64, overhang: f64) -> f64 {
    let l1 = length - 2.0 * overhang;
    w * l1 * l1 / 8.0 - w * overhang * overhang / 2.0
}

/// The section quantities the tilt to cracking depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrackingSection {
    pub iy: f64,
    pub top_width: f64,
    pub bottom_width: f64,
    /// Vertical stresses at the flange tips before tilting (Pa, tension positive)
    pub top_stress: f64,
    pub bottom_stress: f64,
    pub modulus_of_rupture: f64,
}

impl CrackingSection {
    /// Tilt angle at which the lateral moment cracks a flange tip (rad).
    /// Zero when the section is cracked before it tilts.
    pub fn cracking_tilt(&self, vertical_moment: f64) -> f64 {
        let lateral = |stress: f64, width: f64| {
            if width <= 0.0 {
                f64::INFINITY
            } else {
                2.0 * (self.modulus_of_rupture - stress) * self.iy / width
            }
        };
        let m_lat = lateral(self.top_stress, self.top_width).min(lateral(self.bottom_stress, self.bottom_width));
        if m_lat < 0.0 {
            return 0.0;
        }
        if vertical_moment == 0.0 {
            return FRAC_PI_2;
        }
        (m_lat / vertical_moment).abs().clamp(0.0, FRAC_PI_2)
    }
}

/// Hanging girder safety factors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftingSafety {
    pub zo: f64,
    pub ei: f64,
    /// Height of the roll axis above the center of gravity
    pub yr: f64,
    pub theta_i: f64,
    pub theta_max: f64,
    pub fs_cracking: f64,
    pub fs_failure: f64,
}

/// Safety of a girder hanging from lifting loops.
pub fn lifting_safety(zo: f64, ei: f64, yr: f64, theta_max: f64) -> LiftingSafety {
    let theta_i = if yr > 0.0 { ei / yr } else { f64::INFINITY };
    let fs_cracking = if theta_max <= 0.0 || yr <= 0.0 {
        0.0
    } else {
        let denom = zo / yr + theta_i / theta_max;
        if denom > 0.0 {
            1.0 / denom
        } else {
            f64::INFINITY
        }
    };
    let fs_failure = if zo <= 0.0 || yr <= 0.0 {
        f64::INFINITY
    } else {
        let theta = (ei / (FAILURE_AMPLIFICATION * zo)).sqrt();
        let zo_prime = zo * (1.0 + FAILURE_AMPLIFICATION * theta);
        let denom = zo_prime * theta + ei;
        if denom > 0.0 {
            yr * theta / denom
        } else {
            f64::INFINITY
        }
    };
    LiftingSafety {
        zo,
        ei,
        yr,
        theta_i,
        theta_max,
        fs_cracking: fs_cracking.max(0.0),
        // A girder cannot fail before it cracks
        fs_failure: fs_failure.max(fs_cracking).max(0.0),
    }
}

/// Truck and roadway quantities for hauling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaulingGeometry {
    /// Radius of stability Kθ/W (m)
    pub r: f64,
    /// Height of the center of gravity above the roll center (m)
    pub y: f64,
    /// Height of the roll center above the roadway (m)
    pub hr: f64,
    /// Lateral distance from the roll center to the tire reaction (m)
    pub zmax: f64,
    pub superelevation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaulingSafety {
    pub zo: f64,
    pub ei: f64,
    pub theta_max: f64,
    pub theta_rollover: f64,
    pub fs_cracking: f64,
    pub fs_rollover: f64,
}

/// Safety of a girder supported on a truck on a superelevated roadway
pub fn hauling_safety(zo: f64, ei: f64, theta_max: f64, truck: &HaulingGeometry) -> HaulingSafety {
    let alpha = truck.superelevation;
    let fs_cracking = if theta_max <= alpha {
        0.0
    } else {
        truck.r * (theta_max - alpha) / (zo * theta_max + ei + truck.y * theta_max)
    };
    let theta_rollover = if truck.r > 0.0 {
        (truck.zmax - truck.hr * alpha) / truck.r + alpha
    } else {
        0.0
    };
    let zo_prime = zo * (1.0 + FAILURE_AMPLIFICATION * theta_rollover);
    let denom = zo_prime * theta_rollover + ei + truck.y * theta_rollover;
    let fs_rollover = if denom > 0.0 {
        truck.r * (theta_rollover - alpha) / denom
    } else {
        0.0
    };
    HaulingSafety {
        zo,
        ei,
        theta_max,
        theta_rollover,
        fs_cracking: fs_cracking.max(0.0),
        fs_rollover: fs_rollover.max(0.0),
    }
}

// =============================================================================
// Checks
// =============================================================================

/// Quantities shared by lifting and hauling of one segment
struct Handling {
    mid: PoiId,
    w: f64,
    length: f64,
    overhang: f64,
    ec: f64,
    zo: f64,
    theta_max: f64,
    y_bottom: f64,
    y_top: f64,
    moment: f64,
}

fn handling_state(
    ctx: &CheckContext<'_>,
    segment: &Segment,
    mid: PoiId,
    interval: usize,
    overhang: f64,
    at_transfer: bool,
) -> BridgeResult<Handling> {
    let concrete = ctx.sections.concrete_properties(mid, interval)?;
    let gross = segment.section.gross_properties(concrete.ec);
    let w = segment.weight_per_length();
    let length = segment.length;
    let moment = midspan_moment(w, length, overhang);
    let prestress = prestress_stresses(ctx, mid, interval, at_transfer)?;
    let (top_gravity, bottom_gravity) = if gross.ix > 0.0 {
        (-moment * gross.y_top_girder / gross.ix, moment * gross.y_bottom / gross.ix)
    } else {
        (0.0, 0.0)
    };
    let cracking = CrackingSection {
        iy: gross.iy,
        top_width: segment.section.top_flange_width,
        bottom_width: segment.section.bottom_flange_width,
        top_stress: prestress.top + top_gravity,
        bottom_stress: prestress.bottom + bottom_gravity,
        modulus_of_rupture: segment.concrete.modulus_of_rupture(concrete.fc),
    };
    Ok(Handling {
        mid,
        w,
        length,
        overhang,
        ec: concrete.ec,
        zo: lateral_deflection(w, length, overhang, concrete.ec, gross.iy),
        theta_max: cracking.cracking_tilt(moment),
        y_bottom: gross.y_bottom,
        y_top: gross.y_top_girder,
        moment,
    })
}

/// Lifting from the loops at release
pub(crate) fn check_lifting(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let criteria = &ctx.criteria().lifting;
    let timeline = ctx.sections.timeline();
    let mut artifacts = Vec::new();
    for (i, segment) in ctx.sections.bridge().segments.iter().enumerate() {
        let location = CheckLocation::Segment(i);
        let (Some(release), Some(mid)) = (timeline.segment_construction_interval(i), ctx.segment_midpoint(i)) else {
            artifacts.push(Artifact::inapplicable(
                CheckKind::LiftingStability,
                location,
                "segment is never cast",
            ));
            continue;
        };
        let state = handling_state(ctx, segment, mid, release, segment.handling.lift_overhang, true)?;
        let ei = criteria.sweep_tolerance * state.length + criteria.placement_tolerance;
        let yr = state.y_top + criteria.loop_height;
        let safety = lifting_safety(state.zo, ei, yr, state.theta_max);
        tracing::debug!(
            segment = i,
            fs_cracking = safety.fs_cracking,
            fs_failure = safety.fs_failure,
            "lifting stability"
        );
        let common = |a: Artifact| {
            a.with_interval(release)
                .with_detail("zo", safety.zo)
                .with_detail("ei", safety.ei)
                .with_detail("yr", safety.yr)
                .with_detail("theta_i", safety.theta_i)
                .with_detail("theta_max", safety.theta_max)
                .with_detail("midspan_moment", state.moment)
                .with_detail("overhang", state.overhang)
                .with_detail("ec", state.ec)
                .with_detail("poi", state.mid.0 as f64)
        };
        artifacts.push(common(Artifact::evaluate(
            CheckKind::LiftingStability,
            location,
            "FS against cracking",
            criteria.min_fs_cracking,
            safety.fs_cracking,
            safety.fs_cracking >= criteria.min_fs_cracking,
        )));
        artifacts.push(common(Artifact::evaluate(
            CheckKind::LiftingStability,
            location,
            "FS against failure",
            criteria.min_fs_failure,
            safety.fs_failure,
            safety.fs_failure >= criteria.min_fs_failure,
        )));
    }
    Ok(artifacts)
}

/// Hauling on a truck to the site, with the losses up to erection
pub(crate) fn check_hauling(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let criteria = &ctx.criteria().hauling;
    let timeline = ctx.sections.timeline();
    let mut artifacts = Vec::new();
    for (i, segment) in ctx.sections.bridge().segments.iter().enumerate() {
        let location = CheckLocation::Segment(i);
        let (Some(release), Some(erection), Some(mid)) = (
            timeline.segment_construction_interval(i),
            timeline.segment_erection_interval(i),
            ctx.segment_midpoint(i),
        ) else {
            artifacts.push(Artifact::inapplicable(
                CheckKind::HaulingStability,
                location,
                "segment is never erected",
            ));
            continue;
        };
        // Storage interval just before erection
        let interval = erection.saturating_sub(1).max(release);
        let state = handling_state(ctx, segment, mid, interval, segment.handling.bunk_overhang, false)?;
        let weight = state.w * state.length;
        let truck = HaulingGeometry {
            r: if weight > 0.0 { criteria.roll_stiffness / weight } else { 0.0 },
            y: criteria.girder_bottom_height + state.y_bottom - criteria.roll_center_height,
            hr: criteria.roll_center_height,
            zmax: criteria.wheel_spacing / 2.0,
            superelevation: criteria.superelevation,
        };
        let ei = criteria.sweep_tolerance * state.length + criteria.placement_tolerance;
        let safety = hauling_safety(state.zo, ei, state.theta_max, &truck);
        tracing::debug!(
            segment = i,
            fs_cracking = safety.fs_cracking,
            fs_rollover = safety.fs_rollover,
            "hauling stability"
        );
        let common = |a: Artifact| {
            a.with_interval(interval)
                .with_detail("zo", safety.zo)
                .with_detail("ei", safety.ei)
                .with_detail("r", truck.r)
                .with_detail("y", truck.y)
                .with_detail("theta_max", safety.theta_max)
                .with_detail("theta_rollover", safety.theta_rollover)
                .with_detail("midspan_moment", state.moment)
                .with_detail("overhang", state.overhang)
        };
        artifacts.push(common(Artifact::evaluate(
            CheckKind::HaulingStability,
            location,
            "FS against cracking",
            criteria.min_fs_cracking,
            safety.fs_cracking,
            safety.fs_cracking >= criteria.min_fs_cracking,
        )));
        artifacts.push(common(Artifact::evaluate(
            CheckKind::HaulingStability,
            location,
            "FS against rollover",
            criteria.min_fs_rollover,
            safety.fs_rollover,
            safety.fs_rollover >= criteria.min_fs_rollover,
        )));
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tests::with_context;
    use crate::project::Project;
    use approx::assert_relative_eq;

    #[test]
    fn test_lateral_deflection_without_overhang() {
        // Simply supported: 5wL⁴/384EI is vertical, the lateral sweep form is wL⁴/120EI
        let zo = lateral_deflection(10_000.0, 30.0, 0.0, 30.0e9, 0.01);
        assert_relative_eq!(zo, 10_000.0 * 30.0_f64.powi(4) / (120.0 * 30.0e9 * 0.01), epsilon = 1e-12);
    }

    #[test]
    fn test_overhang_reduces_deflection_and_moment() {
        let base = lateral_deflection(10_000.0, 30.0, 0.0, 30.0e9, 0.01);
        let hung = lateral_deflection(10_000.0, 30.0, 2.0, 30.0e9, 0.01);
        assert!(hung < base);
        assert!(midspan_moment(10_000.0, 30.0, 2.0) < midspan_moment(10_000.0, 30.0, 0.0));
        assert_relative_eq!(midspan_moment(8.0, 10.0, 0.0), 100.0);
    }

    #[test]
    fn test_cracked_before_tilt() {
        let section = CrackingSection {
            iy: 0.01,
            top_width: 1.0,
            bottom_width: 0.7,
            top_stress: 5.0e6,
            bottom_stress: -10.0e6,
            modulus_of_rupture: 3.0e6,
        };
        assert_eq!(section.cracking_tilt(1.0e6), 0.0);
        let safety = lifting_safety(0.01, 0.04, 1.0, 0.0);
        assert_eq!(safety.fs_cracking, 0.0);
    }

    #[test]
    fn test_lifting_failure_not_below_cracking() {
        let safety = lifting_safety(0.05, 0.03, 0.9, 0.2);
        assert!(safety.fs_cracking > 0.0);
        assert!(safety.fs_failure >= safety.fs_cracking);
        assert_relative_eq!(safety.theta_i, 0.03 / 0.9);
    }

    #[test]
    fn test_rollover_angle() {
        let truck = HaulingGeometry {
            r: 2.0,
            y: 1.5,
            hr: 0.6,
            zmax: 0.915,
            superelevation: 0.06,
        };
        let safety = hauling_safety(0.02, 0.05, 0.1, &truck);
        assert_relative_eq!(safety.theta_rollover, (0.915 - 0.6 * 0.06) / 2.0 + 0.06);
        assert!(safety.fs_rollover > 0.0);
    }

    #[test]
    fn test_superelevation_cracks_girder() {
        let truck = HaulingGeometry {
            r: 2.0,
            y: 1.5,
            hr: 0.6,
            zmax: 0.915,
            superelevation: 0.06,
        };
        assert_eq!(hauling_safety(0.02, 0.05, 0.05, &truck).fs_cracking, 0.0);
    }

    #[test]
    fn test_single_span_handling() {
        let project = Project::single_span_example();
        with_context(&project, |ctx| {
            let lifting = check_lifting(ctx).unwrap();
            assert_eq!(lifting.len(), 2 * project.bridge.segments.len());
            assert!(lifting.iter().all(|a| a.is_applicable()));
            let cracking = &lifting[0];
            assert!(cracking.capacity > 1.0, "FS cracking {}", cracking.capacity);
            assert!(cracking.detail("zo").unwrap() > 0.0);

            let hauling = check_hauling(ctx).unwrap();
            assert_eq!(hauling.len(), 2 * project.bridge.segments.len());
            assert!(hauling.iter().all(|a| a.is_applicable() && a.capacity >= 0.0));
            assert!(lifting.iter().chain(&hauling).all(|a| a.passed()), "{:?}", hauling);
        });
    }
}
