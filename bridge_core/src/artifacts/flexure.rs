//! # Flexural Capacity
//!
//! Nominal flexural resistance of bonded prestressing steel and mild
//! reinforcement using the approximate strain-compatibility equations of
//! LRFD 5.6.3.1.1. Mild steel is taken at yield.
//!
//! ```text
//! k   = 2 (1.04 - fpy/fpu)
//! c   = (Aps fpu + As fy) / (α1 f'c β1 b + k Aps fpu/dp)                    rectangular
//! c   = (Aps fpu + As fy - α1 f'c (b - bw) hf) / (α1 f'c β1 bw + k Aps fpu/dp)   flanged
//! fps = fpu (1 - k c/dp)
//! Mn  = Aps fps (dp - a/2) + As fy (ds - a/2) + α1 f'c (b - bw) hf (a/2 - hf/2)
//! Mr  = φ Mn,  φ from εt = 0.003 (dt - c)/c
//! ```
//!
//! Positive moment uses the deck as the compression flange once it is
//! composite, the top flange before that. Negative moment uses the bottom
//! flange with the steel in the top half of the girder in tension, plus the
//! deck bars once the deck is composite.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::artifacts::flexure::{nominal_capacity, CompressionZone, FlexuralSteel, MildSteel};
//! use bridge_core::provisions::LrfdProvisions;
//!
//! let steel = [FlexuralSteel { area: 4.76e-3, fpu: 1860.0e6, fpy: 1674.0e6, depth: 1.75 }];
//! let zone = CompressionZone { width: 2.4, thickness: 0.2, web_width: 0.2, fc: 30.0e6 };
//! let capacity = nominal_capacity(&steel, &[], &zone, &LrfdProvisions::default());
//! assert!(capacity.a < zone.thickness);
//! assert!(capacity.mr > 14.0e6);
//!
//! let bars = [MildSteel { area: 2.0e-3, fy: 420.0e6, depth: 1.8 }];
//! let reinforced = nominal_capacity(&steel, &bars, &zone, &LrfdProvisions::default());
//! assert!(reinforced.mr > capacity.mr);
//! ```

use serde::{Deserialize, Serialize};

use super::{capacity_check, Artifact, CheckContext, CheckKind};
use crate::analysis::{Extreme, LimitState, ResponseType};
use crate::bridge::Segment;
use crate::errors::BridgeResult;
use crate::poi::{Poi, PoiId};
use crate::provisions::CodeProvisions;
use crate::timeline::CastComponent;
use crate::units::to_mpa;

/// Ultimate concrete strain
const EPSILON_CU: f64 = 0.003;

/// Moments smaller than this are not checked (N·m)
const MOMENT_TOLERANCE: f64 = 1.0;

/// One group of bonded prestressing steel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlexuralSteel {
    pub area: f64,
    pub fpu: f64,
    pub fpy: f64,
    /// Distance from the extreme compression fiber to the steel centroid (m)
    pub depth: f64,
}

/// One layer of tension reinforcing bars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MildSteel {
    pub area: f64,
    pub fy: f64,
    /// Distance from the extreme compression fiber to the bar centroid (m)
    pub depth: f64,
}

/// Compression flange and web of the section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionZone {
    pub width: f64,
    pub thickness: f64,
    pub web_width: f64,
    pub fc: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlexuralCapacity {
    pub aps: f64,
    pub dp: f64,
    /// Area of tension reinforcing bars (m²)
    pub as_mild: f64,
    /// Depth of the tension bar centroid (m)
    pub ds: f64,
    pub c: f64,
    pub a: f64,
    pub fps: f64,
    pub et: f64,
    pub phi: f64,
    pub mn: f64,
    pub mr: f64,
    /// Compression block extends below the flange
    pub flanged: bool,
}

/// Stress block intensity α1 (LRFD 5.6.2.2)
fn alpha1(fc: f64) -> f64 {
    let fc = to_mpa(fc);
    if fc <= 69.0 {
        0.85
    } else {
        (0.85 - 0.02 * (fc - 69.0) / 7.0).max(0.75)
    }
}

/// Nominal and factored flexural resistance
pub fn nominal_capacity(
    steel: &[FlexuralSteel],
    mild: &[MildSteel],
    zone: &CompressionZone,
    provisions: &dyn CodeProvisions,
) -> FlexuralCapacity {
    let aps: f64 = steel.iter().map(|s| s.area).sum();
    let prestress: f64 = steel.iter().map(|s| s.area * s.fpu).sum();
    let as_mild: f64 = mild.iter().map(|s| s.area).sum();
    let bars: f64 = mild.iter().map(|s| s.area * s.fy).sum();
    if prestress + bars <= 0.0 || zone.fc <= 0.0 {
        return FlexuralCapacity::default();
    }
    let (fpu, dp, k) = if prestress > 0.0 {
        (
            prestress / aps,
            steel.iter().map(|s| s.area * s.fpu * s.depth).sum::<f64>() / prestress,
            steel.iter().map(|s| s.area * 2.0 * (1.04 - s.fpy / s.fpu)).sum::<f64>() / aps,
        )
    } else {
        (0.0, 0.0, 0.0)
    };
    let ds = if bars > 0.0 {
        mild.iter().map(|s| s.area * s.fy * s.depth).sum::<f64>() / bars
    } else {
        0.0
    };
    let dt = steel
        .iter()
        .map(|s| s.depth)
        .chain(mild.iter().map(|s| s.depth))
        .fold(0.0, f64::max);

    let alpha = alpha1(zone.fc);
    let beta = provisions.stress_block_factor(zone.fc);
    let steel_term = if prestress > 0.0 { k * prestress / dp } else { 0.0 };
    let force = prestress + bars;

    let mut flanged = false;
    let mut c = force / (alpha * zone.fc * beta * zone.width + steel_term);
    if beta * c > zone.thickness && zone.width > zone.web_width {
        let overhang = alpha * zone.fc * (zone.width - zone.web_width) * zone.thickness;
        c = ((force - overhang) / (alpha * zone.fc * beta * zone.web_width + steel_term)).max(0.0);
        flanged = beta * c > zone.thickness;
        if !flanged {
            c = force / (alpha * zone.fc * beta * zone.width + steel_term);
        }
    }
    let a = beta * c;
    let fps = if prestress > 0.0 { fpu * (1.0 - k * c / dp) } else { 0.0 };
    let mut mn = aps * fps * (dp - a / 2.0) + bars * (ds - a / 2.0);
    if flanged {
        mn += alpha * zone.fc * (zone.width - zone.web_width) * zone.thickness * (a / 2.0 - zone.thickness / 2.0);
    }
    let et = if c > 0.0 { EPSILON_CU * (dt - c) / c } else { f64::INFINITY };
    let phi = provisions.flexure_resistance_factor(et);
    FlexuralCapacity {
        aps,
        dp,
        as_mild,
        ds,
        c,
        a,
        fps,
        et,
        phi,
        mn,
        mr: phi * mn,
        flanged,
    }
}

/// Compare a factored moment with the capacity
pub fn flexure_artifact(location: super::CheckLocation, label: &str, mu: f64, capacity: &FlexuralCapacity) -> Artifact {
    capacity_check(CheckKind::FlexuralCapacity, location, label, mu, capacity.mr)
        .with_detail("Mn", capacity.mn)
        .with_detail("phi", capacity.phi)
        .with_detail("c", capacity.c)
        .with_detail("a", capacity.a)
        .with_detail("fps", capacity.fps)
        .with_detail("dp", capacity.dp)
        .with_detail("Aps", capacity.aps)
        .with_detail("As", capacity.as_mild)
        .with_detail("ds", capacity.ds)
        .with_detail("et", capacity.et)
}

/// Bonded steel at a POI with heights above the girder bottom
fn bonded_steel(ctx: &CheckContext<'_>, poi: &Poi, interval: usize) -> Vec<(f64, f64, f64, f64)> {
    let sections = ctx.sections;
    let bridge = sections.bridge();
    let timeline = sections.timeline();
    let mut steel = Vec::new();
    if let (Some((area, y)), Some(segment)) = (sections.strands_at(poi), host(ctx, poi)) {
        if area > 0.0 {
            steel.push((area, segment.strands.material.fpu, segment.strands.material.fpy, y));
        }
    }
    for (i, y) in sections.tendons_at(poi) {
        // Ducts are grouted in the interval after stressing
        let grouted = timeline.tendon_stressing_interval(i).is_some_and(|s| s < interval);
        match bridge.tendons.get(i) {
            Some(tendon) if grouted => steel.push((tendon.area(), tendon.strand.fpu, tendon.strand.fpy, y)),
            _ => {}
        }
    }
    steel
}

fn host<'a>(ctx: &CheckContext<'a>, poi: &Poi) -> Option<&'a Segment> {
    let bridge = ctx.sections.bridge();
    bridge.segments.get(bridge.host_segment(poi.location.member))
}

/// Tension bars at a POI: girder longitudinal layers as (area, fy, height)
/// plus the deck mats once the deck is composite
fn bonded_bars(ctx: &CheckContext<'_>, poi: &Poi, interval: usize) -> BridgeResult<Vec<(f64, f64, f64)>> {
    let sections = ctx.sections;
    let mut bars = Vec::new();
    if let Some(segment) = host(ctx, poi) {
        let material = &segment.longitudinal.material;
        bars.extend(segment.longitudinal.layers.iter().map(|l| (l.area, material.fy, l.y)));
    }
    let composite = sections.timeline().composite_deck_interval().is_some_and(|c| c <= interval);
    if let (Some(deck), Some(top), true) = (&sections.bridge().deck, sections.deck_top(poi)?, composite) {
        if let Some(rebar) = &deck.rebar {
            bars.extend(deck.rebar_layers().into_iter().map(|(area, depth)| (area, rebar.material.fy, top - depth)));
        }
    }
    Ok(bars)
}

/// Capacity for positive (`sagging`) or negative moment at a POI
pub(crate) fn capacity_at(ctx: &CheckContext<'_>, id: PoiId, interval: usize, sagging: bool) -> BridgeResult<FlexuralCapacity> {
    let sections = ctx.sections;
    let poi = sections.poi(id)?;
    let Some(segment) = host(ctx, poi) else {
        return Ok(FlexuralCapacity::default());
    };
    let shape = &segment.section;
    let girder_fc = sections.concrete_properties(id, interval)?.fc;
    let steel = bonded_steel(ctx, poi, interval);
    let bars = bonded_bars(ctx, poi, interval)?;

    let (zone, top) = if sagging {
        let composite = sections.timeline().composite_deck_interval().is_some_and(|c| c <= interval);
        let deck = match (&sections.bridge().deck, sections.component_concrete(CastComponent::Deck, interval)?) {
            (Some(deck), Some(concrete)) if composite => Some((deck, concrete.fc)),
            _ => None,
        };
        match (deck, sections.deck_top(poi)?) {
            (Some((deck, fc)), Some(top)) => (
                CompressionZone {
                    width: deck.effective_width,
                    thickness: deck.thickness,
                    web_width: shape.total_web_width(),
                    fc,
                },
                top,
            ),
            _ => (
                CompressionZone {
                    width: shape.top_flange_width,
                    thickness: shape.top_flange_thickness,
                    web_width: shape.total_web_width(),
                    fc: girder_fc,
                },
                shape.height,
            ),
        }
    } else {
        (
            CompressionZone {
                width: shape.bottom_flange_width,
                thickness: shape.bottom_flange_thickness,
                web_width: shape.total_web_width(),
                fc: girder_fc,
            },
            0.0,
        )
    };

    let in_tension = |y: f64| if sagging { y < shape.height / 2.0 } else { y > shape.height / 2.0 };
    let steel: Vec<FlexuralSteel> = steel
        .into_iter()
        .filter(|(_, _, _, y)| if sagging { *y < top } else { in_tension(*y) })
        .map(|(area, fpu, fpy, y)| FlexuralSteel {
            area,
            fpu,
            fpy,
            depth: (top - y).abs(),
        })
        .collect();
    let mild: Vec<MildSteel> = bars
        .into_iter()
        .filter(|(area, _, y)| *area > 0.0 && in_tension(*y))
        .map(|(area, fy, y)| MildSteel {
            area,
            fy,
            depth: (top - y).abs(),
        })
        .collect();
    Ok(nominal_capacity(&steel, &mild, &zone, ctx.provisions))
}

/// Strength I moments against the resistance at every POI in the final interval
pub(crate) fn check_flexural_capacity(ctx: &CheckContext<'_>) -> BridgeResult<Vec<Artifact>> {
    let k = ctx.last_interval();
    let mut artifacts = Vec::new();
    for id in ctx.sections.pois().sorted() {
        let location = ctx.poi_location(id)?;
        let max = ctx.combined(id, k, LimitState::StrengthI, ResponseType::Moment, Extreme::Max)?;
        if max > MOMENT_TOLERANCE {
            let capacity = capacity_at(ctx, id, k, true)?;
            artifacts.push(flexure_artifact(location, "Positive moment", max, &capacity).with_interval(k));
        }
        let min = ctx.combined(id, k, LimitState::StrengthI, ResponseType::Moment, Extreme::Min)?;
        if min < -MOMENT_TOLERANCE {
            let capacity = capacity_at(ctx, id, k, false)?;
            artifacts.push(flexure_artifact(location, "Negative moment", min, &capacity).with_interval(k));
        }
    }
    Ok(artifacts)
}
