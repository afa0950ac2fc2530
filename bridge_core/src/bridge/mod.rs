//! # Bridge Model
//!
//! The girder line being analyzed: precast segments laid end to end, the
//! closure joints that splice them, the piers and temporary supports they
//! rest on, an optional composite deck, post-tensioning tendons and the
//! superimposed loads.
//!
//! Stations are measured from the start of segment 0. Closure joints are
//! zero-length connections at segment ends for stiffness; their weight is
//! applied as a point load when they are cast.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::project::Project;
//!
//! let project = Project::single_span_example();
//! let bridge = &project.bridge;
//! assert!(bridge.validate().is_ok());
//! assert!((bridge.total_length() - 30.0).abs() < 1e-9);
//! ```

pub mod prestressing;
pub mod reinforcement;
pub mod shape;

pub use prestressing::{Duct, JackingEnd, StrandLayout, Tendon, TendonPoint};
pub use reinforcement::{LongitudinalLayer, LongitudinalReinforcement, StirrupZone, TransverseReinforcement};
pub use shape::GirderSection;

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::materials::{ConcreteMaterial, RebarMaterial};
use crate::units::weight_per_length;

/// Length comparison tolerance for stations and POI locations (m)
pub const LENGTH_TOLERANCE: f64 = 1.0e-6;

// =============================================================================
// MEMBERS
// =============================================================================

/// A physical member of the girder line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberId {
    Segment(usize),
    ClosureJoint(usize),
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberId::Segment(i) => write!(f, "Segment {}", i + 1),
            MemberId::ClosureJoint(i) => write!(f, "Closure Joint {}", i + 1),
        }
    }
}

/// Lifting and hauling support locations, measured from each end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlingLocations {
    /// Lifting loop overhang (m)
    pub lift_overhang: f64,
    /// Truck bunk overhang (m)
    pub bunk_overhang: f64,
}

impl Default for HandlingLocations {
    fn default() -> Self {
        HandlingLocations {
            lift_overhang: 1.0,
            bunk_overhang: 1.5,
        }
    }
}

/// A precast girder segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub length: f64,
    pub section: GirderSection,
    pub concrete: ConcreteMaterial,
    pub strands: StrandLayout,
    #[serde(default)]
    pub reinforcement: TransverseReinforcement,
    #[serde(default)]
    pub longitudinal: LongitudinalReinforcement,
    #[serde(default)]
    pub handling: HandlingLocations,
}

impl Segment {
    /// Self weight per unit length (N/m)
    pub fn weight_per_length(&self) -> f64 {
        weight_per_length(self.section.area(), self.concrete.density)
    }
}

/// Cast-in-place closure joint splicing segment `i` to segment `i + 1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureJoint {
    /// Physical length of the joint, used for its weight (m)
    pub length: f64,
    pub concrete: ConcreteMaterial,
}

/// How a pier restrains the girder once closures are cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PierConnection {
    /// Continuity is established when the closure over the pier is cast
    #[default]
    ContinuousAfterClosure,
    /// The girder is always hinged over this pier
    Hinge,
}

/// A permanent support (abutments are piers at the girder ends)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pier {
    pub name: String,
    pub station: f64,
    /// Bearing width along the girder (m)
    pub bearing_width: f64,
    #[serde(default)]
    pub connection: PierConnection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TemporarySupportKind {
    #[default]
    ErectionTower,
    StrongBack,
}

/// A support used during construction and removed later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporarySupport {
    pub station: f64,
    #[serde(default)]
    pub kind: TemporarySupportKind,
}

/// Composite cast-in-place deck tributary to one girder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Structural slab thickness (m)
    pub thickness: f64,
    /// Effective flange width (m)
    pub effective_width: f64,
    /// Haunch depth at the segment ends (m)
    pub haunch_depth: f64,
    /// Camber allowance: reduction of the haunch toward mid-segment (m)
    #[serde(default)]
    pub camber_allowance: f64,
    pub concrete: ConcreteMaterial,
    #[serde(default)]
    pub rebar: Option<DeckRebar>,
}

/// One mat of longitudinal deck bars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckRebarMat {
    /// Bar area per unit deck width (m²/m)
    pub area_per_width: f64,
    /// Clear cover to the bar centroid from the nearer slab face (m)
    pub cover: f64,
}

/// Longitudinal deck reinforcement within the effective width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckRebar {
    #[serde(default)]
    pub material: RebarMaterial,
    pub top: DeckRebarMat,
    pub bottom: DeckRebarMat,
}

impl Deck {
    /// Slab offset "A" dimension: slab plus haunch at the segment ends (m)
    pub fn slab_offset(&self) -> f64 {
        self.thickness + self.haunch_depth
    }

    /// Deck bar layers as (area, depth below the deck top) pairs
    pub fn rebar_layers(&self) -> Vec<(f64, f64)> {
        self.rebar
            .iter()
            .flat_map(|r| {
                [
                    (r.top.area_per_width * self.effective_width, r.top.cover),
                    (
                        r.bottom.area_per_width * self.effective_width,
                        self.thickness - r.bottom.cover,
                    ),
                ]
            })
            .filter(|(area, _)| *area > 0.0)
            .collect()
    }
}

/// Longitudinal joint between adjacent girder flanges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalJoint {
    pub width: f64,
    pub depth: f64,
    pub concrete: ConcreteMaterial,
}

// =============================================================================
// USER LOADS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UserLoadCategory {
    Dc,
    Dw,
    LlIm,
}

/// Load magnitudes act downward when positive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserLoadShape {
    /// Uniform load (N/m) between two stations
    Uniform { start: f64, end: f64, w: f64 },
    /// Concentrated load (N) at a station
    Point { station: f64, p: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLoad {
    pub name: String,
    pub category: UserLoadCategory,
    pub shape: UserLoadShape,
}

impl UserLoad {
    /// Stations where the load starts, ends or acts
    pub fn stations(&self) -> Vec<f64> {
        match self.shape {
            UserLoadShape::Uniform { start, end, .. } => vec![start, end],
            UserLoadShape::Point { station, .. } => vec![station],
        }
    }
}

// =============================================================================
// GIRDER LINE
// =============================================================================

/// A single girder line of a precast or spliced girder bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeModel {
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub closures: Vec<ClosureJoint>,
    pub piers: Vec<Pier>,
    #[serde(default)]
    pub temporary_supports: Vec<TemporarySupport>,
    #[serde(default)]
    pub deck: Option<Deck>,
    #[serde(default)]
    pub longitudinal_joint: Option<LongitudinalJoint>,
    #[serde(default)]
    pub tendons: Vec<Tendon>,
    /// Traffic barrier weight carried by this girder (N/m)
    #[serde(default)]
    pub traffic_barrier: f64,
    /// Overlay weight carried by this girder (N/m)
    #[serde(default)]
    pub overlay: f64,
    #[serde(default)]
    pub user_loads: Vec<UserLoad>,
    /// Center-to-center girder spacing (m)
    pub girder_spacing: f64,
    pub girder_count: u32,
}

impl BridgeModel {
    pub fn segment_start(&self, index: usize) -> f64 {
        self.segments.iter().take(index).map(|s| s.length).sum()
    }

    pub fn segment_end(&self, index: usize) -> f64 {
        self.segment_start(index) + self.segments.get(index).map(|s| s.length).unwrap_or(0.0)
    }

    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    /// Station of closure joint `index` (end of segment `index`)
    pub fn closure_station(&self, index: usize) -> f64 {
        self.segment_end(index)
    }

    pub fn is_spliced(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn has_tendons(&self) -> bool {
        !self.tendons.is_empty()
    }

    /// Station of a location on a member
    pub fn station(&self, member: MemberId, distance: f64) -> BridgeResult<f64> {
        match member {
            MemberId::Segment(i) => {
                let segment = self
                    .segments
                    .get(i)
                    .ok_or_else(|| BridgeError::geometry(member.to_string(), "no such segment"))?;
                if distance < -LENGTH_TOLERANCE || distance > segment.length + LENGTH_TOLERANCE {
                    return Err(BridgeError::geometry(
                        member.to_string(),
                        format!("distance {} is off the segment", distance),
                    ));
                }
                Ok(self.segment_start(i) + distance)
            }
            MemberId::ClosureJoint(i) => {
                if i >= self.closures.len() {
                    return Err(BridgeError::geometry(member.to_string(), "no such closure joint"));
                }
                Ok(self.closure_station(i))
            }
        }
    }

    /// Length of a member (closure joints are zero-length)
    pub fn member_length(&self, member: MemberId) -> f64 {
        match member {
            MemberId::Segment(i) => self.segments.get(i).map(|s| s.length).unwrap_or(0.0),
            MemberId::ClosureJoint(_) => 0.0,
        }
    }

    /// The segment governing the section at a member location
    pub fn host_segment(&self, member: MemberId) -> usize {
        match member {
            MemberId::Segment(i) | MemberId::ClosureJoint(i) => i,
        }
    }

    /// Segment containing `station`; at a segment boundary the segment to
    /// the left is returned
    pub fn segment_at(&self, station: f64) -> Option<(usize, f64)> {
        let mut start = 0.0;
        for (i, segment) in self.segments.iter().enumerate() {
            let end = start + segment.length;
            if station >= start - LENGTH_TOLERANCE && station <= end + LENGTH_TOLERANCE {
                return Some((i, (station - start).clamp(0.0, segment.length)));
            }
            start = end;
        }
        None
    }

    /// Pier stations in ascending order
    pub fn pier_stations(&self) -> Vec<f64> {
        let mut stations: Vec<f64> = self.piers.iter().map(|p| p.station).collect();
        stations.sort_by(|a, b| a.total_cmp(b));
        stations
    }

    /// The permanent span containing `station` as (start, end)
    pub fn span_containing(&self, station: f64) -> Option<(f64, f64)> {
        self.pier_stations()
            .windows(2)
            .find(|w| station >= w[0] - LENGTH_TOLERANCE && station <= w[1] + LENGTH_TOLERANCE)
            .map(|w| (w[0], w[1]))
    }

    /// Span lengths between consecutive piers
    pub fn span_lengths(&self) -> Vec<f64> {
        self.pier_stations().windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Index of the pier at `station`, if any
    pub fn pier_at(&self, station: f64) -> Option<usize> {
        self.piers
            .iter()
            .position(|p| (p.station - station).abs() <= LENGTH_TOLERANCE)
    }

    /// Supports (piers and temporary supports) whose station falls within a segment
    pub fn supports_under_segment(&self, index: usize) -> (Vec<usize>, Vec<usize>) {
        let (start, end) = (self.segment_start(index), self.segment_end(index));
        let within = |s: f64| s >= start - LENGTH_TOLERANCE && s <= end + LENGTH_TOLERANCE;
        let piers = (0..self.piers.len()).filter(|&i| within(self.piers[i].station)).collect();
        let temps = (0..self.temporary_supports.len())
            .filter(|&i| within(self.temporary_supports[i].station))
            .collect();
        (piers, temps)
    }

    /// Check geometric consistency of the whole girder line
    pub fn validate(&self) -> BridgeResult<()> {
        if self.segments.is_empty() {
            return Err(BridgeError::geometry("girder", "the girder has no segments"));
        }
        for (i, segment) in self.segments.iter().enumerate() {
            let element = MemberId::Segment(i).to_string();
            if segment.length <= 0.0 || !segment.length.is_finite() {
                return Err(BridgeError::geometry(element, format!("length must be positive, got {}", segment.length)));
            }
            segment.section.validate(&element)?;
            segment.strands.validate(&element, segment.section.height)?;
        }
        if self.closures.len() != self.segments.len() - 1 {
            return Err(BridgeError::geometry(
                "girder",
                format!(
                    "{} segments require {} closure joints, found {}",
                    self.segments.len(),
                    self.segments.len() - 1,
                    self.closures.len()
                ),
            ));
        }
        for (i, closure) in self.closures.iter().enumerate() {
            if closure.length < 0.0 {
                return Err(BridgeError::geometry(MemberId::ClosureJoint(i).to_string(), "negative length"));
            }
        }

        let length = self.total_length();
        let on_girder = |s: f64| s >= -LENGTH_TOLERANCE && s <= length + LENGTH_TOLERANCE;
        if self.piers.len() < 2 && self.temporary_supports.is_empty() {
            return Err(BridgeError::geometry("girder", "at least two supports are required"));
        }
        for pier in &self.piers {
            if !on_girder(pier.station) {
                return Err(BridgeError::geometry(&pier.name, "pier is off the girder line"));
            }
            if pier.bearing_width < 0.0 {
                return Err(BridgeError::geometry(&pier.name, "negative bearing width"));
            }
        }
        for (i, support) in self.temporary_supports.iter().enumerate() {
            if !on_girder(support.station) {
                return Err(BridgeError::geometry(
                    format!("temporary support {}", i + 1),
                    "support is off the girder line",
                ));
            }
        }
        for tendon in &self.tendons {
            tendon.validate(length)?;
        }
        if let Some(deck) = &self.deck {
            if deck.thickness <= 0.0 || deck.effective_width <= 0.0 || deck.haunch_depth < 0.0 {
                return Err(BridgeError::geometry("deck", "invalid deck dimensions"));
            }
            if deck.camber_allowance > deck.haunch_depth + LENGTH_TOLERANCE {
                return Err(BridgeError::geometry("deck", "camber allowance exceeds the haunch depth"));
            }
            if let Some(rebar) = &deck.rebar {
                let inside = |c: f64| c >= 0.0 && c <= deck.thickness;
                if !inside(rebar.top.cover) || !inside(rebar.bottom.cover) {
                    return Err(BridgeError::geometry("deck", "deck bars lie outside the slab"));
                }
            }
        }
        for load in &self.user_loads {
            if load.stations().iter().any(|&s| !on_girder(s)) {
                return Err(BridgeError::geometry(&load.name, "user load is off the girder line"));
            }
        }
        if self.girder_spacing <= 0.0 || self.girder_count == 0 {
            return Err(BridgeError::geometry("girder line", "spacing and girder count must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_span_layout() {
        let bridge = Project::single_span_example().bridge;
        assert!(bridge.validate().is_ok());
        assert_eq!(bridge.segments.len(), 1);
        assert!(!bridge.is_spliced());
        assert_eq!(bridge.span_lengths(), vec![30.0]);
        assert_eq!(bridge.pier_at(30.0), Some(1));
    }

    #[test]
    fn test_spliced_stations() {
        let bridge = Project::spliced_example().bridge;
        assert!(bridge.validate().is_ok());
        let s1 = bridge.segment_start(1);
        assert_relative_eq!(s1, bridge.segments[0].length);
        assert_relative_eq!(bridge.closure_station(0), s1);
        assert_relative_eq!(bridge.station(MemberId::Segment(1), 2.0).unwrap(), s1 + 2.0);
        assert_eq!(bridge.segment_at(s1).map(|(i, _)| i), Some(0));
        assert_eq!(bridge.segment_at(s1 + 0.5).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn test_station_off_member() {
        let bridge = Project::single_span_example().bridge;
        let err = bridge.station(MemberId::Segment(0), 31.0).unwrap_err();
        assert_eq!(err.error_code(), "GEOMETRY_ERROR");
        assert!(bridge.station(MemberId::ClosureJoint(0), 0.0).is_err());
    }

    #[test]
    fn test_negative_segment_length_rejected() {
        let mut bridge = Project::single_span_example().bridge;
        bridge.segments[0].length = -1.0;
        let err = bridge.validate().unwrap_err();
        assert!(matches!(err, BridgeError::GeometryError { .. }));
    }

    #[test]
    fn test_closure_count_checked() {
        let mut bridge = Project::spliced_example().bridge;
        bridge.closures.pop();
        assert!(bridge.validate().is_err());
    }

    #[test]
    fn test_deck_rebar_layers() {
        let bridge = Project::spliced_example().bridge;
        let deck = bridge.deck.as_ref().unwrap();
        let layers = deck.rebar_layers();
        assert_eq!(layers.len(), 2);
        let rebar = deck.rebar.as_ref().unwrap();
        assert_relative_eq!(layers[0].0, rebar.top.area_per_width * deck.effective_width);
        assert_relative_eq!(layers[1].1, deck.thickness - rebar.bottom.cover);

        let mut bridge = bridge;
        if let Some(r) = bridge.deck.as_mut().and_then(|d| d.rebar.as_mut()) {
            r.top.cover = 1.0;
        }
        assert!(bridge.validate().is_err());
    }

    #[test]
    fn test_member_display() {
        assert_eq!(MemberId::Segment(0).to_string(), "Segment 1");
        assert_eq!(MemberId::ClosureJoint(1).to_string(), "Closure Joint 2");
    }
}
