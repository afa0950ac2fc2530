//! # Points of Interest
//!
//! The canonical set of longitudinal locations where results are computed.
//! POIs live in an arena and are identified by their index, so a [`PoiId`]
//! never changes once issued. Every downstream table is keyed by it.
//!
//! Two locations on the same member closer than [`LENGTH_TOLERANCE`] are the
//! same POI: adding one again returns the existing id and unions the
//! attributes.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::bridge::MemberId;
//! use bridge_core::poi::{PoiAttributes, PoiLocation, PoiRegistry};
//!
//! let mut registry = PoiRegistry::new();
//! let a = registry.add_or_get(PoiLocation::new(MemberId::Segment(0), 15.0), 15.0, PoiAttributes::HARP_POINT);
//! let b = registry.add_or_get(PoiLocation::new(MemberId::Segment(0), 15.0 + 1e-7), 15.0, PoiAttributes::SPAN_5L);
//! assert_eq!(a, b);
//! assert!(registry.get(a).unwrap().attributes.contains(PoiAttributes::HARP_POINT | PoiAttributes::SPAN_5L));
//! ```

pub mod poi_map;

pub use poi_map::{PoiMap, SolverNodes};

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

pub use crate::bridge::LENGTH_TOLERANCE;
use crate::bridge::{BridgeModel, MemberId};
use crate::errors::BridgeResult;
use crate::provisions;

// =============================================================================
// ATTRIBUTES
// =============================================================================

/// Bitset of POI attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiAttributes(pub u64);

impl PoiAttributes {
    pub const NONE: PoiAttributes = PoiAttributes(0);
    pub const SPAN_0L: PoiAttributes = PoiAttributes(1 << 0);
    pub const SPAN_1L: PoiAttributes = PoiAttributes(1 << 1);
    pub const SPAN_2L: PoiAttributes = PoiAttributes(1 << 2);
    pub const SPAN_3L: PoiAttributes = PoiAttributes(1 << 3);
    pub const SPAN_4L: PoiAttributes = PoiAttributes(1 << 4);
    pub const SPAN_5L: PoiAttributes = PoiAttributes(1 << 5);
    pub const SPAN_6L: PoiAttributes = PoiAttributes(1 << 6);
    pub const SPAN_7L: PoiAttributes = PoiAttributes(1 << 7);
    pub const SPAN_8L: PoiAttributes = PoiAttributes(1 << 8);
    pub const SPAN_9L: PoiAttributes = PoiAttributes(1 << 9);
    pub const SPAN_10L: PoiAttributes = PoiAttributes(1 << 10);
    pub const HARP_POINT: PoiAttributes = PoiAttributes(1 << 11);
    pub const SUPPORT: PoiAttributes = PoiAttributes(1 << 12);
    pub const CRITICAL_SECTION_SHEAR: PoiAttributes = PoiAttributes(1 << 13);
    pub const PICK_POINT: PoiAttributes = PoiAttributes(1 << 14);
    pub const BUNK_POINT: PoiAttributes = PoiAttributes(1 << 15);
    pub const CLOSURE: PoiAttributes = PoiAttributes(1 << 16);
    pub const START_FACE: PoiAttributes = PoiAttributes(1 << 17);
    pub const END_FACE: PoiAttributes = PoiAttributes(1 << 18);
    pub const PS_TRANSFER: PoiAttributes = PoiAttributes(1 << 19);
    pub const PS_DEVELOPMENT: PoiAttributes = PoiAttributes(1 << 20);
    pub const DEBOND: PoiAttributes = PoiAttributes(1 << 21);
    pub const STIRRUP_ZONE: PoiAttributes = PoiAttributes(1 << 22);
    pub const H: PoiAttributes = PoiAttributes(1 << 23);
    pub const H15: PoiAttributes = PoiAttributes(1 << 24);
    pub const FACE_OF_SUPPORT: PoiAttributes = PoiAttributes(1 << 25);
    pub const TEMP_SUPPORT: PoiAttributes = PoiAttributes(1 << 26);
    pub const CONC_LOAD: PoiAttributes = PoiAttributes(1 << 27);
    pub const MIRROR: PoiAttributes = PoiAttributes(1 << 28);

    /// Tenth-point attribute for `tenth` in 0..=10
    pub fn span_point(tenth: u32) -> PoiAttributes {
        PoiAttributes(1 << tenth.min(10))
    }

    /// True when every bit of `mask` is set
    pub fn contains(self, mask: PoiAttributes) -> bool {
        self.0 & mask.0 == mask.0
    }

    pub fn intersects(self, mask: PoiAttributes) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PoiAttributes {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        PoiAttributes(self.0 | rhs.0)
    }
}

impl BitOrAssign for PoiAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// =============================================================================
// POI RECORDS
// =============================================================================

/// Arena index of a POI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoiId(pub usize);

/// A location on a member, measured from the member's start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoiLocation {
    pub member: MemberId,
    pub distance: f64,
}

impl PoiLocation {
    pub fn new(member: MemberId, distance: f64) -> Self {
        PoiLocation { member, distance }
    }

    /// Same member and within the length tolerance
    pub fn matches(&self, other: &PoiLocation) -> bool {
        self.member == other.member && (self.distance - other.distance).abs() <= LENGTH_TOLERANCE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: PoiId,
    pub location: PoiLocation,
    /// Station along the girder line (m)
    pub station: f64,
    pub attributes: PoiAttributes,
}

/// Arena of canonical POIs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiRegistry {
    pois: Vec<Poi>,
}

impl PoiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    pub fn get(&self, id: PoiId) -> Option<&Poi> {
        self.pois.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Poi> {
        self.pois.iter()
    }

    /// Return the POI at `location`, creating it if needed. Attributes are unioned.
    pub fn add_or_get(&mut self, location: PoiLocation, station: f64, attributes: PoiAttributes) -> PoiId {
        if let Some(id) = self.find(&location) {
            self.pois[id.0].attributes |= attributes;
            return id;
        }
        let id = PoiId(self.pois.len());
        self.pois.push(Poi {
            id,
            location,
            station,
            attributes,
        });
        id
    }

    /// Exact lookup within the length tolerance
    pub fn find(&self, location: &PoiLocation) -> Option<PoiId> {
        self.pois.iter().find(|p| p.location.matches(location)).map(|p| p.id)
    }

    /// Nearest POI on the same member
    pub fn find_closest(&self, location: &PoiLocation) -> Option<PoiId> {
        self.pois
            .iter()
            .filter(|p| p.location.member == location.member)
            .min_by(|a, b| {
                let da = (a.location.distance - location.distance).abs();
                let db = (b.location.distance - location.distance).abs();
                da.total_cmp(&db).then(a.id.cmp(&b.id))
            })
            .map(|p| p.id)
    }

    /// POIs having every bit of `mask`, in girder order
    pub fn by_attribute(&self, mask: PoiAttributes) -> Vec<PoiId> {
        self.sorted()
            .into_iter()
            .filter(|id| self.pois[id.0].attributes.contains(mask))
            .collect()
    }

    /// POIs on one member ordered by distance
    pub fn on_member(&self, member: MemberId) -> Vec<PoiId> {
        self.sorted()
            .into_iter()
            .filter(|id| self.pois[id.0].location.member == member)
            .collect()
    }

    /// All POIs in girder order: by station, then segment end, closure, next segment start
    pub fn sorted(&self) -> Vec<PoiId> {
        let mut ids: Vec<PoiId> = self.pois.iter().map(|p| p.id).collect();
        ids.sort_by(|a, b| {
            let (pa, pb) = (&self.pois[a.0], &self.pois[b.0]);
            girder_order(pa)
                .partial_cmp(&girder_order(pb))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });
        ids
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Generate the standard POIs of a girder line
    pub fn for_bridge(bridge: &BridgeModel) -> BridgeResult<PoiRegistry> {
        let mut registry = PoiRegistry::new();
        let slab_offset = bridge.deck.as_ref().map(|d| d.slab_offset()).unwrap_or(0.0);

        for (i, segment) in bridge.segments.iter().enumerate() {
            let mut pois = SegmentPois {
                registry: &mut registry,
                member: MemberId::Segment(i),
                start: bridge.segment_start(i),
                length: segment.length,
            };
            let length = segment.length;

            for tenth in 0..=10u32 {
                pois.add(length * f64::from(tenth) / 10.0, PoiAttributes::span_point(tenth));
            }
            pois.add(0.0, PoiAttributes::START_FACE);
            pois.add(length, PoiAttributes::END_FACE);

            let strands = &segment.strands;
            if let Some(harped) = strands.harped.as_ref().filter(|h| h.count > 0) {
                pois.symmetric(harped.harp_fraction * length, PoiAttributes::HARP_POINT);
            }
            let transfer = provisions::transfer_length(strands.material.diameter);
            pois.symmetric(transfer, PoiAttributes::PS_TRANSFER);
            let development =
                provisions::estimated_development_length(&strands.material, strands.jacking_stress(), segment.section.height);
            pois.symmetric(development, PoiAttributes::PS_DEVELOPMENT);
            if strands.straight.debonded > 0 {
                let debond = strands.straight.debond_length;
                pois.symmetric(debond, PoiAttributes::DEBOND);
                pois.symmetric(debond + transfer, PoiAttributes::PS_TRANSFER);
            }
            for boundary in segment.reinforcement.zone_boundaries(length) {
                pois.add(boundary, PoiAttributes::STIRRUP_ZONE);
            }
            pois.symmetric(segment.handling.lift_overhang, PoiAttributes::PICK_POINT);
            pois.symmetric(segment.handling.bunk_overhang, PoiAttributes::BUNK_POINT);

            // Supports falling on this segment
            let height = segment.section.height + slab_offset;
            let dv = 0.72 * height;
            for pier in &bridge.piers {
                let local = pier.station - pois.start;
                if pois.add(local, PoiAttributes::SUPPORT) {
                    let half = pier.bearing_width / 2.0;
                    for side in [-1.0, 1.0] {
                        let face = local + side * half;
                        pois.add(face, PoiAttributes::FACE_OF_SUPPORT);
                        pois.add(face + side * dv, PoiAttributes::CRITICAL_SECTION_SHEAR);
                        pois.add(local + side * height, PoiAttributes::H);
                        pois.add(local + side * 1.5 * height, PoiAttributes::H15);
                    }
                }
            }
            for support in &bridge.temporary_supports {
                pois.add(support.station - pois.start, PoiAttributes::TEMP_SUPPORT);
            }
            for load in &bridge.user_loads {
                for station in load.stations() {
                    pois.add(station - pois.start, PoiAttributes::CONC_LOAD);
                }
            }
        }

        for c in 0..bridge.closures.len() {
            let station = bridge.closure_station(c);
            let mut attributes = PoiAttributes::CLOSURE;
            if bridge.pier_at(station).is_some() {
                attributes |= PoiAttributes::SUPPORT;
            }
            registry.add_or_get(PoiLocation::new(MemberId::ClosureJoint(c), 0.0), station, attributes);
        }

        registry.mark_mirrors(bridge);
        tracing::debug!(pois = registry.len(), "generated points of interest");
        Ok(registry)
    }

    /// Flag POIs in the second half of a segment whose mirror image exists
    fn mark_mirrors(&mut self, bridge: &BridgeModel) {
        let mirrored: Vec<PoiId> = self
            .pois
            .iter()
            .filter(|p| {
                let length = bridge.member_length(p.location.member);
                p.location.distance > length / 2.0 + LENGTH_TOLERANCE
                    && self
                        .find(&PoiLocation::new(p.location.member, length - p.location.distance))
                        .is_some()
            })
            .map(|p| p.id)
            .collect();
        for id in mirrored {
            self.pois[id.0].attributes |= PoiAttributes::MIRROR;
        }
    }
}

/// Adds POIs to one segment, ignoring locations off the segment
struct SegmentPois<'a> {
    registry: &'a mut PoiRegistry,
    member: MemberId,
    start: f64,
    length: f64,
}

impl SegmentPois<'_> {
    /// Returns false when `distance` is off the segment
    fn add(&mut self, distance: f64, attributes: PoiAttributes) -> bool {
        if distance < -LENGTH_TOLERANCE || distance > self.length + LENGTH_TOLERANCE {
            return false;
        }
        let distance = distance.clamp(0.0, self.length);
        self.registry
            .add_or_get(PoiLocation::new(self.member, distance), self.start + distance, attributes);
        true
    }

    /// Add the location measured from both ends
    fn symmetric(&mut self, from_end: f64, attributes: PoiAttributes) {
        if from_end > 0.0 && from_end < self.length / 2.0 + LENGTH_TOLERANCE {
            self.add(from_end, attributes);
            self.add(self.length - from_end, attributes);
        }
    }
}

/// Sort key placing a closure between the end of one segment and the start of the next
fn girder_order(poi: &Poi) -> (f64, u8) {
    let rank = match poi.location.member {
        MemberId::Segment(_) if poi.location.distance > LENGTH_TOLERANCE => 0,
        MemberId::ClosureJoint(_) => 1,
        MemberId::Segment(_) => 2,
    };
    (poi.station, rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use proptest::prelude::*;

    fn seg(d: f64) -> PoiLocation {
        PoiLocation::new(MemberId::Segment(0), d)
    }

    #[test]
    fn test_duplicate_below_tolerance_merges() {
        let mut registry = PoiRegistry::new();
        let a = registry.add_or_get(seg(10.0), 10.0, PoiAttributes::SUPPORT);
        let b = registry.add_or_get(seg(10.0 + 1.0e-7), 10.0, PoiAttributes::HARP_POINT);
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(a).unwrap().attributes.contains(PoiAttributes::SUPPORT | PoiAttributes::HARP_POINT));
    }

    #[test]
    fn test_duplicate_above_tolerance_distinct() {
        let mut registry = PoiRegistry::new();
        let a = registry.add_or_get(seg(10.0), 10.0, PoiAttributes::SUPPORT);
        let b = registry.add_or_get(seg(10.0 + 1.0e-3), 10.001, PoiAttributes::SUPPORT);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_same_distance_different_member() {
        let mut registry = PoiRegistry::new();
        let a = registry.add_or_get(seg(0.0), 0.0, PoiAttributes::NONE);
        let b = registry.add_or_get(PoiLocation::new(MemberId::Segment(1), 0.0), 30.0, PoiAttributes::NONE);
        assert_ne!(a, b);
    }

    #[test]
    fn test_find_closest() {
        let mut registry = PoiRegistry::new();
        let a = registry.add_or_get(seg(0.0), 0.0, PoiAttributes::NONE);
        let b = registry.add_or_get(seg(5.0), 5.0, PoiAttributes::NONE);
        assert_eq!(registry.find_closest(&seg(1.0)), Some(a));
        assert_eq!(registry.find_closest(&seg(4.0)), Some(b));
        assert_eq!(registry.find_closest(&PoiLocation::new(MemberId::Segment(3), 0.0)), None);
    }

    #[test]
    fn test_attribute_query() {
        let mut registry = PoiRegistry::new();
        registry.add_or_get(seg(3.0), 3.0, PoiAttributes::SPAN_1L);
        let mid = registry.add_or_get(seg(15.0), 15.0, PoiAttributes::SPAN_5L | PoiAttributes::HARP_POINT);
        assert_eq!(registry.by_attribute(PoiAttributes::SPAN_5L), vec![mid]);
        assert_eq!(registry.by_attribute(PoiAttributes::SPAN_5L | PoiAttributes::SUPPORT), Vec::<PoiId>::new());
    }

    #[test]
    fn test_generated_single_span() {
        let project = Project::single_span_example();
        let registry = PoiRegistry::for_bridge(&project.bridge).unwrap();
        assert_eq!(registry.by_attribute(PoiAttributes::SPAN_5L).len(), 1);
        assert_eq!(registry.by_attribute(PoiAttributes::SUPPORT).len(), 2);
        assert_eq!(registry.by_attribute(PoiAttributes::CRITICAL_SECTION_SHEAR).len(), 2);
        assert!(!registry.by_attribute(PoiAttributes::PS_TRANSFER).is_empty());
        let end = registry.by_attribute(PoiAttributes::SPAN_10L)[0];
        assert!(registry.get(end).unwrap().attributes.contains(PoiAttributes::MIRROR | PoiAttributes::END_FACE));

        let stations: Vec<f64> = registry.sorted().iter().map(|id| registry.get(*id).unwrap().station).collect();
        assert!(stations.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_generated_spliced_closure_order() {
        let project = Project::spliced_example();
        let registry = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let closures = registry.by_attribute(PoiAttributes::CLOSURE);
        assert_eq!(closures.len(), project.bridge.closures.len());

        let order = registry.sorted();
        let closure_pos = order.iter().position(|id| *id == closures[0]).unwrap();
        let before = registry.get(order[closure_pos - 1]).unwrap();
        let after = registry.get(order[closure_pos + 1]).unwrap();
        assert_eq!(before.location.member, MemberId::Segment(0));
        assert_eq!(after.location.member, MemberId::Segment(1));
    }

    proptest! {
        #[test]
        fn prop_add_or_get_idempotent(d in 0.0f64..100.0, offset in 0.0f64..0.9e-6) {
            let mut registry = PoiRegistry::new();
            let a = registry.add_or_get(seg(d), d, PoiAttributes::SUPPORT);
            let b = registry.add_or_get(seg(d + offset), d, PoiAttributes::H);
            prop_assert_eq!(a, b);
            prop_assert!(registry.get(a).unwrap().attributes.contains(PoiAttributes::SUPPORT | PoiAttributes::H));
        }

        #[test]
        fn prop_distinct_beyond_tolerance(d in 0.0f64..100.0, offset in 2.0e-6f64..10.0) {
            let mut registry = PoiRegistry::new();
            let a = registry.add_or_get(seg(d), d, PoiAttributes::NONE);
            let b = registry.add_or_get(seg(d + offset), d + offset, PoiAttributes::NONE);
            prop_assert_ne!(a, b);
        }
    }
}
