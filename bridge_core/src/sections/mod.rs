//! # Section Properties and Material State
//!
//! Time-dependent section properties at every POI and interval. Which
//! components exist in an interval comes from the timeline: a component
//! contributes from the interval in which it is cast onward, with a modulus
//! that matures with the age of its concrete. A component that has not been
//! cast contributes nothing.
//!
//! Composite sections are expressed in the girder concrete of the interval:
//! the deck, longitudinal joint and strands are transformed by their modular
//! ratios with respect to the girder.
//!
//! ## Property Types
//!
//! | Type        | Concrete | Bonded steel      | Ducts               |
//! |-------------|----------|-------------------|---------------------|
//! | Gross       | yes      | ignored           | ignored             |
//! | Transformed | yes      | (n - 1) A         | grouted tendons     |
//! | Net         | yes      | area removed      | holes removed       |
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::project::Project;
//! use bridge_core::poi::{PoiAttributes, PoiRegistry};
//! use bridge_core::sections::{SectionComponent, SectionEngine, SectionPropertyType};
//! use bridge_core::overrides::DesignOverrides;
//!
//! let project = Project::single_span_example();
//! let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
//! let engine = SectionEngine::new(&project.bridge, &project.timeline, &pois, &project.settings, &DesignOverrides::default());
//! let mid = pois.by_attribute(PoiAttributes::SPAN_5L)[0];
//!
//! // No deck before it is cast
//! let deck = engine.component_properties(mid, 0, SectionComponent::Deck, SectionPropertyType::Gross).unwrap();
//! assert!(deck.is_zero());
//! ```

pub mod properties;

pub use properties::{PropertyAccumulator, SectionPart, SectionProperties};

use serde::{Deserialize, Serialize};

use crate::bridge::{BridgeModel, MemberId, Segment};
use crate::errors::{BridgeError, BridgeResult};
use crate::materials::{ConcreteMaterial, MaturingConcrete, TimeDependentModel};
use crate::overrides::DesignOverrides;
use crate::poi::{Poi, PoiId, PoiRegistry};
use crate::provisions::{longitudinal_stiffness, DistributionInputs};
use crate::settings::{AnalysisSettings, HaunchMode, SlabOffsetRounding};
use crate::timeline::{CastComponent, TimelineManager};

const STAGE: &str = "section properties";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum SectionPropertyType {
    #[default]
    Gross,
    Transformed,
    Net,
}

/// Structural component of the cross-section at a POI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionComponent {
    Girder,
    ClosureJoint,
    Deck,
    LongitudinalJoint,
}

/// Concrete state at a POI and time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcreteProperties {
    /// Modulus of elasticity (Pa)
    pub ec: f64,
    /// Compressive strength (Pa)
    pub fc: f64,
    /// Age since placement (days)
    pub age: f64,
}

/// Computes section properties and concrete state for one model snapshot.
pub struct SectionEngine<'a> {
    bridge: &'a BridgeModel,
    timeline: &'a TimelineManager,
    pois: &'a PoiRegistry,
    model: TimeDependentModel,
    humidity: f64,
    haunch: HaunchMode,
    rounding: SlabOffsetRounding,
    force_gross: bool,
}

impl<'a> SectionEngine<'a> {
    pub fn new(
        bridge: &'a BridgeModel,
        timeline: &'a TimelineManager,
        pois: &'a PoiRegistry,
        settings: &AnalysisSettings,
        overrides: &DesignOverrides,
    ) -> Self {
        SectionEngine {
            bridge,
            timeline,
            pois,
            model: settings.time_dependent_model,
            humidity: settings.relative_humidity,
            haunch: if overrides.parabolic_haunch {
                HaunchMode::Parabolic
            } else {
                settings.haunch
            },
            rounding: settings.slab_offset_rounding,
            force_gross: overrides.force_gross_section,
        }
    }

    pub fn bridge(&self) -> &'a BridgeModel {
        self.bridge
    }

    pub fn timeline(&self) -> &'a TimelineManager {
        self.timeline
    }

    pub fn pois(&self) -> &'a PoiRegistry {
        self.pois
    }

    /// Section component forming the girder at a POI
    pub fn girder_section_component(&self, poi: &Poi) -> SectionComponent {
        match poi.location.member {
            MemberId::Segment(_) => SectionComponent::Girder,
            MemberId::ClosureJoint(_) => SectionComponent::ClosureJoint,
        }
    }

    pub fn poi(&self, id: PoiId) -> BridgeResult<&'a Poi> {
        self.pois
            .get(id)
            .ok_or_else(|| BridgeError::validation(STAGE, format!("unknown POI {}", id.0)))
    }

    /// Property type actually used, after design overrides
    pub fn effective_type(&self, requested: SectionPropertyType) -> SectionPropertyType {
        if self.force_gross && requested == SectionPropertyType::Transformed {
            SectionPropertyType::Gross
        } else {
            requested
        }
    }

    // =========================================================================
    // Materials
    // =========================================================================

    /// The concrete forming the girder at a POI
    pub fn girder_component(&self, poi: &Poi) -> CastComponent {
        match poi.location.member {
            MemberId::Segment(i) => CastComponent::Segment(i),
            MemberId::ClosureJoint(c) => CastComponent::ClosureJoint(c),
        }
    }

    fn host_segment(&self, poi: &Poi) -> BridgeResult<&'a Segment> {
        let index = self.bridge.host_segment(poi.location.member);
        self.bridge
            .segments
            .get(index)
            .ok_or_else(|| BridgeError::validation(STAGE, format!("POI {} is on a missing segment", poi.id.0)))
    }

    fn material(&self, component: CastComponent) -> BridgeResult<&'a ConcreteMaterial> {
        let missing = || BridgeError::validation(STAGE, format!("{:?} does not exist", component));
        match component {
            CastComponent::Segment(i) => self.bridge.segments.get(i).map(|s| &s.concrete).ok_or_else(missing),
            CastComponent::ClosureJoint(c) => self.bridge.closures.get(c).map(|c| &c.concrete).ok_or_else(missing),
            CastComponent::Deck => self.bridge.deck.as_ref().map(|d| &d.concrete).ok_or_else(missing),
            CastComponent::LongitudinalJoint => self
                .bridge
                .longitudinal_joint
                .as_ref()
                .map(|j| &j.concrete)
                .ok_or_else(missing),
        }
    }

    /// Volume-to-surface ratio of a component (m)
    pub fn volume_to_surface(&self, component: CastComponent) -> f64 {
        match component {
            CastComponent::Segment(i) | CastComponent::ClosureJoint(i) => self
                .bridge
                .segments
                .get(i)
                .map(|s| s.section.volume_to_surface())
                .unwrap_or(0.1),
            // Slab dries from the top and bottom faces
            CastComponent::Deck => self.bridge.deck.as_ref().map(|d| d.thickness / 2.0).unwrap_or(0.1),
            CastComponent::LongitudinalJoint => self
                .bridge
                .longitudinal_joint
                .as_ref()
                .map(|j| j.width * j.depth / (2.0 * j.depth))
                .unwrap_or(0.1),
        }
    }

    /// Time-dependent model of a component's concrete
    pub fn maturing(&self, component: CastComponent) -> BridgeResult<MaturingConcrete<'a>> {
        Ok(MaturingConcrete::new(
            self.material(component)?,
            self.model,
            self.humidity,
            self.volume_to_surface(component),
        ))
    }

    /// Concrete state of a component on `day`, `None` when it has not been placed
    pub fn concrete_at(&self, component: CastComponent, day: f64) -> BridgeResult<Option<ConcreteProperties>> {
        let Some((_, placed)) = self.timeline.casting(component) else {
            return Ok(None);
        };
        let age = day - placed;
        if age < 0.0 {
            return Ok(None);
        }
        let concrete = self.maturing(component)?;
        Ok(Some(ConcreteProperties {
            ec: concrete.modulus(age)?,
            fc: concrete.strength(age)?,
            age,
        }))
    }

    /// Concrete state of a component at the start of `interval`, `None` when not yet cast
    pub fn component_concrete(&self, component: CastComponent, interval: usize) -> BridgeResult<Option<ConcreteProperties>> {
        match self.timeline.casting(component) {
            Some((cast, _)) if cast <= interval => {}
            _ => return Ok(None),
        }
        let start = self
            .timeline
            .interval(interval)
            .ok_or_else(|| BridgeError::validation(STAGE, format!("interval {} does not exist", interval)))?
            .start;
        self.concrete_at(component, start)
    }

    /// Girder concrete at a POI at the start of `interval`
    pub fn concrete_properties(&self, id: PoiId, interval: usize) -> BridgeResult<ConcreteProperties> {
        let poi = self.poi(id)?;
        let component = self.girder_component(poi);
        self.component_concrete(component, interval)?.ok_or_else(|| {
            BridgeError::validation(
                STAGE,
                format!("{} does not exist in interval {}", poi.location.member, interval),
            )
        })
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Haunch depth at a POI after slab-offset rounding (m)
    pub fn haunch_depth(&self, poi: &Poi) -> f64 {
        let Some(deck) = &self.bridge.deck else {
            return 0.0;
        };
        let end_haunch = (self.rounding.apply(deck.slab_offset()) - deck.thickness).max(0.0);
        match self.haunch {
            HaunchMode::Uniform => end_haunch,
            HaunchMode::Parabolic => {
                let length = self.bridge.member_length(poi.location.member);
                let xi = if length > 0.0 { poi.location.distance / length } else { 0.0 };
                (end_haunch - deck.camber_allowance * 4.0 * xi * (1.0 - xi)).max(0.0)
            }
        }
    }

    /// Height of the top of the deck above the bottom of the girder (m)
    pub fn deck_top(&self, poi: &Poi) -> BridgeResult<Option<f64>> {
        let segment = self.host_segment(poi)?;
        Ok(self
            .bridge
            .deck
            .as_ref()
            .map(|d| segment.section.height + self.haunch_depth(poi) + d.thickness))
    }

    fn deck_parts(&self, poi: &Poi, segment: &Segment) -> Vec<SectionPart> {
        let Some(deck) = &self.bridge.deck else {
            return Vec::new();
        };
        let height = segment.section.height;
        let haunch = self.haunch_depth(poi);
        vec![
            SectionPart::rectangle(segment.section.top_flange_width, haunch, height),
            SectionPart::rectangle(deck.effective_width, deck.thickness, height + haunch),
        ]
    }

    fn joint_part(&self, segment: &Segment) -> Option<SectionPart> {
        self.bridge.longitudinal_joint.as_ref().map(|j| {
            SectionPart::rectangle(j.width, j.depth, segment.section.height - j.depth)
        })
    }

    /// Bonded pretensioned strand area and centroid height at a POI
    pub fn strands_at(&self, poi: &Poi) -> Option<(f64, f64)> {
        match poi.location.member {
            MemberId::Segment(i) => self.bridge.segments.get(i).map(|s| {
                let d = poi.location.distance;
                (s.strands.area_at(d, s.length), s.strands.centroid_at(d, s.length))
            }),
            MemberId::ClosureJoint(_) => None,
        }
    }

    /// Tendons passing through a POI with their heights
    pub fn tendons_at(&self, poi: &Poi) -> Vec<(usize, f64)> {
        self.bridge
            .tendons
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.y_at(poi.station).map(|y| (i, y)))
            .collect()
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Properties of one component in its own concrete. Zero when not cast.
    pub fn component_properties(
        &self,
        id: PoiId,
        interval: usize,
        component: SectionComponent,
        ptype: SectionPropertyType,
    ) -> BridgeResult<SectionProperties> {
        let poi = self.poi(id)?;
        let segment = self.host_segment(poi)?;
        let height = segment.section.height;
        let cast = match (component, poi.location.member) {
            (SectionComponent::Girder, MemberId::Segment(i)) => Some(CastComponent::Segment(i)),
            (SectionComponent::ClosureJoint, MemberId::ClosureJoint(c)) => Some(CastComponent::ClosureJoint(c)),
            (SectionComponent::Girder, MemberId::ClosureJoint(_))
            | (SectionComponent::ClosureJoint, MemberId::Segment(_)) => None,
            (SectionComponent::Deck, _) => self.bridge.deck.as_ref().map(|_| CastComponent::Deck),
            (SectionComponent::LongitudinalJoint, _) => {
                self.bridge.longitudinal_joint.as_ref().map(|_| CastComponent::LongitudinalJoint)
            }
        };
        let Some(cast) = cast else {
            return Ok(SectionProperties::ZERO);
        };
        let Some(concrete) = self.component_concrete(cast, interval)? else {
            return Ok(SectionProperties::ZERO);
        };

        let mut acc = PropertyAccumulator::new();
        let deck_top = match component {
            SectionComponent::Girder | SectionComponent::ClosureJoint => {
                for part in segment.section.parts() {
                    acc.add(part, 1.0);
                }
                if component == SectionComponent::Girder {
                    self.add_steel(&mut acc, poi, interval, concrete.ec, self.effective_type(ptype));
                }
                None
            }
            SectionComponent::Deck => {
                for part in self.deck_parts(poi, segment) {
                    acc.add(part, 1.0);
                }
                self.deck_top(poi)?
            }
            SectionComponent::LongitudinalJoint => {
                if let Some(part) = self.joint_part(segment) {
                    acc.add(part, 1.0);
                }
                None
            }
        };
        Ok(acc.finish(concrete.ec, height, deck_top))
    }

    /// Composite section at a POI for `interval`, in the girder concrete
    pub fn section_properties(&self, id: PoiId, interval: usize, ptype: SectionPropertyType) -> BridgeResult<SectionProperties> {
        self.composite(id, interval, ptype, |cast| cast <= interval)
    }

    /// Section resisting loads applied at the start of `interval`. Components
    /// cast at that event are still wet and carry nothing.
    pub fn loading_section(&self, id: PoiId, interval: usize, ptype: SectionPropertyType) -> BridgeResult<SectionProperties> {
        self.composite(id, interval, ptype, |cast| cast < interval)
    }

    /// Section resisting a load applied at the start of `interval`. In the
    /// interval the girder itself is cast, that is the fresh girder alone.
    pub fn applied_section(&self, id: PoiId, interval: usize, ptype: SectionPropertyType) -> BridgeResult<SectionProperties> {
        let poi = self.poi(id)?;
        let first = self.timeline.casting(self.girder_component(poi)).map(|(i, _)| i);
        if first == Some(interval) {
            self.section_properties(id, interval, ptype)
        } else {
            self.loading_section(id, interval, ptype)
        }
    }

    fn composite(
        &self,
        id: PoiId,
        interval: usize,
        ptype: SectionPropertyType,
        present: impl Fn(usize) -> bool,
    ) -> BridgeResult<SectionProperties> {
        let poi = self.poi(id)?;
        let segment = self.host_segment(poi)?;
        let girder = self.girder_component(poi);
        let is_present = |component: CastComponent| {
            self.timeline
                .casting(component)
                .map(|(cast, _)| present(cast))
                .unwrap_or(false)
        };

        if !is_present(girder) {
            return match girder {
                CastComponent::Segment(_) => Err(BridgeError::validation(
                    STAGE,
                    format!("{} does not exist in interval {}", poi.location.member, interval),
                )),
                // An uncast closure is a gap in the girder
                _ => Ok(SectionProperties::ZERO),
            };
        }
        let Some(girder_concrete) = self.component_concrete(girder, interval)? else {
            return Err(BridgeError::validation(
                STAGE,
                format!("{} does not exist in interval {}", poi.location.member, interval),
            ));
        };
        let eg = girder_concrete.ec;

        let mut acc = PropertyAccumulator::new();
        for part in segment.section.parts() {
            acc.add(part, 1.0);
        }
        self.add_steel(&mut acc, poi, interval, eg, self.effective_type(ptype));

        let mut deck_top = None;
        if is_present(CastComponent::Deck) {
            if let Some(deck) = self.component_concrete(CastComponent::Deck, interval)? {
                let n = deck.ec / eg;
                for part in self.deck_parts(poi, segment) {
                    acc.add(part, n);
                }
                deck_top = self.deck_top(poi)?;
            }
        }
        if is_present(CastComponent::LongitudinalJoint) {
            if let (Some(joint), Some(part)) = (
                self.component_concrete(CastComponent::LongitudinalJoint, interval)?,
                self.joint_part(segment),
            ) {
                acc.add(part, joint.ec / eg);
            }
        }
        Ok(acc.finish(eg, segment.section.height, deck_top))
    }

    /// Add or remove steel and duct areas according to the property type
    fn add_steel(&self, acc: &mut PropertyAccumulator, poi: &Poi, interval: usize, eg: f64, ptype: SectionPropertyType) {
        if ptype == SectionPropertyType::Gross {
            return;
        }
        if let Some((aps, y)) = self.strands_at(poi) {
            let released = match poi.location.member {
                MemberId::Segment(i) => self
                    .timeline
                    .segment_construction_interval(i)
                    .map(|r| r <= interval)
                    .unwrap_or(false),
                MemberId::ClosureJoint(_) => false,
            };
            if released && aps > 0.0 {
                let ep = self.bridge.segments[self.bridge.host_segment(poi.location.member)]
                    .strands
                    .material
                    .ep;
                let n = match ptype {
                    SectionPropertyType::Transformed => ep / eg - 1.0,
                    _ => -1.0,
                };
                acc.add(SectionPart::point(aps, y), n);
            }
        }
        for (index, y) in self.tendons_at(poi) {
            let tendon = &self.bridge.tendons[index];
            let grouted = self
                .timeline
                .tendon_stressing_interval(index)
                .map(|s| s < interval)
                .unwrap_or(false);
            match ptype {
                SectionPropertyType::Transformed if grouted => {
                    acc.add(SectionPart::point(tendon.duct.outer_area(), y), -1.0);
                    acc.add(SectionPart::point(tendon.area(), y), tendon.strand.ep / eg);
                }
                SectionPropertyType::Gross => {}
                _ => {
                    acc.add(SectionPart::point(tendon.duct.outer_area(), y), -1.0);
                }
            }
        }
    }

    /// Inputs for the approximate live load distribution factors at a POI
    pub fn distribution_inputs(&self, id: PoiId) -> BridgeResult<DistributionInputs> {
        let poi = self.poi(id)?;
        let segment = self.host_segment(poi)?;
        let deck = self.bridge.deck.as_ref().ok_or_else(|| {
            BridgeError::refined_analysis("distribution factors", "approximate factors require a composite deck")
        })?;
        let (start, end) = self
            .bridge
            .span_containing(poi.station)
            .ok_or_else(|| BridgeError::geometry(poi.location.member.to_string(), "POI is not within a span"))?;
        let girder = MaturingConcrete::new(&segment.concrete, self.model, self.humidity, 0.1);
        let slab = MaturingConcrete::new(&deck.concrete, self.model, self.humidity, 0.1);
        let n = girder.modulus(28.0)? / slab.modulus(28.0)?;
        let gross = segment.section.gross_properties(1.0);
        let eg = segment.section.height + self.haunch_depth(poi) + deck.thickness / 2.0 - gross.y_bottom;
        Ok(DistributionInputs {
            spacing: self.bridge.girder_spacing,
            slab_thickness: deck.thickness,
            span: end - start,
            girder_count: self.bridge.girder_count,
            kg: longitudinal_stiffness(n, gross.ix, gross.area, eg),
        })
    }
}
