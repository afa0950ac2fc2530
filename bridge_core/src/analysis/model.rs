//! Structural model of the girder line for one interval.
//!
//! The model holds the segments erected by the interval, resting on the
//! piers and temporary supports standing during it. Closure joints connect
//! adjacent segments only for loads applied after the interval in which the
//! closure is cast; before that the segments act independently.
//!
//! Under [`ModelKind::Simple`] a closure located over a permanent pier is a
//! hinge. Under [`ModelKind::Continuous`] it is rigid unless the pier itself
//! is detailed as a hinge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::fem::{LineModel, ModelResponse};
use super::reactions::SupportLocation;
use crate::bridge::{MemberId, PierConnection};
use crate::errors::{BridgeError, BridgeResult};
use crate::poi::{PoiId, PoiMap, SolverNodes};
use crate::sections::{SectionEngine, SectionPropertyType};

const STAGE: &str = "structural model";

/// POIs closer than this share a solver node (m)
const MIN_NODE_SPACING: f64 = 1.0e-3;

/// Boundary-condition assumption of a structural model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    Simple,
    Continuous,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Simple => write!(f, "Simple span"),
            ModelKind::Continuous => write!(f, "Continuous"),
        }
    }
}

/// Force and displacement at one POI from one [`ModelResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeForces {
    pub moment: f64,
    pub shear: f64,
    pub deflection: f64,
    pub rotation: f64,
}

/// A line model together with its mapping to POIs and supports
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralModel {
    pub kind: ModelKind,
    pub interval: usize,
    line: LineModel,
    poi_map: PoiMap,
    /// Location of each support, parallel to [`LineModel::supports`]
    supports: Vec<SupportLocation>,
    /// Nodes of each segment in the model, in girder order
    segment_nodes: BTreeMap<usize, Vec<usize>>,
    /// Elements of each segment in the model, in girder order
    segment_elements: BTreeMap<usize, Vec<usize>>,
    /// POIs reporting shear just right of their node
    right_side: BTreeMap<PoiId, bool>,
}

impl StructuralModel {
    fn new(kind: ModelKind, interval: usize) -> Self {
        StructuralModel {
            kind,
            interval,
            line: LineModel::new(),
            poi_map: PoiMap::new(),
            supports: Vec::new(),
            segment_nodes: BTreeMap::new(),
            segment_elements: BTreeMap::new(),
            right_side: BTreeMap::new(),
        }
    }

    pub fn line(&self) -> &LineModel {
        &self.line
    }

    pub fn poi_map(&self) -> &PoiMap {
        &self.poi_map
    }

    pub fn is_empty(&self) -> bool {
        self.line.elements().is_empty()
    }

    pub fn support_locations(&self) -> &[SupportLocation] {
        &self.supports
    }

    pub fn contains_segment(&self, segment: usize) -> bool {
        self.segment_nodes.contains_key(&segment)
    }

    pub fn segment_nodes(&self, segment: usize) -> &[usize] {
        self.segment_nodes.get(&segment).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn segment_elements(&self, segment: usize) -> &[usize] {
        self.segment_elements.get(&segment).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node carrying a load applied at `station`, preferring the left of a split location
    pub fn node_at(&self, station: f64) -> Option<usize> {
        self.segment_nodes
            .values()
            .flatten()
            .copied()
            .find(|&n| (self.line.nodes()[n].station - station).abs() <= MIN_NODE_SPACING)
    }

    /// Element of the model containing `station`, with the offset from its start
    pub fn element_at(&self, station: f64) -> Option<(usize, f64)> {
        self.segment_elements.values().flatten().copied().find_map(|e| {
            let element = &self.line.elements()[e];
            let start = self.line.nodes()[element.start].station;
            let end = self.line.nodes()[element.end].station;
            (station >= start - MIN_NODE_SPACING && station <= end + MIN_NODE_SPACING)
                .then(|| (e, (station - start).max(0.0)))
        })
    }

    /// Forces at a POI, or `None` when the POI is not part of this model
    pub fn forces_at(&self, response: &ModelResponse, poi: PoiId) -> Option<NodeForces> {
        let nodes = self.poi_map.get(poi)?;
        let right = self.right_side.get(&poi).copied().unwrap_or(true);
        let node = if right { nodes.right() } else { nodes.left() };
        Some(NodeForces {
            moment: response.node_moment(&self.line, node),
            shear: response.node_shear(&self.line, node, right),
            deflection: response.deflection[node],
            rotation: response.rotation[node],
        })
    }

    /// Reactions summed per support location
    pub fn reactions(&self, response: &ModelResponse) -> BTreeMap<SupportLocation, f64> {
        let mut totals = BTreeMap::new();
        for (location, reaction) in self.supports.iter().zip(&response.reactions) {
            *totals.entry(*location).or_insert(0.0) += reaction;
        }
        totals
    }

    /// Add the nodes and elements of one segment. Stiffness comes from the
    /// section resisting loads applied at the start of `interval`.
    fn add_segment(
        &mut self,
        sections: &SectionEngine<'_>,
        segment: usize,
        ptype: SectionPropertyType,
    ) -> BridgeResult<()> {
        let pois = sections.pois().on_member(MemberId::Segment(segment));
        if pois.is_empty() {
            return Err(BridgeError::validation(
                STAGE,
                format!("segment {} has no points of interest", segment + 1),
            ));
        }
        let length = sections.bridge().member_length(MemberId::Segment(segment));

        // (node, representative POI)
        let mut nodes: Vec<(usize, PoiId)> = Vec::new();
        for id in pois {
            let poi = sections.poi(id)?;
            let node = match nodes.last() {
                Some(&(node, _)) if poi.station - self.line.nodes()[node].station < MIN_NODE_SPACING => node,
                _ => {
                    let node = self.line.add_node(poi.station);
                    nodes.push((node, id));
                    node
                }
            };
            self.poi_map.insert(id, SolverNodes::Single(node));
            let at_end = poi.location.distance >= length - MIN_NODE_SPACING && poi.location.distance > 0.0;
            self.right_side.insert(id, !at_end);
        }
        if nodes.len() < 2 {
            return Err(BridgeError::geometry(
                format!("Segment {}", segment + 1),
                "too short to model",
            ));
        }

        let mut elements = Vec::with_capacity(nodes.len() - 1);
        for pair in nodes.windows(2) {
            let (start, a) = pair[0];
            let (end, b) = pair[1];
            let ei_a = sections.applied_section(a, self.interval, ptype)?.ei();
            let ei_b = sections.applied_section(b, self.interval, ptype)?.ei();
            let ei = (ei_a + ei_b) / 2.0;
            if ei <= 0.0 {
                return Err(BridgeError::validation(
                    STAGE,
                    format!("segment {} has no stiffness in interval {}", segment + 1, self.interval),
                ));
            }
            elements.push(self.line.add_element(start, end, ei));
        }
        self.segment_nodes.insert(segment, nodes.iter().map(|(n, _)| *n).collect());
        self.segment_elements.insert(segment, elements);
        Ok(())
    }

    fn add_support_at(&mut self, station: f64, location: SupportLocation) {
        let matching: Vec<usize> = self
            .segment_nodes
            .values()
            .flatten()
            .copied()
            .filter(|&n| (self.line.nodes()[n].station - station).abs() <= MIN_NODE_SPACING)
            .collect();
        for node in matching {
            self.line.add_support(node);
            self.supports.push(location);
        }
    }
}

/// Build the model of the girder line for loads applied at the start of `interval`
pub fn build_interval_model(
    sections: &SectionEngine<'_>,
    kind: ModelKind,
    interval: usize,
    ptype: SectionPropertyType,
) -> BridgeResult<StructuralModel> {
    let bridge = sections.bridge();
    let timeline = sections.timeline();
    let mut model = StructuralModel::new(kind, interval);

    for segment in 0..bridge.segments.len() {
        let erected = timeline.segment_erection_interval(segment).is_some_and(|e| e <= interval);
        if erected {
            model.add_segment(sections, segment, ptype)?;
        }
    }

    for closure in 0..bridge.closures.len() {
        let Some(&id) = sections.pois().on_member(MemberId::ClosureJoint(closure)).first() else {
            continue;
        };
        let left = model.segment_nodes(closure).last().copied();
        let right = model.segment_nodes(closure + 1).first().copied();
        let nodes = match (left, right) {
            (Some(left), Some(right)) => SolverNodes::Pair { left, right },
            (Some(node), None) | (None, Some(node)) => SolverNodes::Single(node),
            (None, None) => continue,
        };
        model.poi_map.insert(id, nodes);
        model.right_side.insert(id, false);

        let connected = timeline.closure_casting_interval(closure).is_some_and(|c| c < interval);
        if let (true, SolverNodes::Pair { left, right }) = (connected, nodes) {
            let hinge = bridge
                .pier_at(bridge.closure_station(closure))
                .and_then(|p| bridge.piers.get(p))
                .map(|p| kind == ModelKind::Simple || p.connection == PierConnection::Hinge)
                .unwrap_or(false);
            model.line.connect(left, right, !hinge);
        }
    }

    for (i, pier) in bridge.piers.iter().enumerate() {
        if timeline.pier_erection_interval(i).is_some_and(|e| e <= interval) {
            model.add_support_at(pier.station, SupportLocation::Pier(i));
        }
    }
    for (i, support) in bridge.temporary_supports.iter().enumerate() {
        let erected = timeline.temporary_support_erection_interval(i).is_some_and(|e| e <= interval);
        let removed = timeline.temporary_support_removal_interval(i).is_some_and(|r| r <= interval);
        if erected && !removed {
            model.add_support_at(support.station, SupportLocation::TemporarySupport(i));
        }
    }

    tracing::trace!(
        interval,
        ?kind,
        nodes = model.line.nodes().len(),
        supports = model.supports.len(),
        "built structural model"
    );
    Ok(model)
}

/// A segment in the casting yard, simply supported at its ends
pub fn build_yard_model(
    sections: &SectionEngine<'_>,
    segment: usize,
    interval: usize,
    ptype: SectionPropertyType,
) -> BridgeResult<StructuralModel> {
    let mut model = StructuralModel::new(ModelKind::Simple, interval);
    model.add_segment(sections, segment, ptype)?;
    let nodes = model.segment_nodes(segment).to_vec();
    if let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) {
        for node in [first, last] {
            model.line.add_support(node);
            model.supports.push(SupportLocation::CastingYard { segment });
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fem::{DirectStiffnessSolver, LineGirderSolver, LoadSet};
    use crate::overrides::DesignOverrides;
    use crate::poi::{PoiAttributes, PoiRegistry};
    use crate::project::Project;
    use approx::assert_relative_eq;

    fn with_engine<R>(project: &Project, f: impl FnOnce(&SectionEngine<'_>) -> R) -> R {
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let engine = SectionEngine::new(
            &project.bridge,
            &project.timeline,
            &pois,
            &project.settings,
            &DesignOverrides::default(),
        );
        f(&engine)
    }

    #[test]
    fn test_single_span_model() {
        let project = Project::single_span_example();
        with_engine(&project, |sections| {
            let model = build_interval_model(sections, ModelKind::Continuous, 0, SectionPropertyType::Gross).unwrap();
            assert_eq!(model.support_locations(), &[SupportLocation::Pier(0), SupportLocation::Pier(1)]);
            assert!(model.contains_segment(0));
            for poi in sections.pois().iter() {
                assert!(model.poi_map().get(poi.id).is_some());
            }

            // Uniform load gives wL²/8 at midspan
            let w = 10.0e3;
            let mut loads = LoadSet::new();
            for &e in model.segment_elements(0) {
                loads = loads.with_uniform(e, w);
            }
            let response = DirectStiffnessSolver.solve(model.line(), &[loads]).unwrap();
            let mid = sections.pois().by_attribute(PoiAttributes::SPAN_5L)[0];
            let forces = model.forces_at(&response[0], mid).unwrap();
            assert_relative_eq!(forces.moment, w * 30.0 * 30.0 / 8.0, max_relative = 1e-9);
            let reactions = model.reactions(&response[0]);
            assert_relative_eq!(reactions[&SupportLocation::Pier(0)], w * 15.0, max_relative = 1e-9);
        });
    }

    #[test]
    fn test_spliced_model_before_erection_is_empty() {
        let project = Project::spliced_example();
        with_engine(&project, |sections| {
            let model = build_interval_model(sections, ModelKind::Continuous, 0, SectionPropertyType::Gross).unwrap();
            assert!(model.is_empty());
            let yard = build_yard_model(sections, 1, 0, SectionPropertyType::Gross).unwrap();
            assert_eq!(yard.support_locations().len(), 2);
        });
    }

    #[test]
    fn test_closure_splits_until_cast() {
        let project = Project::spliced_example();
        with_engine(&project, |sections| {
            let closure = sections.pois().by_attribute(PoiAttributes::CLOSURE)[0];
            // Erected on towers, closures not yet connected
            let erected = build_interval_model(sections, ModelKind::Continuous, 1, SectionPropertyType::Gross).unwrap();
            assert!(matches!(erected.poi_map().get(closure), Some(SolverNodes::Pair { .. })));
            assert!(erected
                .support_locations()
                .contains(&SupportLocation::TemporarySupport(0)));

            // Towers removed in interval 4
            let spliced = build_interval_model(sections, ModelKind::Continuous, 4, SectionPropertyType::Gross).unwrap();
            assert!(!spliced
                .support_locations()
                .iter()
                .any(|s| matches!(s, SupportLocation::TemporarySupport(_))));

            // A load on the drop-in segment reaches the piers only through the closures
            let mut loads = LoadSet::new();
            for &e in spliced.segment_elements(1) {
                loads = loads.with_uniform(e, 10.0e3);
            }
            let response = DirectStiffnessSolver.solve(spliced.line(), &[loads]).unwrap();
            let total: f64 = spliced.reactions(&response[0]).values().sum();
            assert_relative_eq!(total, 10.0e3 * 12.0, max_relative = 1e-9);
        });
    }

    #[test]
    fn test_closure_at_pier_is_hinge_in_simple_model() {
        let mut project = Project::spliced_example();
        // Move the middle pier under the first closure
        project.bridge.piers[1].station = 34.0;
        project.bridge.temporary_supports.remove(0);
        project.timeline = crate::timeline::TimelineManager::new();
        // Reuse a simple timeline: everything erected at once, closures cast, then loads
        use crate::timeline::{Activity, CuringDuration, Event};
        for event in [
            Event::new("Construct", 0.0).with_activity(Activity::ConstructSegments {
                segments: vec![0, 1, 2],
                curing: CuringDuration::new(1.0, 0.0),
            }),
            Event::new("Erect", 10.0)
                .with_activity(Activity::ErectPiers {
                    piers: vec![0, 1, 2],
                    temporary_supports: vec![0],
                })
                .with_activity(Activity::ErectSegments { segments: vec![0, 1, 2] }),
            Event::new("Close", 20.0).with_activity(Activity::CastClosureJoints {
                closures: vec![0, 1],
                curing: CuringDuration::new(1.0, 0.0),
            }),
            Event::new("Later", 30.0),
            Event::new("Final", 40.0),
        ] {
            project.timeline.add_event(event).unwrap();
        }

        with_engine(&project, |sections| {
            let closure = sections.pois().by_attribute(PoiAttributes::CLOSURE)[0];
            let solve = |kind| {
                let model = build_interval_model(sections, kind, 3, SectionPropertyType::Gross).unwrap();
                let mut loads = LoadSet::new();
                for segment in 0..3 {
                    for &e in model.segment_elements(segment) {
                        loads = loads.with_uniform(e, 10.0e3);
                    }
                }
                let response = DirectStiffnessSolver.solve(model.line(), &[loads]).unwrap();
                model.forces_at(&response[0], closure).unwrap().moment
            };
            assert!(solve(ModelKind::Simple).abs() < 1.0);
            assert!(solve(ModelKind::Continuous) < -1.0e3);
        });
    }
}
