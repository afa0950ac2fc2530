//! Product load analysis, interval by interval.
//!
//! For each interval the loads first acting in it are applied to the model
//! of that interval:
//!
//! | Load case          | Applied when                                   |
//! |--------------------|------------------------------------------------|
//! | girder self weight | release (casting yard) and again at erection   |
//! | closure joint      | closure cast, as a point load                  |
//! | deck               | deck cast, slab plus haunch                    |
//! | longitudinal joint | joint cast                                     |
//! | barrier, overlay   | their load activity                            |
//! | user loads         | their load activity                            |
//! | secondary PT       | tendon stressed, as imposed curvature          |
//!
//! At erection the casting yard response is removed and the self weight is
//! applied to the erected model. When a temporary support is removed its
//! cumulative reaction from each load case is applied, reversed, to the
//! model without the support.

use std::collections::BTreeMap;

use super::fem::{LoadSet, ModelResponse};
use super::model::{build_interval_model, build_yard_model, ModelKind, StructuralModel};
use super::reactions::SupportLocation;
use super::{stress_factors, AnalysisContext, LoadCase, ModelResults, PointResponse, StressFactors};
use crate::bridge::{MemberId, UserLoadCategory, UserLoadShape};
use crate::errors::BridgeResult;
use crate::losses::TendonForceProfile;
use crate::poi::PoiId;
use crate::sections::SectionPropertyType;
use crate::units::weight_per_length;

/// Load sets of one interval, by load case
type IntervalLoads = BTreeMap<LoadCase, LoadSet>;

/// Product load increments of every interval for one structural model
pub fn analyze_product_loads(ctx: &AnalysisContext<'_>, kind: ModelKind) -> BridgeResult<ModelResults> {
    let sections = ctx.sections;
    let timeline = sections.timeline();
    let bridge = sections.bridge();
    let ptype = ctx.settings.section_properties;
    let count = timeline.interval_count();

    let mut results = ModelResults::default();
    let mut yard: BTreeMap<usize, (StructuralModel, ModelResponse)> = BTreeMap::new();

    for k in 0..count {
        ctx.checkpoint(k)?;
        ctx.progress.report("product loads", k as f64 / count.max(1) as f64);
        let factors = StressCache::new(ctx, k, ptype);

        // Segments released in this interval but erected later sit in the yard
        for segment in 0..bridge.segments.len() {
            let released = timeline.segment_construction_interval(segment) == Some(k);
            let erected_now = timeline.segment_erection_interval(segment) == Some(k);
            if released && !erected_now {
                let model = build_yard_model(sections, segment, k, ptype)?;
                let loads = self_weight(&model, segment, bridge.segments[segment].weight_per_length());
                let response = solve_one(ctx, &model, loads)?;
                record(&mut results, &factors, &model, &response, LoadCase::GirderSelfWeight, 1.0)?;
                yard.insert(segment, (model, response));
            }
        }

        let model = build_interval_model(sections, kind, k, ptype)?;
        if model.is_empty() {
            continue;
        }

        let mut loads = interval_loads(ctx, &model, k)?;
        add_support_removal(ctx, &model, &results, k, &mut loads);

        let cases: Vec<LoadCase> = loads.iter().filter(|(_, l)| !l.is_empty()).map(|(c, _)| *c).collect();
        let sets: Vec<LoadSet> = cases.iter().filter_map(|c| loads.remove(c)).collect();
        if !sets.is_empty() {
            let responses = ctx.solver.solve(model.line(), &sets)?;
            for (case, response) in cases.iter().zip(&responses) {
                record(&mut results, &factors, &model, response, *case, 1.0)?;
            }
        }

        // Erected segments leave the casting yard
        for segment in 0..bridge.segments.len() {
            if timeline.segment_erection_interval(segment) == Some(k) {
                if let Some((yard_model, response)) = yard.remove(&segment) {
                    record(&mut results, &factors, &yard_model, &response, LoadCase::GirderSelfWeight, -1.0)?;
                }
            }
        }

        // Removed temporary supports no longer carry anything
        for i in 0..bridge.temporary_supports.len() {
            if timeline.temporary_support_removal_interval(i) == Some(k) {
                let support = SupportLocation::TemporarySupport(i);
                for case in LoadCase::ALL {
                    let carried = results.cumulative_reaction(support, k, case);
                    if carried != 0.0 {
                        results.add_reaction(k, case, support, -carried);
                    }
                }
            }
        }

        tracing::debug!(interval = k, ?kind, cases = cases.len(), "product loads applied");
    }
    Ok(results)
}

fn solve_one(ctx: &AnalysisContext<'_>, model: &StructuralModel, loads: LoadSet) -> BridgeResult<ModelResponse> {
    let mut responses = ctx.solver.solve(model.line(), &[loads])?;
    Ok(responses.pop().unwrap_or_default())
}

/// Stress factors of the POIs in one interval, computed on first use
struct StressCache<'c, 'a> {
    ctx: &'c AnalysisContext<'a>,
    interval: usize,
    ptype: SectionPropertyType,
    factors: std::cell::RefCell<BTreeMap<PoiId, StressFactors>>,
}

impl<'c, 'a> StressCache<'c, 'a> {
    fn new(ctx: &'c AnalysisContext<'a>, interval: usize, ptype: SectionPropertyType) -> Self {
        StressCache {
            ctx,
            interval,
            ptype,
            factors: std::cell::RefCell::new(BTreeMap::new()),
        }
    }

    fn get(&self, poi: PoiId) -> BridgeResult<StressFactors> {
        if let Some(f) = self.factors.borrow().get(&poi) {
            return Ok(*f);
        }
        let f = stress_factors(self.ctx.sections, poi, self.interval, self.ptype)?;
        self.factors.borrow_mut().insert(poi, f);
        Ok(f)
    }
}

/// Store a model response (scaled by `sign`) as increments of `case`
fn record(
    results: &mut ModelResults,
    factors: &StressCache<'_, '_>,
    model: &StructuralModel,
    response: &ModelResponse,
    case: LoadCase,
    sign: f64,
) -> BridgeResult<()> {
    let interval = factors.interval;
    for (poi, _) in model.poi_map().iter() {
        let Some(forces) = model.forces_at(response, poi) else {
            continue;
        };
        let point = PointResponse {
            shear: forces.shear,
            deflection: forces.deflection,
            rotation: forces.rotation,
            ..factors.get(poi)?.stresses(forces.moment)
        };
        results.add_response(interval, case, poi, point * sign);
    }
    for (support, reaction) in model.reactions(response) {
        results.add_reaction(interval, case, support, reaction * sign);
    }
    Ok(())
}

fn self_weight(model: &StructuralModel, segment: usize, w: f64) -> LoadSet {
    model
        .segment_elements(segment)
        .iter()
        .fold(LoadSet::new(), |loads, &e| loads.with_uniform(e, w))
}

/// Uniform load on every element between two stations
fn uniform_between(model: &StructuralModel, loads: LoadSet, start: f64, end: f64, w: f64) -> LoadSet {
    let line = model.line();
    (0..line.elements().len()).fold(loads, |loads, e| {
        let element = &line.elements()[e];
        let mid = 0.5 * (line.nodes()[element.start].station + line.nodes()[element.end].station);
        if mid >= start && mid <= end {
            loads.with_uniform(e, w)
        } else {
            loads
        }
    })
}

/// Loads first acting in interval `k`
fn interval_loads(ctx: &AnalysisContext<'_>, model: &StructuralModel, k: usize) -> BridgeResult<IntervalLoads> {
    let sections = ctx.sections;
    let timeline = sections.timeline();
    let bridge = sections.bridge();
    let mut loads = IntervalLoads::new();
    let mut add = |case: LoadCase, f: &dyn Fn(LoadSet) -> LoadSet| {
        let set = loads.remove(&case).unwrap_or_default();
        loads.insert(case, f(set));
    };

    for (i, segment) in bridge.segments.iter().enumerate() {
        if timeline.segment_erection_interval(i) == Some(k) {
            let w = segment.weight_per_length();
            add(LoadCase::GirderSelfWeight, &|set| {
                model.segment_elements(i).iter().fold(set, |set, &e| set.with_uniform(e, w))
            });
        }
    }

    for (c, closure) in bridge.closures.iter().enumerate() {
        if timeline.closure_casting_interval(c) != Some(k) {
            continue;
        }
        let Some(&id) = sections.pois().on_member(MemberId::ClosureJoint(c)).first() else {
            continue;
        };
        let area = bridge.segments.get(c).map(|s| s.section.area()).unwrap_or(0.0);
        let weight = weight_per_length(area, closure.concrete.density) * closure.length;
        if let Some(nodes) = model.poi_map().get(id) {
            add(LoadCase::ClosureJoint, &|set| {
                if nodes.left() == nodes.right() {
                    set.with_point(nodes.left(), weight)
                } else {
                    set.with_point(nodes.left(), weight / 2.0).with_point(nodes.right(), weight / 2.0)
                }
            });
        }
    }

    if let Some(deck) = bridge.deck.as_ref().filter(|_| timeline.deck_casting_interval() == Some(k)) {
        // Slab plus haunch, averaged over each element
        let mut per_element = Vec::new();
        for (segment, elements) in (0..bridge.segments.len()).map(|s| (s, model.segment_elements(s))) {
            let flange = bridge.segments[segment].section.top_flange_width;
            for &e in elements {
                let element = &model.line().elements()[e];
                let mut haunch = 0.0;
                for node in [element.start, element.end] {
                    let poi = model
                        .poi_map()
                        .pois_at_node(node)
                        .into_iter()
                        .find_map(|id| sections.poi(id).ok().filter(|p| p.location.member == MemberId::Segment(segment)));
                    haunch += poi.map(|p| sections.haunch_depth(p)).unwrap_or(deck.haunch_depth) / 2.0;
                }
                let area = deck.effective_width * deck.thickness + flange * haunch;
                per_element.push((e, weight_per_length(area, deck.concrete.density)));
            }
        }
        add(LoadCase::Deck, &|set| per_element.iter().fold(set, |set, &(e, w)| set.with_uniform(e, w)));
    }

    if let Some(joint) = bridge
        .longitudinal_joint
        .as_ref()
        .filter(|_| timeline.longitudinal_joint_casting_interval() == Some(k))
    {
        let w = weight_per_length(joint.width * joint.depth, joint.concrete.density);
        add(LoadCase::LongitudinalJoint, &|set| {
            uniform_between(model, set, f64::NEG_INFINITY, f64::INFINITY, w)
        });
    }

    if timeline.railing_system_interval() == Some(k) && bridge.traffic_barrier != 0.0 {
        add(LoadCase::TrafficBarrier, &|set| {
            uniform_between(model, set, f64::NEG_INFINITY, f64::INFINITY, bridge.traffic_barrier)
        });
    }
    if timeline.overlay_interval() == Some(k) && bridge.overlay != 0.0 {
        add(LoadCase::Overlay, &|set| {
            uniform_between(model, set, f64::NEG_INFINITY, f64::INFINITY, bridge.overlay)
        });
    }

    for (i, load) in bridge.user_loads.iter().enumerate() {
        if timeline.user_load_interval(i) != Some(k) {
            continue;
        }
        let case = match load.category {
            UserLoadCategory::Dc => LoadCase::UserDc,
            UserLoadCategory::Dw => LoadCase::UserDw,
            UserLoadCategory::LlIm => LoadCase::UserLlIm,
        };
        match load.shape {
            UserLoadShape::Uniform { start, end, w } => {
                add(case, &|set| uniform_between(model, set, start.min(end), start.max(end), w));
            }
            UserLoadShape::Point { station, p } => match model.node_at(station) {
                Some(node) => add(case, &|set| set.with_point(node, p)),
                None => tracing::warn!(load = %load.name, station, "user load is off the erected girder"),
            },
        }
    }

    for (t, tendon) in bridge.tendons.iter().enumerate() {
        if timeline.tendon_stressing_interval(t) != Some(k) {
            continue;
        }
        let profile = TendonForceProfile::new(tendon);
        let average = ctx.settings.use_average_tendon_force.then(|| profile.average());
        let mut curvatures = Vec::new();
        for e in 0..model.line().elements().len() {
            let element = &model.line().elements()[e];
            let mut pe = 0.0;
            for node in [element.start, element.end] {
                let station = model.line().nodes()[node].station;
                let Some(y) = tendon.y_at(station) else {
                    continue;
                };
                let Some(id) = model.poi_map().pois_at_node(node).into_iter().next() else {
                    continue;
                };
                let section = sections.applied_section(id, k, ctx.settings.section_properties)?;
                let stress = average.unwrap_or_else(|| profile.stress(station));
                pe += tendon.area() * stress * section.eccentricity(y) / 2.0;
            }
            if element.ei > 0.0 && pe != 0.0 {
                // Prestress below the centroid cambers the girder upward
                curvatures.push((e, -pe / element.ei));
            }
        }
        add(LoadCase::SecondaryPt, &|set| {
            curvatures.iter().fold(set, |set, &(e, kappa)| set.with_curvature(e, kappa))
        });
    }

    Ok(loads)
}

/// Apply the reactions of temporary supports removed in interval `k`
fn add_support_removal(
    ctx: &AnalysisContext<'_>,
    model: &StructuralModel,
    results: &ModelResults,
    k: usize,
    loads: &mut IntervalLoads,
) {
    let timeline = ctx.sections.timeline();
    for (i, support) in ctx.sections.bridge().temporary_supports.iter().enumerate() {
        if timeline.temporary_support_removal_interval(i) != Some(k) {
            continue;
        }
        let Some(node) = model.node_at(support.station) else {
            continue;
        };
        let location = SupportLocation::TemporarySupport(i);
        for case in LoadCase::ALL {
            let reaction = results.cumulative_reaction(location, k.saturating_sub(1), case);
            if reaction != 0.0 {
                let set = loads.remove(&case).unwrap_or_default();
                loads.insert(case, set.with_point(node, reaction));
            }
        }
        tracing::debug!(interval = k, support = %location, "temporary support removed");
    }
}
