//! Timeline consistency rules.
//!
//! Validation never stops at the first problem: every rule is evaluated and
//! the complete list is returned so the caller can show all of them at once.

use serde::{Deserialize, Serialize};

use super::{Activity, CastComponent, EventId, TimelineManager};
use crate::bridge::BridgeModel;

/// What is wrong with the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimelineIssueKind {
    CastDeckActivityRequired,
    CastLongitudinalJointActivityRequired,
    ComponentCastMultipleTimes { component: CastComponent },
    RailingSystemActivityRequired,
    RailingSystemBeforeDeck,
    OverlayActivityRequired,
    MultipleOverlayEvents,
    MultipleLiveLoadEvents,
    LoadRatingBeforeLiveLoad,
    ErectPiersActivityRequired { pier: usize },
    TemporarySupportErectionRequired { support: usize },
    TemporarySupportRemovalRequired { support: usize },
    TemporarySupportRemovedBeforeErection { support: usize },
    TemporarySupportStillSupporting { support: usize, segment: usize },
    StressTendonActivityRequired { tendon: usize },
    TendonStressedBeforeErection { tendon: usize },
    TendonStressedBeforeClosure { tendon: usize },
    ConstructSegmentsActivityRequired { segment: usize },
    ErectSegmentsActivityRequired { segment: usize },
    SegmentErectedBeforeConstruction { segment: usize },
    SegmentErectedBeforeSupports { segment: usize },
    CastClosureJointActivityRequired { closure: usize },
    ClosureCastBeforeSegmentsErected { closure: usize },
    UserLoadActivityRequired { load: usize },
    UnknownComponent { activity: String, index: usize },
    OverlapsPreviousEvent { min_elapsed: f64 },
    FinalEventHasActivities,
    InvalidCuringDuration,
}

/// One timeline problem, with the event it was found on when there is one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineIssue {
    pub kind: TimelineIssueKind,
    pub event: Option<EventId>,
}

impl TimelineIssue {
    pub fn new(kind: TimelineIssueKind, event: Option<EventId>) -> Self {
        TimelineIssue { kind, event }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        use TimelineIssueKind::*;
        match self.kind {
            CastDeckActivityRequired => "TLM_CAST_DECK_ACTIVITY_REQUIRED",
            CastLongitudinalJointActivityRequired => "TLM_CAST_LONGITUDINAL_JOINT_ACTIVITY_REQUIRED",
            ComponentCastMultipleTimes { .. } => "TLM_COMPONENT_CAST_MULTIPLE_TIMES",
            RailingSystemActivityRequired => "TLM_RAILING_SYSTEM_ACTIVITY_REQUIRED",
            RailingSystemBeforeDeck => "TLM_RAILING_SYSTEM_BEFORE_DECK",
            OverlayActivityRequired => "TLM_OVERLAY_ACTIVITY_REQUIRED",
            MultipleOverlayEvents => "TLM_MULTIPLE_OVERLAY_EVENTS",
            MultipleLiveLoadEvents => "TLM_MULTIPLE_LIVE_LOAD_EVENTS",
            LoadRatingBeforeLiveLoad => "TLM_LOAD_RATING_BEFORE_LIVE_LOAD",
            ErectPiersActivityRequired { .. } => "TLM_ERECT_PIERS_ACTIVITY_REQUIRED",
            TemporarySupportErectionRequired { .. } => "TLM_TEMPORARY_SUPPORT_ERECTION_REQUIRED",
            TemporarySupportRemovalRequired { .. } => "TLM_TEMPORARY_SUPPORT_REMOVAL_REQUIRED",
            TemporarySupportRemovedBeforeErection { .. } => "TLM_TEMPORARY_SUPPORT_REMOVED_BEFORE_ERECTION",
            TemporarySupportStillSupporting { .. } => "TLM_TEMPORARY_SUPPORT_STILL_SUPPORTING",
            StressTendonActivityRequired { .. } => "TLM_STRESS_TENDON_ACTIVITY_REQUIRED",
            TendonStressedBeforeErection { .. } => "TLM_TENDON_STRESSED_BEFORE_ERECTION",
            TendonStressedBeforeClosure { .. } => "TLM_TENDON_STRESSED_BEFORE_CLOSURE",
            ConstructSegmentsActivityRequired { .. } => "TLM_CONSTRUCT_SEGMENTS_ACTIVITY_REQUIRED",
            ErectSegmentsActivityRequired { .. } => "TLM_ERECT_SEGMENTS_ACTIVITY_REQUIRED",
            SegmentErectedBeforeConstruction { .. } => "TLM_SEGMENT_ERECTED_BEFORE_CONSTRUCTION",
            SegmentErectedBeforeSupports { .. } => "TLM_SEGMENT_ERECTED_BEFORE_SUPPORTS",
            CastClosureJointActivityRequired { .. } => "TLM_CAST_CLOSURE_JOINT_ACTIVITY_REQUIRED",
            ClosureCastBeforeSegmentsErected { .. } => "TLM_CLOSURE_CAST_BEFORE_SEGMENTS_ERECTED",
            UserLoadActivityRequired { .. } => "TLM_USER_LOAD_ACTIVITY_REQUIRED",
            UnknownComponent { .. } => "TLM_UNKNOWN_COMPONENT",
            OverlapsPreviousEvent { .. } => "TLM_OVERLAPS_PREVIOUS_EVENT",
            FinalEventHasActivities => "TLM_FINAL_EVENT_HAS_ACTIVITIES",
            InvalidCuringDuration => "TLM_INVALID_CURING_DURATION",
        }
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        use TimelineIssueKind::*;
        match &self.kind {
            CastDeckActivityRequired => "The deck is never cast".to_string(),
            CastLongitudinalJointActivityRequired => "The longitudinal joint is never cast".to_string(),
            ComponentCastMultipleTimes { component } => format!("{:?} is cast more than once", component),
            RailingSystemActivityRequired => "The railing system is never installed".to_string(),
            RailingSystemBeforeDeck => "The railing system is installed before the deck is cast".to_string(),
            OverlayActivityRequired => "The overlay is never installed".to_string(),
            MultipleOverlayEvents => "The overlay is installed at more than one event".to_string(),
            MultipleLiveLoadEvents => "Live load is opened to traffic at more than one event".to_string(),
            LoadRatingBeforeLiveLoad => "Load rating occurs before the bridge is open to traffic".to_string(),
            ErectPiersActivityRequired { pier } => format!("Pier {} is never erected", pier + 1),
            TemporarySupportErectionRequired { support } => {
                format!("Temporary support {} is never erected", support + 1)
            }
            TemporarySupportRemovalRequired { support } => {
                format!("Temporary support {} is never removed", support + 1)
            }
            TemporarySupportRemovedBeforeErection { support } => {
                format!("Temporary support {} is removed before it is erected", support + 1)
            }
            TemporarySupportStillSupporting { support, segment } => format!(
                "Temporary support {} is removed while segment {} still depends on it",
                support + 1,
                segment + 1
            ),
            StressTendonActivityRequired { tendon } => format!("Tendon {} is never stressed", tendon + 1),
            TendonStressedBeforeErection { tendon } => {
                format!("Tendon {} is stressed before all segments are erected", tendon + 1)
            }
            TendonStressedBeforeClosure { tendon } => {
                format!("Tendon {} is stressed before all closure joints are cast", tendon + 1)
            }
            ConstructSegmentsActivityRequired { segment } => format!("Segment {} is never constructed", segment + 1),
            ErectSegmentsActivityRequired { segment } => format!("Segment {} is never erected", segment + 1),
            SegmentErectedBeforeConstruction { segment } => {
                format!("Segment {} is erected before it is constructed", segment + 1)
            }
            SegmentErectedBeforeSupports { segment } => {
                format!("Segment {} is erected before the supports under it", segment + 1)
            }
            CastClosureJointActivityRequired { closure } => format!("Closure joint {} is never cast", closure + 1),
            ClosureCastBeforeSegmentsErected { closure } => format!(
                "Closure joint {} is cast before its adjacent segments are erected",
                closure + 1
            ),
            UserLoadActivityRequired { load } => format!("User load {} is never applied", load + 1),
            UnknownComponent { activity, index } => {
                format!("{} references component {} which does not exist", activity, index + 1)
            }
            OverlapsPreviousEvent { min_elapsed } => format!(
                "The event occurs before the previous event's minimum elapsed time of {} days",
                min_elapsed
            ),
            FinalEventHasActivities => "The final event cannot have activities".to_string(),
            InvalidCuringDuration => "Curing durations must be non-negative".to_string(),
        }
    }
}

impl std::fmt::Display for TimelineIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.event {
            Some(id) => write!(f, "[{}] {} (event {})", self.code(), self.message(), id),
            None => write!(f, "[{}] {}", self.code(), self.message()),
        }
    }
}

// =============================================================================
// RULES
// =============================================================================

struct Collector {
    issues: Vec<TimelineIssue>,
}

impl Collector {
    fn push(&mut self, kind: TimelineIssueKind, event: Option<EventId>) {
        self.issues.push(TimelineIssue::new(kind, event));
    }
}

/// Event indices whose activities satisfy `pred`, in time order
fn events_with(timeline: &TimelineManager, pred: impl Fn(&Activity) -> bool) -> Vec<usize> {
    timeline
        .events()
        .iter()
        .enumerate()
        .filter(|(_, e)| e.activities.iter().any(&pred))
        .map(|(i, _)| i)
        .collect()
}

fn first_event_with(timeline: &TimelineManager, pred: impl Fn(&Activity) -> bool) -> Option<usize> {
    events_with(timeline, pred).first().copied()
}

pub(crate) fn validate(timeline: &TimelineManager, bridge: &BridgeModel) -> Vec<TimelineIssue> {
    let mut out = Collector { issues: Vec::new() };
    let events = timeline.events();
    let id_of = |index: usize| events.get(index).map(|e| e.id);

    check_event_structure(timeline, &mut out);
    check_references(timeline, bridge, &mut out);

    // Segments
    let construct = |s: usize| {
        first_event_with(timeline, |a| matches!(a, Activity::ConstructSegments { segments, .. } if segments.contains(&s)))
    };
    let erect = |s: usize| {
        first_event_with(timeline, |a| matches!(a, Activity::ErectSegments { segments } if segments.contains(&s)))
    };
    let pier_erect = |p: usize| {
        first_event_with(timeline, |a| matches!(a, Activity::ErectPiers { piers, .. } if piers.contains(&p)))
    };
    let temp_erect = |t: usize| {
        first_event_with(
            timeline,
            |a| matches!(a, Activity::ErectPiers { temporary_supports, .. } if temporary_supports.contains(&t)),
        )
    };
    let closure_cast = |c: usize| {
        first_event_with(timeline, |a| matches!(a, Activity::CastClosureJoints { closures, .. } if closures.contains(&c)))
    };

    for s in 0..bridge.segments.len() {
        let constructed = events_with(
            timeline,
            |a| matches!(a, Activity::ConstructSegments { segments, .. } if segments.contains(&s)),
        );
        if constructed.is_empty() {
            out.push(TimelineIssueKind::ConstructSegmentsActivityRequired { segment: s }, None);
        } else if constructed.len() > 1 {
            out.push(
                TimelineIssueKind::ComponentCastMultipleTimes {
                    component: CastComponent::Segment(s),
                },
                id_of(constructed[1]),
            );
        }
        match (construct(s), erect(s)) {
            (_, None) => out.push(TimelineIssueKind::ErectSegmentsActivityRequired { segment: s }, None),
            (Some(c), Some(e)) if e < c => {
                out.push(TimelineIssueKind::SegmentErectedBeforeConstruction { segment: s }, id_of(e))
            }
            _ => {}
        }
        if let Some(e) = erect(s) {
            let (piers, temps) = bridge.supports_under_segment(s);
            let early = piers.iter().any(|&p| pier_erect(p).map(|pe| pe > e).unwrap_or(false))
                || temps.iter().any(|&t| temp_erect(t).map(|te| te > e).unwrap_or(false));
            if early {
                out.push(TimelineIssueKind::SegmentErectedBeforeSupports { segment: s }, id_of(e));
            }
        }
    }

    // Piers and temporary supports
    for p in 0..bridge.piers.len() {
        if pier_erect(p).is_none() {
            out.push(TimelineIssueKind::ErectPiersActivityRequired { pier: p }, None);
        }
    }
    for t in 0..bridge.temporary_supports.len() {
        let removal = first_event_with(
            timeline,
            |a| matches!(a, Activity::RemoveTemporarySupports { supports } if supports.contains(&t)),
        );
        match (temp_erect(t), removal) {
            (None, _) => out.push(TimelineIssueKind::TemporarySupportErectionRequired { support: t }, None),
            (Some(_), None) => out.push(TimelineIssueKind::TemporarySupportRemovalRequired { support: t }, None),
            (Some(e), Some(r)) if r <= e => out.push(
                TimelineIssueKind::TemporarySupportRemovedBeforeErection { support: t },
                id_of(r),
            ),
            (Some(_), Some(r)) => {
                let station = bridge.temporary_supports[t].station;
                for s in 0..bridge.segments.len() {
                    let (start, end) = (bridge.segment_start(s), bridge.segment_end(s));
                    if station < start - crate::bridge::LENGTH_TOLERANCE || station > end + crate::bridge::LENGTH_TOLERANCE {
                        continue;
                    }
                    // Closures on either side of the segment must be cast before removal
                    let adjacent = [s.checked_sub(1), (s < bridge.closures.len()).then_some(s)];
                    let uncast = adjacent
                        .iter()
                        .flatten()
                        .any(|&c| closure_cast(c).map(|cc| cc >= r).unwrap_or(true));
                    if uncast {
                        out.push(
                            TimelineIssueKind::TemporarySupportStillSupporting { support: t, segment: s },
                            id_of(r),
                        );
                    }
                }
            }
        }
    }

    // Closure joints
    for c in 0..bridge.closures.len() {
        let casts = events_with(
            timeline,
            |a| matches!(a, Activity::CastClosureJoints { closures, .. } if closures.contains(&c)),
        );
        match casts.first() {
            None => out.push(TimelineIssueKind::CastClosureJointActivityRequired { closure: c }, None),
            Some(&cast) => {
                let neighbours_erected = [c, c + 1]
                    .iter()
                    .all(|&s| erect(s).map(|e| e < cast).unwrap_or(false));
                if !neighbours_erected {
                    out.push(TimelineIssueKind::ClosureCastBeforeSegmentsErected { closure: c }, id_of(cast));
                }
            }
        }
        if casts.len() > 1 {
            out.push(
                TimelineIssueKind::ComponentCastMultipleTimes {
                    component: CastComponent::ClosureJoint(c),
                },
                id_of(casts[1]),
            );
        }
    }

    // Tendons
    let last_erection = (0..bridge.segments.len()).map(erect).collect::<Option<Vec<_>>>().map(|v| v.into_iter().max());
    let last_closure = (0..bridge.closures.len()).map(closure_cast).collect::<Option<Vec<_>>>().map(|v| v.into_iter().max());
    for t in 0..bridge.tendons.len() {
        let stressed = first_event_with(timeline, |a| matches!(a, Activity::StressTendons { tendons } if tendons.contains(&t)));
        let Some(stress) = stressed else {
            out.push(TimelineIssueKind::StressTendonActivityRequired { tendon: t }, None);
            continue;
        };
        match last_erection {
            Some(Some(e)) if e <= stress => {}
            Some(None) => {}
            _ => out.push(TimelineIssueKind::TendonStressedBeforeErection { tendon: t }, id_of(stress)),
        }
        match last_closure {
            Some(Some(c)) if c < stress => {}
            Some(None) => {}
            _ => out.push(TimelineIssueKind::TendonStressedBeforeClosure { tendon: t }, id_of(stress)),
        }
    }

    // Deck and longitudinal joint
    let decks = events_with(timeline, |a| matches!(a, Activity::CastDeck { .. }));
    if bridge.deck.is_some() {
        if decks.is_empty() {
            out.push(TimelineIssueKind::CastDeckActivityRequired, None);
        } else if decks.len() > 1 {
            out.push(
                TimelineIssueKind::ComponentCastMultipleTimes {
                    component: CastComponent::Deck,
                },
                id_of(decks[1]),
            );
        }
    }
    let joints = events_with(timeline, |a| matches!(a, Activity::CastLongitudinalJoint { .. }));
    if bridge.longitudinal_joint.is_some() {
        if joints.is_empty() {
            out.push(TimelineIssueKind::CastLongitudinalJointActivityRequired, None);
        } else if joints.len() > 1 {
            out.push(
                TimelineIssueKind::ComponentCastMultipleTimes {
                    component: CastComponent::LongitudinalJoint,
                },
                id_of(joints[1]),
            );
        }
    }

    // Superimposed loads
    let railing = first_event_with(timeline, |a| matches!(a, Activity::ApplyLoads(l) if l.railing_system));
    if bridge.traffic_barrier > 0.0 && railing.is_none() {
        out.push(TimelineIssueKind::RailingSystemActivityRequired, None);
    }
    if let (Some(r), Some(&d)) = (railing, decks.first()) {
        if r <= d {
            out.push(TimelineIssueKind::RailingSystemBeforeDeck, id_of(r));
        }
    }
    let overlays = events_with(timeline, |a| matches!(a, Activity::ApplyLoads(l) if l.overlay));
    if bridge.overlay > 0.0 && overlays.is_empty() {
        out.push(TimelineIssueKind::OverlayActivityRequired, None);
    }
    if overlays.len() > 1 {
        out.push(TimelineIssueKind::MultipleOverlayEvents, id_of(overlays[1]));
    }
    let live = events_with(timeline, |a| matches!(a, Activity::ApplyLoads(l) if l.live_load));
    if live.len() > 1 {
        out.push(TimelineIssueKind::MultipleLiveLoadEvents, id_of(live[1]));
    }
    if let Some(rating) = first_event_with(timeline, |a| matches!(a, Activity::ApplyLoads(l) if l.load_rating)) {
        if live.first().map(|&l| rating < l).unwrap_or(true) {
            out.push(TimelineIssueKind::LoadRatingBeforeLiveLoad, id_of(rating));
        }
    }
    for u in 0..bridge.user_loads.len() {
        if first_event_with(timeline, |a| matches!(a, Activity::ApplyLoads(l) if l.user_loads.contains(&u))).is_none() {
            out.push(TimelineIssueKind::UserLoadActivityRequired { load: u }, None);
        }
    }

    out.issues
}

fn check_event_structure(timeline: &TimelineManager, out: &mut Collector) {
    let events = timeline.events();
    for event in events {
        if event.activities.iter().filter_map(Activity::curing).any(|c| !c.is_valid()) {
            out.push(TimelineIssueKind::InvalidCuringDuration, Some(event.id));
        }
    }
    for pair in events.windows(2) {
        let min_elapsed = pair[0].min_elapsed_time();
        if pair[1].day < pair[0].day + min_elapsed - 1.0e-9 {
            out.push(TimelineIssueKind::OverlapsPreviousEvent { min_elapsed }, Some(pair[1].id));
        }
    }
    if let Some(last) = events.last() {
        if events.len() > 1 && !last.activities.is_empty() {
            out.push(TimelineIssueKind::FinalEventHasActivities, Some(last.id));
        }
    }
}

fn check_references(timeline: &TimelineManager, bridge: &BridgeModel, out: &mut Collector) {
    for event in timeline.events() {
        for activity in &event.activities {
            let (references, count): (Vec<usize>, usize) = match activity {
                Activity::ConstructSegments { segments, .. } | Activity::ErectSegments { segments } => {
                    (segments.clone(), bridge.segments.len())
                }
                Activity::ErectPiers {
                    piers,
                    temporary_supports,
                } => {
                    for &t in temporary_supports {
                        if t >= bridge.temporary_supports.len() {
                            out.push(
                                TimelineIssueKind::UnknownComponent {
                                    activity: activity.name().to_string(),
                                    index: t,
                                },
                                Some(event.id),
                            );
                        }
                    }
                    (piers.clone(), bridge.piers.len())
                }
                Activity::CastClosureJoints { closures, .. } => (closures.clone(), bridge.closures.len()),
                Activity::StressTendons { tendons } => (tendons.clone(), bridge.tendons.len()),
                Activity::RemoveTemporarySupports { supports } => {
                    (supports.clone(), bridge.temporary_supports.len())
                }
                Activity::ApplyLoads(loads) => (loads.user_loads.clone(), bridge.user_loads.len()),
                Activity::CastDeck { .. } => (vec![0], usize::from(bridge.deck.is_some())),
                Activity::CastLongitudinalJoint { .. } => {
                    (vec![0], usize::from(bridge.longitudinal_joint.is_some()))
                }
                Activity::GeometryControl => (Vec::new(), 0),
            };
            for index in references.into_iter().filter(|&i| i >= count) {
                out.push(
                    TimelineIssueKind::UnknownComponent {
                        activity: activity.name().to_string(),
                        index,
                    },
                    Some(event.id),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use crate::timeline::{CuringDuration, Event, LoadActivity};

    fn codes(issues: &[TimelineIssue]) -> Vec<&'static str> {
        issues.iter().map(TimelineIssue::code).collect()
    }

    #[test]
    fn test_example_timelines_are_valid() {
        let project = Project::single_span_example();
        assert!(project.timeline.validate(&project.bridge).is_empty());
        let project = Project::spliced_example();
        let issues = project.timeline.validate(&project.bridge);
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_missing_deck_cast() {
        let mut project = Project::single_span_example();
        let deck_event = project
            .timeline
            .events()
            .iter()
            .find(|e| e.activities.iter().any(|a| matches!(a, Activity::CastDeck { .. })))
            .map(|e| e.id)
            .unwrap();
        project.timeline.remove_event(deck_event).unwrap();
        let issues = project.timeline.validate(&project.bridge);
        assert!(codes(&issues).contains(&"TLM_CAST_DECK_ACTIVITY_REQUIRED"));
    }

    #[test]
    fn test_all_issues_reported_together() {
        let project = Project::single_span_example();
        let mut timeline = crate::timeline::TimelineManager::new();
        timeline.add_event(Event::new("Only", 0.0)).unwrap();
        timeline
            .add_event(Event::new("Final", 10.0).with_activity(Activity::GeometryControl))
            .unwrap();
        let issues = timeline.validate(&project.bridge);
        let codes = codes(&issues);
        assert!(codes.contains(&"TLM_CONSTRUCT_SEGMENTS_ACTIVITY_REQUIRED"));
        assert!(codes.contains(&"TLM_ERECT_SEGMENTS_ACTIVITY_REQUIRED"));
        assert!(codes.contains(&"TLM_ERECT_PIERS_ACTIVITY_REQUIRED"));
        assert!(codes.contains(&"TLM_CAST_DECK_ACTIVITY_REQUIRED"));
        assert!(codes.contains(&"TLM_FINAL_EVENT_HAS_ACTIVITIES"));

        let err = timeline.ensure_valid(&project.bridge).unwrap_err();
        assert_eq!(err.timeline_issues().len(), issues.len());
    }

    #[test]
    fn test_unknown_component_and_overlap() {
        let project = Project::single_span_example();
        let mut timeline = project.timeline.clone();
        let first = timeline.events()[0].id;
        timeline
            .add_activity(first, Activity::StressTendons { tendons: vec![3] })
            .unwrap();
        timeline
            .add_activity(
                first,
                Activity::CastLongitudinalJoint {
                    curing: CuringDuration::new(1.0, 10_000.0),
                },
            )
            .unwrap();
        let issues = timeline.validate(&project.bridge);
        let codes = codes(&issues);
        assert!(codes.contains(&"TLM_UNKNOWN_COMPONENT"));
        assert!(codes.contains(&"TLM_OVERLAPS_PREVIOUS_EVENT"));
    }

    #[test]
    fn test_load_rating_before_live_load() {
        let project = Project::single_span_example();
        let mut timeline = project.timeline.clone();
        let first = timeline.events()[0].id;
        timeline
            .add_activity(
                first,
                Activity::ApplyLoads(LoadActivity {
                    load_rating: true,
                    ..LoadActivity::default()
                }),
            )
            .unwrap();
        let issues = timeline.validate(&project.bridge);
        assert!(codes(&issues).contains(&"TLM_LOAD_RATING_BEFORE_LIVE_LOAD"));
    }

    #[test]
    fn test_spliced_rules() {
        let project = Project::spliced_example();
        let mut timeline = project.timeline.clone();
        // Stress the tendons at the first event, before any closure is cast
        let first = timeline.events()[0].id;
        timeline
            .add_activity(first, Activity::StressTendons { tendons: vec![0] })
            .unwrap();
        let codes = codes(&timeline.validate(&project.bridge));
        assert!(codes.contains(&"TLM_TENDON_STRESSED_BEFORE_CLOSURE"));
    }

    #[test]
    fn test_negative_curing_rejected() {
        let project = Project::single_span_example();
        let mut timeline = project.timeline.clone();
        let first = timeline.events()[0].id;
        timeline
            .add_activity(
                first,
                Activity::CastClosureJoints {
                    closures: vec![],
                    curing: CuringDuration::new(-3.0, 0.0),
                },
            )
            .unwrap();
        assert!(codes(&timeline.validate(&project.bridge)).contains(&"TLM_INVALID_CURING_DURATION"));
    }
}
