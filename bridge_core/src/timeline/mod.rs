//! # Timeline
//!
//! The construction and loading history of the girder line. A timeline is an
//! ordered list of events; each event holds the activities that happen on
//! its day. Interval `i` is the half-open span between event `i` and event
//! `i + 1`, so there is always one interval fewer than events. Intervals are
//! derived from the events and never stored.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::timeline::{Activity, CuringDuration, Event, TimelineManager};
//!
//! let mut timeline = TimelineManager::new();
//! timeline.add_event(Event::new("Release", 0.0).with_activity(Activity::ConstructSegments {
//!     segments: vec![0],
//!     curing: CuringDuration::new(1.0, 0.0),
//! })).unwrap();
//! timeline.add_event(Event::new("Cast deck", 90.0)).unwrap();
//! timeline.add_event(Event::new("Final", 120.0)).unwrap();
//!
//! assert_eq!(timeline.event_count(), 3);
//! assert_eq!(timeline.interval_count(), 2);
//! ```

pub mod activity;
pub mod validation;

pub use activity::{Activity, CuringDuration, LoadActivity};
pub use validation::{TimelineIssue, TimelineIssueKind};

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeModel;
use crate::errors::{BridgeError, BridgeResult};

/// Event days closer than this are the same day
const DAY_TOLERANCE: f64 = 1.0e-9;

/// Stable event identifier. Ids survive insertion and removal of other events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A point in time with the activities that happen then
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by the timeline when the event is added
    pub id: EventId,
    pub description: String,
    /// Time of the event (days)
    pub day: f64,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl Event {
    pub fn new(description: impl Into<String>, day: f64) -> Self {
        Event {
            id: EventId(0),
            description: description.into(),
            day,
            activities: Vec::new(),
        }
    }

    /// Add an activity (builder pattern)
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    /// Days that must pass before the next event may occur
    pub fn min_elapsed_time(&self) -> f64 {
        self.activities
            .iter()
            .map(Activity::min_elapsed_time)
            .fold(0.0, f64::max)
    }
}

/// A point within an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalTime {
    Start,
    Middle,
    End,
}

/// The span between two consecutive events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub index: usize,
    pub start_event: EventId,
    pub end_event: EventId,
    /// Day the interval starts
    pub start: f64,
    /// Day the interval ends
    pub end: f64,
    pub description: String,
}

impl Interval {
    pub fn time(&self, at: IntervalTime) -> f64 {
        match at {
            IntervalTime::Start => self.start,
            IntervalTime::Middle => 0.5 * (self.start + self.end),
            IntervalTime::End => self.end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A cast-in-place or precast concrete component of the girder line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CastComponent {
    Segment(usize),
    ClosureJoint(usize),
    Deck,
    LongitudinalJoint,
}

/// Owns the events of the timeline, ordered by day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TimelineManager {
    events: Vec<Event>,
    next_id: u32,
}

impl TimelineManager {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Insert an event in time order and return its id.
    ///
    /// Two events on the same day are rejected: the interval between them
    /// would be empty.
    pub fn add_event(&mut self, mut event: Event) -> BridgeResult<EventId> {
        if !event.day.is_finite() {
            return Err(BridgeError::invalid_input("day", event.day.to_string(), "must be finite"));
        }
        if self.events.iter().any(|e| (e.day - event.day).abs() <= DAY_TOLERANCE) {
            return Err(BridgeError::invalid_input(
                "day",
                event.day.to_string(),
                "an event already occurs on this day",
            ));
        }
        let id = EventId(self.next_id);
        self.next_id += 1;
        event.id = id;
        let position = self.events.partition_point(|e| e.day < event.day);
        self.events.insert(position, event);
        Ok(id)
    }

    pub fn remove_event(&mut self, id: EventId) -> BridgeResult<Event> {
        let index = self
            .event_index(id)
            .ok_or_else(|| BridgeError::invalid_input("event", id.to_string(), "no such event"))?;
        Ok(self.events.remove(index))
    }

    /// Add an activity to an existing event
    pub fn add_activity(&mut self, id: EventId, activity: Activity) -> BridgeResult<()> {
        let index = self
            .event_index(id)
            .ok_or_else(|| BridgeError::invalid_input("event", id.to_string(), "no such event"))?;
        self.events[index].activities.push(activity);
        Ok(())
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn event_index(&self, id: EventId) -> Option<usize> {
        self.events.iter().position(|e| e.id == id)
    }

    // =========================================================================
    // Intervals
    // =========================================================================

    pub fn interval_count(&self) -> usize {
        self.events.len().saturating_sub(1)
    }

    /// The interval that begins at event `event_index`
    pub fn get_interval(&self, event_index: usize) -> Option<usize> {
        (event_index < self.interval_count()).then_some(event_index)
    }

    pub fn interval(&self, index: usize) -> Option<Interval> {
        if index >= self.interval_count() {
            return None;
        }
        let (start, end) = (&self.events[index], &self.events[index + 1]);
        Some(Interval {
            index,
            start_event: start.id,
            end_event: end.id,
            start: start.day,
            end: end.day,
            description: self.interval_description(index),
        })
    }

    pub fn intervals(&self) -> Vec<Interval> {
        (0..self.interval_count()).filter_map(|i| self.interval(i)).collect()
    }

    /// Description of an interval, e.g. "Interval 2: Cast deck"
    pub fn interval_description(&self, index: usize) -> String {
        let description = self.events.get(index).map(|e| e.description.as_str()).unwrap_or("");
        format!("Interval {}: {}", index + 1, description)
    }

    pub fn interval_time(&self, index: usize, at: IntervalTime) -> Option<f64> {
        self.interval(index).map(|i| i.time(at))
    }

    /// Day of the last event
    pub fn final_day(&self) -> f64 {
        self.events.last().map(|e| e.day).unwrap_or(0.0)
    }

    // =========================================================================
    // Component queries
    // =========================================================================

    /// First interval whose starting event has an activity matching `pred`
    fn find_interval(&self, pred: impl Fn(&Activity) -> bool) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.activities.iter().any(&pred))
            .and_then(|i| self.get_interval(i))
    }

    pub fn segment_construction_interval(&self, segment: usize) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ConstructSegments { segments, .. } if segments.contains(&segment)))
    }

    pub fn segment_erection_interval(&self, segment: usize) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ErectSegments { segments } if segments.contains(&segment)))
    }

    pub fn closure_casting_interval(&self, closure: usize) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::CastClosureJoints { closures, .. } if closures.contains(&closure)))
    }

    pub fn deck_casting_interval(&self) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::CastDeck { .. }))
    }

    pub fn longitudinal_joint_casting_interval(&self) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::CastLongitudinalJoint { .. }))
    }

    /// First interval in which the deck acts compositely.
    ///
    /// The deck is wet concrete carried by the girder during its casting
    /// interval and acts compositely from the next interval on, so this is
    /// always the deck casting interval plus one.
    pub fn composite_deck_interval(&self) -> Option<usize> {
        self.deck_casting_interval().map(|i| i + 1)
    }

    pub fn tendon_stressing_interval(&self, tendon: usize) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::StressTendons { tendons } if tendons.contains(&tendon)))
    }

    pub fn pier_erection_interval(&self, pier: usize) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ErectPiers { piers, .. } if piers.contains(&pier)))
    }

    pub fn temporary_support_erection_interval(&self, support: usize) -> Option<usize> {
        self.find_interval(
            |a| matches!(a, Activity::ErectPiers { temporary_supports, .. } if temporary_supports.contains(&support)),
        )
    }

    pub fn temporary_support_removal_interval(&self, support: usize) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::RemoveTemporarySupports { supports } if supports.contains(&support)))
    }

    pub fn railing_system_interval(&self) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ApplyLoads(l) if l.railing_system))
    }

    pub fn overlay_interval(&self) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ApplyLoads(l) if l.overlay))
    }

    pub fn live_load_interval(&self) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ApplyLoads(l) if l.live_load))
    }

    pub fn load_rating_interval(&self) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ApplyLoads(l) if l.load_rating))
    }

    pub fn user_load_interval(&self, load: usize) -> Option<usize> {
        self.find_interval(|a| matches!(a, Activity::ApplyLoads(l) if l.user_loads.contains(&load)))
    }

    /// Interval in which all segments have been erected
    pub fn last_segment_erection_interval(&self, segment_count: usize) -> Option<usize> {
        (0..segment_count)
            .map(|s| self.segment_erection_interval(s))
            .collect::<Option<Vec<_>>>()
            .and_then(|v| v.into_iter().max())
    }

    /// Interval in which a component is cast, and the day its concrete is placed
    pub fn casting(&self, component: CastComponent) -> Option<(usize, f64)> {
        let index = self.events.iter().position(|e| {
            e.activities.iter().any(|a| match (component, a) {
                (CastComponent::Segment(s), Activity::ConstructSegments { segments, .. }) => segments.contains(&s),
                (CastComponent::ClosureJoint(c), Activity::CastClosureJoints { closures, .. }) => closures.contains(&c),
                (CastComponent::Deck, Activity::CastDeck { .. }) => true,
                (CastComponent::LongitudinalJoint, Activity::CastLongitudinalJoint { .. }) => true,
                _ => false,
            })
        })?;
        let interval = self.get_interval(index)?;
        let event = &self.events[index];
        let curing = event
            .activities
            .iter()
            .filter_map(Activity::curing)
            .map(|c| c.total)
            .fold(0.0, f64::max);
        Some((interval, event.day - curing))
    }

    /// Age of a component's concrete on `day`, `None` if it is never cast
    pub fn age(&self, component: CastComponent, day: f64) -> Option<f64> {
        self.casting(component).map(|(_, placed)| day - placed)
    }

    /// True when the component has been cast by the start of `interval`
    pub fn is_cast(&self, component: CastComponent, interval: usize) -> bool {
        self.casting(component).map(|(i, _)| i <= interval).unwrap_or(false)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check the timeline against the bridge model. Every issue is reported.
    pub fn validate(&self, bridge: &BridgeModel) -> Vec<TimelineIssue> {
        validation::validate(self, bridge)
    }

    /// Validate and fail with the full issue list when the timeline is inconsistent
    pub fn ensure_valid(&self, bridge: &BridgeModel) -> BridgeResult<()> {
        let issues = self.validate(bridge);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::TimelineConsistency { issues })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn three_event_timeline() -> TimelineManager {
        let mut timeline = TimelineManager::new();
        timeline
            .add_event(Event::new("Release", 0.0).with_activity(Activity::ConstructSegments {
                segments: vec![0],
                curing: CuringDuration::new(1.0, 0.0),
            }))
            .unwrap();
        timeline
            .add_event(Event::new("Cast deck", 90.0).with_activity(Activity::CastDeck {
                curing: CuringDuration::new(1.0, 7.0),
            }))
            .unwrap();
        timeline.add_event(Event::new("Final", 120.0)).unwrap();
        timeline
    }

    #[test]
    fn test_interval_count() {
        let timeline = three_event_timeline();
        assert_eq!(timeline.event_count(), 3);
        assert_eq!(timeline.interval_count(), 2);
        assert_eq!(TimelineManager::new().interval_count(), 0);
    }

    #[test]
    fn test_events_sorted_by_day() {
        let mut timeline = three_event_timeline();
        let id = timeline.add_event(Event::new("Erect", 30.0)).unwrap();
        assert_eq!(timeline.event_index(id), Some(1));
        let days: Vec<f64> = timeline.events().iter().map(|e| e.day).collect();
        assert_eq!(days, vec![0.0, 30.0, 90.0, 120.0]);
    }

    #[test]
    fn test_duplicate_day_rejected() {
        let mut timeline = three_event_timeline();
        assert!(timeline.add_event(Event::new("Again", 90.0)).is_err());
    }

    #[test]
    fn test_remove_event_keeps_ids() {
        let mut timeline = three_event_timeline();
        let final_id = timeline.events()[2].id;
        let deck_id = timeline.events()[1].id;
        timeline.remove_event(deck_id).unwrap();
        assert_eq!(timeline.interval_count(), 1);
        assert_eq!(timeline.events()[1].id, final_id);
        assert!(timeline.remove_event(deck_id).is_err());
    }

    #[test]
    fn test_get_interval() {
        let timeline = three_event_timeline();
        assert_eq!(timeline.get_interval(0), Some(0));
        assert_eq!(timeline.get_interval(1), Some(1));
        assert_eq!(timeline.get_interval(2), None);
    }

    #[test]
    fn test_interval_times_and_description() {
        let timeline = three_event_timeline();
        let interval = timeline.interval(1).unwrap();
        assert_relative_eq!(interval.time(IntervalTime::Start), 90.0);
        assert_relative_eq!(interval.time(IntervalTime::Middle), 105.0);
        assert_relative_eq!(interval.duration(), 30.0);
        assert_eq!(interval.description, "Interval 2: Cast deck");
    }

    #[test]
    fn test_component_queries() {
        let timeline = three_event_timeline();
        assert_eq!(timeline.segment_construction_interval(0), Some(0));
        assert_eq!(timeline.deck_casting_interval(), Some(1));
        assert_eq!(timeline.composite_deck_interval(), Some(2));
        assert_eq!(TimelineManager::new().composite_deck_interval(), None);
        assert_eq!(timeline.live_load_interval(), None);
        assert!(!timeline.is_cast(CastComponent::Deck, 0));
        assert!(timeline.is_cast(CastComponent::Deck, 1));
    }

    #[test]
    fn test_casting_age() {
        let timeline = three_event_timeline();
        let (interval, placed) = timeline.casting(CastComponent::Deck).unwrap();
        assert_eq!(interval, 1);
        assert_relative_eq!(placed, 89.0);
        assert_relative_eq!(timeline.age(CastComponent::Segment(0), 90.0).unwrap(), 91.0);
        assert!(timeline.age(CastComponent::LongitudinalJoint, 90.0).is_none());
    }

    #[test]
    fn test_min_elapsed_time() {
        let timeline = three_event_timeline();
        assert_relative_eq!(timeline.events()[1].min_elapsed_time(), 7.0);
    }

    proptest! {
        #[test]
        fn prop_intervals_contiguous(days in proptest::collection::btree_set(0u32..2000, 1..20)) {
            let mut timeline = TimelineManager::new();
            for day in &days {
                timeline.add_event(Event::new("event", f64::from(*day))).unwrap();
            }
            prop_assert_eq!(timeline.interval_count(), timeline.event_count() - 1);
            let intervals = timeline.intervals();
            for pair in intervals.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
                prop_assert!(pair[0].duration() > 0.0);
            }
        }
    }
}
