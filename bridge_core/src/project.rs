//! # Project Data Structures
//!
//! The `Project` struct is the root container handed to the analysis: the
//! girder line, its construction timeline and the analysis settings.
//! Projects serialize to `.pgx` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! Project
//! ├── meta: ProjectMetadata (schema version, engineer, job info, timestamps)
//! ├── settings: AnalysisSettings (loss method, models, criteria)
//! ├── bridge: BridgeModel (segments, closures, supports, deck, tendons, loads)
//! └── timeline: TimelineManager (events and their activities)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::project::Project;
//!
//! let project = Project::single_span_example();
//! assert_eq!(project.timeline.interval_count(), 3);
//!
//! let json = serde_json::to_string_pretty(&project).unwrap();
//! let roundtrip: Project = serde_json::from_str(&json).unwrap();
//! assert_eq!(roundtrip.bridge, project.bridge);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bridge::{
    BridgeModel, ClosureJoint, Deck, DeckRebar, DeckRebarMat, Duct, GirderSection, HandlingLocations, JackingEnd,
    LongitudinalReinforcement, Pier, PierConnection, Segment, StirrupZone, StrandLayout, Tendon, TendonPoint,
    TemporarySupport, TemporarySupportKind, TransverseReinforcement,
};
use crate::materials::{ConcreteMaterial, CuringMethod, RebarMaterial, StrandMaterial};
use crate::settings::AnalysisSettings;
use crate::timeline::{Activity, CuringDuration, Event, LoadActivity, TimelineManager};
use crate::units::MegaPascals;

/// Current schema version for .pgx files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root project container, serialized to `.pgx` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub meta: ProjectMetadata,
    pub settings: AnalysisSettings,
    pub bridge: BridgeModel,
    pub timeline: TimelineManager,
}

impl Project {
    /// Create a project for a girder line with an empty timeline.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bridge_core::project::Project;
    ///
    /// let bridge = Project::single_span_example().bridge;
    /// let project = Project::new("Jane Engineer", "25-042", bridge);
    /// assert_eq!(project.meta.engineer, "Jane Engineer");
    /// assert_eq!(project.timeline.event_count(), 0);
    /// ```
    pub fn new(engineer: impl Into<String>, job_id: impl Into<String>, bridge: BridgeModel) -> Self {
        let now = Utc::now();
        Project {
            meta: ProjectMetadata {
                id: Uuid::new_v4(),
                version: SCHEMA_VERSION.to_string(),
                engineer: engineer.into(),
                job_id: job_id.into(),
                bridge_name: String::new(),
                created: now,
                modified: now,
            },
            settings: AnalysisSettings::default(),
            bridge,
            timeline: TimelineManager::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// Add an event to the timeline and mark the project modified.
    pub fn add_event(&mut self, event: Event) -> crate::errors::BridgeResult<crate::timeline::EventId> {
        let id = self.timeline.add_event(event)?;
        self.touch();
        Ok(id)
    }

    // =========================================================================
    // Example projects
    // =========================================================================

    /// A 30 m simple-span precast I-girder with a composite deck.
    ///
    /// Release and erection on day 0, deck cast on day 90, barrier, overlay
    /// and live load on day 120, and a final event at 2000 days.
    pub fn single_span_example() -> Self {
        let mut project = Project::new("", "EXAMPLE-1", single_span_bridge());
        project.meta.bridge_name = "Single span precast girder".to_string();
        for event in [
            Event::new("Release prestress and erect girder", 0.0)
                .with_activity(Activity::ConstructSegments {
                    segments: vec![0],
                    curing: CuringDuration::new(2.0, 0.0),
                })
                .with_activity(Activity::ErectPiers {
                    piers: vec![0, 1],
                    temporary_supports: vec![],
                })
                .with_activity(Activity::ErectSegments { segments: vec![0] }),
            Event::new("Cast deck", 90.0).with_activity(Activity::CastDeck {
                curing: CuringDuration::new(1.0, 0.0),
            }),
            Event::new("Barrier, overlay and live load", 120.0).with_activity(Activity::ApplyLoads(LoadActivity {
                railing_system: true,
                overlay: true,
                live_load: true,
                ..LoadActivity::default()
            })),
            Event::new("Final", 2000.0),
        ] {
            push_event(&mut project.timeline, event);
        }
        project
    }

    /// The three-event precast girder: release at day 0, deck at day 90 and
    /// a final event at day 120, with no superimposed or live load.
    pub fn minimal_example() -> Self {
        let mut bridge = single_span_bridge();
        bridge.traffic_barrier = 0.0;
        bridge.overlay = 0.0;
        let mut project = Project::new("", "EXAMPLE-2", bridge);
        project.meta.bridge_name = "Three event precast girder".to_string();
        for event in [
            Event::new("Release prestress and erect girder", 0.0)
                .with_activity(Activity::ConstructSegments {
                    segments: vec![0],
                    curing: CuringDuration::new(2.0, 0.0),
                })
                .with_activity(Activity::ErectPiers {
                    piers: vec![0, 1],
                    temporary_supports: vec![],
                })
                .with_activity(Activity::ErectSegments { segments: vec![0] }),
            Event::new("Cast deck", 90.0).with_activity(Activity::CastDeck {
                curing: CuringDuration::new(1.0, 0.0),
            }),
            Event::new("Final", 120.0),
        ] {
            push_event(&mut project.timeline, event);
        }
        project
    }

    /// A two-span spliced girder: three segments on temporary towers,
    /// closures cast, a continuous tendon stressed, towers removed, deck cast.
    pub fn spliced_example() -> Self {
        let mut project = Project::new("", "EXAMPLE-3", spliced_bridge());
        project.meta.bridge_name = "Two span spliced girder".to_string();
        for event in [
            Event::new("Release segments", 0.0).with_activity(Activity::ConstructSegments {
                segments: vec![0, 1, 2],
                curing: CuringDuration::new(2.0, 0.0),
            }),
            Event::new("Erect piers, towers and segments", 30.0)
                .with_activity(Activity::ErectPiers {
                    piers: vec![0, 1, 2],
                    temporary_supports: vec![0, 1],
                })
                .with_activity(Activity::ErectSegments {
                    segments: vec![0, 1, 2],
                }),
            Event::new("Cast closure joints", 40.0).with_activity(Activity::CastClosureJoints {
                closures: vec![0, 1],
                curing: CuringDuration::new(1.0, 0.0),
            }),
            Event::new("Stress tendons", 50.0).with_activity(Activity::StressTendons { tendons: vec![0] }),
            Event::new("Remove temporary towers", 55.0)
                .with_activity(Activity::RemoveTemporarySupports { supports: vec![0, 1] }),
            Event::new("Cast deck", 60.0).with_activity(Activity::CastDeck {
                curing: CuringDuration::new(1.0, 0.0),
            }),
            Event::new("Barrier, overlay and live load", 90.0).with_activity(Activity::ApplyLoads(LoadActivity {
                railing_system: true,
                overlay: true,
                live_load: true,
                ..LoadActivity::default()
            })),
            Event::new("Final", 2000.0),
        ] {
            push_event(&mut project.timeline, event);
        }
        project
    }
}

/// Example timelines use distinct days, so insertion cannot fail
fn push_event(timeline: &mut TimelineManager, event: Event) {
    if let Err(error) = timeline.add_event(event) {
        tracing::error!(%error, "example event rejected");
    }
}

fn girder_concrete() -> ConcreteMaterial {
    ConcreteMaterial::normal_weight(MegaPascals(55.0)).with_curing(CuringMethod::Steam)
}

/// Area of one 16 mm bar (m²)
const BAR_16: f64 = 199.0e-6;

/// Deck with longitudinal mats of `top` and `bottom` m²/m at 50 mm cover
fn example_deck(top: f64, bottom: f64) -> Deck {
    Deck {
        thickness: 0.2,
        effective_width: 2.4,
        haunch_depth: 0.05,
        camber_allowance: 0.0,
        concrete: ConcreteMaterial::normal_weight(MegaPascals(30.0)),
        rebar: Some(DeckRebar {
            material: RebarMaterial::default(),
            top: DeckRebarMat {
                area_per_width: top,
                cover: 0.05,
            },
            bottom: DeckRebarMat {
                area_per_width: bottom,
                cover: 0.05,
            },
        }),
    }
}

fn single_span_bridge() -> BridgeModel {
    let strand = StrandMaterial::low_relaxation_15_2();
    let mut section = GirderSection::i_girder(1.6);
    section.top_flange_width = 1.2;
    // Two-leg 16 mm stirrups, closer over the outer quarter of the span
    let stirrups = TransverseReinforcement {
        stirrups: vec![
            StirrupZone {
                length: 7.5,
                av: 2.0 * BAR_16,
                spacing: 0.15,
            },
            StirrupZone {
                length: 0.0,
                av: 2.0 * BAR_16,
                spacing: 0.3,
            },
        ],
        ..TransverseReinforcement::default()
    };
    let segment = Segment {
        length: 30.0,
        section,
        concrete: girder_concrete(),
        strands: StrandLayout::straight(strand, 28, 0.09)
            .with_harped(6, 1.3, 0.15)
            .with_debonding(4, 2.0),
        reinforcement: stirrups.with_confinement(0.0127, 0.1, 2.5).with_splitting_area(2.4e-3),
        longitudinal: LongitudinalReinforcement::default().with_layer(6.0 * BAR_16, 1.55),
        handling: HandlingLocations::default(),
    };
    BridgeModel {
        segments: vec![segment],
        closures: vec![],
        piers: vec![
            Pier {
                name: "Abutment 1".to_string(),
                station: 0.0,
                bearing_width: 0.2,
                connection: PierConnection::Hinge,
            },
            Pier {
                name: "Abutment 2".to_string(),
                station: 30.0,
                bearing_width: 0.2,
                connection: PierConnection::Hinge,
            },
        ],
        temporary_supports: vec![],
        deck: Some(example_deck(0.8e-3, 0.8e-3)),
        longitudinal_joint: None,
        tendons: vec![],
        traffic_barrier: 4.5e3,
        overlay: 1.5e3,
        user_loads: vec![],
        girder_spacing: 2.4,
        girder_count: 6,
    }
}

fn spliced_bridge() -> BridgeModel {
    let strand = StrandMaterial::low_relaxation_15_2();
    let mut section = GirderSection::i_girder(2.0);
    section.web_thickness = 0.25;
    let segment = |length: f64, count: u32| Segment {
        length,
        section: section.clone(),
        concrete: girder_concrete(),
        strands: StrandLayout::straight(strand.clone(), count, 0.09),
        reinforcement: TransverseReinforcement::default()
            .with_confinement(0.0127, 0.1, 3.0)
            .with_splitting_area(1.2e-3),
        longitudinal: LongitudinalReinforcement::default().with_layer(12.0 * BAR_16, 1.94),
        handling: HandlingLocations::default(),
    };
    let closure = || ClosureJoint {
        length: 0.6,
        concrete: ConcreteMaterial::normal_weight(MegaPascals(45.0)),
    };
    let pier = |name: &str, station: f64| Pier {
        name: name.to_string(),
        station,
        bearing_width: 0.3,
        connection: PierConnection::ContinuousAfterClosure,
    };
    let tower = |station: f64| TemporarySupport {
        station,
        kind: TemporarySupportKind::ErectionTower,
    };
    let point = |station: f64, y: f64| TendonPoint { station, y };

    BridgeModel {
        segments: vec![segment(34.0, 12), segment(12.0, 6), segment(34.0, 12)],
        closures: vec![closure(), closure()],
        piers: vec![pier("Abutment 1", 0.0), pier("Pier 2", 40.0), pier("Abutment 3", 80.0)],
        temporary_supports: vec![tower(34.0), tower(46.0)],
        deck: Some(example_deck(2.0e-3, 1.2e-3)),
        longitudinal_joint: None,
        tendons: vec![Tendon {
            name: "T1".to_string(),
            strand,
            strand_count: 15,
            duct: Duct {
                outer_diameter: 0.095,
                inner_diameter: 0.088,
            },
            profile: vec![
                point(0.0, 1.0),
                point(16.0, 0.2),
                point(40.0, 1.75),
                point(64.0, 0.2),
                point(80.0, 1.0),
            ],
            friction_coefficient: 0.25,
            wobble: 6.6e-4,
            anchor_set: 0.00635,
            jacking_end: JackingEnd::Both,
            jacking_ratio: 0.80,
        }],
        traffic_barrier: 4.5e3,
        overlay: 1.5e3,
        user_loads: vec![],
        girder_spacing: 2.4,
        girder_count: 6,
    }
}

/// Project metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Stable project identifier
    pub id: Uuid,

    /// Schema version (for migration compatibility)
    pub version: String,

    /// Name of the responsible engineer
    pub engineer: String,

    /// Job/project number
    pub job_id: String,

    #[serde(default)]
    pub bridge_name: String,

    pub created: DateTime<Utc>,

    pub modified: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_creation() {
        let project = Project::new("John Doe", "25-001", single_span_bridge());
        assert_eq!(project.meta.engineer, "John Doe");
        assert_eq!(project.meta.job_id, "25-001");
        assert_eq!(project.meta.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_examples_are_consistent() {
        for project in [Project::single_span_example(), Project::minimal_example(), Project::spliced_example()] {
            assert!(project.bridge.validate().is_ok());
            let issues = project.timeline.validate(&project.bridge);
            assert!(issues.is_empty(), "{}: {:?}", project.meta.bridge_name, issues);
        }
    }

    #[test]
    fn test_minimal_example_has_three_events() {
        let project = Project::minimal_example();
        assert_eq!(project.timeline.event_count(), 3);
        assert_eq!(project.timeline.interval_count(), 2);
        assert_eq!(project.timeline.deck_casting_interval(), Some(1));
    }

    #[test]
    fn test_project_serialization() {
        let project = Project::spliced_example();
        let json = serde_json::to_string_pretty(&project).unwrap();
        assert!(json.contains("EXAMPLE-3"));
        let roundtrip: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.bridge, project.bridge);
        assert_eq!(roundtrip.timeline, project.timeline);
        assert_eq!(roundtrip.settings, project.settings);
    }

    #[test]
    fn test_single_span_bars_and_stirrups() {
        let bridge = Project::single_span_example().bridge;
        let segment = &bridge.segments[0];
        assert_eq!(segment.section.top_flange_width, 1.2);
        assert!(segment.longitudinal.area_above(segment.section.height / 2.0) > 1.0e-3);
        let end = segment.reinforcement.av_over_s(1.0, 30.0);
        let middle = segment.reinforcement.av_over_s(15.0, 30.0);
        assert!((end - 2.0 * middle).abs() < 1e-9);
        assert_eq!(segment.reinforcement.zone_boundaries(30.0), vec![7.5, 22.5]);
    }

    #[test]
    fn test_add_event_touches() {
        let mut project = Project::new("Engineer", "25-001", single_span_bridge());
        let before = project.meta.modified;
        project.add_event(Event::new("Release", 0.0)).unwrap();
        assert!(project.meta.modified >= before);
        assert_eq!(project.timeline.event_count(), 1);
    }
}
