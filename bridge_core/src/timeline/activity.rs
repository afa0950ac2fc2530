//! Construction and loading activities carried by timeline events.

use serde::{Deserialize, Serialize};

/// Curing time of a cast-in-place activity (days).
///
/// `total` is the time from placement to the event, so the concrete is
/// placed `total` days before the event day. `active` is the time after
/// the event during which nothing else may happen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuringDuration {
    pub total: f64,
    pub active: f64,
}

impl CuringDuration {
    pub fn new(total: f64, active: f64) -> Self {
        CuringDuration { total, active }
    }

    pub fn is_valid(&self) -> bool {
        self.total >= 0.0 && self.active >= 0.0 && self.total.is_finite() && self.active.is_finite()
    }
}

impl Default for CuringDuration {
    fn default() -> Self {
        CuringDuration {
            total: 1.0,
            active: 0.0,
        }
    }
}

/// Loads switched on by an `ApplyLoads` activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoadActivity {
    #[serde(default)]
    pub railing_system: bool,
    #[serde(default)]
    pub overlay: bool,
    #[serde(default)]
    pub live_load: bool,
    #[serde(default)]
    pub load_rating: bool,
    /// Indices into the bridge's user loads
    #[serde(default)]
    pub user_loads: Vec<usize>,
}

/// Something that happens at an event.
///
/// Component references are indices into the bridge model's collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "activity")]
pub enum Activity {
    /// Prestress release of precast segments
    ConstructSegments {
        segments: Vec<usize>,
        curing: CuringDuration,
    },
    ErectPiers {
        piers: Vec<usize>,
        #[serde(default)]
        temporary_supports: Vec<usize>,
    },
    ErectSegments { segments: Vec<usize> },
    CastClosureJoints {
        closures: Vec<usize>,
        curing: CuringDuration,
    },
    CastDeck { curing: CuringDuration },
    CastLongitudinalJoint { curing: CuringDuration },
    StressTendons { tendons: Vec<usize> },
    RemoveTemporarySupports { supports: Vec<usize> },
    ApplyLoads(LoadActivity),
    GeometryControl,
}

impl Activity {
    pub fn name(&self) -> &'static str {
        match self {
            Activity::ConstructSegments { .. } => "Construct segments",
            Activity::ErectPiers { .. } => "Erect piers",
            Activity::ErectSegments { .. } => "Erect segments",
            Activity::CastClosureJoints { .. } => "Cast closure joints",
            Activity::CastDeck { .. } => "Cast deck",
            Activity::CastLongitudinalJoint { .. } => "Cast longitudinal joint",
            Activity::StressTendons { .. } => "Stress tendons",
            Activity::RemoveTemporarySupports { .. } => "Remove temporary supports",
            Activity::ApplyLoads(_) => "Apply loads",
            Activity::GeometryControl => "Geometry control",
        }
    }

    pub fn curing(&self) -> Option<&CuringDuration> {
        match self {
            Activity::ConstructSegments { curing, .. }
            | Activity::CastClosureJoints { curing, .. }
            | Activity::CastDeck { curing }
            | Activity::CastLongitudinalJoint { curing } => Some(curing),
            Activity::ErectPiers { .. }
            | Activity::ErectSegments { .. }
            | Activity::StressTendons { .. }
            | Activity::RemoveTemporarySupports { .. }
            | Activity::ApplyLoads(_)
            | Activity::GeometryControl => None,
        }
    }

    /// Days that must elapse after the event before the next one
    pub fn min_elapsed_time(&self) -> f64 {
        self.curing().map(|c| c.active).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_elapsed_time() {
        let deck = Activity::CastDeck {
            curing: CuringDuration::new(1.0, 7.0),
        };
        assert_eq!(deck.min_elapsed_time(), 7.0);
        assert_eq!(Activity::GeometryControl.min_elapsed_time(), 0.0);
    }

    #[test]
    fn test_activity_serialization() {
        let activity = Activity::StressTendons { tendons: vec![0, 1] };
        let json = serde_json::to_string(&activity).unwrap();
        assert!(json.contains("\"activity\":\"StressTendons\""));
        let back: Activity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, activity);
    }

    #[test]
    fn test_invalid_curing() {
        assert!(!CuringDuration::new(-1.0, 0.0).is_valid());
        assert!(CuringDuration::default().is_valid());
    }
}
