//! Reconciles the support taxonomy (piers and temporary supports) with the
//! POI taxonomy used everywhere else. Results are computed per POI; reactions
//! belong to supports. A support may be represented by zero, one or two
//! solver nodes depending on which segments are erected.

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeModel;
use crate::poi::{PoiAttributes, PoiId, PoiRegistry};

/// Tolerance for matching a support to a POI station (m)
const STATION_TOLERANCE: f64 = 1.0e-3;

/// Where a reaction acts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupportLocation {
    Pier(usize),
    TemporarySupport(usize),
    /// End support of a segment in the casting yard
    CastingYard { segment: usize },
}

impl std::fmt::Display for SupportLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupportLocation::Pier(i) => write!(f, "Pier {}", i + 1),
            SupportLocation::TemporarySupport(i) => write!(f, "Temporary Support {}", i + 1),
            SupportLocation::CastingYard { segment } => write!(f, "Casting yard, Segment {}", segment + 1),
        }
    }
}

/// Cross-reference between supports and POIs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionAdapter {
    entries: Vec<(SupportLocation, f64, Vec<PoiId>)>,
}

impl ReactionAdapter {
    pub fn new(bridge: &BridgeModel, pois: &PoiRegistry) -> Self {
        let at = |station: f64, mask: PoiAttributes| -> Vec<PoiId> {
            pois.sorted()
                .into_iter()
                .filter(|id| {
                    pois.get(*id)
                        .map(|p| (p.station - station).abs() <= STATION_TOLERANCE && p.attributes.intersects(mask))
                        .unwrap_or(false)
                })
                .collect()
        };
        let mut entries = Vec::new();
        for (i, pier) in bridge.piers.iter().enumerate() {
            entries.push((SupportLocation::Pier(i), pier.station, at(pier.station, PoiAttributes::SUPPORT)));
        }
        for (i, support) in bridge.temporary_supports.iter().enumerate() {
            entries.push((
                SupportLocation::TemporarySupport(i),
                support.station,
                at(support.station, PoiAttributes::TEMP_SUPPORT),
            ));
        }
        ReactionAdapter { entries }
    }

    /// Permanent and temporary supports of the girder line
    pub fn supports(&self) -> impl Iterator<Item = SupportLocation> + '_ {
        self.entries.iter().map(|(s, _, _)| *s)
    }

    pub fn station(&self, support: SupportLocation) -> Option<f64> {
        self.entries.iter().find(|(s, _, _)| *s == support).map(|(_, x, _)| *x)
    }

    /// POIs located over a support
    pub fn pois_at(&self, support: SupportLocation) -> &[PoiId] {
        self.entries
            .iter()
            .find(|(s, _, _)| *s == support)
            .map(|(_, _, p)| p.as_slice())
            .unwrap_or(&[])
    }

    /// The support over which a POI sits, piers first
    pub fn support_at(&self, poi: PoiId) -> Option<SupportLocation> {
        self.entries.iter().find(|(_, _, p)| p.contains(&poi)).map(|(s, _, _)| *s)
    }

    /// Supports at a station, piers first
    pub fn supports_at_station(&self, station: f64) -> Vec<SupportLocation> {
        self.entries
            .iter()
            .filter(|(_, x, _)| (x - station).abs() <= STATION_TOLERANCE)
            .map(|(s, _, _)| *s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;

    #[test]
    fn test_piers_map_to_support_pois() {
        let project = Project::single_span_example();
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let adapter = ReactionAdapter::new(&project.bridge, &pois);
        assert_eq!(adapter.supports().count(), 2);

        let end = adapter.pois_at(SupportLocation::Pier(1));
        assert_eq!(end.len(), 1);
        assert_eq!(adapter.support_at(end[0]), Some(SupportLocation::Pier(1)));
        assert!((adapter.station(SupportLocation::Pier(1)).unwrap() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_temporary_support_at_closure_spans_both_segments() {
        let project = Project::spliced_example();
        let pois = PoiRegistry::for_bridge(&project.bridge).unwrap();
        let adapter = ReactionAdapter::new(&project.bridge, &pois);
        // End of segment 1 and start of segment 2 sit over the tower
        let tower = adapter.pois_at(SupportLocation::TemporarySupport(0));
        assert_eq!(tower.len(), 2);
        assert_eq!(
            adapter.supports_at_station(34.0),
            vec![SupportLocation::TemporarySupport(0)]
        );
        let mid_pier = adapter.pois_at(SupportLocation::Pier(1));
        assert_eq!(mid_pier.len(), 1);
        assert_eq!(SupportLocation::Pier(1).to_string(), "Pier 2");
    }
}
