//! Mild reinforcement of a precast segment: stirrup zones, the end-zone
//! confinement and splitting steel, and the longitudinal bars.

use serde::{Deserialize, Serialize};

use crate::materials::RebarMaterial;

/// A stirrup zone measured from the nearest segment end. Zones are applied
/// symmetrically and listed from the end inward; the last zone extends to
/// mid-segment whatever its length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StirrupZone {
    /// Zone length measured along the segment (m)
    pub length: f64,
    /// Area of all stirrup legs at one location (m²)
    pub av: f64,
    /// Stirrup spacing (m)
    pub spacing: f64,
}

/// End-zone confinement bars enclosing the bottom flange strands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfinementBars {
    /// Bar diameter (m)
    pub bar_diameter: f64,
    pub spacing: f64,
    /// Length over which the bars are provided from each end (m)
    pub zone_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransverseReinforcement {
    pub material: RebarMaterial,
    pub stirrups: Vec<StirrupZone>,
    #[serde(default)]
    pub confinement: Option<ConfinementBars>,
    /// Vertical steel area within h/4 of each end resisting splitting (m²)
    #[serde(default)]
    pub splitting_area: f64,
}

impl TransverseReinforcement {
    /// Uniform stirrups along the full segment
    pub fn uniform(av: f64, spacing: f64) -> Self {
        TransverseReinforcement {
            material: RebarMaterial::default(),
            stirrups: vec![StirrupZone {
                length: 0.0,
                av,
                spacing,
            }],
            confinement: None,
            splitting_area: 0.0,
        }
    }

    pub fn with_confinement(mut self, bar_diameter: f64, spacing: f64, zone_length: f64) -> Self {
        self.confinement = Some(ConfinementBars {
            bar_diameter,
            spacing,
            zone_length,
        });
        self
    }

    pub fn with_splitting_area(mut self, area: f64) -> Self {
        self.splitting_area = area;
        self
    }

    /// Stirrup zone governing distance `x` from the segment start
    pub fn zone_at(&self, x: f64, length: f64) -> Option<&StirrupZone> {
        let from_end = x.min(length - x).max(0.0);
        let mut start = 0.0;
        for zone in &self.stirrups {
            if from_end < start + zone.length {
                return Some(zone);
            }
            start += zone.length;
        }
        self.stirrups.last()
    }

    /// Transverse steel ratio Av/s at `x` (m²/m)
    pub fn av_over_s(&self, x: f64, length: f64) -> f64 {
        self.zone_at(x, length)
            .filter(|z| z.spacing > 0.0)
            .map(|z| z.av / z.spacing)
            .unwrap_or(0.0)
    }

    /// Boundaries of the stirrup zones measured from the segment start
    pub fn zone_boundaries(&self, length: f64) -> Vec<f64> {
        let mut boundaries = Vec::new();
        let mut start = 0.0;
        for zone in &self.stirrups {
            if zone.length <= 0.0 {
                break;
            }
            start += zone.length;
            if start < length / 2.0 {
                boundaries.push(start);
                boundaries.push(length - start);
            }
        }
        boundaries
    }
}

impl Default for TransverseReinforcement {
    fn default() -> Self {
        // Two-leg 13 mm stirrups at 300 mm
        Self::uniform(2.0 * 129.0e-6, 0.3)
    }
}

/// A layer of longitudinal bars running the full segment length
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalLayer {
    /// Total bar area in the layer (m²)
    pub area: f64,
    /// Height of the layer above the bottom of the girder (m)
    pub y: f64,
}

/// Longitudinal mild steel of a segment. It is bonded from casting and
/// carries the tensile force at release and negative moment at strength.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LongitudinalReinforcement {
    #[serde(default)]
    pub material: RebarMaterial,
    pub layers: Vec<LongitudinalLayer>,
}

impl LongitudinalReinforcement {
    pub fn with_layer(mut self, area: f64, y: f64) -> Self {
        self.layers.push(LongitudinalLayer { area, y });
        self
    }

    /// Total bar area with its centroid above height `y` (m²)
    pub fn area_above(&self, y: f64) -> f64 {
        self.layers.iter().filter(|l| l.y > y).map(|l| l.area).sum()
    }

    /// Total bar area with its centroid below height `y` (m²)
    pub fn area_below(&self, y: f64) -> f64 {
        self.layers.iter().filter(|l| l.y < y).map(|l| l.area).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reinforcement() -> TransverseReinforcement {
        TransverseReinforcement {
            material: RebarMaterial::default(),
            stirrups: vec![
                StirrupZone {
                    length: 1.5,
                    av: 400.0e-6,
                    spacing: 0.1,
                },
                StirrupZone {
                    length: 100.0,
                    av: 258.0e-6,
                    spacing: 0.3,
                },
            ],
            confinement: None,
            splitting_area: 0.0,
        }
    }

    #[test]
    fn test_zones_are_symmetric() {
        let r = reinforcement();
        assert_relative_eq!(r.av_over_s(0.5, 30.0), 400.0e-6 / 0.1);
        assert_relative_eq!(r.av_over_s(29.5, 30.0), 400.0e-6 / 0.1);
        assert_relative_eq!(r.av_over_s(15.0, 30.0), 258.0e-6 / 0.3);
    }

    #[test]
    fn test_zone_boundaries() {
        let r = reinforcement();
        assert_eq!(r.zone_boundaries(30.0), vec![1.5, 28.5]);
        assert!(TransverseReinforcement::default().zone_boundaries(30.0).is_empty());
    }

    #[test]
    fn test_longitudinal_area_by_zone() {
        let bars = LongitudinalReinforcement::default()
            .with_layer(1.2e-3, 1.55)
            .with_layer(0.8e-3, 0.05);
        assert_relative_eq!(bars.area_above(0.8), 1.2e-3);
        assert_relative_eq!(bars.area_below(0.8), 0.8e-3);
        assert_eq!(bars.area_above(1.6), 0.0);
    }
}
