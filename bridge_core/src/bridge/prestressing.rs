//! Pretensioned strand layouts and post-tensioning tendons.

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::materials::StrandMaterial;

// =============================================================================
// PRETENSIONING
// =============================================================================

/// Straight strands, optionally with some strands debonded at the ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StraightStrands {
    pub count: u32,
    /// Centroid height above the bottom of the girder (m)
    pub y: f64,
    /// Number of strands debonded at both ends
    #[serde(default)]
    pub debonded: u32,
    /// Debond length measured from each end (m)
    #[serde(default)]
    pub debond_length: f64,
    /// Strands placed in the bottom flange outside the web width
    #[serde(default)]
    pub outside_web: u32,
}

/// Harped strands. The profile is straight from each end up to the harp
/// points located at `harp_fraction` of the segment length from either end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarpedStrands {
    pub count: u32,
    /// Centroid height at the segment ends (m)
    pub y_end: f64,
    /// Centroid height between the harp points (m)
    pub y_harp: f64,
    #[serde(default = "default_harp_fraction")]
    pub harp_fraction: f64,
}

fn default_harp_fraction() -> f64 {
    0.4
}

/// Pretensioned strand pattern of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandLayout {
    pub material: StrandMaterial,
    pub straight: StraightStrands,
    #[serde(default)]
    pub harped: Option<HarpedStrands>,
    /// Jacking stress as a fraction of fpu
    #[serde(default = "default_pretension_jacking")]
    pub jacking_ratio: f64,
}

fn default_pretension_jacking() -> f64 {
    0.75
}

impl StrandLayout {
    /// Straight strands only, jacked to 0.75 fpu
    pub fn straight(material: StrandMaterial, count: u32, y: f64) -> Self {
        StrandLayout {
            material,
            straight: StraightStrands {
                count,
                y,
                debonded: 0,
                debond_length: 0.0,
                outside_web: 0,
            },
            harped: None,
            jacking_ratio: 0.75,
        }
    }

    /// Add a harped strand group (builder pattern)
    pub fn with_harped(mut self, count: u32, y_end: f64, y_harp: f64) -> Self {
        self.harped = Some(HarpedStrands {
            count,
            y_end,
            y_harp,
            harp_fraction: default_harp_fraction(),
        });
        self
    }

    /// Debond `count` straight strands over `length` at each end (builder pattern)
    pub fn with_debonding(mut self, count: u32, length: f64) -> Self {
        self.straight.debonded = count;
        self.straight.debond_length = length;
        self
    }

    pub fn total_strands(&self) -> u32 {
        self.straight.count + self.harped.as_ref().map(|h| h.count).unwrap_or(0)
    }

    pub fn total_area(&self) -> f64 {
        f64::from(self.total_strands()) * self.material.area
    }

    /// Jacking stress fpj (Pa)
    pub fn jacking_stress(&self) -> f64 {
        self.jacking_ratio * self.material.fpu
    }

    /// Straight strands bonded at distance `x` from the segment start
    pub fn bonded_straight(&self, x: f64, length: f64) -> u32 {
        let from_end = x.min(length - x);
        if self.straight.debonded > 0 && from_end < self.straight.debond_length {
            self.straight.count.saturating_sub(self.straight.debonded)
        } else {
            self.straight.count
        }
    }

    /// Harped strand centroid height at `x`, if the segment has harped strands
    pub fn harped_y(&self, x: f64, length: f64) -> Option<f64> {
        self.harped.as_ref().filter(|h| h.count > 0).map(|h| {
            let harp = h.harp_fraction * length;
            let from_end = x.min(length - x).max(0.0);
            if harp <= 0.0 || from_end >= harp {
                h.y_harp
            } else {
                h.y_end + (h.y_harp - h.y_end) * from_end / harp
            }
        })
    }

    /// Bonded strand area at `x` (m²)
    pub fn area_at(&self, x: f64, length: f64) -> f64 {
        let harped = self.harped.as_ref().map(|h| h.count).unwrap_or(0);
        f64::from(self.bonded_straight(x, length) + harped) * self.material.area
    }

    /// Centroid height of the bonded strands at `x` (m)
    pub fn centroid_at(&self, x: f64, length: f64) -> f64 {
        let ns = f64::from(self.bonded_straight(x, length));
        let (nh, yh) = match (self.harped.as_ref(), self.harped_y(x, length)) {
            (Some(h), Some(y)) => (f64::from(h.count), y),
            _ => (0.0, 0.0),
        };
        if ns + nh == 0.0 {
            return self.straight.y;
        }
        (ns * self.straight.y + nh * yh) / (ns + nh)
    }

    /// Slope of the harped strands between the end and the harp point (rise/run)
    pub fn harped_slope(&self, length: f64) -> Option<f64> {
        self.harped.as_ref().filter(|h| h.count > 0).map(|h| {
            let run = h.harp_fraction * length;
            if run > 0.0 {
                (h.y_end - h.y_harp).abs() / run
            } else {
                f64::INFINITY
            }
        })
    }

    /// Fraction of the strand force developed at `x` given the transfer length
    pub fn transfer_factor(&self, x: f64, length: f64, transfer_length: f64) -> f64 {
        if transfer_length <= 0.0 {
            return 1.0;
        }
        let from_end = x.min(length - x).max(0.0);
        // Debonded strands start transferring at the end of the debond length
        let bonded_from_end = if self.straight.debonded > 0 && from_end >= self.straight.debond_length {
            from_end - self.straight.debond_length
        } else {
            from_end
        };
        let total = f64::from(self.total_strands());
        if total == 0.0 {
            return 0.0;
        }
        let fully_bonded = f64::from(self.total_strands() - self.straight.debonded.min(self.straight.count));
        let debonded = f64::from(self.straight.debonded.min(self.straight.count));
        let f_bonded = (from_end / transfer_length).min(1.0);
        let f_debonded = if from_end >= self.straight.debond_length {
            (bonded_from_end / transfer_length).min(1.0)
        } else {
            0.0
        };
        (fully_bonded * f_bonded + debonded * f_debonded) / total
    }

    pub fn validate(&self, element: &str, height: f64) -> BridgeResult<()> {
        if self.straight.debonded > self.straight.count {
            return Err(BridgeError::geometry(element, "more strands debonded than straight strands"));
        }
        if self.straight.y < 0.0 || self.straight.y > height {
            return Err(BridgeError::geometry(element, "straight strands lie outside the girder"));
        }
        if let Some(h) = &self.harped {
            if h.y_end < 0.0 || h.y_end > height || h.y_harp < 0.0 || h.y_harp > height {
                return Err(BridgeError::geometry(element, "harped strands lie outside the girder"));
            }
            if !(0.0..=0.5).contains(&h.harp_fraction) {
                return Err(BridgeError::geometry(element, "harp point must lie in the first half of the segment"));
            }
        }
        if !(0.0..1.0).contains(&self.jacking_ratio) {
            return Err(BridgeError::invalid_input(
                "jacking_ratio",
                self.jacking_ratio.to_string(),
                "must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// POST-TENSIONING
// =============================================================================

/// Which end(s) of a tendon are jacked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JackingEnd {
    #[default]
    Start,
    End,
    Both,
}

/// Round duct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duct {
    /// Outside diameter (m)
    pub outer_diameter: f64,
    /// Inside diameter (m)
    pub inner_diameter: f64,
}

impl Duct {
    pub fn inner_area(&self) -> f64 {
        std::f64::consts::PI * self.inner_diameter.powi(2) / 4.0
    }

    pub fn outer_area(&self) -> f64 {
        std::f64::consts::PI * self.outer_diameter.powi(2) / 4.0
    }
}

/// A vertex of a tendon's piecewise-linear profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TendonPoint {
    /// Station along the girder line (m)
    pub station: f64,
    /// Height of the tendon centroid above the bottom of the girder (m)
    pub y: f64,
}

/// A field-stressed tendon spanning one or more segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tendon {
    pub name: String,
    pub strand: StrandMaterial,
    pub strand_count: u32,
    pub duct: Duct,
    pub profile: Vec<TendonPoint>,
    /// Curvature friction coefficient μ
    #[serde(default = "default_mu")]
    pub friction_coefficient: f64,
    /// Wobble coefficient K (1/m)
    #[serde(default = "default_wobble")]
    pub wobble: f64,
    /// Anchor set (m)
    #[serde(default = "default_anchor_set")]
    pub anchor_set: f64,
    #[serde(default)]
    pub jacking_end: JackingEnd,
    /// Jacking stress as a fraction of fpu
    #[serde(default = "default_tendon_jacking")]
    pub jacking_ratio: f64,
}

fn default_mu() -> f64 {
    0.25
}

fn default_wobble() -> f64 {
    6.6e-4
}

fn default_anchor_set() -> f64 {
    0.00635
}

fn default_tendon_jacking() -> f64 {
    0.80
}

impl Tendon {
    pub fn area(&self) -> f64 {
        f64::from(self.strand_count) * self.strand.area
    }

    pub fn jacking_stress(&self) -> f64 {
        self.jacking_ratio * self.strand.fpu
    }

    pub fn start_station(&self) -> f64 {
        self.profile.first().map(|p| p.station).unwrap_or(0.0)
    }

    pub fn end_station(&self) -> f64 {
        self.profile.last().map(|p| p.station).unwrap_or(0.0)
    }

    pub fn length(&self) -> f64 {
        self.end_station() - self.start_station()
    }

    /// True when `station` lies within the tendon's extent
    pub fn covers(&self, station: f64) -> bool {
        station >= self.start_station() - 1.0e-9 && station <= self.end_station() + 1.0e-9
    }

    /// Tendon height at `station`, linearly interpolated
    pub fn y_at(&self, station: f64) -> Option<f64> {
        if !self.covers(station) {
            return None;
        }
        let station = station.clamp(self.start_station(), self.end_station());
        self.profile.windows(2).find_map(|w| {
            let (a, b) = (w[0], w[1]);
            if station >= a.station && station <= b.station {
                let dx = b.station - a.station;
                Some(if dx > 0.0 {
                    a.y + (b.y - a.y) * (station - a.station) / dx
                } else {
                    a.y
                })
            } else {
                None
            }
        })
    }

    /// Slope dy/dx of the segment of the profile containing `station`
    pub fn slope_at(&self, station: f64) -> f64 {
        self.profile
            .windows(2)
            .find(|w| station >= w[0].station && station <= w[1].station)
            .map(|w| {
                let dx = w[1].station - w[0].station;
                if dx > 0.0 {
                    (w[1].y - w[0].y) / dx
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Cumulative angular change from the start of the tendon to `station` (rad)
    pub fn angular_change_to(&self, station: f64) -> f64 {
        let mut alpha = 0.0;
        let mut previous: Option<f64> = None;
        for w in self.profile.windows(2) {
            if w[0].station >= station {
                break;
            }
            let dx = w[1].station - w[0].station;
            let theta = if dx > 0.0 { ((w[1].y - w[0].y) / dx).atan() } else { 0.0 };
            if let Some(prev) = previous {
                alpha += (theta - prev).abs();
            }
            previous = Some(theta);
        }
        alpha
    }

    pub fn validate(&self, girder_length: f64) -> BridgeResult<()> {
        let element = format!("tendon '{}'", self.name);
        if self.profile.len() < 2 {
            return Err(BridgeError::geometry(element, "profile needs at least two points"));
        }
        if self.profile.windows(2).any(|w| w[1].station <= w[0].station) {
            return Err(BridgeError::geometry(element, "profile stations must increase"));
        }
        if self.start_station() < -1.0e-9 || self.end_station() > girder_length + 1.0e-9 {
            return Err(BridgeError::geometry(element, "tendon extends beyond the girder"));
        }
        if self.strand_count == 0 {
            return Err(BridgeError::geometry(element, "tendon has no strands"));
        }
        if self.duct.inner_diameter <= 0.0 || self.duct.outer_diameter < self.duct.inner_diameter {
            return Err(BridgeError::geometry(element, "invalid duct diameters"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layout() -> StrandLayout {
        StrandLayout::straight(StrandMaterial::low_relaxation_15_2(), 20, 0.1)
            .with_harped(8, 1.2, 0.15)
            .with_debonding(4, 2.0)
    }

    #[test]
    fn test_bonded_strands_and_area() {
        let layout = layout();
        assert_eq!(layout.total_strands(), 28);
        assert_eq!(layout.bonded_straight(1.0, 30.0), 16);
        assert_eq!(layout.bonded_straight(15.0, 30.0), 20);
        assert_relative_eq!(layout.area_at(15.0, 30.0), 28.0 * 140.0e-6);
    }

    #[test]
    fn test_harped_profile() {
        let layout = layout();
        assert_relative_eq!(layout.harped_y(0.0, 30.0).unwrap(), 1.2);
        assert_relative_eq!(layout.harped_y(15.0, 30.0).unwrap(), 0.15);
        assert_relative_eq!(layout.harped_y(6.0, 30.0).unwrap(), 1.2 + (0.15 - 1.2) * 0.5);
        assert_relative_eq!(layout.harped_slope(30.0).unwrap(), 1.05 / 12.0);
    }

    #[test]
    fn test_centroid_at_midspan() {
        let layout = layout();
        let y = layout.centroid_at(15.0, 30.0);
        assert_relative_eq!(y, (20.0 * 0.1 + 8.0 * 0.15) / 28.0);
    }

    #[test]
    fn test_transfer_factor() {
        let layout = StrandLayout::straight(StrandMaterial::low_relaxation_15_2(), 10, 0.1);
        assert_relative_eq!(layout.transfer_factor(0.0, 30.0, 0.9), 0.0);
        assert_relative_eq!(layout.transfer_factor(0.45, 30.0, 0.9), 0.5);
        assert_relative_eq!(layout.transfer_factor(15.0, 30.0, 0.9), 1.0);
    }

    fn tendon() -> Tendon {
        Tendon {
            name: "T1".into(),
            strand: StrandMaterial::low_relaxation_15_2(),
            strand_count: 12,
            duct: Duct {
                outer_diameter: 0.085,
                inner_diameter: 0.080,
            },
            profile: vec![
                TendonPoint { station: 0.0, y: 0.9 },
                TendonPoint { station: 20.0, y: 0.2 },
                TendonPoint { station: 40.0, y: 0.9 },
            ],
            friction_coefficient: 0.25,
            wobble: 6.6e-4,
            anchor_set: 0.00635,
            jacking_end: JackingEnd::Start,
            jacking_ratio: 0.80,
        }
    }

    #[test]
    fn test_tendon_geometry() {
        let t = tendon();
        assert_relative_eq!(t.length(), 40.0);
        assert_relative_eq!(t.y_at(10.0).unwrap(), 0.55);
        assert!(t.y_at(41.0).is_none());
        assert_relative_eq!(t.angular_change_to(10.0), 0.0);
        assert_relative_eq!(t.angular_change_to(30.0), 2.0 * (0.7_f64 / 20.0).atan(), max_relative = 1e-12);
        assert!(t.validate(40.0).is_ok());
        assert!(t.validate(30.0).is_err());
    }
}
