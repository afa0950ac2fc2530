//! Tendon stress along the duct after friction and anchor set.
//!
//! Friction follows fpx = fpj·e^-(Kx + μα), with α the cumulative angular
//! change of the profile from the jacking end. Anchor set draws the stress
//! down near the anchorage until the area between the friction curve and
//! the seated curve equals Ep·Δset.

use serde::{Deserialize, Serialize};

use crate::bridge::{JackingEnd, Tendon};

/// Samples along the tendon used for integration
const SAMPLES: usize = 400;

/// Stress in one tendon after friction and anchor set.
///
/// # Example
///
/// ```rust
/// use bridge_core::losses::friction::TendonForceProfile;
/// use bridge_core::project::Project;
///
/// let project = Project::spliced_example();
/// let tendon = &project.bridge.tendons[0];
/// let profile = TendonForceProfile::new(tendon);
///
/// // Friction only ever reduces the jacking stress
/// let mid = 0.5 * (tendon.start_station() + tendon.end_station());
/// assert!(profile.stress_after_friction(mid) < tendon.jacking_stress());
/// assert!(profile.stress(mid) <= profile.stress_after_friction(mid));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TendonForceProfile {
    fpj: f64,
    stations: Vec<f64>,
    after_friction: Vec<f64>,
    after_set: Vec<f64>,
    /// Length affected by anchor set at the start and end anchorages (m)
    set_lengths: (f64, f64),
}

impl TendonForceProfile {
    pub fn new(tendon: &Tendon) -> Self {
        let start = tendon.start_station();
        let length = tendon.length().max(0.0);
        let fpj = tendon.jacking_stress();
        let stations: Vec<f64> = (0..=SAMPLES)
            .map(|i| start + length * i as f64 / SAMPLES as f64)
            .collect();
        let total_alpha = tendon.angular_change_to(tendon.end_station() + 1.0);
        let set_area = tendon.strand.ep * tendon.anchor_set;

        // Friction from the start anchorage, then from the end anchorage
        let from_start: Vec<f64> = stations
            .iter()
            .map(|&s| {
                let x = s - start;
                fpj * (-(tendon.wobble * x + tendon.friction_coefficient * tendon.angular_change_to(s))).exp()
            })
            .collect();
        let from_end: Vec<f64> = stations
            .iter()
            .map(|&s| {
                let x = tendon.end_station() - s;
                let alpha = total_alpha - tendon.angular_change_to(s);
                fpj * (-(tendon.wobble * x + tendon.friction_coefficient * alpha)).exp()
            })
            .collect();

        let (after_friction, after_set, set_lengths) = match tendon.jacking_end {
            JackingEnd::Start => {
                let (seated, l) = seat(&stations, &from_start, set_area);
                (from_start, seated, (l, 0.0))
            }
            JackingEnd::End => {
                let (seated, l) = seat_reversed(&stations, &from_end, set_area);
                (from_end, seated, (0.0, l))
            }
            JackingEnd::Both => {
                let friction: Vec<f64> = from_start.iter().zip(&from_end).map(|(a, b)| a.max(*b)).collect();
                let (seated, ls) = seat(&stations, &friction, set_area);
                let (seated, le) = seat_reversed(&stations, &seated, set_area);
                (friction, seated, (ls, le))
            }
        };

        TendonForceProfile {
            fpj,
            stations,
            after_friction,
            after_set,
            set_lengths,
        }
    }

    pub fn jacking_stress(&self) -> f64 {
        self.fpj
    }

    /// Stress after friction, before seating (Pa)
    pub fn stress_after_friction(&self, station: f64) -> f64 {
        interpolate(&self.stations, &self.after_friction, station)
    }

    /// Stress after friction and anchor set (Pa)
    pub fn stress(&self, station: f64) -> f64 {
        interpolate(&self.stations, &self.after_set, station)
    }

    /// Friction plus anchor set loss at `station` (Pa)
    pub fn loss(&self, station: f64) -> f64 {
        self.fpj - self.stress(station)
    }

    /// Largest seated stress anywhere along the tendon (Pa)
    pub fn max_stress(&self) -> f64 {
        self.after_set.iter().copied().fold(0.0, f64::max)
    }

    /// Stress immediately behind the anchorages after seating (Pa)
    pub fn anchorage_stress(&self) -> f64 {
        match (self.after_set.first(), self.after_set.last()) {
            (Some(a), Some(b)) => a.max(*b),
            _ => 0.0,
        }
    }

    /// Tendon-length average of the seated stress (Pa)
    pub fn average(&self) -> f64 {
        let length = match (self.stations.first(), self.stations.last()) {
            (Some(a), Some(b)) if b > a => b - a,
            _ => return self.after_set.first().copied().unwrap_or(self.fpj),
        };
        trapezoid(&self.stations, &self.after_set) / length
    }

    /// Lengths affected by anchor set at the start and end anchorages (m)
    pub fn anchor_set_lengths(&self) -> (f64, f64) {
        self.set_lengths
    }
}

/// Apply anchor set at the first station of a friction curve that decreases
/// away from it. Returns the seated curve and the affected length.
fn seat(stations: &[f64], friction: &[f64], set_area: f64) -> (Vec<f64>, f64) {
    let n = stations.len();
    if n < 2 || set_area <= 0.0 {
        return (friction.to_vec(), 0.0);
    }
    let x0 = stations[0];
    // area(i) = 2 ∫0^xi (f - f(xi)) dx
    let mut integral = 0.0;
    let mut previous_area = 0.0;
    for i in 1..n {
        integral += 0.5 * (friction[i] + friction[i - 1]) * (stations[i] - stations[i - 1]);
        let l = stations[i] - x0;
        let area = 2.0 * (integral - l * friction[i]);
        if area >= set_area {
            // Interpolate the zone end between samples i-1 and i
            let t = if area > previous_area {
                (set_area - previous_area) / (area - previous_area)
            } else {
                1.0
            };
            let x_set = stations[i - 1] + t * (stations[i] - stations[i - 1]);
            let f_set = friction[i - 1] + t * (friction[i] - friction[i - 1]);
            let seated = stations
                .iter()
                .zip(friction)
                .map(|(&s, &f)| if s < x_set { 2.0 * f_set - f } else { f })
                .collect();
            return (seated, x_set - x0);
        }
        previous_area = area;
    }
    // The set zone covers the whole tendon; shift the mirrored curve uniformly
    let length = stations[n - 1] - x0;
    let f_end = friction[n - 1];
    let shift = (set_area - previous_area) / length;
    let seated = friction.iter().map(|&f| (2.0 * f_end - f - shift).max(0.0)).collect();
    (seated, length)
}

fn seat_reversed(stations: &[f64], friction: &[f64], set_area: f64) -> (Vec<f64>, f64) {
    let last = stations.last().copied().unwrap_or(0.0);
    let mirrored: Vec<f64> = stations.iter().rev().map(|s| last - s).collect();
    let reversed: Vec<f64> = friction.iter().rev().copied().collect();
    let (mut seated, length) = seat(&mirrored, &reversed, set_area);
    seated.reverse();
    (seated, length)
}

fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (ys[0] + ys[1]) * (xs[1] - xs[0]))
        .sum()
}

fn interpolate(x: &[f64], y: &[f64], at: f64) -> f64 {
    match (x.first(), x.last()) {
        (Some(&first), Some(&last)) => {
            if at <= first {
                return y[0];
            }
            if at >= last {
                return y[y.len() - 1];
            }
        }
        _ => return 0.0,
    }
    let i = x.partition_point(|&s| s <= at).clamp(1, x.len() - 1);
    let (x0, x1) = (x[i - 1], x[i]);
    let t = if x1 > x0 { (at - x0) / (x1 - x0) } else { 0.0 };
    y[i - 1] + t * (y[i] - y[i - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Duct, TendonPoint};
    use crate::materials::StrandMaterial;
    use approx::assert_relative_eq;

    fn straight_tendon(jacking_end: JackingEnd, anchor_set: f64) -> Tendon {
        Tendon {
            name: "T".to_string(),
            strand: StrandMaterial::low_relaxation_15_2(),
            strand_count: 12,
            duct: Duct {
                outer_diameter: 0.085,
                inner_diameter: 0.08,
            },
            profile: vec![TendonPoint { station: 0.0, y: 0.5 }, TendonPoint { station: 40.0, y: 0.5 }],
            friction_coefficient: 0.25,
            wobble: 6.6e-4,
            anchor_set,
            jacking_end,
            jacking_ratio: 0.8,
        }
    }

    #[test]
    fn test_wobble_only_friction() {
        let tendon = straight_tendon(JackingEnd::Start, 0.0);
        let profile = TendonForceProfile::new(&tendon);
        let fpj = tendon.jacking_stress();
        assert_relative_eq!(profile.stress(0.0), fpj, max_relative = 1e-12);
        assert_relative_eq!(profile.stress(40.0), fpj * (-6.6e-4 * 40.0f64).exp(), max_relative = 1e-9);
        assert_eq!(profile.anchor_set_lengths(), (0.0, 0.0));
    }

    #[test]
    fn test_anchor_set_area_matches_seating() {
        let tendon = straight_tendon(JackingEnd::Start, 0.00635);
        let profile = TendonForceProfile::new(&tendon);
        let (l_set, _) = profile.anchor_set_lengths();
        assert!(l_set > 0.0 && l_set < 40.0);

        // Linear friction slope p: L_set = sqrt(Ep·Δ / p)
        let fpj = tendon.jacking_stress();
        let p = fpj * 6.6e-4;
        let expected = (tendon.strand.ep * 0.00635 / p).sqrt();
        assert_relative_eq!(l_set, expected, max_relative = 0.02);

        // Seated stress is lowest at the anchorage
        assert!(profile.stress(0.0) < profile.stress(l_set));
        assert_relative_eq!(profile.stress(l_set + 1.0), profile.stress_after_friction(l_set + 1.0));
    }

    #[test]
    fn test_set_zone_longer_than_tendon() {
        let mut tendon = straight_tendon(JackingEnd::Start, 0.05);
        tendon.profile[1].station = 10.0;
        let profile = TendonForceProfile::new(&tendon);
        assert_relative_eq!(profile.anchor_set_lengths().0, 10.0);
        // Total seating loss area equals Ep·Δset
        let lost: f64 = (0..=100)
            .map(|i| {
                let s = i as f64 * 0.1;
                profile.stress_after_friction(s) - profile.stress(s)
            })
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]) * 0.1)
            .sum();
        assert_relative_eq!(lost, tendon.strand.ep * 0.05, max_relative = 0.01);
    }

    #[test]
    fn test_end_jacking_mirrors_start() {
        let start = TendonForceProfile::new(&straight_tendon(JackingEnd::Start, 0.00635));
        let end = TendonForceProfile::new(&straight_tendon(JackingEnd::End, 0.00635));
        for s in [0.0, 5.0, 12.5, 20.0, 33.0] {
            assert_relative_eq!(start.stress(s), end.stress(40.0 - s), max_relative = 1e-6);
        }
    }

    #[test]
    fn test_both_ends_symmetric_and_stronger() {
        let both = TendonForceProfile::new(&straight_tendon(JackingEnd::Both, 0.001));
        let start = TendonForceProfile::new(&straight_tendon(JackingEnd::Start, 0.001));
        assert_relative_eq!(both.stress(10.0), both.stress(30.0), max_relative = 1e-6);
        assert!(both.stress(38.0) > start.stress(38.0));
        assert!(both.average() > start.average());
    }

    #[test]
    fn test_curvature_friction() {
        let tendon = Tendon {
            profile: vec![
                TendonPoint { station: 0.0, y: 1.0 },
                TendonPoint { station: 20.0, y: 0.2 },
                TendonPoint { station: 40.0, y: 1.0 },
            ],
            ..straight_tendon(JackingEnd::Start, 0.0)
        };
        let profile = TendonForceProfile::new(&tendon);
        let alpha = 2.0 * (0.8f64 / 20.0).atan();
        let expected = tendon.jacking_stress() * (-(6.6e-4 * 30.0 + 0.25 * alpha)).exp();
        assert_relative_eq!(profile.stress(30.0), expected, max_relative = 1e-6);
    }

    #[test]
    fn test_average_between_extremes() {
        let profile = TendonForceProfile::new(&straight_tendon(JackingEnd::Start, 0.00635));
        let avg = profile.average();
        assert!(avg < profile.max_stress());
        assert!(avg > profile.stress(40.0).min(profile.stress(0.0)));
    }
}
