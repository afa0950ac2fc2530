//! # Vehicular Live Load
//!
//! HL-93 live load (design truck or tandem, plus lane load) and the fatigue
//! truck, moved across influence lines of the structural model that stands
//! when live load is first applied.
//!
//! ```text
//! design truck   35 kN --4.3 m-- 145 kN --4.3 m-- 145 kN
//! design tandem  110 kN --1.2 m-- 110 kN
//! lane           9.3 kN/m over the parts of the influence line of one sign
//! fatigue truck  35 kN --4.3 m-- 145 kN --9.0 m-- 145 kN
//! ```
//!
//! Moments and shears are scaled by the distribution factor; the dynamic
//! load allowance applies to the truck and tandem only. For negative moment
//! 90% of two trucks 15 m apart plus 90% of the lane load is also
//! considered. Deflection uses the larger of the truck alone and 25% of the
//! truck plus the lane load, distributed equally to all girders.
//!
//! ## Reference
//!
//! AASHTO LRFD 3.6.1.2, 3.6.1.3, 3.6.1.4, 3.6.2, 4.6.2.2

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::fem::{LineGirderSolver, LoadSet};
use super::model::StructuralModel;
use super::{flexural_stresses, PointResponse, ResponseType};
use crate::errors::{BridgeError, BridgeResult};
use crate::poi::PoiId;
use crate::provisions::{CodeProvisions, DistributionAction};
use crate::sections::{SectionEngine, SectionPropertyType};
use crate::settings::LiveLoadSettings;

const STAGE: &str = "live load";

/// Design lane load (N/m)
pub const LANE_LOAD: f64 = 9.3e3;

/// Headway between the two trucks of the negative-moment train (m)
const DUAL_TRUCK_HEADWAY: f64 = 15.0;

const DUAL_TRUCK_FACTOR: f64 = 0.9;

/// Design lane width for counting loaded lanes (m)
const LANE_WIDTH: f64 = 3.6;

/// An axle at `offset` behind the lead axle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axle {
    pub offset: f64,
    /// Axle weight (N)
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,
    pub axles: Vec<Axle>,
}

impl Vehicle {
    fn new(name: &str, axles: &[(f64, f64)]) -> Self {
        Vehicle {
            name: name.to_string(),
            axles: axles.iter().map(|&(offset, weight)| Axle { offset, weight }).collect(),
        }
    }

    pub fn length(&self) -> f64 {
        self.axles.iter().map(|a| a.offset).fold(0.0, f64::max)
    }

    /// Two copies of this vehicle, the second following at `headway` behind the last axle
    fn train(&self, headway: f64) -> Vehicle {
        let shift = self.length() + headway;
        let mut axles = self.axles.clone();
        axles.extend(self.axles.iter().map(|a| Axle {
            offset: a.offset + shift,
            weight: a.weight,
        }));
        Vehicle {
            name: format!("Two {}", self.name),
            axles,
        }
    }
}

pub static DESIGN_TRUCK: Lazy<Vehicle> =
    Lazy::new(|| Vehicle::new("HL-93 Truck", &[(0.0, 35.0e3), (4.3, 145.0e3), (8.6, 145.0e3)]));

pub static DESIGN_TANDEM: Lazy<Vehicle> = Lazy::new(|| Vehicle::new("HL-93 Tandem", &[(0.0, 110.0e3), (1.2, 110.0e3)]));

pub static FATIGUE_TRUCK: Lazy<Vehicle> =
    Lazy::new(|| Vehicle::new("Fatigue Truck", &[(0.0, 35.0e3), (4.3, 145.0e3), (13.3, 145.0e3)]));

/// Multiple presence factor for `lanes` loaded lanes
fn multiple_presence(lanes: u32) -> f64 {
    match lanes {
        0 | 1 => 1.2,
        2 => 1.0,
        3 => 0.85,
        _ => 0.65,
    }
}

// =============================================================================
// Influence lines
// =============================================================================

/// Response at a fixed point to a unit downward load moving along the girder
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfluenceLine {
    stations: Vec<f64>,
    values: Vec<f64>,
}

impl InfluenceLine {
    pub fn new(stations: Vec<f64>, values: Vec<f64>) -> Self {
        InfluenceLine { stations, values }
    }

    /// Linear interpolation, zero off the girder
    pub fn value_at(&self, x: f64) -> f64 {
        let (Some(&first), Some(&last)) = (self.stations.first(), self.stations.last()) else {
            return 0.0;
        };
        if x < first || x > last {
            return 0.0;
        }
        let i = self.stations.partition_point(|&s| s <= x);
        if i == 0 {
            return self.values[0];
        }
        if i >= self.stations.len() {
            return self.values[self.values.len() - 1];
        }
        let (x0, x1) = (self.stations[i - 1], self.stations[i]);
        let (y0, y1) = (self.values[i - 1], self.values[i]);
        if x1 - x0 <= 0.0 {
            y1
        } else {
            y0 + (y1 - y0) * (x - x0) / (x1 - x0)
        }
    }

    /// Areas of the negative and positive parts
    pub fn areas(&self) -> (f64, f64) {
        let mut negative = 0.0;
        let mut positive = 0.0;
        for i in 1..self.stations.len() {
            let (x0, x1) = (self.stations[i - 1], self.stations[i]);
            let (y0, y1) = (self.values[i - 1], self.values[i]);
            let dx = x1 - x0;
            if dx <= 0.0 {
                continue;
            }
            if y0 * y1 >= 0.0 {
                let area = (y0 + y1) / 2.0 * dx;
                if area >= 0.0 {
                    positive += area;
                } else {
                    negative += area;
                }
            } else {
                // Sign change inside the panel
                let xc = dx * y0.abs() / (y0.abs() + y1.abs());
                for (y, length) in [(y0, xc), (y1, dx - xc)] {
                    let area = y / 2.0 * length;
                    if area >= 0.0 {
                        positive += area;
                    } else {
                        negative += area;
                    }
                }
            }
        }
        (negative, positive)
    }

    /// Extreme (min, max) effect of a vehicle travelling in either direction
    pub fn vehicle_extremes(&self, vehicle: &Vehicle) -> (f64, f64) {
        let mut min = 0.0_f64;
        let mut max = 0.0_f64;
        for &station in &self.stations {
            for axle in &vehicle.axles {
                for direction in [1.0, -1.0] {
                    // Place this axle on the station
                    let lead = station + direction * axle.offset;
                    let effect: f64 = vehicle
                        .axles
                        .iter()
                        .map(|a| a.weight * self.value_at(lead - direction * a.offset))
                        .sum();
                    min = min.min(effect);
                    max = max.max(effect);
                }
            }
        }
        (min, max)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Live load envelope at a POI, per girder, with dynamic load allowance
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveLoadEnvelope {
    pub min: PointResponse,
    pub max: PointResponse,
}

impl LiveLoadEnvelope {
    pub fn value(&self, response: ResponseType, maximize: bool) -> f64 {
        if maximize {
            self.max.value(response)
        } else {
            self.min.value(response)
        }
    }
}

/// Live load results for one structural model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveLoadResults {
    /// Interval in which live load is first applied
    pub interval: usize,
    pub design: BTreeMap<PoiId, LiveLoadEnvelope>,
    pub fatigue: BTreeMap<PoiId, LiveLoadEnvelope>,
    /// Moment and shear distribution factors used at each POI
    pub distribution: BTreeMap<PoiId, (f64, f64)>,
}

impl LiveLoadResults {
    pub fn design(&self, poi: PoiId) -> LiveLoadEnvelope {
        self.design.get(&poi).copied().unwrap_or_default()
    }

    pub fn fatigue(&self, poi: PoiId) -> LiveLoadEnvelope {
        self.fatigue.get(&poi).copied().unwrap_or_default()
    }
}

/// Everything the live load analysis reads
pub struct LiveLoadContext<'a> {
    pub sections: &'a SectionEngine<'a>,
    pub provisions: &'a dyn CodeProvisions,
    pub solver: &'a dyn LineGirderSolver,
    pub settings: &'a LiveLoadSettings,
    pub section_type: SectionPropertyType,
}

impl LiveLoadContext<'_> {
    fn distribution_factor(&self, poi: PoiId, action: DistributionAction) -> BridgeResult<f64> {
        let supplied = match action {
            DistributionAction::Moment => self.settings.moment_df_override,
            DistributionAction::Shear => self.settings.shear_df_override,
        };
        if let Some(df) = supplied {
            return Ok(df);
        }
        let inputs = self.sections.distribution_inputs(poi)?;
        self.provisions.distribution_factor(action, &inputs)
    }

    /// Lanes per girder for deflection: all lanes loaded, shared by all girders
    fn deflection_factor(&self) -> f64 {
        let bridge = self.sections.bridge();
        let girders = bridge.girder_count.max(1);
        let width = bridge.girder_spacing * f64::from(girders);
        let lanes = ((width / LANE_WIDTH).floor() as u32).max(1);
        f64::from(lanes) * multiple_presence(lanes) / f64::from(girders)
    }
}

/// Influence lines of moment, shear and deflection at every POI of a model
fn influence_lines(
    model: &StructuralModel,
    solver: &dyn LineGirderSolver,
) -> BridgeResult<BTreeMap<PoiId, [InfluenceLine; 3]>> {
    // One load position per distinct station
    let mut positions: Vec<(f64, usize)> = model
        .line()
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, n)| (n.station, i))
        .collect();
    positions.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    positions.dedup_by(|b, a| (b.0 - a.0).abs() < 1.0e-9);

    let loads: Vec<LoadSet> = positions.iter().map(|&(_, node)| LoadSet::new().with_point(node, 1.0)).collect();
    let responses = solver.solve(model.line(), &loads)?;
    let stations: Vec<f64> = positions.iter().map(|(s, _)| *s).collect();

    let mut lines = BTreeMap::new();
    for (poi, _) in model.poi_map().iter() {
        let mut values = [
            Vec::with_capacity(stations.len()),
            Vec::with_capacity(stations.len()),
            Vec::with_capacity(stations.len()),
        ];
        for response in &responses {
            let forces = model.forces_at(response, poi).unwrap_or_default();
            values[0].push(forces.moment);
            values[1].push(forces.shear);
            values[2].push(forces.deflection);
        }
        let [m, v, d] = values;
        lines.insert(
            poi,
            [
                InfluenceLine::new(stations.clone(), m),
                InfluenceLine::new(stations.clone(), v),
                InfluenceLine::new(stations.clone(), d),
            ],
        );
    }
    Ok(lines)
}

/// Envelope of the HL-93 combinations on one influence line, before distribution
fn design_extremes(line: &InfluenceLine, im: f64, negative_moment_train: bool) -> (f64, f64) {
    let (truck_min, truck_max) = line.vehicle_extremes(&DESIGN_TRUCK);
    let (tandem_min, tandem_max) = line.vehicle_extremes(&DESIGN_TANDEM);
    let (lane_min, lane_max) = line.areas();
    let mut min = truck_min.min(tandem_min) * (1.0 + im) + lane_min * LANE_LOAD;
    let max = truck_max.max(tandem_max) * (1.0 + im) + lane_max * LANE_LOAD;
    if negative_moment_train {
        let (train_min, _) = line.vehicle_extremes(&DESIGN_TRUCK.train(DUAL_TRUCK_HEADWAY));
        min = min.min(DUAL_TRUCK_FACTOR * (train_min * (1.0 + im) + lane_min * LANE_LOAD));
    }
    (min, max)
}

/// Live load envelopes at every POI of `model`
pub fn analyze_live_load(ctx: &LiveLoadContext<'_>, model: &StructuralModel) -> BridgeResult<LiveLoadResults> {
    if model.is_empty() {
        return Err(BridgeError::validation(
            STAGE,
            format!("no girder is erected in live load interval {}", model.interval),
        ));
    }
    if ctx.settings.moment_df_override.is_some() || ctx.settings.shear_df_override.is_some() {
        tracing::warn!(
            moment = ?ctx.settings.moment_df_override,
            shear = ?ctx.settings.shear_df_override,
            "live load distribution factors supplied by override"
        );
    }
    let interval = model.interval;
    let im = ctx.settings.dynamic_allowance;
    let continuous = model.support_locations().len() > 2;
    let deflection_df = ctx.deflection_factor();

    let mut results = LiveLoadResults {
        interval,
        ..LiveLoadResults::default()
    };
    for (poi, [moment, shear, deflection]) in influence_lines(model, ctx.solver)? {
        let dfm = ctx.distribution_factor(poi, DistributionAction::Moment)?;
        let dfv = ctx.distribution_factor(poi, DistributionAction::Shear)?;
        results.distribution.insert(poi, (dfm, dfv));

        let (m_min, m_max) = design_extremes(&moment, im, continuous);
        let (v_min, v_max) = design_extremes(&shear, im, false);
        let (truck_d_min, _) = deflection.vehicle_extremes(&DESIGN_TRUCK);
        let (lane_d_min, _) = deflection.areas();
        let truck_d = truck_d_min * (1.0 + im);
        let d_min = truck_d.min(0.25 * truck_d + lane_d_min * LANE_LOAD) * deflection_df;

        let envelope = envelope_at(ctx, poi, interval, (m_min * dfm, m_max * dfm), (v_min * dfv, v_max * dfv), d_min)?;
        results.design.insert(poi, envelope);

        if ctx.settings.include_fatigue {
            // Single-lane factor without multiple presence
            let dff = dfm / multiple_presence(1);
            let (f_min, f_max) = moment.vehicle_extremes(&FATIGUE_TRUCK);
            let (fv_min, fv_max) = shear.vehicle_extremes(&FATIGUE_TRUCK);
            let scale = (1.0 + ctx.settings.fatigue_allowance) * dff;
            let envelope = envelope_at(
                ctx,
                poi,
                interval,
                (f_min * scale, f_max * scale),
                (fv_min * scale, fv_max * scale),
                0.0,
            )?;
            results.fatigue.insert(poi, envelope);
        }
    }
    tracing::debug!(interval, pois = results.design.len(), "live load envelopes computed");
    Ok(results)
}

fn envelope_at(
    ctx: &LiveLoadContext<'_>,
    poi: PoiId,
    interval: usize,
    moment: (f64, f64),
    shear: (f64, f64),
    deflection: f64,
) -> BridgeResult<LiveLoadEnvelope> {
    let at_min = flexural_stresses(ctx.sections, poi, interval, ctx.section_type, moment.0)?;
    let at_max = flexural_stresses(ctx.sections, poi, interval, ctx.section_type, moment.1)?;
    let lower = |a: f64, b: f64| a.min(b);
    let upper = |a: f64, b: f64| a.max(b);
    let min = PointResponse {
        moment: moment.0,
        shear: shear.0,
        deflection,
        rotation: 0.0,
        top_girder: lower(at_min.top_girder, at_max.top_girder),
        bottom_girder: lower(at_min.bottom_girder, at_max.bottom_girder),
        top_deck: lower(at_min.top_deck, at_max.top_deck),
    };
    let max = PointResponse {
        moment: moment.1,
        shear: shear.1,
        deflection: 0.0,
        rotation: 0.0,
        top_girder: upper(at_min.top_girder, at_max.top_girder),
        bottom_girder: upper(at_min.bottom_girder, at_max.bottom_girder),
        top_deck: upper(at_min.top_deck, at_max.top_deck),
    };
    Ok(LiveLoadEnvelope { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Midspan moment influence line of a simple span
    fn midspan_moment(span: f64, panels: usize) -> InfluenceLine {
        let stations: Vec<f64> = (0..=panels).map(|i| span * i as f64 / panels as f64).collect();
        let values = stations
            .iter()
            .map(|&x| if x <= span / 2.0 { x / 2.0 } else { (span - x) / 2.0 })
            .collect();
        InfluenceLine::new(stations, values)
    }

    #[test]
    fn test_interpolation() {
        let line = midspan_moment(10.0, 2);
        assert_relative_eq!(line.value_at(2.5), 1.25, epsilon = 1e-12);
        assert_eq!(line.value_at(-1.0), 0.0);
        assert_eq!(line.value_at(11.0), 0.0);
    }

    #[test]
    fn test_lane_area_simple_span() {
        let line = midspan_moment(30.0, 60);
        let (negative, positive) = line.areas();
        assert_eq!(negative, 0.0);
        // wL²/8 per unit load
        assert_relative_eq!(positive, 30.0 * 30.0 / 8.0, max_relative = 1e-9);
    }

    #[test]
    fn test_areas_split_at_sign_change() {
        let line = InfluenceLine::new(vec![0.0, 2.0], vec![-1.0, 1.0]);
        let (negative, positive) = line.areas();
        assert_relative_eq!(negative, -0.5, epsilon = 1e-12);
        assert_relative_eq!(positive, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_truck_on_simple_span() {
        // Middle axle at midspan: 145·7.5 + (35 + 145)·(7.5 - 4.3/2)
        let line = midspan_moment(30.0, 300);
        let (min, max) = line.vehicle_extremes(&DESIGN_TRUCK);
        assert_eq!(min, 0.0);
        let expected = 145.0e3 * 7.5 + 180.0e3 * (7.5 - 4.3 / 2.0);
        assert_relative_eq!(max, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_tandem_governs_short_span() {
        let line = midspan_moment(6.0, 60);
        let (_, truck) = line.vehicle_extremes(&DESIGN_TRUCK);
        let (_, tandem) = line.vehicle_extremes(&DESIGN_TANDEM);
        assert!(tandem > truck);
    }

    #[test]
    fn test_train_spacing() {
        let train = DESIGN_TRUCK.train(DUAL_TRUCK_HEADWAY);
        assert_eq!(train.axles.len(), 6);
        assert_relative_eq!(train.axles[3].offset, 8.6 + 15.0, epsilon = 1e-12);
        assert_relative_eq!(FATIGUE_TRUCK.length(), 13.3, epsilon = 1e-12);
    }

    #[test]
    fn test_multiple_presence() {
        assert_eq!(multiple_presence(1), 1.2);
        assert_eq!(multiple_presence(2), 1.0);
        assert_eq!(multiple_presence(5), 0.65);
    }
}
