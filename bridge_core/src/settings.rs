//! # Analysis Settings
//!
//! Project-level configuration of the analysis: loss method, time-dependent
//! material model, structural analysis type, section property mode, live
//! load parameters and the specification-check criteria. Settings are saved
//! with the project.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::settings::{AnalysisSettings, LossMethod, RoundingMethod};
//!
//! let settings = AnalysisSettings::default();
//! assert_eq!(settings.loss_method, LossMethod::Approximate);
//! assert!(!settings.use_average_tendon_force);
//!
//! // Slab offsets round to the nearest 5 mm; an exact half rounds up
//! assert_eq!(settings.slab_offset_rounding.method, RoundingMethod::RoundNearest);
//! assert!((settings.slab_offset_rounding.apply(0.2525) - 0.255).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

use crate::materials::TimeDependentModel;
use crate::provisions::LrfdEdition;
use crate::sections::SectionPropertyType;

/// Prestress loss method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LossMethod {
    /// LRFD approximate lump-sum estimate
    #[default]
    Approximate,
    /// Incremental age-adjusted effective modulus method
    TimeStep,
}

/// Structural model used for the per-interval analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnalysisType {
    /// Closures over permanent piers act as hinges
    Simple,
    /// Cast closures provide continuity
    Continuous,
    /// Envelope of the simple and continuous models
    #[default]
    Envelope,
}

/// Haunch assumption for composite section properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HaunchMode {
    /// Haunch depth equal to the end value everywhere
    #[default]
    Uniform,
    /// Haunch reduces toward mid-segment by the camber allowance
    Parabolic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoundingMethod {
    #[default]
    RoundNearest,
    RoundUp,
}

/// Rounding of the slab offset ("A" dimension)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabOffsetRounding {
    pub method: RoundingMethod,
    /// Rounding increment (m)
    pub increment: f64,
}

impl SlabOffsetRounding {
    /// Round `value` to the increment. An exact half increment rounds up.
    pub fn apply(&self, value: f64) -> f64 {
        if self.increment <= 0.0 {
            return value;
        }
        // Snap away representation noise so exact halves and multiples behave
        let steps = value / self.increment;
        let steps = (steps * 1.0e9).round() / 1.0e9;
        let rounded = match self.method {
            RoundingMethod::RoundNearest => (steps + 0.5).floor(),
            RoundingMethod::RoundUp => steps.ceil(),
        };
        rounded * self.increment
    }
}

impl Default for SlabOffsetRounding {
    fn default() -> Self {
        SlabOffsetRounding {
            method: RoundingMethod::RoundNearest,
            increment: 0.005,
        }
    }
}

/// Live load parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveLoadSettings {
    /// Dynamic load allowance applied to the design truck
    pub dynamic_allowance: f64,
    /// Dynamic load allowance applied to the fatigue truck
    pub fatigue_allowance: f64,
    /// Moment distribution factor supplied by the engineer
    #[serde(default)]
    pub moment_df_override: Option<f64>,
    /// Shear distribution factor supplied by the engineer
    #[serde(default)]
    pub shear_df_override: Option<f64>,
    pub include_fatigue: bool,
}

impl Default for LiveLoadSettings {
    fn default() -> Self {
        LiveLoadSettings {
            dynamic_allowance: 0.33,
            fatigue_allowance: 0.15,
            moment_df_override: None,
            shear_df_override: None,
            include_fatigue: true,
        }
    }
}

/// Girder lifting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftingCriteria {
    /// Sweep tolerance (m/m)
    pub sweep_tolerance: f64,
    /// Lifting device placement tolerance (m)
    pub placement_tolerance: f64,
    /// Height of the lifting loops above the top of the girder (m)
    pub loop_height: f64,
    pub min_fs_cracking: f64,
    pub min_fs_failure: f64,
}

impl Default for LiftingCriteria {
    fn default() -> Self {
        LiftingCriteria {
            sweep_tolerance: 1.0 / 1000.0,
            placement_tolerance: 0.00635,
            loop_height: 0.0,
            min_fs_cracking: 1.0,
            min_fs_failure: 1.5,
        }
    }
}

/// Girder hauling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaulingCriteria {
    pub sweep_tolerance: f64,
    /// Truck support placement tolerance (m)
    pub placement_tolerance: f64,
    /// Roll stiffness of the truck (N·m/rad)
    pub roll_stiffness: f64,
    /// Height of the roll center above the roadway (m)
    pub roll_center_height: f64,
    /// Height of the girder bottom above the roadway (m)
    pub girder_bottom_height: f64,
    /// Center-to-center distance between dual tires (m)
    pub wheel_spacing: f64,
    /// Roadway superelevation (rad)
    pub superelevation: f64,
    pub min_fs_cracking: f64,
    pub min_fs_rollover: f64,
}

impl Default for HaulingCriteria {
    fn default() -> Self {
        HaulingCriteria {
            sweep_tolerance: 1.0 / 1000.0,
            placement_tolerance: 0.0254,
            roll_stiffness: 40.0e6,
            roll_center_height: 0.6,
            girder_bottom_height: 1.7,
            wheel_spacing: 1.83,
            superelevation: 0.06,
            min_fs_cracking: 1.0,
            min_fs_rollover: 1.5,
        }
    }
}

/// Specification-check criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecCriteria {
    pub edition: LrfdEdition,
    /// Compression limit at release as a fraction of f'ci
    pub release_compression: f64,
    /// Tension limit at release, coefficient on √f'ci (MPa)
    pub release_tension: f64,
    /// Maximum tension at release (Pa)
    pub release_tension_max: f64,
    /// Tension limit at release where bonded bars carry the tensile force,
    /// coefficient on √f'ci (MPa)
    pub release_tension_with_bars: f64,
    /// Stress allowed in those bars, taken as the lesser of this and 0.5 fy (Pa)
    pub release_bar_stress_max: f64,
    /// Service compression limit under permanent loads (fraction of f'c)
    pub service_compression_permanent: f64,
    /// Service compression limit under total load (fraction of f'c)
    pub service_compression_total: f64,
    /// Service III tension limit, coefficient on √f'c (MPa)
    pub service_tension: f64,
    /// Live load deflection limit L/n
    pub deflection_ratio: f64,
    /// Maximum harped strand slope 1:n for 15.2 mm strand
    pub strand_slope_15_2: f64,
    /// Maximum harped strand slope 1:n for 12.7 mm and smaller strand
    pub strand_slope_12_7: f64,
    /// Hold-down force limit per harp point (N)
    pub hold_down_limit: f64,
    /// Principal tension limit, coefficient on √f'c (MPa)
    pub principal_tension: f64,
    /// f'c above which the principal web stress check applies (Pa)
    pub principal_tension_fc_threshold: f64,
    /// Maximum ratio of duct outside diameter to web thickness
    pub duct_to_web_ratio: f64,
    /// Maximum ratio of tendon steel area to duct area
    pub duct_area_ratio: f64,
    pub lifting: LiftingCriteria,
    pub hauling: HaulingCriteria,
}

impl Default for SpecCriteria {
    fn default() -> Self {
        SpecCriteria {
            edition: LrfdEdition::default(),
            release_compression: 0.65,
            release_tension: 0.25,
            release_tension_max: 1.38e6,
            release_tension_with_bars: 0.63,
            release_bar_stress_max: 206.8e6,
            service_compression_permanent: 0.45,
            service_compression_total: 0.60,
            service_tension: 0.50,
            deflection_ratio: 800.0,
            strand_slope_15_2: 8.0,
            strand_slope_12_7: 6.0,
            hold_down_limit: 200.0e3,
            principal_tension: 0.289,
            principal_tension_fc_threshold: 70.0e6,
            duct_to_web_ratio: 0.4,
            duct_area_ratio: 0.4,
            lifting: LiftingCriteria::default(),
            hauling: HaulingCriteria::default(),
        }
    }
}

/// Analysis configuration saved with the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub loss_method: LossMethod,
    pub time_dependent_model: TimeDependentModel,
    pub analysis_type: AnalysisType,
    /// Section properties used for stress analysis
    pub section_properties: SectionPropertyType,
    /// Average ambient relative humidity (%)
    pub relative_humidity: f64,
    /// Use the tendon-length average of the force after friction and
    /// anchor set instead of the value at each POI. One lookup per tendon
    /// instead of one per POI, at the cost of local accuracy near anchors.
    #[serde(default)]
    pub use_average_tendon_force: bool,
    #[serde(default)]
    pub haunch: HaunchMode,
    #[serde(default)]
    pub slab_offset_rounding: SlabOffsetRounding,
    #[serde(default)]
    pub live_load: LiveLoadSettings,
    #[serde(default)]
    pub criteria: SpecCriteria,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            loss_method: LossMethod::Approximate,
            time_dependent_model: TimeDependentModel::AashtoLrfd,
            analysis_type: AnalysisType::Envelope,
            section_properties: SectionPropertyType::Gross,
            relative_humidity: 70.0,
            use_average_tendon_force: false,
            haunch: HaunchMode::Uniform,
            slab_offset_rounding: SlabOffsetRounding::default(),
            live_load: LiveLoadSettings::default(),
            criteria: SpecCriteria::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_nearest_half_rounds_up() {
        let rounding = SlabOffsetRounding::default();
        assert_relative_eq!(rounding.apply(0.2525), 0.255, max_relative = 1e-12);
        assert_relative_eq!(rounding.apply(0.2524), 0.250, max_relative = 1e-12);
        assert_relative_eq!(rounding.apply(0.2526), 0.255, max_relative = 1e-12);
        assert_relative_eq!(rounding.apply(0.250), 0.250, max_relative = 1e-12);
    }

    #[test]
    fn test_round_up() {
        let rounding = SlabOffsetRounding {
            method: RoundingMethod::RoundUp,
            increment: 0.005,
        };
        assert_relative_eq!(rounding.apply(0.2501), 0.255, max_relative = 1e-12);
        assert_relative_eq!(rounding.apply(0.250), 0.250, max_relative = 1e-12);
    }

    #[test]
    fn test_zero_increment_is_identity() {
        let rounding = SlabOffsetRounding {
            method: RoundingMethod::RoundUp,
            increment: 0.0,
        };
        assert_eq!(rounding.apply(0.123), 0.123);
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = AnalysisSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: AnalysisSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);
    }
}
