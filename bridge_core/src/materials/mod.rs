//! # Materials
//!
//! Concrete, prestressing strand and reinforcing bar definitions. Concrete
//! carries its specified 28-day strength; the strength and stiffness at any
//! age come from the time-dependent models in [`concrete`].
//!
//! ## Material Types
//!
//! - **Concrete**: normal weight, all-lightweight, sand-lightweight, UHPC
//! - **Strand**: seven-wire low-relaxation or stress-relieved strand
//! - **Rebar**: mild reinforcement for stirrups, confinement and splitting steel
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::materials::{ConcreteMaterial, StrandMaterial};
//! use bridge_core::units::MegaPascals;
//!
//! let girder = ConcreteMaterial::normal_weight(MegaPascals(50.0));
//! let strand = StrandMaterial::low_relaxation_15_2();
//! assert!(girder.fc > 0.0);
//! assert_eq!(strand.area, 140.0e-6);
//! ```

pub mod concrete;

pub use concrete::{MaturingConcrete, TimeDependentModel};

use serde::{Deserialize, Serialize};

use crate::units::{MegaPascals, Pascals};

// =============================================================================
// CONCRETE
// =============================================================================

/// Concrete type. Lightweight concretes carry a reduction factor λ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConcreteType {
    #[default]
    NormalWeight,
    AllLightweight,
    SandLightweight,
    /// Ultra-high performance concrete
    Uhpc,
}

impl ConcreteType {
    /// Concrete density modification factor λ
    pub fn lambda(&self) -> f64 {
        match self {
            ConcreteType::NormalWeight | ConcreteType::Uhpc => 1.0,
            ConcreteType::SandLightweight => 0.85,
            ConcreteType::AllLightweight => 0.75,
        }
    }

    pub fn is_lightweight(&self) -> bool {
        matches!(self, ConcreteType::AllLightweight | ConcreteType::SandLightweight)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ConcreteType::NormalWeight => "Normal weight",
            ConcreteType::AllLightweight => "All lightweight",
            ConcreteType::SandLightweight => "Sand lightweight",
            ConcreteType::Uhpc => "UHPC",
        }
    }
}

/// Curing method. Selects the strength-gain coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CuringMethod {
    #[default]
    Moist,
    Steam,
}

/// A concrete mix definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteMaterial {
    pub concrete_type: ConcreteType,

    /// Specified compressive strength at 28 days (Pa)
    pub fc: f64,

    /// Mass density used for stiffness and dead load (kg/m³)
    pub density: f64,

    /// Aggregate correction factor on the modulus of elasticity
    #[serde(default = "default_k1")]
    pub k1: f64,

    #[serde(default)]
    pub curing: CuringMethod,
}

fn default_k1() -> f64 {
    1.0
}

impl ConcreteMaterial {
    /// Create a concrete definition
    pub fn new(concrete_type: ConcreteType, fc: MegaPascals, density: f64) -> Self {
        ConcreteMaterial {
            concrete_type,
            fc: Pascals::from(fc).0,
            density,
            k1: 1.0,
            curing: CuringMethod::Moist,
        }
    }

    /// Normal weight concrete at 2450 kg/m³, moist cured
    pub fn normal_weight(fc: MegaPascals) -> Self {
        Self::new(ConcreteType::NormalWeight, fc, 2450.0)
    }

    /// Sand-lightweight concrete at 1850 kg/m³
    pub fn sand_lightweight(fc: MegaPascals) -> Self {
        Self::new(ConcreteType::SandLightweight, fc, 1850.0)
    }

    /// UHPC at 2500 kg/m³
    pub fn uhpc(fc: MegaPascals) -> Self {
        Self::new(ConcreteType::Uhpc, fc, 2500.0)
    }

    /// Set the curing method (builder pattern)
    pub fn with_curing(mut self, curing: CuringMethod) -> Self {
        self.curing = curing;
        self
    }

    /// Modulus of rupture at strength `fc` (Pa), fr = 0.63 λ √f'c (MPa)
    pub fn modulus_of_rupture(&self, fc: f64) -> f64 {
        let fc_mpa = fc / 1.0e6;
        0.63 * self.concrete_type.lambda() * fc_mpa.max(0.0).sqrt() * 1.0e6
    }
}

// =============================================================================
// PRESTRESSING STRAND
// =============================================================================

/// Strand relaxation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StrandType {
    #[default]
    LowRelaxation,
    StressRelieved,
}

/// Seven-wire prestressing strand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandMaterial {
    pub strand_type: StrandType,
    /// Nominal diameter (m)
    pub diameter: f64,
    /// Nominal area of one strand (m²)
    pub area: f64,
    /// Tensile strength (Pa)
    pub fpu: f64,
    /// Yield strength (Pa)
    pub fpy: f64,
    /// Modulus of elasticity (Pa)
    pub ep: f64,
}

impl StrandMaterial {
    /// 15.2 mm (0.6 in) Grade 1860 low-relaxation strand
    pub fn low_relaxation_15_2() -> Self {
        StrandMaterial {
            strand_type: StrandType::LowRelaxation,
            diameter: 0.0152,
            area: 140.0e-6,
            fpu: 1860.0e6,
            fpy: 0.90 * 1860.0e6,
            ep: 197.0e9,
        }
    }

    /// 12.7 mm (0.5 in) Grade 1860 low-relaxation strand
    pub fn low_relaxation_12_7() -> Self {
        StrandMaterial {
            strand_type: StrandType::LowRelaxation,
            diameter: 0.0127,
            area: 98.7e-6,
            fpu: 1860.0e6,
            fpy: 0.90 * 1860.0e6,
            ep: 197.0e9,
        }
    }

    /// Relaxation constant K_L used with the log-time relaxation law
    pub fn relaxation_constant(&self) -> f64 {
        match self.strand_type {
            StrandType::LowRelaxation => 45.0,
            StrandType::StressRelieved => 10.0,
        }
    }

    /// Lump-sum relaxation loss ΔfpR for the approximate method (Pa)
    pub fn approximate_relaxation_loss(&self) -> f64 {
        match self.strand_type {
            StrandType::LowRelaxation => 17.0e6,
            StrandType::StressRelieved => 70.0e6,
        }
    }
}

impl Default for StrandMaterial {
    fn default() -> Self {
        Self::low_relaxation_15_2()
    }
}

// =============================================================================
// REINFORCING BAR
// =============================================================================

/// Mild reinforcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebarMaterial {
    /// Yield strength (Pa)
    pub fy: f64,
    /// Modulus of elasticity (Pa)
    pub es: f64,
}

impl Default for RebarMaterial {
    fn default() -> Self {
        RebarMaterial {
            fy: 420.0e6,
            es: 200.0e9,
        }
    }
}
