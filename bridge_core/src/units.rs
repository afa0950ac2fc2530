//! # Unit Types
//!
//! Type-safe wrappers for the units used at the edges of the API. Internally
//! every computation is carried in consistent SI base units (m, N, Pa, days)
//! as plain `f64`, which is also what every result and artifact reports.
//! Presentation (unit conversion, rounding for display) belongs to the caller.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::units::{MegaPascals, Pascals, Millimeters, Meters};
//!
//! let fc: Pascals = MegaPascals(50.0).into();
//! assert_eq!(fc.0, 50.0e6);
//!
//! let cover: Meters = Millimeters(50.0).into();
//! assert!((cover.0 - 0.05).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Gravitational acceleration (m/s²)
pub const GRAVITY: f64 = 9.80665;

/// Pascals per megapascal
pub const PA_PER_MPA: f64 = 1.0e6;

// ============================================================================
// Length Units
// ============================================================================

/// Length in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Length in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millimeters(pub f64);

impl From<Millimeters> for Meters {
    fn from(mm: Millimeters) -> Self {
        Meters(mm.0 / 1000.0)
    }
}

impl From<Meters> for Millimeters {
    fn from(m: Meters) -> Self {
        Millimeters(m.0 * 1000.0)
    }
}

// ============================================================================
// Stress Units
// ============================================================================

/// Stress in pascals
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pascals(pub f64);

/// Stress in megapascals
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MegaPascals(pub f64);

impl From<MegaPascals> for Pascals {
    fn from(mpa: MegaPascals) -> Self {
        Pascals(mpa.0 * PA_PER_MPA)
    }
}

impl From<Pascals> for MegaPascals {
    fn from(pa: Pascals) -> Self {
        MegaPascals(pa.0 / PA_PER_MPA)
    }
}

// ============================================================================
// Force Units
// ============================================================================

/// Force in newtons
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Newtons(pub f64);

/// Force in kilonewtons
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KiloNewtons(pub f64);

impl From<KiloNewtons> for Newtons {
    fn from(kn: KiloNewtons) -> Self {
        Newtons(kn.0 * 1000.0)
    }
}

impl From<Newtons> for KiloNewtons {
    fn from(n: Newtons) -> Self {
        KiloNewtons(n.0 / 1000.0)
    }
}

// ============================================================================
// Distributed Load Units
// ============================================================================

/// Distributed load in newtons per meter
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewtonsPerMeter(pub f64);

/// Distributed load in kilonewtons per meter
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KiloNewtonsPerMeter(pub f64);

impl From<KiloNewtonsPerMeter> for NewtonsPerMeter {
    fn from(knm: KiloNewtonsPerMeter) -> Self {
        NewtonsPerMeter(knm.0 * 1000.0)
    }
}

// ============================================================================
// Time
// ============================================================================

/// Time in days. Timeline events and concrete ages are measured in days.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Days(pub f64);

// ============================================================================
// Helpers
// ============================================================================

/// Convert a stress in Pa to MPa (the unit most code equations are written in)
#[inline]
pub fn to_mpa(pa: f64) -> f64 {
    pa / PA_PER_MPA
}

/// Convert a stress in MPa to Pa
#[inline]
pub fn from_mpa(mpa: f64) -> f64 {
    mpa * PA_PER_MPA
}

/// Weight per unit length (N/m) of a cross-section area (m²) at a mass density (kg/m³)
#[inline]
pub fn weight_per_length(area: f64, density: f64) -> f64 {
    area * density * GRAVITY
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Meters);
impl_arithmetic!(Millimeters);
impl_arithmetic!(Pascals);
impl_arithmetic!(MegaPascals);
impl_arithmetic!(Newtons);
impl_arithmetic!(KiloNewtons);
impl_arithmetic!(NewtonsPerMeter);
impl_arithmetic!(KiloNewtonsPerMeter);
impl_arithmetic!(Days);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millimeters_to_meters() {
        let m: Meters = Millimeters(1370.0).into();
        assert!((m.0 - 1.37).abs() < 1e-12);
    }

    #[test]
    fn test_megapascals_roundtrip() {
        let pa: Pascals = MegaPascals(27.5).into();
        let back: MegaPascals = pa.into();
        assert!((back.0 - 27.5).abs() < 1e-12);
        assert!((to_mpa(from_mpa(3.0)) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic() {
        let a = Days(90.0);
        let b = Days(30.0);
        assert_eq!((a + b).0, 120.0);
        assert_eq!((a - b).0, 60.0);
        assert_eq!((b * 2.0).0, 60.0);
        assert_eq!((a / 3.0).0, 30.0);
    }

    #[test]
    fn test_weight_per_length() {
        // 1 m² of 2400 kg/m³ concrete
        let w = weight_per_length(1.0, 2400.0);
        assert!((w - 23_535.96).abs() < 0.01);
    }

    #[test]
    fn test_serialization() {
        let d = Days(28.0);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "28.0");
        let roundtrip: Days = serde_json::from_str(&json).unwrap();
        assert_eq!(d, roundtrip);
    }
}
