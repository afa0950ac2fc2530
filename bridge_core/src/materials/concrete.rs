//! # Time-Dependent Concrete Models
//!
//! Strength gain, modulus, creep and shrinkage laws for aging concrete. All
//! functions take ages measured in days since the concrete was placed, never
//! wall-clock time.
//!
//! ## Models
//!
//! - **AASHTO LRFD** (§5.4.2.3): creep ψ = 1.9 ks khc kf ktd ti^-0.118, shrinkage
//!   εsh = ks khs kf ktd 0.48×10⁻³. Strength gain uses the ACI 209 form.
//! - **ACI 209R-92**: hyperbolic strength gain, creep and shrinkage with the
//!   standard correction factors.
//! - **CEB-FIP 1990**: exponential strength gain, φ(t,t0) = φ0 βc(t−t0).
//!
//! Every creep coefficient returned here is relative to the elastic strain at
//! the age of loading. CEB-FIP coefficients are converted from their 28-day
//! basis so the models are interchangeable in the loss engine.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::materials::{ConcreteMaterial, MaturingConcrete, TimeDependentModel};
//! use bridge_core::units::MegaPascals;
//!
//! let mix = ConcreteMaterial::normal_weight(MegaPascals(50.0));
//! let concrete = MaturingConcrete::new(&mix, TimeDependentModel::AashtoLrfd, 70.0, 0.09);
//! let early = concrete.strength(3.0).unwrap();
//! let late = concrete.strength(56.0).unwrap();
//! assert!(late > early);
//! assert!(concrete.strength(0.0).is_err());
//! ```

use serde::{Deserialize, Serialize};

use super::{ConcreteMaterial, ConcreteType, CuringMethod};
use crate::errors::{BridgeError, BridgeResult};
use crate::units::{from_mpa, to_mpa};

/// Selects the strength gain, creep and shrinkage laws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeDependentModel {
    #[default]
    AashtoLrfd,
    Aci209,
    CebFip1990,
}

impl TimeDependentModel {
    pub fn display_name(&self) -> &'static str {
        match self {
            TimeDependentModel::AashtoLrfd => "AASHTO LRFD",
            TimeDependentModel::Aci209 => "ACI 209R-92",
            TimeDependentModel::CebFip1990 => "CEB-FIP 1990",
        }
    }
}

/// Upper f'c limit of the LRFD creep and shrinkage expressions (MPa)
const LRFD_MAX_FC_MPA: f64 = 103.0;

/// Upper characteristic strength covered by CEB-FIP 1990 (MPa)
const CEB_MAX_FCK_MPA: f64 = 80.0;

/// A concrete mix evaluated under one time-dependent model and environment.
#[derive(Debug, Clone, Copy)]
pub struct MaturingConcrete<'a> {
    pub material: &'a ConcreteMaterial,
    pub model: TimeDependentModel,
    /// Average ambient relative humidity (%)
    pub humidity: f64,
    /// Volume-to-surface ratio of the member (m)
    pub volume_to_surface: f64,
}

impl<'a> MaturingConcrete<'a> {
    pub fn new(
        material: &'a ConcreteMaterial,
        model: TimeDependentModel,
        humidity: f64,
        volume_to_surface: f64,
    ) -> Self {
        MaturingConcrete {
            material,
            model,
            humidity,
            volume_to_surface,
        }
    }

    fn check_age(&self, parameter: &str, age: f64) -> BridgeResult<()> {
        if age <= 0.0 || !age.is_finite() {
            return Err(BridgeError::assumption(
                self.model.display_name(),
                parameter,
                age,
                "Concrete age must be greater than zero",
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Strength and stiffness
    // =========================================================================

    /// ACI 209 strength-gain constants (a, b) for the curing method
    fn aci_constants(&self) -> (f64, f64) {
        match self.material.curing {
            CuringMethod::Moist => (4.0, 0.85),
            CuringMethod::Steam => (1.0, 0.95),
        }
    }

    /// CEB-FIP cement coefficient s
    fn ceb_s(&self) -> f64 {
        match self.material.curing {
            CuringMethod::Moist => 0.25,
            CuringMethod::Steam => 0.20,
        }
    }

    /// Ratio f'c(t)/f'c28
    fn strength_ratio(&self, age: f64) -> f64 {
        match self.model {
            TimeDependentModel::AashtoLrfd | TimeDependentModel::Aci209 => {
                let (a, b) = self.aci_constants();
                age / (a + b * age)
            }
            TimeDependentModel::CebFip1990 => (self.ceb_s() * (1.0 - (28.0 / age).sqrt())).exp(),
        }
    }

    /// Compressive strength at `age` days (Pa)
    pub fn strength(&self, age: f64) -> BridgeResult<f64> {
        self.check_age("age", age)?;
        Ok(self.material.fc * self.strength_ratio(age))
    }

    /// Modulus of elasticity at `age` days (Pa)
    pub fn modulus(&self, age: f64) -> BridgeResult<f64> {
        self.check_age("age", age)?;
        let ec = match self.model {
            TimeDependentModel::AashtoLrfd | TimeDependentModel::Aci209 => {
                self.secant_modulus(self.material.fc * self.strength_ratio(age))
            }
            TimeDependentModel::CebFip1990 => {
                let beta_cc = self.strength_ratio(age);
                let ec28 = match self.material.concrete_type {
                    ConcreteType::Uhpc => self.secant_modulus(self.material.fc),
                    _ => {
                        let fcm = to_mpa(self.material.fc) + 8.0;
                        let density_factor = (self.material.density / 2200.0).powi(2).min(1.0);
                        from_mpa(21_500.0 * (fcm / 10.0).cbrt()) * density_factor
                    }
                };
                beta_cc.sqrt() * ec28
            }
        };
        Ok(ec)
    }

    /// LRFD/ACI secant modulus at strength `fc` (Pa)
    fn secant_modulus(&self, fc: f64) -> f64 {
        let fc_mpa = to_mpa(fc);
        match self.material.concrete_type {
            // 2500 f'c^0.33 ksi, expressed in MPa
            ConcreteType::Uhpc => from_mpa(6.895 * 2500.0 * (fc_mpa / 6.895).powf(0.33)),
            _ => from_mpa(0.043 * self.material.k1 * self.material.density.powf(1.5) * fc_mpa.sqrt()),
        }
    }

    // =========================================================================
    // Creep
    // =========================================================================

    /// Creep coefficient ψ(t, ti) for concrete loaded at age `age_at_loading`
    /// and observed at age `age`. Zero when `age <= age_at_loading`.
    pub fn creep_coefficient(&self, age: f64, age_at_loading: f64) -> BridgeResult<f64> {
        self.check_age("age at loading", age_at_loading)?;
        let duration = age - age_at_loading;
        if duration <= 0.0 {
            return Ok(0.0);
        }
        let vs_mm = self.volume_to_surface * 1000.0;
        let h = self.humidity;

        match self.model {
            TimeDependentModel::AashtoLrfd => {
                let fci = to_mpa(self.strength(age_at_loading)?);
                let ktd = self.lrfd_ktd(duration, fci)?;
                let khc = 1.56 - 0.008 * h;
                if self.material.concrete_type == ConcreteType::Uhpc {
                    return Ok(1.2 * khc * ktd * age_at_loading.powf(-0.118));
                }
                let ks = (1.45 - 0.00512 * vs_mm).max(1.0);
                let kf = 35.0 / (7.0 + fci);
                Ok(1.9 * ks * khc * kf * ktd * age_at_loading.powf(-0.118))
            }
            TimeDependentModel::Aci209 => {
                let gamma_la = match self.material.curing {
                    CuringMethod::Moist => 1.25 * age_at_loading.powf(-0.118),
                    CuringMethod::Steam => 1.13 * age_at_loading.powf(-0.094),
                };
                let gamma_h = if h > 40.0 { 1.27 - 0.0067 * h } else { 1.0 };
                let gamma_vs = 2.0 / 3.0 * (1.0 + 1.13 * (-0.0213 * vs_mm).exp());
                let t = duration.powf(0.6);
                Ok(t / (10.0 + t) * 2.35 * gamma_la * gamma_h * gamma_vs)
            }
            TimeDependentModel::CebFip1990 => {
                let fcm = self.ceb_fcm()?;
                let h0 = 2.0 * vs_mm;
                let phi_rh = 1.0 + (1.0 - h / 100.0) / (0.46 * (h0 / 100.0).cbrt());
                let beta_fcm = 5.3 / (fcm / 10.0).sqrt();
                let beta_t0 = 1.0 / (0.1 + age_at_loading.powf(0.2));
                let beta_h = (150.0 * (1.0 + (1.2 * h / 100.0).powi(18)) * h0 / 100.0 + 250.0).min(1500.0);
                let beta_c = (duration / (beta_h + duration)).powf(0.3);
                let phi28 = phi_rh * beta_fcm * beta_t0 * beta_c;
                // Convert from the 28-day modulus basis to the age-of-loading basis
                let ratio = self.modulus(age_at_loading)? / self.modulus(28.0)?;
                Ok(phi28 * ratio)
            }
        }
    }

    // =========================================================================
    // Shrinkage
    // =========================================================================

    /// Shrinkage strain magnitude accumulated between the start of drying at
    /// `drying_start_age` and `age` (positive = shortening).
    pub fn shrinkage_strain(&self, age: f64, drying_start_age: f64) -> BridgeResult<f64> {
        self.check_age("drying start age", drying_start_age)?;
        let duration = age - drying_start_age;
        if duration <= 0.0 {
            return Ok(0.0);
        }
        let vs_mm = self.volume_to_surface * 1000.0;
        let h = self.humidity;

        match self.model {
            TimeDependentModel::AashtoLrfd => {
                let fci = to_mpa(self.strength(drying_start_age)?);
                let ktd = self.lrfd_ktd(duration, fci)?;
                if self.material.concrete_type == ConcreteType::Uhpc {
                    return Ok(0.6e-3 * ktd);
                }
                let ks = (1.45 - 0.00512 * vs_mm).max(1.0);
                let khs = 2.00 - 0.014 * h;
                let kf = 35.0 / (7.0 + fci);
                Ok(ks * khs * kf * ktd * 0.48e-3)
            }
            TimeDependentModel::Aci209 => {
                let time_factor = match self.material.curing {
                    CuringMethod::Moist => duration / (35.0 + duration),
                    CuringMethod::Steam => duration / (55.0 + duration),
                };
                let gamma_h = if h <= 40.0 {
                    1.0
                } else if h <= 80.0 {
                    1.40 - 0.010 * h
                } else {
                    3.00 - 0.030 * h
                };
                let gamma_vs = 1.2 * (-0.00472 * vs_mm).exp();
                Ok(time_factor * 780.0e-6 * gamma_h * gamma_vs)
            }
            TimeDependentModel::CebFip1990 => {
                let fcm = self.ceb_fcm()?;
                let h0 = 2.0 * vs_mm;
                let eps_s = (160.0 + 10.0 * 5.0 * (9.0 - fcm / 10.0)) * 1.0e-6;
                let beta_rh = if h >= 99.0 {
                    0.25
                } else {
                    -1.55 * (1.0 - (h / 100.0).powi(3))
                };
                let beta_s = (duration / (350.0 * (h0 / 100.0).powi(2) + duration)).sqrt();
                Ok(-(eps_s * beta_rh) * beta_s)
            }
        }
    }

    /// LRFD time development factor ktd = t / (61 − 0.58 f'ci + t)
    fn lrfd_ktd(&self, duration: f64, fci_mpa: f64) -> BridgeResult<f64> {
        if self.material.concrete_type == ConcreteType::Uhpc {
            return Ok(duration / (duration + 5.0));
        }
        if fci_mpa > LRFD_MAX_FC_MPA {
            return Err(BridgeError::assumption(
                "AASHTO LRFD",
                "f'ci",
                fci_mpa,
                "Creep and shrinkage expressions are limited to f'c of 103 MPa",
            ));
        }
        Ok(duration / (61.0 - 0.58 * fci_mpa + duration))
    }

    /// Mean 28-day strength for CEB-FIP (MPa), range checked
    fn ceb_fcm(&self) -> BridgeResult<f64> {
        let fck = to_mpa(self.material.fc);
        if fck > CEB_MAX_FCK_MPA {
            return Err(BridgeError::assumption(
                "CEB-FIP 1990",
                "fck",
                fck,
                "Model is limited to characteristic strengths of 80 MPa",
            ));
        }
        Ok(fck + 8.0)
    }
}
