//! Engineer-controlled analysis overrides.
//!
//! Overrides change how the model is evaluated without touching the stored
//! project: gross section properties everywhere, or a parabolic haunch.
//! Every change invalidates all cached results. [`OverrideGuard`] applies
//! overrides for a scope and restores the previous state when dropped, on
//! every exit path.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::pipeline::BridgeAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DesignOverrides {
    /// Use gross concrete properties regardless of the configured mode
    #[serde(default)]
    pub force_gross_section: bool,
    /// Use a parabolic haunch regardless of the configured haunch mode
    #[serde(default)]
    pub parabolic_haunch: bool,
}

impl DesignOverrides {
    pub fn is_default(&self) -> bool {
        *self == DesignOverrides::default()
    }
}

/// Scoped override of a [`BridgeAnalysis`].
///
/// # Example
///
/// ```rust
/// use bridge_core::overrides::{DesignOverrides, OverrideGuard};
/// use bridge_core::pipeline::BridgeAnalysis;
/// use bridge_core::project::Project;
///
/// let mut analysis = BridgeAnalysis::new(Project::minimal_example());
/// {
///     let guard = OverrideGuard::new(
///         &mut analysis,
///         DesignOverrides { force_gross_section: true, parabolic_haunch: false },
///     );
///     assert!(guard.overrides().force_gross_section);
/// }
/// assert!(analysis.overrides().is_default());
/// ```
pub struct OverrideGuard<'a> {
    analysis: &'a mut BridgeAnalysis,
    previous: DesignOverrides,
}

impl<'a> OverrideGuard<'a> {
    pub fn new(analysis: &'a mut BridgeAnalysis, overrides: DesignOverrides) -> Self {
        let previous = analysis.overrides();
        analysis.set_overrides(overrides);
        OverrideGuard { analysis, previous }
    }
}

impl Deref for OverrideGuard<'_> {
    type Target = BridgeAnalysis;

    fn deref(&self) -> &BridgeAnalysis {
        self.analysis
    }
}

impl DerefMut for OverrideGuard<'_> {
    fn deref_mut(&mut self) -> &mut BridgeAnalysis {
        self.analysis
    }
}

impl Drop for OverrideGuard<'_> {
    fn drop(&mut self) {
        self.analysis.set_overrides(self.previous);
    }
}
