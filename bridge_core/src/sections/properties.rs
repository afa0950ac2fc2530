//! Section property records and the parallel-axis accumulator used to
//! composite girder, deck, joint and reinforcement areas.

use serde::{Deserialize, Serialize};

/// Properties of a (possibly composite, possibly transformed) cross-section.
///
/// Heights are measured up from the bottom of the girder. Areas and inertias
/// are expressed in the material of `reference_modulus`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SectionProperties {
    /// Area (m²)
    pub area: f64,
    /// Moment of inertia about the horizontal centroidal axis (m⁴)
    pub ix: f64,
    /// Moment of inertia about the vertical centroidal axis (m⁴)
    pub iy: f64,
    /// Height of the centroid above the bottom of the girder (m)
    pub y_bottom: f64,
    /// Distance from the centroid up to the top of the girder (m)
    pub y_top_girder: f64,
    /// Distance from the centroid up to the top of the deck (m), zero without a deck
    pub y_top_deck: f64,
    /// Modulus of the material the section is expressed in (Pa)
    pub reference_modulus: f64,
}

impl SectionProperties {
    /// A component that does not exist (not yet cast)
    pub const ZERO: SectionProperties = SectionProperties {
        area: 0.0,
        ix: 0.0,
        iy: 0.0,
        y_bottom: 0.0,
        y_top_girder: 0.0,
        y_top_deck: 0.0,
        reference_modulus: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.area == 0.0 && self.ix == 0.0
    }

    /// Axial stiffness EA (N)
    pub fn ea(&self) -> f64 {
        self.reference_modulus * self.area
    }

    /// Flexural stiffness EI (N·m²)
    pub fn ei(&self) -> f64 {
        self.reference_modulus * self.ix
    }

    /// Section modulus at the bottom of the girder (m³)
    pub fn s_bottom(&self) -> f64 {
        if self.y_bottom > 0.0 {
            self.ix / self.y_bottom
        } else {
            0.0
        }
    }

    /// Section modulus at the top of the girder (m³)
    pub fn s_top_girder(&self) -> f64 {
        if self.y_top_girder.abs() > 0.0 {
            self.ix / self.y_top_girder
        } else {
            0.0
        }
    }

    /// Section modulus at the top of the deck (m³)
    pub fn s_top_deck(&self) -> f64 {
        if self.y_top_deck > 0.0 {
            self.ix / self.y_top_deck
        } else {
            0.0
        }
    }

    /// Eccentricity of a point at height `y` (from girder bottom) below the centroid
    pub fn eccentricity(&self, y: f64) -> f64 {
        self.y_bottom - y
    }
}

/// One piece of a section: an area with its own centroidal inertias.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionPart {
    pub area: f64,
    pub ix: f64,
    pub iy: f64,
    /// Centroid height above the bottom of the girder (m)
    pub y: f64,
}

impl SectionPart {
    /// A rectangle `width` wide and `depth` deep whose bottom sits at `y_bottom`
    pub fn rectangle(width: f64, depth: f64, y_bottom: f64) -> Self {
        SectionPart {
            area: width * depth,
            ix: width * depth.powi(3) / 12.0,
            iy: depth * width.powi(3) / 12.0,
            y: y_bottom + depth / 2.0,
        }
    }

    /// A concentrated area (strand, duct) with negligible own inertia
    pub fn point(area: f64, y: f64) -> Self {
        SectionPart { area, ix: 0.0, iy: 0.0, y }
    }
}

/// Parallel-axis accumulator. Each part is scaled by a modular ratio `n`
/// (its modulus over the reference modulus) before it is summed.
#[derive(Debug, Clone, Default)]
pub struct PropertyAccumulator {
    parts: Vec<(SectionPart, f64)>,
}

impl PropertyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a part with modular ratio `n`; negative `n` removes area (holes)
    pub fn add(&mut self, part: SectionPart, n: f64) -> &mut Self {
        if part.area != 0.0 && n != 0.0 {
            self.parts.push((part, n));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Composite the parts.
    ///
    /// `girder_height` and `deck_top` locate the extreme fibres; pass
    /// `deck_top = None` for a section without a deck.
    pub fn finish(&self, reference_modulus: f64, girder_height: f64, deck_top: Option<f64>) -> SectionProperties {
        let area: f64 = self.parts.iter().map(|(p, n)| p.area * n).sum();
        if area <= 0.0 {
            return SectionProperties::ZERO;
        }
        let y_bar = self.parts.iter().map(|(p, n)| p.area * n * p.y).sum::<f64>() / area;
        let ix = self
            .parts
            .iter()
            .map(|(p, n)| n * (p.ix + p.area * (p.y - y_bar).powi(2)))
            .sum();
        let iy = self.parts.iter().map(|(p, n)| n * p.iy).sum();

        SectionProperties {
            area,
            ix,
            iy,
            y_bottom: y_bar,
            y_top_girder: girder_height - y_bar,
            y_top_deck: deck_top.map(|top| top - y_bar).unwrap_or(0.0),
            reference_modulus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_properties() {
        let mut acc = PropertyAccumulator::new();
        acc.add(SectionPart::rectangle(0.3, 0.6, 0.0), 1.0);
        let props = acc.finish(30.0e9, 0.6, None);
        assert_relative_eq!(props.area, 0.18);
        assert_relative_eq!(props.ix, 0.3 * 0.6_f64.powi(3) / 12.0);
        assert_relative_eq!(props.y_bottom, 0.3);
        assert_relative_eq!(props.s_bottom(), props.ix / 0.3);
        assert_eq!(props.y_top_deck, 0.0);
    }

    #[test]
    fn test_parallel_axis_two_rectangles() {
        // Two stacked 1 x 1 squares form a 1 x 2 rectangle
        let mut acc = PropertyAccumulator::new();
        acc.add(SectionPart::rectangle(1.0, 1.0, 0.0), 1.0);
        acc.add(SectionPart::rectangle(1.0, 1.0, 1.0), 1.0);
        let props = acc.finish(1.0, 2.0, None);
        assert_relative_eq!(props.ix, 1.0 * 8.0 / 12.0, max_relative = 1e-12);
        assert_relative_eq!(props.y_bottom, 1.0);
    }

    #[test]
    fn test_modular_ratio_and_holes() {
        let mut acc = PropertyAccumulator::new();
        acc.add(SectionPart::rectangle(1.0, 1.0, 0.0), 1.0);
        acc.add(SectionPart::point(0.01, 0.1), 5.0);
        acc.add(SectionPart::point(0.01, 0.1), -1.0);
        let props = acc.finish(1.0, 1.0, Some(1.2));
        assert_relative_eq!(props.area, 1.04);
        assert!(props.y_bottom < 0.5);
        assert_relative_eq!(props.y_top_deck, 1.2 - props.y_bottom);
    }

    #[test]
    fn test_empty_is_zero() {
        let props = PropertyAccumulator::new().finish(1.0, 1.0, None);
        assert!(props.is_zero());
        assert_eq!(props, SectionProperties::ZERO);
    }
}
