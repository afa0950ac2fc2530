//! Parametric precast girder cross-section (I-girder / bulb-tee family).

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::sections::properties::{PropertyAccumulator, SectionPart, SectionProperties};

/// Flanged girder cross-section described by rectangles.
///
/// A rectangular or slab section is modeled by setting both flange widths
/// equal to the total web width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GirderSection {
    /// Overall height (m)
    pub height: f64,
    pub top_flange_width: f64,
    pub top_flange_thickness: f64,
    /// Thickness of one web (m)
    pub web_thickness: f64,
    pub bottom_flange_width: f64,
    pub bottom_flange_thickness: f64,
    /// Number of webs (1 for I-girders and bulb-tees)
    #[serde(default = "default_webs")]
    pub webs: u8,
}

fn default_webs() -> u8 {
    1
}

impl GirderSection {
    /// A bulb-tee-like I-girder with typical proportions for its height
    pub fn i_girder(height: f64) -> Self {
        GirderSection {
            height,
            top_flange_width: 0.65,
            top_flange_thickness: 0.18,
            web_thickness: 0.20,
            bottom_flange_width: 0.66,
            bottom_flange_thickness: 0.25,
            webs: 1,
        }
    }

    pub fn total_web_width(&self) -> f64 {
        self.web_thickness * f64::from(self.webs)
    }

    pub fn web_height(&self) -> f64 {
        self.height - self.top_flange_thickness - self.bottom_flange_thickness
    }

    /// True when the bottom flange projects beyond the web(s)
    pub fn has_bottom_flange(&self) -> bool {
        self.bottom_flange_width > self.total_web_width() + 1.0e-9
    }

    pub fn validate(&self, element: &str) -> BridgeResult<()> {
        let dims = [
            ("height", self.height),
            ("top flange width", self.top_flange_width),
            ("top flange thickness", self.top_flange_thickness),
            ("web thickness", self.web_thickness),
            ("bottom flange width", self.bottom_flange_width),
            ("bottom flange thickness", self.bottom_flange_thickness),
        ];
        for (name, value) in dims {
            if value <= 0.0 || !value.is_finite() {
                return Err(BridgeError::geometry(element, format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.webs == 0 {
            return Err(BridgeError::geometry(element, "section must have at least one web"));
        }
        if self.web_height() <= 0.0 {
            return Err(BridgeError::geometry(element, "flange thicknesses exceed the section height"));
        }
        if self.total_web_width() > self.top_flange_width.min(self.bottom_flange_width) + 1.0e-9 {
            return Err(BridgeError::geometry(element, "webs are wider than a flange"));
        }
        Ok(())
    }

    /// The rectangles making up the section, bottom to top
    pub fn parts(&self) -> [SectionPart; 3] {
        [
            SectionPart::rectangle(self.bottom_flange_width, self.bottom_flange_thickness, 0.0),
            SectionPart::rectangle(self.total_web_width(), self.web_height(), self.bottom_flange_thickness),
            SectionPart::rectangle(
                self.top_flange_width,
                self.top_flange_thickness,
                self.height - self.top_flange_thickness,
            ),
        ]
    }

    /// Gross concrete properties expressed in a material of modulus `ec`
    pub fn gross_properties(&self, ec: f64) -> SectionProperties {
        let mut acc = PropertyAccumulator::new();
        for part in self.parts() {
            acc.add(part, 1.0);
        }
        acc.finish(ec, self.height, None)
    }

    pub fn area(&self) -> f64 {
        self.parts().iter().map(|p| p.area).sum()
    }

    /// Width of the section at height `y` above the bottom (m)
    pub fn width_at(&self, y: f64) -> f64 {
        if y < 0.0 || y > self.height {
            0.0
        } else if y <= self.bottom_flange_thickness {
            self.bottom_flange_width
        } else if y >= self.height - self.top_flange_thickness {
            self.top_flange_width
        } else {
            self.total_web_width()
        }
    }

    /// Horizontal bands of constant width as (bottom, top, width)
    fn bands(&self) -> [(f64, f64, f64); 3] {
        [
            (0.0, self.bottom_flange_thickness, self.bottom_flange_width),
            (self.bottom_flange_thickness, self.height - self.top_flange_thickness, self.total_web_width()),
            (self.height - self.top_flange_thickness, self.height, self.top_flange_width),
        ]
    }

    /// First moment about height `y` of the area below it (m³)
    pub fn first_moment_below(&self, y: f64) -> f64 {
        let y = y.clamp(0.0, self.height);
        self.bands()
            .iter()
            .filter(|(bottom, _, _)| *bottom < y)
            .map(|(bottom, top, width)| {
                let top = top.min(y);
                width * (top - bottom) * (y - (bottom + top) / 2.0)
            })
            .sum()
    }

    /// Heights bounding the tensile part of a linear stress field with face
    /// stresses `bottom` and `top` (tension positive)
    pub fn tension_zone(&self, bottom: f64, top: f64) -> Option<(f64, f64)> {
        match (bottom > 0.0, top > 0.0) {
            (true, true) => Some((0.0, self.height)),
            (false, false) => None,
            (true, false) => Some((0.0, self.height * bottom / (bottom - top))),
            (false, true) => Some((self.height * bottom / (bottom - top), self.height)),
        }
    }

    /// Resultant of the tensile part of a linear stress field (N)
    pub fn tension_force(&self, bottom: f64, top: f64) -> f64 {
        let Some((lo, hi)) = self.tension_zone(bottom, top) else {
            return 0.0;
        };
        let stress = |y: f64| bottom + (top - bottom) * y / self.height;
        self.bands()
            .iter()
            .map(|&(b, t, width)| {
                let (y1, y2) = (b.max(lo), t.min(hi));
                if y2 > y1 {
                    width * (y2 - y1) * stress((y1 + y2) / 2.0)
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// Exposed perimeter (m)
    pub fn perimeter(&self) -> f64 {
        let webs = self.total_web_width();
        let top = self.top_flange_width * 2.0 - webs + 2.0 * self.top_flange_thickness;
        let bottom = self.bottom_flange_width * 2.0 - webs + 2.0 * self.bottom_flange_thickness;
        let web_sides = 2.0 * self.web_height() * f64::from(self.webs);
        top + bottom + web_sides
    }

    /// Volume-to-surface ratio of a prismatic member (m)
    pub fn volume_to_surface(&self) -> f64 {
        self.area() / self.perimeter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_i_girder_area_and_centroid() {
        let section = GirderSection::i_girder(1.37);
        let props = section.gross_properties(1.0);
        let web_h = 1.37 - 0.18 - 0.25;
        let area = 0.66 * 0.25 + 0.20 * web_h + 0.65 * 0.18;
        assert_relative_eq!(props.area, area, max_relative = 1e-12);
        assert!(props.y_bottom > 0.5 && props.y_bottom < 0.8, "yb = {}", props.y_bottom);
        assert_relative_eq!(props.y_top_girder + props.y_bottom, 1.37, max_relative = 1e-12);
    }

    #[test]
    fn test_rectangle_section() {
        let section = GirderSection {
            height: 1.0,
            top_flange_width: 0.5,
            top_flange_thickness: 0.2,
            web_thickness: 0.5,
            bottom_flange_width: 0.5,
            bottom_flange_thickness: 0.2,
            webs: 1,
        };
        let props = section.gross_properties(1.0);
        assert_relative_eq!(props.ix, 0.5 / 12.0, max_relative = 1e-12);
        assert!(!section.has_bottom_flange());
        assert_relative_eq!(section.perimeter(), 3.0, max_relative = 1e-12);
    }

    #[test]
    fn test_validation() {
        let mut section = GirderSection::i_girder(1.0);
        assert!(section.validate("segment 0").is_ok());
        section.web_thickness = -0.1;
        assert_eq!(section.validate("segment 0").unwrap_err().error_code(), "GEOMETRY_ERROR");

        let mut section = GirderSection::i_girder(0.3);
        section.top_flange_thickness = 0.2;
        assert!(section.validate("segment 0").is_err());
    }

    #[test]
    fn test_first_moment_about_centroid() {
        let section = GirderSection::i_girder(1.6);
        let props = section.gross_properties(1.0);
        let q = section.first_moment_below(props.y_bottom);
        // Balanced by the area above, so positive and below A·h/2
        assert!(q > 0.0 && q < props.area * 0.8);
        let rect = GirderSection {
            height: 1.0,
            top_flange_width: 0.5,
            top_flange_thickness: 0.2,
            web_thickness: 0.5,
            bottom_flange_width: 0.5,
            bottom_flange_thickness: 0.2,
            webs: 1,
        };
        assert_relative_eq!(rect.first_moment_below(0.5), 0.5 * 0.5 * 0.25, max_relative = 1e-12);
        assert_eq!(rect.width_at(0.5), 0.5);
        assert_eq!(section.width_at(0.8), 0.2);
    }

    #[test]
    fn test_tension_force_of_linear_field() {
        let section = GirderSection::i_girder(1.6);
        // Uniform tension over the whole section
        assert_relative_eq!(section.tension_force(2.0e6, 2.0e6), 2.0e6 * section.area(), max_relative = 1e-12);
        assert_eq!(section.tension_force(-1.0e6, -3.0e6), 0.0);

        // Zero at mid-height, 2 MPa at the top
        let (lo, hi) = section.tension_zone(-2.0e6, 2.0e6).unwrap();
        assert_relative_eq!(lo, 0.8, max_relative = 1e-12);
        assert_relative_eq!(hi, 1.6, max_relative = 1e-12);
        let flange = 0.65 * 0.18 * 2.0e6 * (1.6 - 0.09 - 0.8) / 0.8;
        let web = 0.2 * (1.42 - 0.8) * 2.0e6 * (1.42 + 0.8 - 1.6) / 1.6;
        assert_relative_eq!(section.tension_force(-2.0e6, 2.0e6), flange + web, max_relative = 1e-12);
    }

    #[test]
    fn test_volume_to_surface() {
        let section = GirderSection::i_girder(1.37);
        let vs = section.volume_to_surface();
        assert!(vs > 0.05 && vs < 0.15, "V/S = {}", vs);
    }
}
