//! Print configuration types.
//!
//! Three levels, from the widest scope to the narrowest:
//! - [`PrintConfig`]: printer-wide settings (nozzles, first layer width)
//! - [`PrintObjectConfig`]: per-object settings (layer height, support)
//! - [`PrintRegionConfig`]: per-region settings (perimeters, infill, widths)

use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value given either in mm or as a percentage of some base value.
///
/// Extrusion widths use `Absolute(0.0)` to mean "automatic".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum FloatOrPercent {
    /// Absolute value in mm.
    Absolute(CoordF),
    /// Percentage (e.g. 110.0 for 110%) of a base value.
    Percent(CoordF),
}

impl FloatOrPercent {
    /// Resolve against `base`.
    #[inline]
    pub fn get_abs_value(&self, base: CoordF) -> CoordF {
        match *self {
            FloatOrPercent::Absolute(v) => v,
            FloatOrPercent::Percent(p) => base * p / 100.0,
        }
    }

    /// Whether this is the automatic marker `Absolute(0.0)`.
    #[inline]
    pub fn is_auto(&self) -> bool {
        matches!(*self, FloatOrPercent::Absolute(v) if v == 0.0)
    }

    fn is_negative(&self) -> bool {
        match *self {
            FloatOrPercent::Absolute(v) | FloatOrPercent::Percent(v) => v < 0.0,
        }
    }
}

impl Default for FloatOrPercent {
    fn default() -> Self {
        FloatOrPercent::Absolute(0.0)
    }
}

impl fmt::Display for FloatOrPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloatOrPercent::Absolute(v) => write!(f, "{}", v),
            FloatOrPercent::Percent(p) => write!(f, "{}%", p),
        }
    }
}

/// Printer-wide settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    /// Nozzle diameter per extruder (mm). Extruders are 1-based in region
    /// settings, so extruder 1 is `nozzle_diameter[0]`.
    pub nozzle_diameter: Vec<CoordF>,
    /// Width used for every role on the first layer; automatic when 0.
    pub first_layer_extrusion_width: FloatOrPercent,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            nozzle_diameter: vec![0.4],
            first_layer_extrusion_width: FloatOrPercent::Percent(200.0),
        }
    }
}

impl PrintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: single-extruder nozzle diameter.
    pub fn nozzle_diameter(mut self, diameter: CoordF) -> Self {
        self.nozzle_diameter = vec![diameter];
        self
    }

    /// Builder method: first layer extrusion width.
    pub fn first_layer_extrusion_width(mut self, width: FloatOrPercent) -> Self {
        self.first_layer_extrusion_width = width;
        self
    }

    /// Nozzle diameter of a 1-based extruder, falling back to the first
    /// nozzle when the index is out of range.
    pub fn nozzle_for_extruder(&self, extruder: usize) -> Option<CoordF> {
        self.nozzle_diameter
            .get(extruder.saturating_sub(1))
            .or_else(|| self.nozzle_diameter.first())
            .copied()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.nozzle_diameter.is_empty() {
            return Err("At least one nozzle diameter is required".into());
        }
        if self.nozzle_diameter.iter().any(|d| *d <= 0.0) {
            return Err("Nozzle diameter must be positive".into());
        }
        if self.first_layer_extrusion_width.is_negative() {
            return Err("First layer extrusion width must not be negative".into());
        }
        Ok(())
    }
}

/// Per-object settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintObjectConfig {
    /// Default layer height (mm).
    pub layer_height: CoordF,
    /// First layer height (mm).
    pub first_layer_height: CoordF,
    /// Default width for every role whose own width is automatic.
    pub extrusion_width: FloatOrPercent,
    /// Generate support material.
    pub support_material: bool,
    /// Turn unneeded top sparse infill into voids.
    pub infill_only_where_needed: bool,
}

impl Default for PrintObjectConfig {
    fn default() -> Self {
        Self {
            layer_height: 0.2,
            first_layer_height: 0.3,
            extrusion_width: FloatOrPercent::Absolute(0.0),
            support_material: false,
            infill_only_where_needed: false,
        }
    }
}

impl PrintObjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set layer height.
    pub fn layer_height(mut self, height: CoordF) -> Self {
        self.layer_height = height;
        self
    }

    /// Builder method: enable/disable support.
    pub fn support(mut self, enabled: bool) -> Self {
        self.support_material = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.layer_height <= 0.0 {
            return Err("Layer height must be positive".into());
        }
        if self.first_layer_height <= 0.0 {
            return Err("First layer height must be positive".into());
        }
        if self.extrusion_width.is_negative() {
            return Err("Extrusion width must not be negative".into());
        }
        Ok(())
    }
}

/// Per-region settings. Regions whose configs compare equal share one
/// perimeter generation pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintRegionConfig {
    /// Number of perimeter loops.
    pub perimeters: u32,
    pub perimeter_extrusion_width: FloatOrPercent,
    pub external_perimeter_extrusion_width: FloatOrPercent,
    pub infill_extrusion_width: FloatOrPercent,
    pub solid_infill_extrusion_width: FloatOrPercent,
    pub top_infill_extrusion_width: FloatOrPercent,
    /// 1-based extruder for perimeters.
    pub perimeter_extruder: usize,
    /// 1-based extruder for sparse infill.
    pub infill_extruder: usize,
    /// 1-based extruder for solid infill.
    pub solid_infill_extruder: usize,
    /// Print the external perimeter before the inner ones.
    pub external_perimeters_first: bool,
    /// Sparse infill density (0.0 - 1.0).
    pub fill_density: CoordF,
    pub fill_pattern: InfillPattern,
    /// Base infill angle in degrees.
    pub fill_angle: CoordF,
    pub top_solid_layers: u32,
    pub bottom_solid_layers: u32,
    /// Internal islands up to this area (mm²) are filled solid.
    pub solid_infill_below_area: CoordF,
    /// Bridge flow diameter multiplier, squared into the cross-section.
    pub bridge_flow_ratio: CoordF,
    /// Overlap between infill and the innermost perimeter, percent of the
    /// mean of perimeter and solid infill spacing.
    pub infill_overlap: FloatOrPercent,
    /// Fill narrow gaps between perimeters.
    pub gap_fill: bool,
}

impl Default for PrintRegionConfig {
    fn default() -> Self {
        Self {
            perimeters: 3,
            perimeter_extrusion_width: FloatOrPercent::Absolute(0.0),
            external_perimeter_extrusion_width: FloatOrPercent::Absolute(0.0),
            infill_extrusion_width: FloatOrPercent::Absolute(0.0),
            solid_infill_extrusion_width: FloatOrPercent::Absolute(0.0),
            top_infill_extrusion_width: FloatOrPercent::Absolute(0.0),
            perimeter_extruder: 1,
            infill_extruder: 1,
            solid_infill_extruder: 1,
            external_perimeters_first: false,
            fill_density: 0.2,
            fill_pattern: InfillPattern::default(),
            fill_angle: 45.0,
            top_solid_layers: 3,
            bottom_solid_layers: 3,
            solid_infill_below_area: 70.0,
            bridge_flow_ratio: 1.0,
            infill_overlap: FloatOrPercent::Percent(55.0),
            gap_fill: true,
        }
    }
}

impl PrintRegionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set perimeter count.
    pub fn perimeters(mut self, count: u32) -> Self {
        self.perimeters = count;
        self
    }

    /// Builder method: set infill density.
    pub fn fill_density(mut self, density: CoordF) -> Self {
        self.fill_density = density;
        self
    }

    /// Builder method: set infill pattern.
    pub fn fill_pattern(mut self, pattern: InfillPattern) -> Self {
        self.fill_pattern = pattern;
        self
    }

    /// Builder method: one width for every extrusion role of the region.
    pub fn extrusion_width(mut self, width: FloatOrPercent) -> Self {
        self.perimeter_extrusion_width = width;
        self.external_perimeter_extrusion_width = width;
        self.infill_extrusion_width = width;
        self.solid_infill_extrusion_width = width;
        self.top_infill_extrusion_width = width;
        self
    }

    /// Builder method: number of solid layers at top and bottom.
    pub fn solid_layers(mut self, top: u32, bottom: u32) -> Self {
        self.top_solid_layers = top;
        self.bottom_solid_layers = bottom;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.fill_density) {
            return Err("Fill density must be between 0 and 1".into());
        }
        if self.bridge_flow_ratio <= 0.0 {
            return Err("Bridge flow ratio must be positive".into());
        }
        if self.solid_infill_below_area < 0.0 {
            return Err("Solid infill threshold area must not be negative".into());
        }
        let widths = [
            self.perimeter_extrusion_width,
            self.external_perimeter_extrusion_width,
            self.infill_extrusion_width,
            self.solid_infill_extrusion_width,
            self.top_infill_extrusion_width,
        ];
        if widths.iter().any(|w| w.is_negative()) {
            return Err("Extrusion widths must not be negative".into());
        }
        if self.perimeter_extruder == 0 || self.infill_extruder == 0 || self.solid_infill_extruder == 0
        {
            return Err("Extruders are numbered from 1".into());
        }
        Ok(())
    }
}

/// Infill pattern type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfillPattern {
    /// Parallel lines, direction alternating every layer.
    #[default]
    Rectilinear,
    /// Two crossing line sets on every layer.
    Grid,
    /// Lines at a fixed angle, same on every layer.
    Line,
}

impl InfillPattern {
    pub fn name(&self) -> &'static str {
        match self {
            InfillPattern::Rectilinear => "rectilinear",
            InfillPattern::Grid => "grid",
            InfillPattern::Line => "line",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_config_default() {
        let config = PrintConfig::default();
        assert!((config.nozzle_diameter[0] - 0.4).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_print_config_validation() {
        let mut config = PrintConfig::default();
        config.nozzle_diameter = vec![];
        assert!(config.validate().is_err());

        config.nozzle_diameter = vec![-0.4];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nozzle_for_extruder() {
        let config = PrintConfig {
            nozzle_diameter: vec![0.4, 0.6],
            ..Default::default()
        };
        assert_eq!(config.nozzle_for_extruder(2), Some(0.6));
        assert_eq!(config.nozzle_for_extruder(5), Some(0.4));
    }

    #[test]
    fn test_float_or_percent() {
        assert!((FloatOrPercent::Percent(150.0).get_abs_value(0.2) - 0.3).abs() < 1e-9);
        assert!((FloatOrPercent::Absolute(0.45).get_abs_value(0.2) - 0.45).abs() < 1e-9);
        assert!(FloatOrPercent::default().is_auto());
        assert!(!FloatOrPercent::Percent(0.0).is_auto());
    }

    #[test]
    fn test_region_config_builder() {
        let config = PrintRegionConfig::new()
            .perimeters(2)
            .fill_density(0.4)
            .extrusion_width(FloatOrPercent::Absolute(0.5))
            .solid_layers(0, 2);

        assert_eq!(config.perimeters, 2);
        assert!((config.fill_density - 0.4).abs() < 1e-9);
        assert_eq!(
            config.solid_infill_extrusion_width,
            FloatOrPercent::Absolute(0.5)
        );
        assert_eq!(config.top_solid_layers, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_region_config_validation() {
        let mut config = PrintRegionConfig::default();
        config.fill_density = 1.5;
        assert!(config.validate().is_err());

        config.fill_density = 0.2;
        config.infill_extruder = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_object_config_builder() {
        let config = PrintObjectConfig::new().layer_height(0.1).support(true);
        assert!((config.layer_height - 0.1).abs() < 1e-9);
        assert!(config.support_material);
        assert!(config.validate().is_ok());
    }
}
