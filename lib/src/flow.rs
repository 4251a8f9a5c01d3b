//! Extrusion flow model.
//!
//! A [`Flow`] describes the cross-section of an extruded line: its width,
//! its height and the nozzle it comes out of. Normal extrusions are modelled
//! as a rectangle with semicircular ends; bridges as a circle, since they
//! hang in the air and are not squished.

use crate::config::{FloatOrPercent, PrintConfig, PrintObjectConfig, PrintRegionConfig};
use crate::{scale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Extra spacing between bridge threads (mm).
pub const BRIDGE_EXTRA_SPACING: CoordF = 0.05;

/// Result type for flow computations.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// Errors raised when a flow cannot be computed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("invalid flow dimensions: width {width}, height {height}")]
    InvalidDimensions { width: CoordF, height: CoordF },

    #[error("flow spacing is not positive (width {width}, height {height})")]
    NegativeSpacing { width: CoordF, height: CoordF },

    #[error("invalid nozzle diameter {0}")]
    InvalidNozzle(CoordF),

    #[error("no nozzle configured for extruder {0}")]
    MissingExtruder(usize),
}

/// Role of an extrusion, selecting the width setting and extruder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowRole {
    ExternalPerimeter,
    Perimeter,
    Infill,
    SolidInfill,
    TopSolidInfill,
    SupportMaterial,
    SupportMaterialInterface,
}

impl FlowRole {
    /// Whether the role is any kind of infill.
    #[inline]
    pub fn is_infill(&self) -> bool {
        matches!(
            self,
            FlowRole::Infill | FlowRole::SolidInfill | FlowRole::TopSolidInfill
        )
    }
}

/// An extrusion cross-section.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    width: CoordF,
    height: CoordF,
    nozzle_diameter: CoordF,
    bridge: bool,
}

impl Flow {
    /// A normal (non-bridge) flow.
    pub fn new(width: CoordF, height: CoordF, nozzle_diameter: CoordF) -> FlowResult<Self> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(FlowError::InvalidDimensions { width, height });
        }
        if !(nozzle_diameter > 0.0) {
            return Err(FlowError::InvalidNozzle(nozzle_diameter));
        }
        Ok(Self {
            width,
            height,
            nozzle_diameter,
            bridge: false,
        })
    }

    /// A circular bridge flow of diameter `dmr`.
    pub fn bridging_flow(dmr: CoordF, nozzle_diameter: CoordF) -> FlowResult<Self> {
        let mut flow = Self::new(dmr, dmr, nozzle_diameter)?;
        flow.bridge = true;
        Ok(flow)
    }

    /// Build a flow from a configured width setting.
    ///
    /// `Absolute(0.0)` selects the automatic width for the role; a percentage
    /// is relative to the layer height.
    pub fn new_from_config_width(
        role: FlowRole,
        width: FloatOrPercent,
        nozzle_diameter: CoordF,
        height: CoordF,
        bridge_flow_ratio: CoordF,
    ) -> FlowResult<Self> {
        if !(height > 0.0) {
            return Err(FlowError::InvalidDimensions { width: 0.0, height });
        }
        if !(nozzle_diameter > 0.0) {
            return Err(FlowError::InvalidNozzle(nozzle_diameter));
        }
        if bridge_flow_ratio > 0.0 {
            return Self::bridging_flow(
                Self::bridge_width(nozzle_diameter, bridge_flow_ratio),
                nozzle_diameter,
            );
        }
        let w = if width.is_auto() {
            Self::auto_width(role, nozzle_diameter, height)
        } else {
            width.get_abs_value(height)
        };
        Self::new(w, height, nozzle_diameter)
    }

    /// Diameter of a bridge thread: the nozzle area scaled by `ratio`.
    #[inline]
    pub fn bridge_width(nozzle_diameter: CoordF, ratio: CoordF) -> CoordF {
        (ratio * nozzle_diameter * nozzle_diameter).sqrt()
    }

    /// Width that extrudes the same section as the nozzle area, clamped to
    /// sensible bounds for the role.
    pub fn auto_width(role: FlowRole, nozzle_diameter: CoordF, height: CoordF) -> CoordF {
        let n = nozzle_diameter;
        let mut width = (n * n * PI + height * height * (4.0 - PI)) / (4.0 * height);

        let (min, max) = match role {
            FlowRole::ExternalPerimeter
            | FlowRole::SupportMaterial
            | FlowRole::SupportMaterialInterface => (1.1 * n, 1.1 * n),
            FlowRole::Infill => (1.05 * n, CoordF::INFINITY),
            _ => (1.05 * n, 1.7 * n),
        };
        width = width.max(min);
        width.min(max)
    }

    /// Centre-to-centre distance of two adjacent extrusions, in mm.
    pub fn spacing(&self) -> CoordF {
        if self.bridge {
            self.width + BRIDGE_EXTRA_SPACING
        } else {
            self.width - self.height * (1.0 - PI / 4.0)
        }
    }

    /// Spacing in scaled units.
    #[inline]
    pub fn scaled_spacing(&self) -> Coord {
        scale(self.spacing())
    }

    /// Width in scaled units.
    #[inline]
    pub fn scaled_width(&self) -> Coord {
        scale(self.width)
    }

    /// Spacing of a rounded-rectangle extrusion of the given size.
    pub fn rounded_rectangle_extrusion_spacing(width: CoordF, height: CoordF) -> FlowResult<CoordF> {
        let spacing = width - height * (1.0 - PI / 4.0);
        if spacing <= 0.0 {
            return Err(FlowError::NegativeSpacing { width, height });
        }
        Ok(spacing)
    }

    /// Extruded volume per mm of path.
    pub fn mm3_per_mm(&self) -> CoordF {
        if self.bridge {
            self.width * self.width * PI / 4.0
        } else {
            self.height * (self.width - self.height * (1.0 - PI / 4.0))
        }
    }

    /// Same flow with another width.
    pub fn with_width(&self, width: CoordF) -> FlowResult<Self> {
        let mut flow = Self::new(width, self.height, self.nozzle_diameter)?;
        flow.bridge = self.bridge;
        Ok(flow)
    }

    #[inline]
    pub fn width(&self) -> CoordF {
        self.width
    }

    #[inline]
    pub fn height(&self) -> CoordF {
        self.height
    }

    #[inline]
    pub fn nozzle_diameter(&self) -> CoordF {
        self.nozzle_diameter
    }

    #[inline]
    pub fn is_bridge(&self) -> bool {
        self.bridge
    }
}

/// Flow of `role` for one region at one layer.
///
/// `width` overrides the configured width; `None` or a non-positive value
/// selects the profile default. The first layer uses the printer-wide first
/// layer width when it is set. Role widths left automatic fall back to the
/// object-wide extrusion width.
pub fn region_flow(
    print: &PrintConfig,
    object: &PrintObjectConfig,
    region: &PrintRegionConfig,
    role: FlowRole,
    layer_height: CoordF,
    bridge: bool,
    first_layer: bool,
    width: Option<CoordF>,
) -> FlowResult<Flow> {
    let mut config_width = match width {
        Some(w) if w > 0.0 => FloatOrPercent::Absolute(w),
        _ => {
            if first_layer && !print.first_layer_extrusion_width.is_auto() {
                print.first_layer_extrusion_width
            } else {
                match role {
                    FlowRole::ExternalPerimeter => region.external_perimeter_extrusion_width,
                    FlowRole::Perimeter => region.perimeter_extrusion_width,
                    FlowRole::Infill => region.infill_extrusion_width,
                    FlowRole::SolidInfill => region.solid_infill_extrusion_width,
                    FlowRole::TopSolidInfill => region.top_infill_extrusion_width,
                    FlowRole::SupportMaterial | FlowRole::SupportMaterialInterface => {
                        object.extrusion_width
                    }
                }
            }
        }
    };
    if config_width.is_auto() {
        config_width = object.extrusion_width;
    }

    let extruder = match role {
        FlowRole::ExternalPerimeter | FlowRole::Perimeter => region.perimeter_extruder,
        FlowRole::Infill => region.infill_extruder,
        FlowRole::SolidInfill | FlowRole::TopSolidInfill => region.solid_infill_extruder,
        FlowRole::SupportMaterial | FlowRole::SupportMaterialInterface => 1,
    };
    let nozzle = print
        .nozzle_for_extruder(extruder)
        .ok_or(FlowError::MissingExtruder(extruder))?;

    let bridge_ratio = if bridge { region.bridge_flow_ratio } else { 0.0 };
    Flow::new_from_config_width(role, config_width, nozzle, layer_height, bridge_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_spacing() {
        let flow = Flow::new(0.5, 0.2, 0.4).unwrap();
        let expected = 0.5 - 0.2 * (1.0 - PI / 4.0);
        assert!((flow.spacing() - expected).abs() < 1e-12);
        assert_eq!(flow.scaled_spacing(), scale(expected));
    }

    #[test]
    fn test_bridge_flow() {
        let flow =
            Flow::new_from_config_width(FlowRole::Perimeter, FloatOrPercent::default(), 0.4, 0.2, 1.0)
                .unwrap();
        assert!(flow.is_bridge());
        assert!((flow.width() - 0.4).abs() < 1e-12);
        assert!((flow.height() - 0.4).abs() < 1e-12);
        assert!((flow.spacing() - 0.45).abs() < 1e-12);
        assert!((flow.mm3_per_mm() - 0.16 * PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_auto_width_clamps() {
        let ext = Flow::auto_width(FlowRole::ExternalPerimeter, 0.4, 0.2);
        assert!((ext - 0.44).abs() < 1e-12);

        // Very thin layers make the raw formula explode; perimeters cap at 1.7n.
        let thin = Flow::auto_width(FlowRole::Perimeter, 0.4, 0.05);
        assert!((thin - 0.68).abs() < 1e-12);

        // Solid infill keeps the cap; only sparse infill may grow past it.
        for role in [FlowRole::SolidInfill, FlowRole::TopSolidInfill] {
            let solid = Flow::auto_width(role, 0.4, 0.05);
            assert!((solid - 0.68).abs() < 1e-12, "{:?}: {}", role, solid);
        }
        let infill = Flow::auto_width(FlowRole::Infill, 0.4, 0.05);
        assert!(infill > 0.68);
    }

    #[test]
    fn test_percent_width_is_relative_to_height() {
        let flow = Flow::new_from_config_width(
            FlowRole::Infill,
            FloatOrPercent::Percent(250.0),
            0.4,
            0.2,
            0.0,
        )
        .unwrap();
        assert!((flow.width() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_flow() {
        assert!(Flow::new(0.0, 0.2, 0.4).is_err());
        assert!(Flow::new(0.4, 0.2, 0.0).is_err());
        assert!(Flow::rounded_rectangle_extrusion_spacing(0.05, 0.3).is_err());
    }

    #[test]
    fn test_region_flow_width_override_and_first_layer() {
        let print = PrintConfig::default().first_layer_extrusion_width(FloatOrPercent::Absolute(0.7));
        let object = PrintObjectConfig::default();
        let region = PrintRegionConfig::default().extrusion_width(FloatOrPercent::Absolute(0.45));

        let normal =
            region_flow(&print, &object, &region, FlowRole::Perimeter, 0.2, false, false, None)
                .unwrap();
        assert!((normal.width() - 0.45).abs() < 1e-12);

        let first =
            region_flow(&print, &object, &region, FlowRole::Perimeter, 0.2, false, true, None)
                .unwrap();
        assert!((first.width() - 0.7).abs() < 1e-12);

        let explicit = region_flow(
            &print,
            &object,
            &region,
            FlowRole::Perimeter,
            0.2,
            false,
            false,
            Some(0.6),
        )
        .unwrap();
        assert!((explicit.width() - 0.6).abs() < 1e-12);

        let sentinel = region_flow(
            &print,
            &object,
            &region,
            FlowRole::Perimeter,
            0.2,
            false,
            false,
            Some(-1.0),
        )
        .unwrap();
        assert!((sentinel.width() - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_region_flow_falls_back_to_object_width() {
        let print = PrintConfig::default();
        let object = PrintObjectConfig {
            extrusion_width: FloatOrPercent::Absolute(0.5),
            ..Default::default()
        };
        let region = PrintRegionConfig::default();
        let flow =
            region_flow(&print, &object, &region, FlowRole::Infill, 0.2, false, false, None)
                .unwrap();
        assert!((flow.width() - 0.5).abs() < 1e-12);
    }
}
