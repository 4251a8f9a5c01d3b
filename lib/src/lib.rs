//! # Slicer layers
//!
//! The per-Z-height object model of a layered 3D printing slicer.
//!
//! A [`PrintObject`] owns an arena of [`Layer`]s. Every object layer owns one
//! [`LayerRegion`] per configured print region; support layers carry support
//! geometry instead. The pipeline stages communicate exclusively through
//! these records:
//! - slicing fills region slices ([`SliceEngine`])
//! - perimeter generation narrows fill surfaces ([`PerimeterGenerator`])
//! - surface classification and external surface processing
//! - infill generation consumes fill surfaces ([`Filler`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use slicer_layers::{ObjectSettings, PrintObject};
//!
//! let settings = ObjectSettings::load("object.json")?;
//! let mut object = PrintObject::new(settings);
//! let heights = object.layer_heights(10.0);
//! object.generate_layers(&heights);
//! object.slice(&engine);
//! object.detect_surfaces_type()?;
//! object.make_perimeters()?;
//! object.prepare_infill()?;
//! object.infill()?;
//! ```

pub mod bridge;
pub mod clipper;
pub mod config;
pub mod extrusion;
pub mod flow;
pub mod geometry;
pub mod infill;
pub mod layer;
pub mod perimeter;
pub mod print;
pub mod slice;
pub mod svg;

pub use config::{FloatOrPercent, InfillPattern, PrintConfig, PrintObjectConfig, PrintRegionConfig};
pub use extrusion::{
    ExtrusionEntity, ExtrusionEntityCollection, ExtrusionLoop, ExtrusionPath, ExtrusionRole,
};
pub use flow::{Flow, FlowError, FlowResult, FlowRole, BRIDGE_EXTRA_SPACING};
pub use geometry::{
    BoundingBox, Containable, ExPolygon, ExPolygons, Line, Point, PointF, Polygon, Polyline,
};
pub use infill::{FillParams, Filler, RectilinearFiller};
pub use layer::{Layer, LayerId, LayerKind, LayerRegion, RegionContext, SupportLayer};
pub use perimeter::{
    ClassicPerimeterGenerator, PerimeterGenerator, PerimeterInput, PerimeterOutput,
};
pub use print::{ObjectSettings, PrintObject, PrintRegion, RegionId};
pub use slice::{RawSlice, SliceEngine, Surface, SurfaceCollection, SurfaceType};
pub use svg::SvgExportContext;

/// Coordinate type used throughout the slicer.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 nanometer, so 1mm = 1_000_000 units.
pub const SCALING_FACTOR: f64 = 1_000_000.0;

/// Scale a floating-point coordinate to integer.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer coordinate to floating-point.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for layer model operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Flow(#[from] FlowError),

    /// Region index past the layer's region count. The count is fixed by
    /// configuration, so this is a programming or configuration defect.
    #[error("region index {index} out of bounds (layer has {count} regions)")]
    RegionOutOfBounds { index: usize, count: usize },

    #[error("unknown print region {0:?}")]
    UnknownRegion(RegionId),

    #[error("unknown layer {0:?}")]
    UnknownLayer(LayerId),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        assert_eq!(scale(1.0), 1_000_000);
        assert!((unscale(1_000_000) - 1.0).abs() < 1e-10);
        assert_eq!(scale(0.001), 1_000);
    }

    #[test]
    fn test_region_error_message() {
        let err = Error::RegionOutOfBounds { index: 3, count: 2 };
        assert_eq!(
            err.to_string(),
            "region index 3 out of bounds (layer has 2 regions)"
        );
    }
}
