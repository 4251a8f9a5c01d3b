//! Support layer content.

use crate::extrusion::ExtrusionEntityCollection;
use crate::geometry::ExPolygons;

/// Geometry carried by a support layer instead of per-region content.
#[derive(Debug, Clone, Default)]
pub struct SupportLayer {
    /// Area covered by support at this height.
    pub support_islands: ExPolygons,
    /// Base, interface and contact extrusions.
    pub support_fills: ExtrusionEntityCollection,
}

impl SupportLayer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_extrusions(&self) -> bool {
        !self.support_fills.is_empty()
    }
}
