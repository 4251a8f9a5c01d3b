//! Slice geometry and surface classification.
//!
//! - [`SliceEngine`] - the mesh slicing collaborator invoked by `Layer::make_slices`
//! - [`Surface`] / [`SurfaceCollection`] - classified region islands
//! - [`detect_surface_types`] - top/bottom/internal classification

mod surface;

pub use surface::{detect_surface_types, Surface, SurfaceCollection, SurfaceType};

use crate::geometry::Polygon;
use crate::print::RegionId;
use crate::CoordF;

/// Raw output of a mesh slicer for one region at one height.
#[derive(Clone, Debug, Default)]
pub struct RawSlice {
    /// Closed outlines in any orientation; holes are recovered by the repair
    /// pass in `Layer::make_slices`.
    pub polygons: Vec<Polygon>,
    /// The slicer met open or self-intersecting loops at this height.
    pub has_errors: bool,
}

impl RawSlice {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            has_errors: false,
        }
    }

    /// A slice whose loops could not all be closed.
    pub fn with_errors(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            has_errors: true,
        }
    }
}

/// Intersects the object mesh with a horizontal plane.
///
/// Implementations must be shareable across threads: layers are sliced in
/// parallel.
pub trait SliceEngine: Send + Sync {
    /// Outline of `region`'s volumes at height `slice_z` (mm).
    fn slice_region(&self, region: RegionId, slice_z: CoordF) -> RawSlice;
}

impl<F> SliceEngine for F
where
    F: Fn(RegionId, CoordF) -> RawSlice + Send + Sync,
{
    fn slice_region(&self, region: RegionId, slice_z: CoordF) -> RawSlice {
        self(region, slice_z)
    }
}
