//! Surface types for layer regions.
//!
//! A [`Surface`] is a classified island of a layer region. Classification
//! compares a layer's geometry with its neighbours:
//!
//! - **Top**: areas of the current layer not covered by the layer above
//! - **Bottom**: areas resting on the print bed
//! - **BottomBridge**: areas not supported by the layer below
//! - **Internal**: areas covered both above and below (sparse infill)
//! - **InternalSolid**: internal areas that need solid infill

use crate::clipper::{difference, opening, union_ex, OffsetJoinType};
use crate::geometry::{Containable, ExPolygon, ExPolygons};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Islands smaller than this (mm²) are dropped during classification.
const MIN_SURFACE_AREA: CoordF = 1e-6;

/// Classification of a surface within a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Top surface (visible from above).
    Top,
    /// Bottom surface (resting on the bed).
    Bottom,
    /// Bottom surface that bridges over air.
    BottomBridge,
    /// Internal solid surface.
    InternalSolid,
    /// Internal surface that will receive sparse infill.
    #[default]
    Internal,
    /// Internal bridge surface.
    InternalBridge,
    /// Internal void (empty space, no infill).
    InternalVoid,
}

impl SurfaceType {
    pub const ALL: [SurfaceType; 7] = [
        SurfaceType::Top,
        SurfaceType::Bottom,
        SurfaceType::BottomBridge,
        SurfaceType::InternalSolid,
        SurfaceType::Internal,
        SurfaceType::InternalBridge,
        SurfaceType::InternalVoid,
    ];

    #[inline]
    pub fn is_top(&self) -> bool {
        matches!(self, SurfaceType::Top)
    }

    /// Bottom or bottom bridge.
    #[inline]
    pub fn is_bottom(&self) -> bool {
        matches!(self, SurfaceType::Bottom | SurfaceType::BottomBridge)
    }

    #[inline]
    pub fn is_bridge(&self) -> bool {
        matches!(
            self,
            SurfaceType::BottomBridge | SurfaceType::InternalBridge
        )
    }

    /// Whether this surface type requires solid infill.
    #[inline]
    pub fn is_solid(&self) -> bool {
        matches!(
            self,
            SurfaceType::Top
                | SurfaceType::Bottom
                | SurfaceType::BottomBridge
                | SurfaceType::InternalSolid
                | SurfaceType::InternalBridge
        )
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SurfaceType::Internal
                | SurfaceType::InternalSolid
                | SurfaceType::InternalBridge
                | SurfaceType::InternalVoid
        )
    }

    /// Top or bottom.
    #[inline]
    pub fn is_external(&self) -> bool {
        !self.is_internal()
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Top => "top",
            SurfaceType::Bottom => "bottom",
            SurfaceType::BottomBridge => "bottom bridge",
            SurfaceType::InternalSolid => "internal solid",
            SurfaceType::Internal => "internal",
            SurfaceType::InternalBridge => "internal bridge",
            SurfaceType::InternalVoid => "internal void",
        }
    }

    /// SVG fill colour for diagnostic output.
    pub fn color(&self) -> &'static str {
        match self {
            SurfaceType::Top => "rgb(255,0,0)",
            SurfaceType::Bottom => "rgb(0,255,0)",
            SurfaceType::BottomBridge => "rgb(0,0,255)",
            SurfaceType::InternalSolid => "rgb(255,0,255)",
            SurfaceType::Internal => "rgb(255,255,128)",
            SurfaceType::InternalBridge => "rgb(0,255,255)",
            SurfaceType::InternalVoid => "rgb(128,128,128)",
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A classified island of a layer region.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub expolygon: ExPolygon,
    pub surface_type: SurfaceType,
    /// Bridge angle in radians, once detected.
    pub bridge_angle: Option<CoordF>,
    /// Extra perimeters requested for this surface.
    pub extra_perimeters: usize,
}

impl Surface {
    pub fn new(expolygon: ExPolygon, surface_type: SurfaceType) -> Self {
        Self {
            expolygon,
            surface_type,
            bridge_angle: None,
            extra_perimeters: 0,
        }
    }

    /// Same attributes as `self` with other geometry.
    pub fn with_expolygon(&self, expolygon: ExPolygon) -> Self {
        Self {
            expolygon,
            ..self.clone()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.expolygon.is_empty()
    }

    /// Area in mm².
    #[inline]
    pub fn area_mm2(&self) -> CoordF {
        self.expolygon.area_mm2()
    }

    #[inline]
    pub fn is_top(&self) -> bool {
        self.surface_type.is_top()
    }

    #[inline]
    pub fn is_bottom(&self) -> bool {
        self.surface_type.is_bottom()
    }

    #[inline]
    pub fn is_bridge(&self) -> bool {
        self.surface_type.is_bridge()
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        self.surface_type.is_solid()
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        self.surface_type.is_internal()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Surface({:?}, area={:.2}mm²)",
            self.surface_type,
            self.area_mm2()
        )
    }
}

/// Ordered collection of surfaces.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCollection {
    pub surfaces: Vec<Surface>,
}

impl SurfaceCollection {
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
        }
    }

    pub fn from_surfaces(surfaces: Vec<Surface>) -> Self {
        Self { surfaces }
    }

    /// One surface of `surface_type` per expolygon.
    pub fn from_expolygons(expolygons: ExPolygons, surface_type: SurfaceType) -> Self {
        Self::from_surfaces(
            expolygons
                .into_iter()
                .map(|e| Surface::new(e, surface_type))
                .collect(),
        )
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Surface> {
        self.surfaces.iter()
    }

    pub fn push(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    pub fn clear(&mut self) {
        self.surfaces.clear();
    }

    /// Replace the contents with `expolygons`, all of one type.
    pub fn set(&mut self, expolygons: ExPolygons, surface_type: SurfaceType) {
        *self = Self::from_expolygons(expolygons, surface_type);
    }

    /// Append `expolygons` as surfaces of `surface_type`.
    pub fn append(&mut self, expolygons: ExPolygons, surface_type: SurfaceType) {
        self.surfaces.extend(
            expolygons
                .into_iter()
                .map(|e| Surface::new(e, surface_type)),
        );
    }

    pub fn filter_by_type(&self, surface_type: SurfaceType) -> Vec<&Surface> {
        self.surfaces
            .iter()
            .filter(|s| s.surface_type == surface_type)
            .collect()
    }

    /// Geometry of every surface.
    pub fn expolygons(&self) -> ExPolygons {
        self.surfaces.iter().map(|s| s.expolygon.clone()).collect()
    }

    /// Geometry of the surfaces of one type.
    pub fn expolygons_of_type(&self, surface_type: SurfaceType) -> ExPolygons {
        self.surfaces
            .iter()
            .filter(|s| s.surface_type == surface_type)
            .map(|s| s.expolygon.clone())
            .collect()
    }

    /// Distinct types present, in a stable order.
    pub fn types(&self) -> Vec<SurfaceType> {
        SurfaceType::ALL
            .into_iter()
            .filter(|t| self.has_type(*t))
            .collect()
    }

    /// Total area in mm².
    pub fn total_area_mm2(&self) -> CoordF {
        self.surfaces.iter().map(|s| s.area_mm2()).sum()
    }

    pub fn has_type(&self, surface_type: SurfaceType) -> bool {
        self.surfaces.iter().any(|s| s.surface_type == surface_type)
    }

    /// Whether any surface matching `predicate` contains `item`.
    pub fn any_contains<T, F>(&self, item: &T, predicate: F) -> bool
    where
        T: Containable + ?Sized,
        F: Fn(&Surface) -> bool,
    {
        self.surfaces
            .iter()
            .any(|s| predicate(s) && s.expolygon.contains(item))
    }

    /// Whether an internal surface contains `item`.
    pub fn any_internal_contains<T: Containable + ?Sized>(&self, item: &T) -> bool {
        self.any_contains(item, Surface::is_internal)
    }

    /// Whether a bottom surface contains `item`.
    pub fn any_bottom_contains<T: Containable + ?Sized>(&self, item: &T) -> bool {
        self.any_contains(item, Surface::is_bottom)
    }
}

impl fmt::Debug for SurfaceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.surfaces.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a SurfaceCollection {
    type Item = &'a Surface;
    type IntoIter = std::slice::Iter<'a, Surface>;

    fn into_iter(self) -> Self::IntoIter {
        self.surfaces.iter()
    }
}

/// Classify a layer's slices by comparing with its neighbours.
///
/// `lower_slices` is `None` on the first layer: everything not covered above
/// rests on the bed. An empty lower layer makes everything a bridge.
/// `offset` (mm) is the opening used to drop slivers from the top and
/// bottom masks.
///
/// Areas that are both top and bottom (one-layer membranes) are classified as
/// bottom so bridge detection still runs on them.
pub fn detect_surface_types(
    current_slices: &ExPolygons,
    lower_slices: Option<&ExPolygons>,
    upper_slices: Option<&ExPolygons>,
    offset: CoordF,
) -> Vec<Surface> {
    if current_slices.is_empty() {
        return Vec::new();
    }

    let clean = |expolygons: ExPolygons| -> ExPolygons {
        if offset > 0.0 {
            opening(&expolygons, offset, OffsetJoinType::Miter)
        } else {
            expolygons
        }
    };

    let top = match upper_slices {
        Some(upper) if !upper.is_empty() => clean(difference(current_slices, upper)),
        _ => current_slices.clone(),
    };

    let (bottom, bottom_bridge) = match lower_slices {
        None => (current_slices.clone(), Vec::new()),
        Some(lower) if lower.is_empty() => (Vec::new(), current_slices.clone()),
        Some(lower) => (Vec::new(), clean(difference(current_slices, lower))),
    };

    let all_bottom: ExPolygons = bottom.iter().chain(bottom_bridge.iter()).cloned().collect();
    let top = difference(&top, &all_bottom);

    let mut surfaces = Vec::new();
    let mut push_all = |expolygons: &ExPolygons, surface_type: SurfaceType| {
        for expoly in expolygons {
            if expoly.area_mm2() > MIN_SURFACE_AREA {
                surfaces.push(Surface::new(expoly.clone(), surface_type));
            }
        }
    };
    push_all(&top, SurfaceType::Top);
    push_all(&bottom, SurfaceType::Bottom);
    push_all(&bottom_bridge, SurfaceType::BottomBridge);

    let classified: ExPolygons = union_ex(
        &top.iter()
            .chain(all_bottom.iter())
            .cloned()
            .collect::<Vec<_>>(),
    );
    let internal = difference(current_slices, &classified);
    push_all(&internal, SurfaceType::Internal);

    surfaces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> ExPolygon {
        ExPolygon::rectangle_mm(x, y, x + size, y + size)
    }

    #[test]
    fn test_surface_type_classes() {
        assert!(SurfaceType::BottomBridge.is_bottom());
        assert!(SurfaceType::BottomBridge.is_bridge());
        assert!(SurfaceType::InternalSolid.is_solid());
        assert!(!SurfaceType::Internal.is_solid());
        assert!(SurfaceType::InternalVoid.is_internal());
        assert!(SurfaceType::Top.is_external());
    }

    #[test]
    fn test_collection_by_type() {
        let mut c = SurfaceCollection::from_expolygons(
            vec![make_square_mm(0.0, 0.0, 10.0)],
            SurfaceType::Top,
        );
        c.append(vec![make_square_mm(20.0, 0.0, 5.0)], SurfaceType::Internal);

        assert_eq!(c.len(), 2);
        assert_eq!(c.types(), vec![SurfaceType::Top, SurfaceType::Internal]);
        assert_eq!(c.expolygons_of_type(SurfaceType::Internal).len(), 1);
        assert!((c.total_area_mm2() - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_collection_containment() {
        let mut c = SurfaceCollection::new();
        c.append(vec![make_square_mm(0.0, 0.0, 10.0)], SurfaceType::Internal);
        c.append(vec![make_square_mm(20.0, 0.0, 10.0)], SurfaceType::Bottom);

        let p_internal = Point::new_scale(5.0, 5.0);
        let p_bottom = Point::new_scale(25.0, 5.0);
        assert!(c.any_internal_contains(&p_internal));
        assert!(!c.any_internal_contains(&p_bottom));
        assert!(c.any_bottom_contains(&p_bottom));
        assert!(!c.any_bottom_contains(&p_internal));
    }

    #[test]
    fn test_detect_single_layer() {
        let slices = vec![make_square_mm(0.0, 0.0, 10.0)];
        let surfaces = detect_surface_types(&slices, None, None, 0.0);
        // A lone layer is both top and bottom: bottom wins.
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0].surface_type, SurfaceType::Bottom);
    }

    #[test]
    fn test_detect_middle_layer_internal() {
        let slices = vec![make_square_mm(0.0, 0.0, 10.0)];
        let surfaces = detect_surface_types(&slices, Some(&slices), Some(&slices), 0.0);
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces[0].surface_type, SurfaceType::Internal);
        assert!((surfaces[0].area_mm2() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_detect_overhang_is_bridge() {
        let current = vec![ExPolygon::rectangle_mm(0.0, 0.0, 20.0, 10.0)];
        let lower = vec![make_square_mm(0.0, 0.0, 10.0)];
        let upper = current.clone();
        let surfaces = detect_surface_types(&current, Some(&lower), Some(&upper), 0.0);

        let bridge: CoordF = surfaces
            .iter()
            .filter(|s| s.surface_type == SurfaceType::BottomBridge)
            .map(|s| s.area_mm2())
            .sum();
        let internal: CoordF = surfaces
            .iter()
            .filter(|s| s.surface_type == SurfaceType::Internal)
            .map(|s| s.area_mm2())
            .sum();
        assert!((bridge - 100.0).abs() < 0.01);
        assert!((internal - 100.0).abs() < 0.01);
    }
}
