//! Polygon with holes.

use super::{BoundingBox, Line, Point, Polygon, Polyline};
use crate::{CoordF, SCALING_FACTOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An outer contour (counter-clockwise) with zero or more holes (clockwise).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExPolygon {
    pub contour: Polygon,
    pub holes: Vec<Polygon>,
}

impl ExPolygon {
    pub fn new(contour: Polygon) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(contour: Polygon, holes: Vec<Polygon>) -> Self {
        Self { contour, holes }
    }

    /// Axis-aligned rectangle from millimetre corners.
    pub fn rectangle_mm(x0: CoordF, y0: CoordF, x1: CoordF, y1: CoordF) -> Self {
        Self::new(Polygon::rectangle_mm(x0, y0, x1, y1))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.contour.is_valid()
    }

    /// Area in scaled units squared (contour minus holes).
    pub fn area(&self) -> CoordF {
        let holes: CoordF = self.holes.iter().map(|h| h.area()).sum();
        self.contour.area() - holes
    }

    /// Area in mm².
    #[inline]
    pub fn area_mm2(&self) -> CoordF {
        self.area() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.contour.bounding_box()
    }

    /// Inside the contour and not strictly inside any hole.
    pub fn contains_point(&self, p: &Point) -> bool {
        if !self.contour.contains_point(p) {
            return false;
        }
        !self.holes.iter().any(|h| {
            h.contains_point(p) && !h.lines().iter().any(|l| l.contains_point(p))
        })
    }

    /// Generic containment, see [`Containable`].
    #[inline]
    pub fn contains<T: Containable + ?Sized>(&self, item: &T) -> bool {
        item.is_contained_in(self)
    }

    /// Contour followed by holes.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        let mut polygons = Vec::with_capacity(1 + self.holes.len());
        polygons.push(self.contour.clone());
        polygons.extend(self.holes.iter().cloned());
        polygons
    }

    /// Every boundary as a closed polyline.
    pub fn to_polylines(&self) -> Vec<Polyline> {
        self.to_polygons().iter().map(Polyline::from_polygon).collect()
    }

    pub fn lines(&self) -> Vec<Line> {
        self.to_polygons().iter().flat_map(|p| p.lines()).collect()
    }

    /// Total boundary length in scaled units.
    pub fn perimeter_length(&self) -> CoordF {
        self.to_polygons().iter().map(|p| p.length()).sum()
    }

    pub fn translate(&mut self, v: Point) {
        self.contour.translate(v);
        for hole in &mut self.holes {
            hole.translate(v);
        }
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon(contour={} points, holes={}, area={:.3}mm²)",
            self.contour.len(),
            self.holes.len(),
            self.area_mm2()
        )
    }
}

impl From<Polygon> for ExPolygon {
    fn from(contour: Polygon) -> Self {
        Self::new(contour)
    }
}

/// Type alias for a collection of expolygons.
pub type ExPolygons = Vec<ExPolygon>;

/// Sum of areas in mm².
pub fn total_area_mm2(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(|e| e.area_mm2()).sum()
}

/// Reorder islands by greedy nearest neighbour on bounding box centres,
/// starting from the first one.
pub fn chain_expolygons(mut expolygons: ExPolygons) -> ExPolygons {
    if expolygons.len() < 3 {
        return expolygons;
    }
    let mut ordered = Vec::with_capacity(expolygons.len());
    let mut current = expolygons.remove(0);
    while !expolygons.is_empty() {
        let center = current.bounding_box().center();
        let mut best = 0;
        let mut best_dist = i128::MAX;
        for (idx, candidate) in expolygons.iter().enumerate() {
            let dist = center.distance_squared(&candidate.bounding_box().center());
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
        }
        ordered.push(std::mem::replace(&mut current, expolygons.swap_remove(best)));
    }
    ordered.push(current);
    ordered
}

/// Geometry that can be tested for containment in an [`ExPolygon`].
///
/// Containment is vertex based for paths and polygons: every vertex must lie
/// inside. This is what layer adjacency queries need; it does not detect an
/// edge leaving and re-entering between two vertices.
pub trait Containable {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool;
}

impl Containable for Point {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        expolygon.contains_point(self)
    }
}

impl Containable for Line {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        expolygon.contains_point(&self.a)
            && expolygon.contains_point(&self.b)
            && expolygon.contains_point(&self.midpoint())
    }
}

impl Containable for Polyline {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        !self.is_empty() && self.iter().all(|p| expolygon.contains_point(p))
    }
}

impl Containable for Polygon {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        !self.is_empty() && self.iter().all(|p| expolygon.contains_point(p))
    }
}

impl Containable for ExPolygon {
    fn is_contained_in(&self, expolygon: &ExPolygon) -> bool {
        self.contour.is_contained_in(expolygon)
    }
}
