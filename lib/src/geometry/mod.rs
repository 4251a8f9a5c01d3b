//! Geometry primitives for the layer model.
//!
//! - [`Point`] / [`PointF`] - scaled integer and millimetre points
//! - [`Line`] - line segment between two points
//! - [`Polygon`] - closed polygon (boundary)
//! - [`Polyline`] - open polyline (path)
//! - [`ExPolygon`] - polygon with holes, plus the [`Containable`] query trait
//! - [`BoundingBox`] - axis-aligned bounding box
//!
//! ## Coordinate System
//!
//! Coordinates are scaled integers: 1 unit = 1 nanometer, 1mm = 1_000_000
//! units. Use `scale()` / `unscale()` from the crate root to convert.

mod bounding_box;
mod expolygon;
mod line;
mod point;
mod polygon;
mod polyline;

pub use bounding_box::BoundingBox;
pub use expolygon::{chain_expolygons, total_area_mm2, Containable, ExPolygon, ExPolygons};
pub use line::{Line, Lines};
pub use point::{Point, PointF, Points};
pub use polygon::{Polygon, Polygons};
pub use polyline::{Polyline, Polylines};

/// Cross product of two 2D vectors (returns a scalar).
/// Positive when `v2` is counter-clockwise from `v1`.
#[inline]
pub fn cross2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.y as i128 - v1.y as i128 * v2.x as i128
}

/// Dot product of two 2D vectors.
#[inline]
pub fn dot2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.x as i128 + v1.y as i128 * v2.y as i128
}

/// Whether two directions (radians) are parallel within `tolerance`,
/// treating opposite directions as parallel.
pub fn directions_parallel(a: f64, b: f64, tolerance: f64) -> bool {
    let pi = std::f64::consts::PI;
    let mut diff = (a - b).abs() % pi;
    if diff > pi / 2.0 {
        diff = pi - diff;
    }
    diff < tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross2() {
        let v1 = Point::new(1, 0);
        let v2 = Point::new(0, 1);
        assert_eq!(cross2(v1, v2), 1);
        assert_eq!(cross2(v1, Point::new(0, -1)), -1);
    }

    #[test]
    fn test_directions_parallel() {
        let pi = std::f64::consts::PI;
        assert!(directions_parallel(0.0, pi, 1e-6));
        assert!(directions_parallel(0.01, pi - 0.01, 0.05));
        assert!(!directions_parallel(0.0, pi / 2.0, 0.1));
    }
}
