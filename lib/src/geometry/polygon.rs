//! Closed polygon type.

use super::{cross2, BoundingBox, Line, Point};
use crate::{CoordF, SCALING_FACTOR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A closed polygon. The closing edge from the last point back to the first
/// is implicit. Counter-clockwise polygons are contours, clockwise ones holes.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle from millimetre corners, counter-clockwise.
    pub fn rectangle_mm(x0: CoordF, y0: CoordF, x1: CoordF, y1: CoordF) -> Self {
        Self::from_points(vec![
            Point::new_scale(x0, y0),
            Point::new_scale(x1, y0),
            Point::new_scale(x1, y1),
            Point::new_scale(x0, y1),
        ])
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Signed area in scaled units squared (positive for counter-clockwise).
    pub fn signed_area(&self) -> CoordF {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum: i128 = 0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += cross2(a, b);
        }
        sum as CoordF * 0.5
    }

    /// Absolute area in scaled units squared.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    /// Absolute area in mm².
    #[inline]
    pub fn area_mm2(&self) -> CoordF {
        self.area() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    #[inline]
    pub fn is_counter_clockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn make_counter_clockwise(&mut self) {
        if !self.is_counter_clockwise() {
            self.points.reverse();
        }
    }

    pub fn make_clockwise(&mut self) {
        if self.is_counter_clockwise() {
            self.points.reverse();
        }
    }

    /// Polygons need at least three points.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
    }

    /// All edges including the closing one.
    pub fn lines(&self) -> Vec<Line> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        (0..n)
            .map(|i| Line::new(self.points[i], self.points[(i + 1) % n]))
            .collect()
    }

    /// Perimeter length in scaled units.
    pub fn length(&self) -> CoordF {
        self.lines().iter().map(|l| l.length()).sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    /// Even-odd ray cast. Points exactly on an edge count as inside.
    pub fn contains_point(&self, p: &Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if Line::new(a, b).contains_point(p) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) as CoordF / (b.y - a.y) as CoordF;
                let x = a.x as CoordF + t * (b.x - a.x) as CoordF;
                if (p.x as CoordF) < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p = *p + v;
        }
    }

    pub fn rotate(&mut self, angle: CoordF) {
        for p in &mut self.points {
            p.rotate(angle);
        }
    }
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Polygon({} points, area={:.3}mm²)",
            self.points.len(),
            self.area_mm2()
        )
    }
}

impl Deref for Polygon {
    type Target = [Point];

    fn deref(&self) -> &[Point] {
        &self.points
    }
}

impl DerefMut for Polygon {
    fn deref_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self::from_points(points)
    }
}

impl FromIterator<Point> for Polygon {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

/// Type alias for a collection of polygons.
pub type Polygons = Vec<Polygon>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_area_and_orientation() {
        let mut square = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        assert!(square.is_counter_clockwise());
        assert!((square.area_mm2() - 100.0).abs() < 1e-9);

        square.make_clockwise();
        assert!(!square.is_counter_clockwise());
        assert!((square.area_mm2() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_contains_point() {
        let square = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        assert!(square.contains_point(&Point::new_scale(5.0, 5.0)));
        assert!(square.contains_point(&Point::new_scale(0.0, 5.0)));
        assert!(!square.contains_point(&Point::new_scale(10.5, 5.0)));
    }

    #[test]
    fn test_polygon_length() {
        let square = Polygon::rectangle_mm(0.0, 0.0, 2.0, 3.0);
        assert!((square.length() - 10_000_000.0).abs() < 1e-3);
        assert_eq!(square.lines().len(), 4);
    }
}
