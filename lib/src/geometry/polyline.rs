//! Polyline type for open paths.

use super::{BoundingBox, Line, Point, Polygon};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// An open polyline defined by a sequence of points.
///
/// Unlike a Polygon, a Polyline is not implicitly closed - it's a path from
/// the first point to the last point.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Point>,
}

impl Polyline {
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    #[inline]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Create a polyline from a polygon (closes the polygon by repeating the first point).
    pub fn from_polygon(polygon: &Polygon) -> Self {
        let mut points = polygon.points().to_vec();
        if !points.is_empty() && points.first() != points.last() {
            points.push(points[0]);
        }
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    #[inline]
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// First point, if any.
    #[inline]
    pub fn first_point(&self) -> Option<Point> {
        self.points.first().copied()
    }

    /// Last point, if any.
    #[inline]
    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Segments between consecutive points.
    pub fn lines(&self) -> Vec<Line> {
        self.points
            .windows(2)
            .map(|w| Line::new(w[0], w[1]))
            .collect()
    }

    /// Total length in scaled units.
    pub fn length(&self) -> CoordF {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    /// Whether the first point equals the last point.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.points.len() >= 2 && self.points.first() == self.points.last()
    }

    /// At least two points are needed to describe a path.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }
}

impl fmt::Debug for Polyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polyline({} points)", self.points.len())
    }
}

impl Deref for Polyline {
    type Target = [Point];

    fn deref(&self) -> &[Point] {
        &self.points
    }
}

impl DerefMut for Polyline {
    fn deref_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }
}

impl FromIterator<Point> for Polyline {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl From<Vec<Point>> for Polyline {
    fn from(points: Vec<Point>) -> Self {
        Self::from_points(points)
    }
}

impl From<Line> for Polyline {
    fn from(line: Line) -> Self {
        Self::from_points(vec![line.a, line.b])
    }
}

/// Type alias for a collection of polylines.
pub type Polylines = Vec<Polyline>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_length() {
        let pl = Polyline::from_points(vec![
            Point::new(0, 0),
            Point::new(3, 4),
            Point::new(3, 10),
        ]);
        assert!((pl.length() - 11.0).abs() < 1e-9);
        assert_eq!(pl.lines().len(), 2);
    }

    #[test]
    fn test_polyline_from_polygon_is_closed() {
        let square = Polygon::rectangle_mm(0.0, 0.0, 1.0, 1.0);
        let pl = Polyline::from_polygon(&square);
        assert!(pl.is_closed());
        assert_eq!(pl.len(), 5);
    }

    #[test]
    fn test_polyline_first_last() {
        let mut pl = Polyline::new();
        assert!(pl.first_point().is_none());
        pl.push(Point::new(1, 2));
        pl.push(Point::new(3, 4));
        pl.reverse();
        assert_eq!(pl.first_point(), Some(Point::new(3, 4)));
        assert_eq!(pl.last_point(), Some(Point::new(1, 2)));
    }
}
