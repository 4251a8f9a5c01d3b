//! Point types.
//!
//! [`Point`] stores scaled integer coordinates, [`PointF`] stores millimetres.

use crate::{scale, unscale, Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A 2D point with scaled integer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// Create a point from millimetre coordinates.
    #[inline]
    pub fn new_scale(x: CoordF, y: CoordF) -> Self {
        Self::new(scale(x), scale(y))
    }

    #[inline]
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Convert to an unscaled floating-point point (mm).
    #[inline]
    pub fn to_f64(&self) -> PointF {
        PointF::new(unscale(self.x), unscale(self.y))
    }

    /// Squared distance in scaled units, computed without overflow.
    #[inline]
    pub fn distance_squared(&self, other: &Point) -> i128 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        dx * dx + dy * dy
    }

    /// Euclidean distance in scaled units.
    #[inline]
    pub fn distance(&self, other: &Point) -> CoordF {
        (self.distance_squared(other) as CoordF).sqrt()
    }

    /// Rotate around the origin by `angle` radians.
    pub fn rotate(&mut self, angle: CoordF) {
        let (s, c) = angle.sin_cos();
        let x = self.x as CoordF;
        let y = self.y as CoordF;
        self.x = (c * x - s * y).round() as Coord;
        self.y = (s * x + c * y).round() as Coord;
    }

    pub fn rotated(&self, angle: CoordF) -> Self {
        let mut p = *self;
        p.rotate(angle);
        p
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", unscale(self.x), unscale(self.y))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", unscale(self.x), unscale(self.y))
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;

    #[inline]
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Type alias for a list of points.
pub type Points = Vec<Point>;

/// A 2D point with floating-point coordinates, in mm.
#[derive(Clone, Copy, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct PointF {
    pub x: CoordF,
    pub y: CoordF,
}

impl PointF {
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    /// Convert to a scaled integer point.
    #[inline]
    pub fn to_scaled(&self) -> Point {
        Point::new_scale(self.x, self.y)
    }

    #[inline]
    pub fn length(&self) -> CoordF {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for PointF {
    type Output = PointF;

    #[inline]
    fn add(self, rhs: PointF) -> PointF {
        PointF::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for PointF {
    type Output = PointF;

    #[inline]
    fn sub(self, rhs: PointF) -> PointF {
        PointF::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<CoordF> for PointF {
    type Output = PointF;

    #[inline]
    fn mul(self, rhs: CoordF) -> PointF {
        PointF::new(self.x * rhs, self.y * rhs)
    }
}
