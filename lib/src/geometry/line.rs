//! Line segment type.

use super::{cross2, dot2, Point, PointF};
use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// A line segment defined by two endpoints.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    #[inline]
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// Create a line from millimetre coordinates.
    #[inline]
    pub fn from_coords_scale(ax: CoordF, ay: CoordF, bx: CoordF, by: CoordF) -> Self {
        Self::new(Point::new_scale(ax, ay), Point::new_scale(bx, by))
    }

    #[inline]
    pub fn direction(&self) -> Point {
        self.b - self.a
    }

    /// Direction angle normalized to [0, PI).
    pub fn direction_angle(&self) -> CoordF {
        let dir = self.direction();
        let mut angle = (dir.y as CoordF).atan2(dir.x as CoordF);
        if angle < 0.0 {
            angle += PI;
        }
        if angle >= PI {
            angle -= PI;
        }
        angle
    }

    /// Length in scaled units.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.a.distance(&self.b)
    }

    #[inline]
    pub fn midpoint(&self) -> Point {
        Point::new((self.a.x + self.b.x) / 2, (self.a.y + self.b.y) / 2)
    }

    /// Point at parameter `t` in [0, 1] along the segment.
    pub fn point_at(&self, t: CoordF) -> Point {
        Point::new(
            (self.a.x as CoordF + (self.b.x - self.a.x) as CoordF * t).round() as Coord,
            (self.a.y as CoordF + (self.b.y - self.a.y) as CoordF * t).round() as Coord,
        )
    }

    /// Whether `p` lies on the segment (exact, integer arithmetic).
    pub fn contains_point(&self, p: &Point) -> bool {
        let d = self.direction();
        if cross2(d, *p - self.a) != 0 {
            return false;
        }
        let t = dot2(*p - self.a, d);
        t >= 0 && t <= dot2(d, d)
    }

    /// Parameters `(t, u)` where this segment meets the infinite line through
    /// `other`, or `None` when parallel. `t` is along `self`, `u` along `other`.
    pub fn intersection_params(&self, other: &Line) -> Option<(CoordF, CoordF)> {
        let r = self.direction();
        let s = other.direction();
        let denom = cross2(r, s);
        if denom == 0 {
            return None;
        }
        let qp = other.a - self.a;
        let t = cross2(qp, s) as CoordF / denom as CoordF;
        let u = cross2(qp, r) as CoordF / denom as CoordF;
        Some((t, u))
    }

    /// Unit normal as floating point, pointing to the right of the direction.
    pub fn normal(&self) -> PointF {
        let d = self.direction();
        let len = (d.x as CoordF).hypot(d.y as CoordF);
        if len == 0.0 {
            return PointF::default();
        }
        PointF::new(d.y as CoordF / len, -d.x as CoordF / len)
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({:?} -> {:?})", self.a, self.b)
    }
}

/// Type alias for a collection of lines.
pub type Lines = Vec<Line>;
