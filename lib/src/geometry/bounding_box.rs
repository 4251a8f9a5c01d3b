//! Axis-aligned bounding boxes.

use super::Point;
use crate::{unscale, CoordF};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in scaled coordinates.
///
/// An empty box (`defined == false`) absorbs the first merged point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
    pub defined: bool,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self {
            min,
            max,
            defined: true,
        }
    }

    pub fn from_points(points: &[Point]) -> Self {
        let mut bb = Self::default();
        for p in points {
            bb.merge_point(*p);
        }
        bb
    }

    pub fn merge_point(&mut self, p: Point) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.defined {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.defined
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2,
            (self.min.y + self.max.y) / 2,
        )
    }

    /// Size of the box in mm.
    pub fn size_mm(&self) -> (CoordF, CoordF) {
        (
            unscale(self.max.x - self.min.x),
            unscale(self.max.y - self.min.y),
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.defined
            && p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
    }
}
