//! Infill pattern generation.
//!
//! A [`Filler`] turns one fill island into open polylines. The island is the
//! area left by the perimeter stage; lines are laid on a grid anchored at the
//! origin so consecutive layers line up, then clipped exactly to the island.
//!
//! [`RectilinearFiller`] handles the linear patterns:
//! - `Rectilinear`: one line set, turned by 90° every layer
//! - `Grid`: two crossing line sets on every layer
//! - `Line`: one line set at the base angle

use crate::clipper::intersect_polylines_with_expolygons;
use crate::config::InfillPattern;
use crate::geometry::{BoundingBox, ExPolygon, Line, Point, Polyline, Polylines};
use crate::{scale, Coord, CoordF};
use std::f64::consts::FRAC_PI_2;

/// Parameters for filling one island.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillParams {
    /// Fraction of the island covered, `(0, 1]`.
    pub density: CoordF,
    /// Base line direction in radians.
    pub angle: CoordF,
    /// Flow spacing in mm; the line distance is `spacing / density`.
    pub spacing: CoordF,
    pub pattern: InfillPattern,
    pub layer_id: usize,
    /// Bridges use the given angle as is, one line set at full density.
    pub bridge: bool,
}

impl FillParams {
    /// Line distance in mm, or `None` when nothing should be laid.
    pub fn line_distance(&self) -> Option<CoordF> {
        if !(self.density > 0.0) || !(self.spacing > 0.0) {
            return None;
        }
        let density = if self.bridge { 1.0 } else { self.density.min(1.0) };
        let distance = self.spacing / density;
        match self.pattern {
            // Two crossing sets share the material of one.
            InfillPattern::Grid if !self.bridge && density < 1.0 => Some(distance * 2.0),
            _ => Some(distance),
        }
    }

    /// Line directions laid on this layer.
    pub fn angles(&self) -> Vec<CoordF> {
        if self.bridge {
            return vec![self.angle];
        }
        match self.pattern {
            InfillPattern::Rectilinear if self.layer_id % 2 == 1 => vec![self.angle + FRAC_PI_2],
            InfillPattern::Rectilinear | InfillPattern::Line => vec![self.angle],
            InfillPattern::Grid => vec![self.angle, self.angle + FRAC_PI_2],
        }
    }
}

/// Fills an island with a pattern.
pub trait Filler: Send + Sync {
    fn fill(&self, expolygon: &ExPolygon, params: &FillParams) -> Polylines;
}

/// Parallel lines, alternately reversed to zig-zag across the island.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectilinearFiller;

impl RectilinearFiller {
    pub fn new() -> Self {
        Self
    }

    fn fill_direction(&self, expolygon: &ExPolygon, angle: CoordF, distance: Coord) -> Polylines {
        let mut bbox = BoundingBox::default();
        for p in expolygon.contour.points() {
            bbox.merge_point(p.rotated(-angle));
        }
        if bbox.is_empty() || distance <= 0 {
            return Vec::new();
        }

        // Grid anchored at the origin, half a line distance off the lines.
        let first = bbox.min.y.div_euclid(distance) * distance + distance / 2;
        let mut lines = Vec::new();
        let mut y = first;
        while y <= bbox.max.y {
            let a = Point::new(bbox.min.x - distance, y).rotated(angle);
            let b = Point::new(bbox.max.x + distance, y).rotated(angle);
            lines.push(Polyline::from(Line::new(a, b)));
            y += distance;
        }

        let mut clipped =
            intersect_polylines_with_expolygons(&lines, std::slice::from_ref(expolygon));
        for (i, polyline) in clipped.iter_mut().enumerate() {
            if i % 2 == 1 {
                polyline.reverse();
            }
        }
        clipped
    }
}

impl Filler for RectilinearFiller {
    fn fill(&self, expolygon: &ExPolygon, params: &FillParams) -> Polylines {
        let Some(distance) = params.line_distance() else {
            return Vec::new();
        };
        let distance = scale(distance);
        params
            .angles()
            .into_iter()
            .flat_map(|angle| self.fill_direction(expolygon, angle, distance))
            .collect()
    }
}
