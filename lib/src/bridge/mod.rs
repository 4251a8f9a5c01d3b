//! Bridge detection.
//!
//! Given a surface hanging over the layer below, find the direction in which
//! straight extrusions are best anchored on both ends:
//!
//! 1. Grow the bridge by one spacing and intersect with the lower slices to
//!    get the anchor regions.
//! 2. Test candidate angles every 5°, plus the directions of the bridge edges
//!    and of the anchoring edges.
//! 3. For each angle, lay test lines one spacing apart, clip them to the
//!    bridge and sum the length of those anchored at both ends.
//! 4. Keep the best coverage; among candidates within one spacing of it,
//!    prefer the shortest longest span.

use crate::clipper::{
    self, diff_pl, expolygons_to_polylines, intersect_polylines_with_expolygons,
    point_in_expolygons, OffsetJoinType,
};
use crate::geometry::{directions_parallel, BoundingBox, ExPolygon, ExPolygons, Line, Point, Polyline, Polylines};
use crate::{scale, unscale, Coord, CoordF};
use std::f64::consts::PI;

/// Angular step of the brute-force search.
const ANGLE_RESOLUTION: CoordF = PI / 36.0;

/// Edges within this angle of the bridge direction are not reported as
/// unsupported: bridge lines run along them.
const PARALLEL_EDGE_TOLERANCE: CoordF = PI / 36.0;

#[derive(Debug, Clone)]
struct BridgeDirection {
    angle: CoordF,
    coverage: CoordF,
    max_length: CoordF,
}

impl BridgeDirection {
    fn new(angle: CoordF) -> Self {
        Self {
            angle,
            coverage: 0.0,
            max_length: 0.0,
        }
    }
}

/// Finds the bridging direction of one bridge surface.
#[derive(Debug)]
pub struct BridgeDetector {
    expolygons: ExPolygons,
    lower_slices: ExPolygons,
    /// Extrusion spacing (scaled).
    spacing: Coord,
    /// Detected angle in radians, in `[0, π)`.
    pub angle: Option<CoordF>,
    edges: Polylines,
    anchor_regions: ExPolygons,
}

impl BridgeDetector {
    /// `spacing` is the bridge flow spacing in mm.
    pub fn new(expolygon: ExPolygon, lower_slices: &ExPolygons, spacing: CoordF) -> Self {
        let mut detector = Self {
            expolygons: vec![expolygon],
            lower_slices: lower_slices.clone(),
            spacing: scale(spacing),
            angle: None,
            edges: Vec::new(),
            anchor_regions: Vec::new(),
        };
        detector.initialize();
        detector
    }

    fn initialize(&mut self) {
        if self.lower_slices.is_empty() {
            return;
        }
        let grown = clipper::grow(&self.expolygons, unscale(self.spacing), OffsetJoinType::Square);
        if grown.is_empty() {
            return;
        }

        // Anchoring edges: the grown outline where it runs over lower contours.
        let lower_contours: ExPolygons = self
            .lower_slices
            .iter()
            .map(|ex| ExPolygon::new(ex.contour.clone()))
            .collect();
        self.edges = intersect_polylines_with_expolygons(&expolygons_to_polylines(&grown), &lower_contours);

        // Small safety offset so endpoints on the exact boundary still count.
        let lower = clipper::grow(&clipper::union_ex(&self.lower_slices), 0.01, OffsetJoinType::Square);
        self.anchor_regions = clipper::intersection(&grown, &lower);
    }

    /// Search the bridging angle. Returns `false` when the bridge has no
    /// anchors at all: it hangs completely in the air.
    pub fn detect_angle(&mut self) -> bool {
        if self.edges.is_empty() || self.anchor_regions.is_empty() {
            return false;
        }

        let mut candidates: Vec<BridgeDirection> = self
            .direction_candidates()
            .into_iter()
            .map(BridgeDirection::new)
            .collect();

        let clip_area = clipper::grow(
            &self.expolygons,
            0.5 * unscale(self.spacing),
            OffsetJoinType::Square,
        );

        let mut have_coverage = false;
        for candidate in &mut candidates {
            let lines = self.test_lines(candidate.angle);
            let clipped = intersect_polylines_with_expolygons(&lines, &clip_area);

            for line in &clipped {
                let (Some(a), Some(b)) = (line.first_point(), line.last_point()) else {
                    continue;
                };
                if point_in_expolygons(&a, &self.anchor_regions)
                    && point_in_expolygons(&b, &self.anchor_regions)
                {
                    let len = line.length();
                    candidate.coverage += len;
                    candidate.max_length = candidate.max_length.max(len);
                }
            }
            have_coverage |= candidate.coverage > 0.0;
        }

        if !have_coverage {
            return false;
        }

        candidates.sort_by(|a, b| b.coverage.total_cmp(&a.coverage));

        let spacing = self.spacing as CoordF;
        let mut best = 0;
        for i in 1..candidates.len() {
            if candidates[0].coverage - candidates[i].coverage >= spacing {
                break;
            }
            if candidates[i].max_length < candidates[best].max_length {
                best = i;
            }
        }

        let mut angle = candidates[best].angle;
        if angle >= PI {
            angle -= PI;
        }
        self.angle = Some(angle);
        true
    }

    /// Parallel lines at `angle`, one spacing apart, covering the anchors.
    fn test_lines(&self, angle: CoordF) -> Polylines {
        let mut bbox = BoundingBox::default();
        for expoly in &self.anchor_regions {
            for p in expoly.contour.points() {
                bbox.merge_point(p.rotated(-angle));
            }
        }
        if bbox.is_empty() || self.spacing <= 0 {
            return Vec::new();
        }

        let mut lines = Vec::new();
        let mut y = bbox.min.y;
        while y <= bbox.max.y {
            let a = Point::new(bbox.min.x, y).rotated(angle);
            let b = Point::new(bbox.max.x, y).rotated(angle);
            lines.push(Polyline::from(Line::new(a, b)));
            y += self.spacing;
        }
        lines
    }

    fn direction_candidates(&self) -> Vec<CoordF> {
        let steps = (PI / ANGLE_RESOLUTION).round() as usize;
        let mut angles: Vec<CoordF> = (0..steps).map(|i| i as CoordF * ANGLE_RESOLUTION).collect();

        for expoly in &self.expolygons {
            angles.extend(expoly.lines().iter().map(Line::direction_angle));
        }
        // C-shaped supports anchor along the chord of their edge.
        for edge in &self.edges {
            if let (Some(a), Some(b)) = (edge.first_point(), edge.last_point()) {
                if a != b {
                    angles.push(Line::new(a, b).direction_angle());
                }
            }
        }

        angles.sort_by(|a, b| a.total_cmp(b));
        let mut unique: Vec<CoordF> = Vec::with_capacity(angles.len());
        for angle in angles {
            if !unique
                .iter()
                .any(|&u| directions_parallel(angle, u, PI / 180.0))
            {
                unique.push(angle);
            }
        }
        unique
    }

    /// Bridge outline portions resting on nothing, excluding those running
    /// along the bridge direction.
    pub fn unsupported_edges(&self, angle: Option<CoordF>) -> Polylines {
        let grown_lower = clipper::grow(&self.lower_slices, unscale(self.spacing), OffsetJoinType::Square);
        let outline = diff_pl(&expolygons_to_polylines(&self.expolygons), &grown_lower);

        let Some(angle) = angle.or(self.angle) else {
            return outline;
        };

        let mut unsupported = Vec::new();
        for polyline in &outline {
            for line in polyline.lines() {
                if !directions_parallel(line.direction_angle(), angle, PARALLEL_EDGE_TOLERANCE) {
                    unsupported.push(Polyline::from(line));
                }
            }
        }
        unsupported
    }

    pub fn anchor_regions(&self) -> &ExPolygons {
        &self.anchor_regions
    }
}
