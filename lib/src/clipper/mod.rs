//! Clipper polygon boolean operations module.
//!
//! Polygon booleans (union, intersection, difference) and offsets are
//! delegated to the geo-clipper library. Polyline clipping against
//! expolygons is done exactly here, by splitting segments at boundary
//! crossings.
//!
//! All distances passed to offset functions are in mm.

use crate::geometry::{
    total_area_mm2, ExPolygon, ExPolygons, Line, Point, Polygon, Polyline, Polylines,
};
use crate::{scale, unscale, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Precision of geo-clipper integer conversion: 1000 units per mm (1 micron).
const CLIPPER_FACTOR: f64 = 1000.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    Square,
    #[default]
    Round,
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25),
            OffsetJoinType::Miter => JoinType::Miter(2.0),
        }
    }
}

fn ring_to_geo(poly: &Polygon, counter_clockwise: bool) -> LineString<f64> {
    let mut ring: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();
    if poly.is_counter_clockwise() != counter_clockwise {
        ring.reverse();
    }
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    LineString::new(ring)
}

/// Contours are passed counter-clockwise and holes clockwise, so the
/// non-zero fill rule used by geo-clipper sees holes as holes.
fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    GeoPolygon::new(
        ring_to_geo(&expoly.contour, true),
        expoly.holes.iter().map(|h| ring_to_geo(h, false)).collect(),
    )
}

fn geo_ring_to_polygon(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Polygon::from_points(points)
}

fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>) -> ExPolygon {
    let mut contour = geo_ring_to_polygon(geo_poly.exterior());
    contour.make_counter_clockwise();
    let holes = geo_poly
        .interiors()
        .iter()
        .map(|interior| {
            let mut hole = geo_ring_to_polygon(interior);
            hole.make_clockwise();
            hole
        })
        .collect();
    ExPolygon::with_holes(contour, holes)
}

fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>) -> ExPolygons {
    multi
        .0
        .iter()
        .map(geo_to_expolygon)
        .filter(|e| !e.is_empty())
        .collect()
}

fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

// ============================================================================
// Boolean Operations
// ============================================================================

/// Union of two sets of polygons.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() && clip.is_empty() {
        return vec![];
    }
    let result = expolygons_to_geo_multi(subject).union(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Union of a single set of potentially overlapping polygons.
///
/// Always runs through clipper so the result is normalized: no overlaps,
/// contours counter-clockwise, holes clockwise.
pub fn union_ex(polygons: &[ExPolygon]) -> ExPolygons {
    union(polygons, &[])
}

/// Smallest area difference (mm²) reported as a slicing inconsistency.
const SOUP_AREA_TOLERANCE: CoordF = 1e-3;

/// Expolygons built from a raw polygon soup such as a slicing engine emits.
#[derive(Debug, Clone, Default)]
pub struct SoupRepair {
    pub expolygons: ExPolygons,
    /// The soup was not a set of well-formed counter-clockwise contours and
    /// clockwise holes, and `expolygons` is a best-effort reconstruction.
    pub repaired: bool,
}

/// Build expolygons from a raw polygon soup.
///
/// Counter-clockwise polygons are material and clockwise ones are holes.
/// A self-intersecting ring, or a clockwise ring lying outside every
/// contour, makes the orientations untrustworthy: the result then falls back
/// to the even-odd fill of all rings and is flagged as repaired.
pub fn repair_polygons_ex(polygons: &[Polygon]) -> SoupRepair {
    let rings: Vec<&Polygon> = polygons.iter().filter(|p| p.is_valid()).collect();
    let regions: Vec<ExPolygons> = rings.iter().map(|ring| ring_region(ring)).collect();

    // A self-intersecting ring encloses more than its signed area says.
    let tangled = rings.iter().zip(&regions).any(|(ring, region)| {
        let enclosed = total_area_mm2(region);
        (enclosed - ring.area_mm2()).abs() > SOUP_AREA_TOLERANCE.max(enclosed * 0.01)
    });

    let (contours, holes): (Vec<(&Polygon, &ExPolygons)>, Vec<(&Polygon, &ExPolygons)>) = rings
        .iter()
        .copied()
        .zip(&regions)
        .partition(|(ring, _)| ring.is_counter_clockwise());
    let material = union_ex(&contours.iter().flat_map(|(_, r)| r.iter().cloned()).collect::<Vec<_>>());
    let hole_area: ExPolygons = holes.iter().flat_map(|(_, r)| r.iter().cloned()).collect();

    let stray = holes.iter().any(|(_, region)| {
        let enclosed = total_area_mm2(region);
        enclosed > SOUP_AREA_TOLERANCE
            && total_area_mm2(&intersection(region, &material)) < enclosed * 0.5
    });

    if !tangled && !stray {
        return SoupRepair {
            expolygons: difference(&material, &hole_area),
            repaired: false,
        };
    }

    let expolygons = regions
        .iter()
        .fold(ExPolygons::new(), |acc, region| xor(&acc, region));
    SoupRepair {
        expolygons,
        repaired: true,
    }
}

/// Area enclosed by one ring under the non-zero rule, whatever its
/// orientation.
fn ring_region(ring: &Polygon) -> ExPolygons {
    union_ex(&[ExPolygon::new(ring.clone())])
}

/// Area covered by exactly one of the two sets.
pub fn xor(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return union_ex(clip);
    }
    if clip.is_empty() {
        return union_ex(subject);
    }
    let result = expolygons_to_geo_multi(subject).xor(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Intersection of two sets of polygons.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }
    let result = expolygons_to_geo_multi(subject)
        .intersection(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

/// Difference of two sets of polygons (subject - clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }
    let result = expolygons_to_geo_multi(subject)
        .difference(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result)
}

// ============================================================================
// Offset Operations
// ============================================================================

/// Offset multiple ExPolygons by a given distance.
///
/// Positive delta inflates (grows) the polygons, negative delta deflates (shrinks) them.
pub fn offset_expolygons(
    expolygons: &[ExPolygon],
    delta: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }
    let result = expolygons_to_geo_multi(expolygons).offset(
        delta,
        join_type.into(),
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    geo_multi_to_expolygons(&result)
}

/// Shrink (inset) ExPolygons by a given distance.
pub fn shrink(expolygons: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolygons, -distance.abs(), join_type)
}

/// Grow (outset) ExPolygons by a given distance.
pub fn grow(expolygons: &[ExPolygon], distance: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    offset_expolygons(expolygons, distance.abs(), join_type)
}

/// Morphological opening: shrink then grow by the same amount.
///
/// Removes parts narrower than `2 * distance`.
pub fn opening(
    expolygons: &[ExPolygon],
    distance: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() || distance <= 0.0 {
        return expolygons.to_vec();
    }
    grow(&shrink(expolygons, distance, join_type), distance, join_type)
}

/// Morphological closing: grow then shrink by the same amount.
///
/// Fills gaps and slits narrower than `2 * distance`.
pub fn closing(
    expolygons: &[ExPolygon],
    distance: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() || distance <= 0.0 {
        return expolygons.to_vec();
    }
    shrink(&grow(expolygons, distance, join_type), distance, join_type)
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Whether `point` lies inside any of the expolygons (boundary included).
pub fn point_in_expolygons(point: &Point, expolygons: &[ExPolygon]) -> bool {
    expolygons.iter().any(|e| e.contains_point(point))
}

/// All boundaries of the expolygons as closed polylines.
pub fn expolygons_to_polylines(expolygons: &[ExPolygon]) -> Polylines {
    expolygons.iter().flat_map(|e| e.to_polylines()).collect()
}

// ============================================================================
// Polyline Clipping
// ============================================================================

/// Portions of the polylines that lie inside the expolygons.
pub fn intersect_polylines_with_expolygons(polylines: &[Polyline], clip: &[ExPolygon]) -> Polylines {
    if clip.is_empty() {
        return vec![];
    }
    clip_polylines(polylines, clip, true)
}

/// Portions of the polylines that lie outside the expolygons.
pub fn diff_pl(polylines: &[Polyline], clip: &[ExPolygon]) -> Polylines {
    if clip.is_empty() {
        return polylines.iter().filter(|p| p.is_valid()).cloned().collect();
    }
    clip_polylines(polylines, clip, false)
}

fn clip_polylines(polylines: &[Polyline], clip: &[ExPolygon], keep_inside: bool) -> Polylines {
    let edges: Vec<Line> = clip.iter().flat_map(|e| e.lines()).collect();
    let mut result = Vec::new();

    for polyline in polylines {
        let mut current: Vec<Point> = Vec::new();
        for line in polyline.lines() {
            for (a, b, inside) in split_segment(&line, &edges, clip) {
                if a == b {
                    continue;
                }
                if inside != keep_inside {
                    if current.len() >= 2 {
                        result.push(Polyline::from_points(std::mem::take(&mut current)));
                    }
                    current.clear();
                    continue;
                }
                if current.last() != Some(&a) {
                    if current.len() >= 2 {
                        result.push(Polyline::from_points(std::mem::take(&mut current)));
                    }
                    current.clear();
                    current.push(a);
                }
                current.push(b);
            }
        }
        if current.len() >= 2 {
            result.push(Polyline::from_points(current));
        }
    }

    result
}

/// Split a segment at every crossing with `edges`, tagging each piece with
/// whether its midpoint lies inside `clip`.
fn split_segment(line: &Line, edges: &[Line], clip: &[ExPolygon]) -> Vec<(Point, Point, bool)> {
    let mut params = vec![0.0, 1.0];
    for edge in edges {
        if let Some((t, u)) = line.intersection_params(edge) {
            if t > 0.0 && t < 1.0 && (0.0..=1.0).contains(&u) {
                params.push(t);
            }
        }
    }
    params.sort_by(|a, b| a.total_cmp(b));
    params.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

    params
        .windows(2)
        .map(|w| {
            let a = line.point_at(w[0]);
            let b = line.point_at(w[1]);
            let mid = line.point_at((w[0] + w[1]) * 0.5);
            (a, b, point_in_expolygons(&mid, clip))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> ExPolygon {
        ExPolygon::rectangle_mm(x, y, x + size, y + size)
    }

    #[test]
    fn test_union_overlapping() {
        let a = make_square_mm(0.0, 0.0, 10.0);
        let b = make_square_mm(5.0, 0.0, 10.0);
        let result = union_ex(&[a, b]);
        assert_eq!(result.len(), 1);
        assert!((result[0].area_mm2() - 150.0).abs() < 0.01);
    }

    #[test]
    fn test_difference_makes_hole() {
        let outer = make_square_mm(0.0, 0.0, 10.0);
        let inner = make_square_mm(3.0, 3.0, 4.0);
        let result = difference(&[outer], &[inner]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert!((result[0].area_mm2() - 84.0).abs() < 0.01);
    }

    #[test]
    fn test_intersection() {
        let a = make_square_mm(0.0, 0.0, 10.0);
        let b = make_square_mm(5.0, 5.0, 10.0);
        let result = intersection(&[a], &[b]);
        assert_eq!(result.len(), 1);
        assert!((result[0].area_mm2() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_shrink_square() {
        let square = make_square_mm(0.0, 0.0, 10.0);
        let result = shrink(&[square], 1.0, OffsetJoinType::Miter);
        assert_eq!(result.len(), 1);
        assert!((result[0].area_mm2() - 64.0).abs() < 0.01);
    }

    #[test]
    fn test_repair_keeps_oriented_holes() {
        let outer = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let mut hole = Polygon::rectangle_mm(2.0, 2.0, 8.0, 8.0);
        hole.make_clockwise();
        let soup = repair_polygons_ex(&[outer, hole]);
        assert!(!soup.repaired);
        assert_eq!(soup.expolygons.len(), 1);
        assert!((soup.expolygons[0].area_mm2() - 64.0).abs() < 0.01);
    }

    #[test]
    fn test_repair_overlapping_contours_union() {
        let a = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let b = Polygon::rectangle_mm(5.0, 0.0, 15.0, 10.0);
        let soup = repair_polygons_ex(&[a, b]);
        assert!(!soup.repaired);
        assert!((total_area_mm2(&soup.expolygons) - 150.0).abs() < 0.01);
    }

    #[test]
    fn test_repair_figure_eight() {
        let bowtie = Polygon::from_points(vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(10.0, 10.0),
            Point::new_scale(10.0, 0.0),
            Point::new_scale(0.0, 10.0),
        ]);
        assert!(bowtie.area_mm2() < 1e-9);

        let soup = repair_polygons_ex(&[bowtie]);
        assert!(soup.repaired);
        // Both lobes survive.
        assert_eq!(soup.expolygons.len(), 2);
        assert!((total_area_mm2(&soup.expolygons) - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_repair_misoriented_island() {
        let island = Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0);
        let mut flipped = Polygon::rectangle_mm(20.0, 0.0, 30.0, 10.0);
        flipped.make_clockwise();
        let soup = repair_polygons_ex(&[island, flipped]);
        assert!(soup.repaired);
        assert_eq!(soup.expolygons.len(), 2);
        assert!((total_area_mm2(&soup.expolygons) - 200.0).abs() < 0.01);
    }

    #[test]
    fn test_xor_nested_makes_hole() {
        let outer = make_square_mm(0.0, 0.0, 10.0);
        let inner = make_square_mm(3.0, 3.0, 4.0);
        let result = xor(&[outer], &[inner]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert!((result[0].area_mm2() - 84.0).abs() < 0.01);
    }

    #[test]
    fn test_intersect_polylines_exact() {
        let square = make_square_mm(0.0, 0.0, 10.0);
        let line = Polyline::from(Line::from_coords_scale(-5.0, 5.0, 15.0, 5.0));
        let clipped = intersect_polylines_with_expolygons(&[line.clone()], &[square.clone()]);
        assert_eq!(clipped.len(), 1);
        assert!((clipped[0].length() - 10_000_000.0).abs() < 2.0);

        let outside = diff_pl(&[line], &[square]);
        assert_eq!(outside.len(), 2);
    }

    #[test]
    fn test_intersect_polylines_across_hole() {
        let outer = make_square_mm(0.0, 0.0, 10.0);
        let frame = difference(&[outer], &[make_square_mm(4.0, 4.0, 2.0)]);
        assert_eq!(frame.len(), 1);
        let line = Polyline::from(Line::from_coords_scale(-1.0, 5.0, 11.0, 5.0));
        let clipped = intersect_polylines_with_expolygons(&[line], &frame);
        assert_eq!(clipped.len(), 2);
    }
}
