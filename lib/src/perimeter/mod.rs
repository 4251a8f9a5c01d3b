//! Perimeter generation.
//!
//! Perimeters are the loops tracing each island's outline, generated by
//! offsetting the slice inward once per loop:
//!
//! - loop 0 (external) sits half an external width inside the outline
//! - loop 1 sits the mean of external and internal spacing further in
//! - later loops are one internal spacing apart
//!
//! Internal loops are offset with an open/close pass (shrink further, grow
//! back) so parts too thin for a full loop are left to gap fill. What remains
//! inside the innermost loop, minus half a solid infill spacing and plus the
//! configured infill overlap, becomes the fill area.
//!
//! The [`PerimeterGenerator`] trait is the seam used by `LayerRegion`; the
//! shipped implementation is [`ClassicPerimeterGenerator`].

use crate::clipper::{
    difference, grow, intersect_polylines_with_expolygons, opening, shrink, OffsetJoinType,
};
use crate::config::PrintRegionConfig;
use crate::extrusion::{ExtrusionEntityCollection, ExtrusionLoop, ExtrusionPath, ExtrusionRole};
use crate::flow::Flow;
use crate::geometry::{ExPolygon, ExPolygons, Line, Point, Polygon, Polyline};
use crate::slice::SurfaceCollection;
use crate::{scale, CoordF};

/// Overlap tolerance between adjacent loops when sizing gap fill.
const INSET_OVERLAP_TOLERANCE: CoordF = 0.15;

/// Everything a perimeter generator reads.
#[derive(Debug, Clone, Copy)]
pub struct PerimeterInput<'a> {
    /// Classified islands of the region (or of all regions sharing its config).
    pub slices: &'a SurfaceCollection,
    /// Merged islands of the layer below; `None` on the first layer.
    pub lower_slices: Option<&'a ExPolygons>,
    pub layer_height: CoordF,
    pub layer_id: usize,
    pub perimeter_flow: Flow,
    pub ext_perimeter_flow: Flow,
    /// Flow for loops printed over air.
    pub overhang_flow: Flow,
    pub solid_infill_flow: Flow,
    pub config: &'a PrintRegionConfig,
}

/// Everything a perimeter generator writes.
#[derive(Debug, Clone, Default)]
pub struct PerimeterOutput {
    /// One nested collection per island, loops in print order.
    pub loops: ExtrusionEntityCollection,
    /// Thin extrusions filling gaps between loops.
    pub gap_fill: ExtrusionEntityCollection,
    /// Area left for infill, keeping each island's surface type.
    pub fill_surfaces: SurfaceCollection,
    /// Area left for infill without the infill overlap.
    pub fill_no_overlap: ExPolygons,
}

/// Generates perimeter loops and the remaining fill area.
pub trait PerimeterGenerator: Send + Sync {
    fn generate(&self, input: &PerimeterInput<'_>) -> PerimeterOutput;
}

/// Fixed-width loops by repeated inward offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicPerimeterGenerator {
    pub join_type: OffsetJoinType,
}

impl ClassicPerimeterGenerator {
    pub fn new() -> Self {
        Self {
            join_type: OffsetJoinType::Miter,
        }
    }
}

struct Spacings {
    ext_width: CoordF,
    ext_spacing: CoordF,
    spacing: CoordF,
    solid_spacing: CoordF,
}

impl PerimeterGenerator for ClassicPerimeterGenerator {
    fn generate(&self, input: &PerimeterInput<'_>) -> PerimeterOutput {
        let mut out = PerimeterOutput::default();
        let sp = Spacings {
            ext_width: input.ext_perimeter_flow.width(),
            ext_spacing: input.ext_perimeter_flow.spacing(),
            spacing: input.perimeter_flow.spacing(),
            solid_spacing: input.solid_infill_flow.spacing(),
        };

        // Loops hanging past this area are overhangs.
        let supported = input
            .lower_slices
            .filter(|_| input.layer_id > 0)
            .map(|lower| grow(lower, sp.ext_width / 2.0, self.join_type));

        for surface in input.slices {
            let loop_count = input.config.perimeters as usize + surface.extra_perimeters;
            let mut last: ExPolygons = vec![surface.expolygon.clone()];
            let mut levels: Vec<ExPolygons> = Vec::with_capacity(loop_count);
            let mut gaps: ExPolygons = Vec::new();

            for i in 0..loop_count {
                let offsets = if i == 0 {
                    shrink(&last, sp.ext_width / 2.0, self.join_type)
                } else {
                    let distance = if i == 1 {
                        (sp.ext_spacing + sp.spacing) / 2.0
                    } else {
                        sp.spacing
                    };
                    let narrowed = shrink(&last, distance + sp.spacing / 2.0, self.join_type);
                    let offsets = grow(&narrowed, sp.spacing / 2.0, self.join_type);
                    if input.config.gap_fill {
                        let outer = shrink(&last, distance / 2.0, self.join_type);
                        let inner = grow(&offsets, distance / 2.0 + 0.001, self.join_type);
                        gaps.extend(difference(&outer, &inner));
                    }
                    offsets
                };
                if offsets.is_empty() {
                    break;
                }
                levels.push(offsets.clone());
                last = offsets;
            }

            out.loops.push_collection(self.island_loops(input, &levels, supported.as_ref()));

            if !gaps.is_empty() {
                let min_width = 0.2 * input.perimeter_flow.width() * (1.0 - INSET_OVERLAP_TOLERANCE);
                for gap in opening(&gaps, min_width / 2.0, self.join_type) {
                    for polyline in gap_centerline(&gap) {
                        out.gap_fill.push_path(ExtrusionPath::new(
                            polyline,
                            ExtrusionRole::GapFill,
                            &input.perimeter_flow,
                        ));
                    }
                }
            }

            let inset = match levels.len() {
                0 => 0.0,
                1 => sp.ext_spacing / 2.0,
                _ => sp.spacing / 2.0,
            };
            let overlap = input
                .config
                .infill_overlap
                .get_abs_value(inset + sp.solid_spacing / 2.0);
            let half_solid = sp.solid_spacing / 2.0;

            let fill = inward_offset2(&last, inset - overlap + half_solid, half_solid, self.join_type);
            out.fill_no_overlap
                .extend(inward_offset2(&last, inset + half_solid, half_solid, self.join_type));
            for expoly in fill {
                out.fill_surfaces.push(surface.with_expolygon(expoly));
            }
        }

        out
    }
}

impl ClassicPerimeterGenerator {
    /// Loops of one island, innermost first unless the external one prints first.
    fn island_loops(
        &self,
        input: &PerimeterInput<'_>,
        levels: &[ExPolygons],
        supported: Option<&ExPolygons>,
    ) -> ExtrusionEntityCollection {
        let mut island = ExtrusionEntityCollection::new();
        let mut push_level = |depth: usize, level: &ExPolygons| {
            for expoly in level {
                let polygons = std::iter::once((&expoly.contour, false))
                    .chain(expoly.holes.iter().map(|h| (h, true)));
                for (polygon, is_hole) in polygons {
                    if !polygon.is_valid() {
                        continue;
                    }
                    let (role, flow) = classify_loop(input, depth, polygon, supported);
                    island.push_loop(ExtrusionLoop::new(polygon.clone(), role, &flow, is_hole));
                }
            }
        };

        if input.config.external_perimeters_first {
            for (depth, level) in levels.iter().enumerate() {
                push_level(depth, level);
            }
        } else {
            for (depth, level) in levels.iter().enumerate().rev() {
                push_level(depth, level);
            }
        }
        island
    }
}

fn classify_loop(
    input: &PerimeterInput<'_>,
    depth: usize,
    polygon: &Polygon,
    supported: Option<&ExPolygons>,
) -> (ExtrusionRole, Flow) {
    if let Some(supported) = supported {
        if !supported.iter().any(|s| s.contains(polygon)) {
            return (ExtrusionRole::OverhangPerimeter, input.overhang_flow);
        }
    }
    if depth == 0 {
        (ExtrusionRole::ExternalPerimeter, input.ext_perimeter_flow)
    } else {
        (ExtrusionRole::Perimeter, input.perimeter_flow)
    }
}

fn inward_offset2(
    expolygons: &[ExPolygon],
    shrink_by: CoordF,
    grow_by: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    let shrunk = if shrink_by > 0.0 {
        shrink(expolygons, shrink_by, join_type)
    } else if shrink_by < 0.0 {
        grow(expolygons, -shrink_by, join_type)
    } else {
        expolygons.to_vec()
    };
    grow(&shrunk, grow_by, join_type)
}

/// Approximate medial line of a thin gap: its long axis through the centre
/// of its bounding box, clipped to the gap.
fn gap_centerline(gap: &ExPolygon) -> Vec<Polyline> {
    let bbox = gap.bounding_box();
    if bbox.is_empty() {
        return Vec::new();
    }
    let center = bbox.center();
    let (w, h) = bbox.size_mm();
    let line = if w >= h {
        Line::new(
            Point::new(bbox.min.x, center.y),
            Point::new(bbox.max.x, center.y),
        )
    } else {
        Line::new(
            Point::new(center.x, bbox.min.y),
            Point::new(center.x, bbox.max.y),
        )
    };
    intersect_polylines_with_expolygons(&[Polyline::from(line)], std::slice::from_ref(gap))
        .into_iter()
        .filter(|p| p.length() > scale(0.01) as CoordF)
        .collect()
}
