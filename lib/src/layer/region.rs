//! Per-region geometry of one layer.

use super::{Layer, LayerId};
use crate::bridge::BridgeDetector;
use crate::clipper::{difference, grow, intersection, union_ex, OffsetJoinType};
use crate::config::{InfillPattern, PrintConfig, PrintObjectConfig, PrintRegionConfig};
use crate::extrusion::{ExtrusionEntityCollection, ExtrusionPath, ExtrusionRole};
use crate::flow::{region_flow, Flow, FlowRole};
use crate::geometry::{ExPolygons, Polylines};
use crate::infill::{FillParams, Filler};
use crate::perimeter::{PerimeterGenerator, PerimeterInput};
use crate::print::{ObjectSettings, PrintRegion, RegionId};
use crate::slice::{Surface, SurfaceCollection, SurfaceType};
use crate::svg::{export_surfaces, SvgExportContext};
use crate::{CoordF, Result};
use std::path::{Path, PathBuf};

/// Distance by which top and bottom surfaces are grown into the
/// neighbouring infill, in mm.
pub const EXTERNAL_INFILL_MARGIN: CoordF = 3.0;

/// Configuration seen by one region at one layer.
#[derive(Debug, Clone, Copy)]
pub struct RegionContext<'a> {
    pub print: &'a PrintConfig,
    pub object: &'a PrintObjectConfig,
    pub region: &'a PrintRegion,
    pub layer_id: usize,
    pub layer_height: CoordF,
}

impl<'a> RegionContext<'a> {
    pub fn new(settings: &'a ObjectSettings, region: RegionId, layer: &Layer) -> Result<Self> {
        Ok(Self {
            print: &settings.print,
            object: &settings.object,
            region: settings.region(region)?,
            layer_id: layer.id(),
            layer_height: layer.height,
        })
    }

    #[inline]
    pub fn config(&self) -> &'a PrintRegionConfig {
        &self.region.config
    }
}

/// Geometry of one print region within one layer.
///
/// Collections are written by the pipeline stages in order: slicing fills
/// `slices`, perimeter generation writes `perimeters`, `thin_fills` and the
/// narrowed `fill_surfaces`, infill generation writes `fills`.
#[derive(Debug, Clone)]
pub struct LayerRegion {
    layer: LayerId,
    region: RegionId,

    /// Classified islands of this region.
    pub slices: SurfaceCollection,
    /// Unclassified area left for infill after perimeters.
    pub fill_expolygons: ExPolygons,
    /// Same, without the infill/perimeter overlap.
    pub fill_no_overlap_expolygons: ExPolygons,
    /// Surfaces to be infilled; narrowed by the perimeter stage.
    pub fill_surfaces: SurfaceCollection,
    /// Gap fill produced alongside perimeters.
    pub thin_fills: ExtrusionEntityCollection,
    /// Bridge edges with nothing below, for support generation.
    pub unsupported_bridge_edges: Polylines,
    /// Perimeter loops, nested per island.
    pub perimeters: ExtrusionEntityCollection,
    /// Infill paths, nested per island.
    pub fills: ExtrusionEntityCollection,
}

impl LayerRegion {
    pub(crate) fn new(layer: LayerId, region: RegionId) -> Self {
        Self {
            layer,
            region,
            slices: SurfaceCollection::new(),
            fill_expolygons: Vec::new(),
            fill_no_overlap_expolygons: Vec::new(),
            fill_surfaces: SurfaceCollection::new(),
            thin_fills: ExtrusionEntityCollection::new(),
            unsupported_bridge_edges: Vec::new(),
            perimeters: ExtrusionEntityCollection::new(),
            fills: ExtrusionEntityCollection::new(),
        }
    }

    /// Handle of the owning layer.
    #[inline]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    #[inline]
    pub fn region(&self) -> RegionId {
        self.region
    }

    /// Flow of `role` in this region at this layer. `width` overrides the
    /// configured width; `None` selects the profile default.
    pub fn flow(
        &self,
        ctx: &RegionContext<'_>,
        role: FlowRole,
        bridge: bool,
        width: Option<CoordF>,
    ) -> Result<Flow> {
        Ok(region_flow(
            ctx.print,
            ctx.object,
            ctx.config(),
            role,
            ctx.layer_height,
            bridge,
            ctx.layer_id == 0,
            width,
        )?)
    }

    /// Minimum area (mm²) of an island worth infilling: one solid infill
    /// line spacing squared.
    pub fn infill_area_threshold(&self, ctx: &RegionContext<'_>) -> Result<CoordF> {
        let spacing = self.flow(ctx, FlowRole::SolidInfill, false, None)?.spacing();
        Ok(spacing * spacing)
    }

    pub fn has_extrusions(&self) -> bool {
        !self.perimeters.is_empty() || !self.fills.is_empty()
    }

    /// Rebuild `fill_surfaces` from `slices` per surface type, clipped to the
    /// area left by the perimeters.
    pub fn slices_to_fill_surfaces_clipped(&mut self) {
        let mut fill_surfaces = SurfaceCollection::new();
        for surface_type in self.slices.types() {
            let of_type = self.slices.expolygons_of_type(surface_type);
            fill_surfaces.append(intersection(&of_type, &self.fill_expolygons), surface_type);
        }
        self.fill_surfaces = fill_surfaces;
    }

    /// Generate perimeters for `slices`, replacing `fill_surfaces` with what
    /// remains inside them.
    pub fn make_perimeters(
        &mut self,
        ctx: &RegionContext<'_>,
        slices: &SurfaceCollection,
        fill_surfaces: &mut SurfaceCollection,
        lower_slices: Option<&ExPolygons>,
        generator: &dyn PerimeterGenerator,
    ) -> Result<()> {
        self.perimeters.clear();
        self.thin_fills.clear();

        let input = PerimeterInput {
            slices,
            lower_slices,
            layer_height: ctx.layer_height,
            layer_id: ctx.layer_id,
            perimeter_flow: self.flow(ctx, FlowRole::Perimeter, false, None)?,
            ext_perimeter_flow: self.flow(ctx, FlowRole::ExternalPerimeter, false, None)?,
            overhang_flow: self.flow(ctx, FlowRole::Perimeter, true, None)?,
            solid_infill_flow: self.flow(ctx, FlowRole::SolidInfill, false, None)?,
            config: ctx.config(),
        };
        let output = generator.generate(&input);

        self.perimeters = output.loops;
        self.thin_fills = output.gap_fill;
        self.fill_no_overlap_expolygons = output.fill_no_overlap;
        *fill_surfaces = output.fill_surfaces;
        Ok(())
    }

    /// Detect bridge angles and grow top and bottom surfaces into the
    /// surrounding infill. `lower` is `None` on the first layer.
    pub fn process_external_surfaces(
        &mut self,
        ctx: &RegionContext<'_>,
        lower: Option<&Layer>,
    ) -> Result<()> {
        let config = ctx.config();
        let bridge_spacing = self.flow(ctx, FlowRole::Infill, true, None)?.spacing();
        self.unsupported_bridge_edges.clear();

        let fill_boundaries: ExPolygons = union_ex(
            &self
                .fill_surfaces
                .iter()
                .filter(|s| config.fill_density > 0.0 || s.surface_type != SurfaceType::Internal)
                .map(|s| s.expolygon.clone())
                .collect::<Vec<_>>(),
        );

        let mut bottom: Vec<Surface> = Vec::new();
        for surface in self.fill_surfaces.iter().filter(|s| s.is_bottom()) {
            let mut angle = surface.bridge_angle;
            if surface.is_bridge() {
                match lower {
                    Some(lower) => {
                        let mut detector = BridgeDetector::new(
                            surface.expolygon.clone(),
                            &lower.slices,
                            bridge_spacing,
                        );
                        if detector.detect_angle() {
                            angle = detector.angle;
                        }
                        if ctx.object.support_material {
                            self.unsupported_bridge_edges
                                .extend(detector.unsupported_edges(angle));
                        }
                    }
                    None => {
                        if ctx.object.support_material {
                            self.unsupported_bridge_edges
                                .extend(surface.expolygon.to_polylines());
                        }
                    }
                }
            }

            let grown = grow(
                std::slice::from_ref(&surface.expolygon),
                EXTERNAL_INFILL_MARGIN,
                OffsetJoinType::Square,
            );
            for expoly in intersection(&grown, &fill_boundaries) {
                let mut s = surface.with_expolygon(expoly);
                s.bridge_angle = angle;
                bottom.push(s);
            }
        }

        let bottom_area: ExPolygons = bottom.iter().map(|s| s.expolygon.clone()).collect();
        let mut top: Vec<Surface> = Vec::new();
        for surface in self.fill_surfaces.iter().filter(|s| s.is_top()) {
            let grown = grow(
                std::slice::from_ref(&surface.expolygon),
                EXTERNAL_INFILL_MARGIN,
                OffsetJoinType::Square,
            );
            let clipped = difference(&intersection(&grown, &fill_boundaries), &bottom_area);
            top.extend(clipped.into_iter().map(|e| surface.with_expolygon(e)));
        }

        let external: ExPolygons = bottom_area
            .iter()
            .cloned()
            .chain(top.iter().map(|s| s.expolygon.clone()))
            .collect();
        let mut surfaces = bottom;
        surfaces.extend(top);
        for surface in self
            .fill_surfaces
            .iter()
            .filter(|s| !s.is_top() && !s.is_bottom())
        {
            let rest = difference(std::slice::from_ref(&surface.expolygon), &external);
            surfaces.extend(rest.into_iter().map(|e| surface.with_expolygon(e)));
        }

        self.fill_surfaces = SurfaceCollection::from_surfaces(surfaces);
        Ok(())
    }

    /// Adjust surface types to the solid layer and density settings.
    pub fn prepare_fill_surfaces(&mut self, ctx: &RegionContext<'_>) {
        let config = ctx.config();

        if config.top_solid_layers == 0 {
            let to = if ctx.object.infill_only_where_needed {
                SurfaceType::InternalVoid
            } else {
                SurfaceType::Internal
            };
            for surface in &mut self.fill_surfaces.surfaces {
                if surface.is_top() {
                    surface.surface_type = to;
                }
            }
        }
        if config.bottom_solid_layers == 0 {
            for surface in &mut self.fill_surfaces.surfaces {
                if surface.is_bottom() {
                    surface.surface_type = SurfaceType::Internal;
                }
            }
        }
        if config.fill_density > 0.0 {
            for surface in &mut self.fill_surfaces.surfaces {
                if surface.surface_type == SurfaceType::Internal
                    && surface.area_mm2() <= config.solid_infill_below_area
                {
                    surface.surface_type = SurfaceType::InternalSolid;
                }
            }
        }
    }

    /// Fill every fill surface, dropping islands below the area threshold.
    pub fn make_fill(&mut self, ctx: &RegionContext<'_>, filler: &dyn Filler) -> Result<()> {
        self.fills.clear();
        let config = ctx.config();
        let threshold = self.infill_area_threshold(ctx)?;

        // Merge same-type islands; bridges keep their own angle.
        let mut groups: Vec<Surface> = Vec::new();
        for surface_type in self.fill_surfaces.types() {
            if surface_type == SurfaceType::InternalVoid {
                continue;
            }
            if surface_type.is_bridge() {
                groups.extend(self.fill_surfaces.filter_by_type(surface_type).into_iter().cloned());
            } else {
                let merged = union_ex(&self.fill_surfaces.expolygons_of_type(surface_type));
                groups.extend(merged.into_iter().map(|e| Surface::new(e, surface_type)));
            }
        }

        for surface in &groups {
            let area = surface.area_mm2();
            if area < threshold {
                log::debug!(
                    "layer {}: dropping {} island of {:.3} mm² (threshold {:.3} mm²)",
                    ctx.layer_id,
                    surface.surface_type,
                    area,
                    threshold
                );
                continue;
            }

            let (role, flow_role, bridge) = match surface.surface_type {
                SurfaceType::Top => (ExtrusionRole::TopSolidInfill, FlowRole::TopSolidInfill, false),
                t if t.is_bridge() => (ExtrusionRole::BridgeInfill, FlowRole::SolidInfill, true),
                t if t.is_solid() => (ExtrusionRole::SolidInfill, FlowRole::SolidInfill, false),
                _ => (ExtrusionRole::InternalInfill, FlowRole::Infill, false),
            };
            let flow = self.flow(ctx, flow_role, bridge, None)?;
            let solid = surface.is_solid();

            let params = FillParams {
                density: if solid { 1.0 } else { config.fill_density },
                angle: match surface.bridge_angle {
                    Some(angle) if bridge => angle,
                    _ => config.fill_angle.to_radians(),
                },
                spacing: flow.spacing(),
                pattern: if solid {
                    InfillPattern::Rectilinear
                } else {
                    config.fill_pattern
                },
                layer_id: ctx.layer_id,
                bridge,
            };

            let mut island = ExtrusionEntityCollection::new();
            for polyline in filler.fill(&surface.expolygon, &params) {
                island.push_path(ExtrusionPath::new(polyline, role, &flow));
            }
            self.fills.push_collection(island);
        }

        self.fills.push_collection(self.thin_fills.clone());
        Ok(())
    }

    pub fn export_region_slices_to_svg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        export_surfaces(&self.slices, path)
    }

    /// Numbered export to `<out_dir>/LayerRegion-<name>-<n>.svg`.
    pub fn export_region_slices_to_svg_debug(
        &self,
        name: &str,
        ctx: &mut SvgExportContext,
    ) -> Result<PathBuf> {
        let path = ctx.next_path(&format!("slices-{}", name));
        self.export_region_slices_to_svg(&path)?;
        Ok(path)
    }

    pub fn export_region_fill_surfaces_to_svg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        export_surfaces(&self.fill_surfaces, path)
    }

    pub fn export_region_fill_surfaces_to_svg_debug(
        &self,
        name: &str,
        ctx: &mut SvgExportContext,
    ) -> Result<PathBuf> {
        let path = ctx.next_path(&format!("fill_surfaces-{}", name));
        self.export_region_fill_surfaces_to_svg(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{total_area_mm2, ExPolygon};
    use crate::infill::RectilinearFiller;
    use crate::scale;

    fn make_square_mm(x: CoordF, y: CoordF, size: CoordF) -> ExPolygon {
        ExPolygon::rectangle_mm(x, y, x + size, y + size)
    }

    fn settings(config: PrintRegionConfig) -> ObjectSettings {
        ObjectSettings::single_region(config)
    }

    /// Second layer, so first layer widths do not apply.
    fn layer() -> Layer {
        Layer::new(LayerId(0), 1, 0.2, 0.4, 0.3)
    }

    fn region() -> LayerRegion {
        LayerRegion::new(LayerId(0), RegionId(0))
    }

    fn area_of(collection: &SurfaceCollection, surface_type: SurfaceType) -> CoordF {
        total_area_mm2(&collection.expolygons_of_type(surface_type))
    }

    #[test]
    fn test_make_fill_drops_small_islands() {
        let settings = settings(PrintRegionConfig::new());
        let layer = layer();
        let ctx = RegionContext::new(&settings, RegionId(0), &layer).unwrap();
        let mut region = region();
        let threshold = region.infill_area_threshold(&ctx).unwrap();
        assert!(threshold > 0.25);

        region
            .fill_surfaces
            .set(vec![make_square_mm(0.0, 0.0, 0.5)], SurfaceType::InternalSolid);
        region.make_fill(&ctx, &RectilinearFiller::new()).unwrap();
        assert!(region.fills.is_empty());
        assert!(!region.has_extrusions());

        region
            .fill_surfaces
            .append(vec![make_square_mm(20.0, 0.0, 10.0)], SurfaceType::InternalSolid);
        region.make_fill(&ctx, &RectilinearFiller::new()).unwrap();
        assert!(!region.fills.is_empty());
        for polyline in region.fills.polylines() {
            assert!(polyline.bounding_box().min.x >= scale(19.99));
        }
    }

    #[test]
    fn test_first_layer_bridge_is_unsupported() {
        let mut settings = settings(PrintRegionConfig::new());
        settings.object.support_material = true;
        let layer = layer();
        let ctx = RegionContext::new(&settings, RegionId(0), &layer).unwrap();
        let mut region = region();
        region
            .fill_surfaces
            .set(vec![make_square_mm(0.0, 0.0, 10.0)], SurfaceType::BottomBridge);

        // Running twice does not accumulate edges.
        region.process_external_surfaces(&ctx, None).unwrap();
        region.process_external_surfaces(&ctx, None).unwrap();

        assert_eq!(region.unsupported_bridge_edges.len(), 1);
        assert!(region.fill_surfaces.iter().all(|s| s.bridge_angle.is_none()));
        assert!((area_of(&region.fill_surfaces, SurfaceType::BottomBridge) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_first_layer_bridge_without_support() {
        let settings = settings(PrintRegionConfig::new());
        let layer = layer();
        let ctx = RegionContext::new(&settings, RegionId(0), &layer).unwrap();
        let mut region = region();
        region
            .fill_surfaces
            .set(vec![make_square_mm(0.0, 0.0, 10.0)], SurfaceType::BottomBridge);
        region.process_external_surfaces(&ctx, None).unwrap();
        assert!(region.unsupported_bridge_edges.is_empty());
        assert!(region.fill_surfaces.has_type(SurfaceType::BottomBridge));
    }

    #[test]
    fn test_prepare_fill_surfaces_reclassifies() {
        let config = PrintRegionConfig::new().solid_layers(0, 0).fill_density(0.2);
        let settings = settings(config);
        let layer = layer();
        let ctx = RegionContext::new(&settings, RegionId(0), &layer).unwrap();
        let mut region = region();
        region
            .fill_surfaces
            .set(vec![make_square_mm(0.0, 0.0, 20.0)], SurfaceType::Top);
        region
            .fill_surfaces
            .append(vec![make_square_mm(30.0, 0.0, 20.0)], SurfaceType::Bottom);
        region
            .fill_surfaces
            .append(vec![make_square_mm(60.0, 0.0, 5.0)], SurfaceType::Internal);

        region.prepare_fill_surfaces(&ctx);

        let fs = &region.fill_surfaces;
        assert!(!fs.has_type(SurfaceType::Top));
        assert!(!fs.has_type(SurfaceType::Bottom));
        assert!((area_of(fs, SurfaceType::Internal) - 800.0).abs() < 0.01);
        assert!((area_of(fs, SurfaceType::InternalSolid) - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_prepare_fill_surfaces_voids_top() {
        let mut settings = settings(PrintRegionConfig::new().solid_layers(0, 3));
        settings.object.infill_only_where_needed = true;
        let layer = layer();
        let ctx = RegionContext::new(&settings, RegionId(0), &layer).unwrap();
        let mut region = region();
        region
            .fill_surfaces
            .set(vec![make_square_mm(0.0, 0.0, 20.0)], SurfaceType::Top);
        region
            .fill_surfaces
            .append(vec![make_square_mm(30.0, 0.0, 20.0)], SurfaceType::Bottom);

        region.prepare_fill_surfaces(&ctx);

        assert_eq!(
            region.fill_surfaces.filter_by_type(SurfaceType::InternalVoid).len(),
            1
        );
        assert!(region.fill_surfaces.has_type(SurfaceType::Bottom));
    }

    #[test]
    fn test_slices_to_fill_surfaces_clipped_per_type() {
        let mut region = region();
        region
            .slices
            .set(vec![make_square_mm(0.0, 0.0, 10.0)], SurfaceType::Top);
        region
            .slices
            .append(vec![make_square_mm(10.0, 0.0, 10.0)], SurfaceType::Bottom);
        region.fill_expolygons = vec![ExPolygon::rectangle_mm(5.0, 0.0, 15.0, 10.0)];

        region.slices_to_fill_surfaces_clipped();

        let fs = &region.fill_surfaces;
        assert!((area_of(fs, SurfaceType::Top) - 50.0).abs() < 0.01);
        assert!((area_of(fs, SurfaceType::Bottom) - 50.0).abs() < 0.01);
        assert!((fs.total_area_mm2() - 100.0).abs() < 0.01);
        for surface in fs.filter_by_type(SurfaceType::Top) {
            assert!(surface.expolygon.bounding_box().max.x <= scale(10.0));
        }
    }
}
