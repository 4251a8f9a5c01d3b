//! Layer data structures.
//!
//! A [`Layer`] is one Z slice of a print object. Object layers own one
//! [`LayerRegion`] per print region; support layers carry a [`SupportLayer`]
//! instead. Layers live in the arena of their `PrintObject` and refer to
//! their neighbours by [`LayerId`] handle.

mod region;
mod support;

pub use region::{LayerRegion, RegionContext, EXTERNAL_INFILL_MARGIN};
pub use support::SupportLayer;

use crate::clipper::{intersection, repair_polygons_ex, union_ex};
use crate::geometry::{chain_expolygons, Containable, ExPolygons};
use crate::infill::Filler;
use crate::perimeter::PerimeterGenerator;
use crate::print::{ObjectSettings, RegionId};
use crate::slice::{SliceEngine, Surface, SurfaceCollection, SurfaceType};
use crate::svg::{SvgExportContext, SvgWriter};
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle of a layer in its object's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a layer carries.
#[derive(Debug, Clone)]
pub enum LayerKind {
    /// Object layer: content lives in the regions.
    Object,
    Support(SupportLayer),
}

/// One printable Z slice.
#[derive(Debug, Clone)]
pub struct Layer {
    handle: LayerId,
    /// Sequential index, +1 along `upper_layer`.
    id: usize,
    /// Height at which the mesh is cut (mm).
    pub slice_z: CoordF,
    /// Top of the layer (mm).
    pub print_z: CoordF,
    /// Thickness (mm).
    pub height: CoordF,
    /// The slicer had to repair or guess at this height.
    pub slicing_errors: bool,
    pub upper_layer: Option<LayerId>,
    pub lower_layer: Option<LayerId>,
    /// Union of the region slices, chained for short travel. Only valid
    /// after `merge_slices`.
    pub slices: ExPolygons,
    regions: Vec<LayerRegion>,
    kind: LayerKind,
}

impl Layer {
    pub(crate) fn new(
        handle: LayerId,
        id: usize,
        height: CoordF,
        print_z: CoordF,
        slice_z: CoordF,
    ) -> Self {
        Self {
            handle,
            id,
            slice_z,
            print_z,
            height,
            slicing_errors: false,
            upper_layer: None,
            lower_layer: None,
            slices: Vec::new(),
            regions: Vec::new(),
            kind: LayerKind::Object,
        }
    }

    pub(crate) fn new_support(
        handle: LayerId,
        id: usize,
        height: CoordF,
        print_z: CoordF,
        slice_z: CoordF,
    ) -> Self {
        Self {
            kind: LayerKind::Support(SupportLayer::new()),
            ..Self::new(handle, id, height, print_z, slice_z)
        }
    }

    #[inline]
    pub fn handle(&self) -> LayerId {
        self.handle
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    #[inline]
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    #[inline]
    pub fn is_support(&self) -> bool {
        matches!(self.kind, LayerKind::Support(_))
    }

    pub fn support(&self) -> Option<&SupportLayer> {
        match &self.kind {
            LayerKind::Support(s) => Some(s),
            LayerKind::Object => None,
        }
    }

    pub fn support_mut(&mut self) -> Option<&mut SupportLayer> {
        match &mut self.kind {
            LayerKind::Support(s) => Some(s),
            LayerKind::Object => None,
        }
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn regions(&self) -> &[LayerRegion] {
        &self.regions
    }

    #[inline]
    pub fn regions_mut(&mut self) -> &mut [LayerRegion] {
        &mut self.regions
    }

    pub fn get_region(&self, index: usize) -> Result<&LayerRegion> {
        let count = self.regions.len();
        self.regions
            .get(index)
            .ok_or(Error::RegionOutOfBounds { index, count })
    }

    pub fn get_region_mut(&mut self, index: usize) -> Result<&mut LayerRegion> {
        let count = self.regions.len();
        self.regions
            .get_mut(index)
            .ok_or(Error::RegionOutOfBounds { index, count })
    }

    /// Append a region bound to this layer and `region`.
    pub(crate) fn add_region(&mut self, region: RegionId) -> &mut LayerRegion {
        self.regions.push(LayerRegion::new(self.handle, region));
        let last = self.regions.len() - 1;
        &mut self.regions[last]
    }

    fn region_context<'a>(
        &self,
        settings: &'a ObjectSettings,
        index: usize,
    ) -> Result<RegionContext<'a>> {
        RegionContext::new(settings, self.get_region(index)?.region(), self)
    }

    /// Slice every region at `slice_z`.
    ///
    /// Raw outlines are turned into expolygons by their orientation. When the
    /// engine reports errors, or the outlines are inconsistent and had to be
    /// repaired, the layer is flagged and the best available geometry is kept.
    pub fn make_slices(&mut self, engine: &dyn SliceEngine) {
        self.slicing_errors = false;
        for region in &mut self.regions {
            let raw = engine.slice_region(region.region(), self.slice_z);
            let soup = repair_polygons_ex(&raw.polygons);
            let errors = raw.has_errors || soup.repaired;
            let expolygons = soup.expolygons;

            if errors {
                log::warn!(
                    "layer {} (z = {:.3}): slicing errors in region {:?}",
                    self.id,
                    self.print_z,
                    region.region()
                );
                self.slicing_errors = true;
            }

            region.slices.set(expolygons, SurfaceType::Internal);
            region.fill_surfaces = region.slices.clone();
        }
    }

    /// Recompute `slices` as the union of every region's slices.
    pub fn merge_slices(&mut self) {
        let all: ExPolygons = self
            .regions
            .iter()
            .flat_map(|r| r.slices.iter().map(|s| s.expolygon.clone()))
            .collect();
        self.slices = chain_expolygons(union_ex(&all));
    }

    /// Generate perimeters for every region.
    ///
    /// Regions with identical settings are processed together: their slices
    /// are merged, perimeters go to the first of them and the fill area is
    /// split back by each region's own slices.
    pub fn make_perimeters(
        &mut self,
        settings: &ObjectSettings,
        lower_slices: Option<&ExPolygons>,
        generator: &dyn PerimeterGenerator,
    ) -> Result<()> {
        let count = self.regions.len();
        let mut done = vec![false; count];

        for first in 0..count {
            if done[first] {
                continue;
            }
            let config = &settings.region(self.regions[first].region())?.config;
            let mut group = vec![first];
            for other in first + 1..count {
                if !done[other] && settings.region(self.regions[other].region())?.config == *config
                {
                    group.push(other);
                }
            }
            for &i in &group {
                done[i] = true;
            }

            let ctx = self.region_context(settings, first)?;
            let slices = if group.len() == 1 {
                self.regions[first].slices.clone()
            } else {
                merge_by_type(group.iter().map(|&i| &self.regions[i].slices))
            };

            let mut fill_surfaces = SurfaceCollection::new();
            self.regions[first].make_perimeters(
                &ctx,
                &slices,
                &mut fill_surfaces,
                lower_slices,
                generator,
            )?;

            if group.len() == 1 {
                let region = &mut self.regions[first];
                region.fill_expolygons = union_ex(&fill_surfaces.expolygons());
                region.fill_surfaces = fill_surfaces;
                continue;
            }

            let no_overlap = self.regions[first].fill_no_overlap_expolygons.clone();
            for &i in &group {
                let region = &mut self.regions[i];
                if i != first {
                    region.perimeters.clear();
                    region.thin_fills.clear();
                }
                let own = region.slices.expolygons();
                let surfaces: Vec<Surface> = fill_surfaces
                    .iter()
                    .flat_map(|s| {
                        intersection(std::slice::from_ref(&s.expolygon), &own)
                            .into_iter()
                            .map(move |e| s.with_expolygon(e))
                    })
                    .collect();
                region.fill_surfaces = SurfaceCollection::from_surfaces(surfaces);
                region.fill_expolygons = union_ex(&region.fill_surfaces.expolygons());
                region.fill_no_overlap_expolygons = intersection(&no_overlap, &own);
            }
        }
        Ok(())
    }

    pub fn slices_to_fill_surfaces_clipped(&mut self) {
        for region in &mut self.regions {
            region.slices_to_fill_surfaces_clipped();
        }
    }

    /// `lower` must be this layer's lower neighbour, or `None` on the first
    /// layer.
    pub fn process_external_surfaces(
        &mut self,
        settings: &ObjectSettings,
        lower: Option<&Layer>,
    ) -> Result<()> {
        for i in 0..self.regions.len() {
            let ctx = self.region_context(settings, i)?;
            self.regions[i].process_external_surfaces(&ctx, lower)?;
        }
        Ok(())
    }

    pub fn prepare_fill_surfaces(&mut self, settings: &ObjectSettings) -> Result<()> {
        for i in 0..self.regions.len() {
            let ctx = self.region_context(settings, i)?;
            self.regions[i].prepare_fill_surfaces(&ctx);
        }
        Ok(())
    }

    /// Infill every region. Reads the `fill_surfaces` left by
    /// `make_perimeters`, which must have run first.
    pub fn make_fills(&mut self, settings: &ObjectSettings, filler: &dyn Filler) -> Result<()> {
        for i in 0..self.regions.len() {
            let ctx = self.region_context(settings, i)?;
            self.regions[i].make_fill(&ctx, filler)?;
        }
        Ok(())
    }

    pub fn any_internal_region_slice_contains<T: Containable + ?Sized>(&self, item: &T) -> bool {
        self.regions
            .iter()
            .any(|r| r.slices.any_internal_contains(item))
    }

    pub fn any_bottom_region_slice_contains<T: Containable + ?Sized>(&self, item: &T) -> bool {
        self.regions.iter().any(|r| r.slices.any_bottom_contains(item))
    }

    /// Object layers: whether any region has perimeters or fills. Support
    /// layers: whether there are support extrusions.
    pub fn has_extrusions(&self) -> bool {
        match &self.kind {
            LayerKind::Object => self.regions.iter().any(LayerRegion::has_extrusions),
            LayerKind::Support(support) => support.has_extrusions(),
        }
    }

    /// Slices of every region in one drawing.
    pub fn export_region_slices_to_svg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = SvgWriter::new();
        for surface in self.regions.iter().flat_map(|r| r.slices.iter()) {
            writer.draw_surface(surface, 0.5);
        }
        writer.save(path)
    }

    pub fn export_region_slices_to_svg_debug(
        &self,
        name: &str,
        ctx: &mut SvgExportContext,
    ) -> Result<PathBuf> {
        let path = ctx.next_path(&format!("slices-{}", name));
        self.export_region_slices_to_svg(&path)?;
        Ok(path)
    }

    /// Fill surfaces of every region in one drawing.
    pub fn export_region_fill_surfaces_to_svg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = SvgWriter::new();
        for surface in self.regions.iter().flat_map(|r| r.fill_surfaces.iter()) {
            writer.draw_surface(surface, 0.5);
        }
        writer.save(path)
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

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_support() { "SupportLayer" } else { "Layer" };
        write!(
            f,
            "{} {} (z = {:.3}, h = {:.3}, {} regions)",
            kind,
            self.id,
            self.print_z,
            self.height,
            self.regions.len()
        )
    }
}

/// Union of several regions' slices, type by type.
fn merge_by_type<'a, I>(collections: I) -> SurfaceCollection
where
    I: Iterator<Item = &'a SurfaceCollection>,
{
    let collections: Vec<&SurfaceCollection> = collections.collect();
    let mut merged = SurfaceCollection::new();
    for surface_type in SurfaceType::ALL {
        let of_type: ExPolygons = collections
            .iter()
            .flat_map(|c| c.expolygons_of_type(surface_type))
            .collect();
        if !of_type.is_empty() {
            merged.append(union_ex(&of_type), surface_type);
        }
    }
    merged
}
