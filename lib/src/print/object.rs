//! The print object: layer arena and pipeline stages.

use super::ObjectSettings;
use crate::flow::FlowRole;
use crate::geometry::ExPolygons;
use crate::infill::{Filler, RectilinearFiller};
use crate::layer::{Layer, LayerId, RegionContext};
use crate::perimeter::{ClassicPerimeterGenerator, PerimeterGenerator};
use crate::slice::{detect_surface_types, SliceEngine, SurfaceCollection};
use crate::{CoordF, Error, Result};
use rayon::prelude::*;
use std::fmt;

/// Owns the layers of one object and drives the pipeline over them.
///
/// Layers are stored in an arena and addressed by [`LayerId`]. The object
/// layer sequence and the support layer sequence are separate orderings over
/// the same arena. Removed layers leave a tombstone, so stale handles resolve
/// to `None` instead of another layer.
pub struct PrintObject {
    settings: ObjectSettings,
    arena: Vec<Option<Layer>>,
    layers: Vec<LayerId>,
    support_layers: Vec<LayerId>,
    perimeter_generator: Box<dyn PerimeterGenerator>,
    filler: Box<dyn Filler>,
}

impl PrintObject {
    pub fn new(settings: ObjectSettings) -> Self {
        Self {
            settings,
            arena: Vec::new(),
            layers: Vec::new(),
            support_layers: Vec::new(),
            perimeter_generator: Box::new(ClassicPerimeterGenerator::new()),
            filler: Box::new(RectilinearFiller::new()),
        }
    }

    pub fn with_perimeter_generator<G: PerimeterGenerator + 'static>(mut self, generator: G) -> Self {
        self.perimeter_generator = Box::new(generator);
        self
    }

    pub fn with_filler<F: Filler + 'static>(mut self, filler: F) -> Self {
        self.filler = Box::new(filler);
        self
    }

    #[inline]
    pub fn settings(&self) -> &ObjectSettings {
        &self.settings
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.arena.get(id.0).and_then(Option::as_ref)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.arena.get_mut(id.0).and_then(Option::as_mut)
    }

    fn layer_or_err(&mut self, id: LayerId) -> Result<&mut Layer> {
        self.layer_mut(id).ok_or(Error::UnknownLayer(id))
    }

    /// Object layers, bottom to top.
    #[inline]
    pub fn layer_ids(&self) -> &[LayerId] {
        &self.layers
    }

    /// Support layers, in their stored order.
    #[inline]
    pub fn support_layer_ids(&self) -> &[LayerId] {
        &self.support_layers
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn support_layer_count(&self) -> usize {
        self.support_layers.len()
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter_map(|id| self.layer(*id))
    }

    pub fn support_layers(&self) -> impl Iterator<Item = &Layer> {
        self.support_layers.iter().filter_map(|id| self.layer(*id))
    }

    /// The `index`-th object layer from the bottom.
    pub fn get_layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index).and_then(|id| self.layer(*id))
    }

    fn push_arena(&mut self, layer: impl FnOnce(LayerId) -> Layer) -> LayerId {
        let handle = LayerId(self.arena.len());
        self.arena.push(Some(layer(handle)));
        handle
    }

    /// Append an object layer on top, with one region per configured region,
    /// linked to the previous top layer.
    pub fn add_layer(&mut self, height: CoordF, print_z: CoordF, slice_z: CoordF) -> LayerId {
        let id = self.layers.len();
        let handle = self.push_arena(|h| Layer::new(h, id, height, print_z, slice_z));
        let region_ids: Vec<_> = self.settings.region_ids().collect();
        if let Some(layer) = self.layer_mut(handle) {
            for region in region_ids {
                layer.add_region(region);
            }
        }
        if let Some(&below) = self.layers.last() {
            self.set_links(below, handle);
        }
        self.layers.push(handle);
        handle
    }

    /// Stack object layers of the given heights from z = 0.
    pub fn generate_layers(&mut self, heights: &[CoordF]) -> Vec<LayerId> {
        let mut z = self
            .layers()
            .last()
            .map(|l| l.print_z)
            .unwrap_or(0.0);
        heights
            .iter()
            .map(|&h| {
                z += h;
                self.add_layer(h, z, z - h / 2.0)
            })
            .collect()
    }

    /// Layer heights covering `object_height` with the configured first
    /// layer and layer heights. The last layer may be thinner.
    pub fn layer_heights(&self, object_height: CoordF) -> Vec<CoordF> {
        let first = self.settings.object.first_layer_height;
        let step = self.settings.object.layer_height;
        let mut heights = Vec::new();
        if !(object_height > 0.0) || !(first > 0.0) || !(step > 0.0) {
            return heights;
        }
        let mut z = first.min(object_height);
        heights.push(z);
        while object_height - z > 1e-9 {
            let h = step.min(object_height - z);
            heights.push(h);
            z += h;
        }
        heights
    }

    /// Append a support layer, linked to the previous support layer.
    pub fn add_support_layer(&mut self, height: CoordF, print_z: CoordF, slice_z: CoordF) -> LayerId {
        let id = self.support_layers.len();
        let handle = self.push_arena(|h| Layer::new_support(h, id, height, print_z, slice_z));
        if let Some(&below) = self.support_layers.last() {
            self.set_links(below, handle);
        }
        self.support_layers.push(handle);
        handle
    }

    /// Splice a support layer at position `pos` of the support sequence
    /// (clamped to its length).
    ///
    /// Nothing is linked or renumbered: the caller assigns a consistent `id`
    /// and z values and re-links the neighbours with [`Self::link_layers`].
    pub fn insert_support_layer(
        &mut self,
        pos: usize,
        id: usize,
        height: CoordF,
        print_z: CoordF,
        slice_z: CoordF,
    ) -> LayerId {
        let handle = self.push_arena(|h| Layer::new_support(h, id, height, print_z, slice_z));
        let pos = pos.min(self.support_layers.len());
        self.support_layers.insert(pos, handle);
        handle
    }

    /// Make `upper` the upper neighbour of `lower`, and the reverse.
    pub fn link_layers(&mut self, lower: LayerId, upper: LayerId) -> Result<()> {
        self.layer_or_err(lower)?;
        self.layer_or_err(upper)?;
        self.set_links(lower, upper);
        Ok(())
    }

    fn set_links(&mut self, lower: LayerId, upper: LayerId) {
        if let Some(l) = self.layer_mut(lower) {
            l.upper_layer = Some(upper);
        }
        if let Some(u) = self.layer_mut(upper) {
            u.lower_layer = Some(lower);
        }
    }

    /// Destroy every object layer with its regions.
    pub fn clear_layers(&mut self) {
        for id in std::mem::take(&mut self.layers) {
            self.arena[id.0] = None;
        }
    }

    pub fn clear_support_layers(&mut self) {
        for id in std::mem::take(&mut self.support_layers) {
            self.arena[id.0] = None;
        }
    }

    /// Merged slices of every object layer, indexed by arena slot.
    fn slices_snapshot(&self) -> Vec<Option<ExPolygons>> {
        self.arena
            .iter()
            .map(|slot| slot.as_ref().map(|l| l.slices.clone()))
            .collect()
    }

    fn object_layers_mut(&mut self) -> impl ParallelIterator<Item = &mut Layer> {
        self.arena
            .par_iter_mut()
            .filter_map(|slot| slot.as_mut())
            .filter(|layer| !layer.is_support())
    }

    /// Slice every object layer and merge the region slices.
    pub fn slice(&mut self, engine: &dyn SliceEngine) {
        log::info!("slicing {} layers", self.layers.len());
        self.object_layers_mut().for_each(|layer| {
            layer.make_slices(engine);
            layer.merge_slices();
        });
        let warnings = self.slicing_warnings();
        if !warnings.is_empty() {
            log::warn!("{} layers have slicing errors", warnings.len());
        }
    }

    /// Classify region slices as top, bottom, bridge or internal by
    /// comparing each layer with its neighbours.
    pub fn detect_surfaces_type(&mut self) -> Result<()> {
        log::info!("detecting surface types");
        let snapshot = self.slices_snapshot();
        let empty = ExPolygons::new();
        let neighbour = |id: Option<LayerId>| {
            id.map(|id| {
                snapshot
                    .get(id.0)
                    .and_then(Option::as_ref)
                    .unwrap_or(&empty)
            })
        };
        let settings = &self.settings;

        self.arena
            .par_iter_mut()
            .filter_map(|slot| slot.as_mut())
            .filter(|layer| !layer.is_support())
            .try_for_each(|layer| -> Result<()> {
                let lower = neighbour(layer.lower_layer);
                let upper = neighbour(layer.upper_layer);
                for i in 0..layer.region_count() {
                    let region_id = layer.get_region(i)?.region();
                    let ctx = RegionContext::new(settings, region_id, layer)?;
                    let region = layer.get_region_mut(i)?;
                    let offset = region
                        .flow(&ctx, FlowRole::ExternalPerimeter, false, None)?
                        .width()
                        / 10.0;
                    let surfaces =
                        detect_surface_types(&region.slices.expolygons(), lower, upper, offset);
                    region.slices = SurfaceCollection::from_surfaces(surfaces);
                }
                Ok(())
            })
    }

    /// Generate perimeters on every object layer.
    pub fn make_perimeters(&mut self) -> Result<()> {
        log::info!("generating perimeters");
        let snapshot = self.slices_snapshot();
        let settings = &self.settings;
        let generator = self.perimeter_generator.as_ref();

        self.arena
            .par_iter_mut()
            .filter_map(|slot| slot.as_mut())
            .filter(|layer| !layer.is_support())
            .try_for_each(|layer| {
                let lower = layer
                    .lower_layer
                    .and_then(|id| snapshot.get(id.0).and_then(Option::as_ref));
                layer.make_perimeters(settings, lower, generator)
            })
    }

    /// Turn slices into classified fill surfaces ready for infill.
    ///
    /// External surfaces are processed bottom-up, each layer reading its
    /// lower neighbour.
    pub fn prepare_infill(&mut self) -> Result<()> {
        log::info!("preparing infill");
        self.object_layers_mut()
            .for_each(|layer| layer.slices_to_fill_surfaces_clipped());

        for idx in 0..self.layers.len() {
            let handle = self.layers[idx];
            let mut layer = self.arena[handle.0]
                .take()
                .ok_or(Error::UnknownLayer(handle))?;
            let lower = layer
                .lower_layer
                .and_then(|id| self.arena.get(id.0).and_then(Option::as_ref));
            let result = layer.process_external_surfaces(&self.settings, lower);
            self.arena[handle.0] = Some(layer);
            result?;
        }

        let settings = &self.settings;
        self.arena
            .par_iter_mut()
            .filter_map(|slot| slot.as_mut())
            .filter(|layer| !layer.is_support())
            .try_for_each(|layer| layer.prepare_fill_surfaces(settings))
    }

    /// Generate infill on every object layer.
    pub fn infill(&mut self) -> Result<()> {
        log::info!("generating infill");
        let settings = &self.settings;
        let filler = self.filler.as_ref();
        self.arena
            .par_iter_mut()
            .filter_map(|slot| slot.as_mut())
            .filter(|layer| !layer.is_support())
            .try_for_each(|layer| layer.make_fills(settings, filler))
    }

    /// Run every stage in order.
    pub fn process(&mut self, engine: &dyn SliceEngine) -> Result<()> {
        self.slice(engine);
        self.detect_surfaces_type()?;
        self.make_perimeters()?;
        self.prepare_infill()?;
        self.infill()
    }

    /// `(print_z, layer id)` of every object layer flagged with slicing
    /// errors.
    pub fn slicing_warnings(&self) -> Vec<(CoordF, usize)> {
        self.layers()
            .filter(|l| l.slicing_errors)
            .map(|l| {
                log::warn!(
                    "layer {} at z = {:.3} mm: slicing errors, the layer may be damaged",
                    l.id(),
                    l.print_z
                );
                (l.print_z, l.id())
            })
            .collect()
    }
}

impl fmt::Debug for PrintObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintObject")
            .field("regions", &self.settings.regions.len())
            .field("layers", &self.layers.len())
            .field("support_layers", &self.support_layers.len())
            .finish()
    }
}
