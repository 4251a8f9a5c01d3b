//! Extrusion entities produced by the perimeter, infill and support stages.
//!
//! An [`ExtrusionEntityCollection`] is an ordered tree: perimeters of one
//! island are nested in a sub-collection, and consumers walk it depth first
//! in the stored order.

use crate::flow::Flow;
use crate::geometry::{Polygon, Polyline};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// Type of extrusion for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtrusionRole {
    /// External (outer) perimeter.
    ExternalPerimeter,
    /// Internal perimeter.
    Perimeter,
    /// Perimeter printed over air, with bridge flow.
    OverhangPerimeter,
    /// Sparse infill.
    InternalInfill,
    /// Solid infill.
    SolidInfill,
    /// Top solid infill (visible surface).
    TopSolidInfill,
    /// Bridge infill (over gaps).
    BridgeInfill,
    /// Gap fill (thin areas between perimeters).
    GapFill,
    /// Support material.
    SupportMaterial,
    /// Support interface.
    SupportMaterialInterface,
}

impl ExtrusionRole {
    pub fn is_perimeter(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::ExternalPerimeter
                | ExtrusionRole::Perimeter
                | ExtrusionRole::OverhangPerimeter
        )
    }

    pub fn is_infill(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::InternalInfill
                | ExtrusionRole::SolidInfill
                | ExtrusionRole::TopSolidInfill
                | ExtrusionRole::BridgeInfill
        )
    }

    pub fn is_support(&self) -> bool {
        matches!(
            self,
            ExtrusionRole::SupportMaterial | ExtrusionRole::SupportMaterialInterface
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExtrusionRole::ExternalPerimeter => "external perimeter",
            ExtrusionRole::Perimeter => "perimeter",
            ExtrusionRole::OverhangPerimeter => "overhang perimeter",
            ExtrusionRole::InternalInfill => "internal infill",
            ExtrusionRole::SolidInfill => "solid infill",
            ExtrusionRole::TopSolidInfill => "top solid infill",
            ExtrusionRole::BridgeInfill => "bridge infill",
            ExtrusionRole::GapFill => "gap fill",
            ExtrusionRole::SupportMaterial => "support material",
            ExtrusionRole::SupportMaterialInterface => "support interface",
        }
    }
}

/// An open extrusion path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionPath {
    pub polyline: Polyline,
    pub role: ExtrusionRole,
    /// Extrusion width (mm).
    pub width: CoordF,
    /// Extrusion height (mm).
    pub height: CoordF,
    /// Extruded volume per mm of path.
    pub mm3_per_mm: CoordF,
}

impl ExtrusionPath {
    pub fn new(polyline: Polyline, role: ExtrusionRole, flow: &Flow) -> Self {
        Self {
            polyline,
            role,
            width: flow.width(),
            height: flow.height(),
            mm3_per_mm: flow.mm3_per_mm(),
        }
    }

    /// Length in scaled units.
    pub fn length(&self) -> CoordF {
        self.polyline.length()
    }
}

/// A closed extrusion loop (a perimeter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionLoop {
    pub polygon: Polygon,
    pub role: ExtrusionRole,
    pub width: CoordF,
    pub height: CoordF,
    pub mm3_per_mm: CoordF,
    /// Whether the loop traces a hole rather than an island contour.
    pub is_hole: bool,
}

impl ExtrusionLoop {
    pub fn new(polygon: Polygon, role: ExtrusionRole, flow: &Flow, is_hole: bool) -> Self {
        Self {
            polygon,
            role,
            width: flow.width(),
            height: flow.height(),
            mm3_per_mm: flow.mm3_per_mm(),
            is_hole,
        }
    }

    pub fn length(&self) -> CoordF {
        self.polygon.length()
    }
}

/// One node of an extrusion tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtrusionEntity {
    Path(ExtrusionPath),
    Loop(ExtrusionLoop),
    Collection(ExtrusionEntityCollection),
}

impl ExtrusionEntity {
    /// Role of a leaf; `None` for collections.
    pub fn role(&self) -> Option<ExtrusionRole> {
        match self {
            ExtrusionEntity::Path(p) => Some(p.role),
            ExtrusionEntity::Loop(l) => Some(l.role),
            ExtrusionEntity::Collection(_) => None,
        }
    }
}

/// Ordered, possibly nested, collection of extrusions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionEntityCollection {
    pub entities: Vec<ExtrusionEntity>,
}

impl ExtrusionEntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn push(&mut self, entity: ExtrusionEntity) {
        self.entities.push(entity);
    }

    pub fn push_path(&mut self, path: ExtrusionPath) {
        self.entities.push(ExtrusionEntity::Path(path));
    }

    pub fn push_loop(&mut self, extrusion_loop: ExtrusionLoop) {
        self.entities.push(ExtrusionEntity::Loop(extrusion_loop));
    }

    /// Append `other` as one nested child, keeping it grouped.
    pub fn push_collection(&mut self, other: ExtrusionEntityCollection) {
        if !other.is_empty() {
            self.entities.push(ExtrusionEntity::Collection(other));
        }
    }

    /// Append the entities of `other` at this level.
    pub fn append(&mut self, other: &ExtrusionEntityCollection) {
        self.entities.extend(other.entities.iter().cloned());
    }

    /// Number of leaves in the whole tree.
    pub fn items_count(&self) -> usize {
        self.entities
            .iter()
            .map(|e| match e {
                ExtrusionEntity::Collection(c) => c.items_count(),
                _ => 1,
            })
            .sum()
    }

    /// Depth-first copy of the leaves, in print order.
    pub fn flatten(&self) -> Vec<ExtrusionEntity> {
        let mut out = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            match entity {
                ExtrusionEntity::Collection(c) => out.extend(c.flatten()),
                leaf => out.push(leaf.clone()),
            }
        }
        out
    }

    /// Every leaf as polylines; loops are closed by repeating their first point.
    pub fn polylines(&self) -> Vec<Polyline> {
        self.flatten()
            .into_iter()
            .filter_map(|e| match e {
                ExtrusionEntity::Path(p) => Some(p.polyline),
                ExtrusionEntity::Loop(l) => Some(Polyline::from_polygon(&l.polygon)),
                ExtrusionEntity::Collection(_) => None,
            })
            .collect()
    }

    /// Total length of all leaves, in scaled units.
    pub fn total_length(&self) -> CoordF {
        self.flatten()
            .iter()
            .map(|e| match e {
                ExtrusionEntity::Path(p) => p.length(),
                ExtrusionEntity::Loop(l) => l.length(),
                ExtrusionEntity::Collection(_) => 0.0,
            })
            .sum()
    }
}
