//! SVG export of layer region geometry, for debugging.
//!
//! Exports only read the layer model. Auto-numbered exports take their
//! sequence number from an [`SvgExportContext`] passed by `&mut`, one counter
//! per export name.

use crate::geometry::{BoundingBox, ExPolygon, Polyline};
use crate::slice::Surface;
use crate::{unscale, Result};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Margin around the drawing, in mm.
const MARGIN_MM: f64 = 1.0;

/// Output directory and per-name counters for numbered debug exports.
#[derive(Debug, Clone)]
pub struct SvgExportContext {
    out_dir: PathBuf,
    counters: HashMap<String, usize>,
}

impl Default for SvgExportContext {
    fn default() -> Self {
        Self::new("out")
    }
}

impl SvgExportContext {
    pub fn new<P: Into<PathBuf>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.into(),
            counters: HashMap::new(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Next path for `name`: `<out_dir>/LayerRegion-<name>-<n>.svg`.
    pub fn next_path(&mut self, name: &str) -> PathBuf {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        let path = self
            .out_dir
            .join(format!("LayerRegion-{}-{}.svg", name, *counter));
        *counter += 1;
        path
    }

    /// Number of exports issued so far under `name`.
    pub fn count(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

/// Accumulates shapes and renders them into one SVG document in mm.
#[derive(Debug, Default)]
pub struct SvgWriter {
    bbox: BoundingBox,
    body: String,
}

impl SvgWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_expolygon(&mut self, expolygon: &ExPolygon, fill: &str, opacity: f64) {
        let mut d = String::new();
        for polygon in expolygon.to_polygons() {
            for (i, p) in polygon.points().iter().enumerate() {
                self.bbox.merge_point(*p);
                let cmd = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{} {:.4} {:.4} ", cmd, unscale(p.x), unscale(p.y));
            }
            d.push_str("Z ");
        }
        let _ = writeln!(
            self.body,
            r#"  <path d="{}" fill="{}" fill-opacity="{}" fill-rule="evenodd" stroke="black" stroke-width="0.02"/>"#,
            d.trim_end(),
            fill,
            opacity
        );
    }

    pub fn draw_surface(&mut self, surface: &Surface, opacity: f64) {
        self.draw_expolygon(&surface.expolygon, surface.surface_type.color(), opacity);
    }

    pub fn draw_polyline(&mut self, polyline: &Polyline, stroke: &str, width_mm: f64) {
        if polyline.len() < 2 {
            return;
        }
        let mut points = String::new();
        for p in polyline.points() {
            self.bbox.merge_point(*p);
            let _ = write!(points, "{:.4},{:.4} ", unscale(p.x), unscale(p.y));
        }
        let _ = writeln!(
            self.body,
            r#"  <polyline points="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            points.trim_end(),
            stroke,
            width_mm
        );
    }

    /// The SVG document. Y points up, as in the slicer.
    pub fn render(&self) -> String {
        let (min_x, min_y, w, h) = if self.bbox.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let (w, h) = self.bbox.size_mm();
            (unscale(self.bbox.min.x), unscale(self.bbox.min.y), w, h)
        };
        let vw = w + 2.0 * MARGIN_MM;
        let vh = h + 2.0 * MARGIN_MM;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{vw:.3}mm" height="{vh:.3}mm" viewBox="0 0 {vw:.4} {vh:.4}">"#
        );
        let _ = writeln!(
            svg,
            r#" <g transform="translate({:.4},{:.4}) scale(1,-1)">"#,
            MARGIN_MM - min_x,
            MARGIN_MM + min_y + h
        );
        svg.push_str(&self.body);
        svg.push_str(" </g>\n</svg>\n");
        svg
    }

    /// Write to `path`, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// Draw classified surfaces with their type colours.
pub fn export_surfaces<'a, I, P>(surfaces: I, path: P) -> Result<()>
where
    I: IntoIterator<Item = &'a Surface>,
    P: AsRef<Path>,
{
    let mut writer = SvgWriter::new();
    for surface in surfaces {
        writer.draw_surface(surface, 0.5);
    }
    log::debug!("writing {}", path.as_ref().display());
    writer.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::SurfaceType;

    #[test]
    fn test_numbered_paths_per_name() {
        let mut ctx = SvgExportContext::new("dbg");
        assert_eq!(ctx.next_path("slices"), PathBuf::from("dbg/LayerRegion-slices-0.svg"));
        assert_eq!(ctx.next_path("slices"), PathBuf::from("dbg/LayerRegion-slices-1.svg"));
        assert_eq!(ctx.next_path("fill"), PathBuf::from("dbg/LayerRegion-fill-0.svg"));
        assert_eq!(ctx.count("slices"), 2);
    }

    #[test]
    fn test_default_out_dir() {
        let mut ctx = SvgExportContext::default();
        assert_eq!(ctx.next_path("x"), PathBuf::from("out/LayerRegion-x-0.svg"));
    }

    #[test]
    fn test_render_surface_colors() {
        let mut writer = SvgWriter::new();
        writer.draw_surface(
            &Surface::new(ExPolygon::rectangle_mm(0.0, 0.0, 10.0, 10.0), SurfaceType::Top),
            0.5,
        );
        let svg = writer.render();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("rgb(255,0,0)"));
        assert!(svg.contains("M 0.0000 0.0000"));
    }

    #[test]
    fn test_save_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("a.svg");
        let surfaces = vec![Surface::new(
            ExPolygon::rectangle_mm(0.0, 0.0, 1.0, 1.0),
            SurfaceType::Internal,
        )];
        export_surfaces(&surfaces, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("rgb(255,255,128)"));
    }
}
