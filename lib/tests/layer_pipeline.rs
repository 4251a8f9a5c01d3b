//! End-to-end runs of the layer pipeline on simple prisms.

use slicer_layers::geometry::total_area_mm2;
use slicer_layers::{
    BoundingBox, CoordF, ExPolygon, FloatOrPercent, Layer, ObjectSettings, Polygon, PrintObject,
    PrintRegion, PrintRegionConfig, RawSlice, RegionContext, RegionId, SurfaceType,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn square(_: RegionId, _: CoordF) -> RawSlice {
    RawSlice::new(vec![Polygon::rectangle_mm(0.0, 0.0, 10.0, 10.0)])
}

/// Width whose spacing is exactly `spacing` at layer height `h`.
fn width_for_spacing(spacing: CoordF, h: CoordF) -> CoordF {
    spacing + h * (1.0 - std::f64::consts::PI / 4.0)
}

fn threshold(settings: &ObjectSettings, layer: &Layer) -> CoordF {
    let region = layer.get_region(0).unwrap();
    let ctx = RegionContext::new(settings, region.region(), layer).unwrap();
    region.infill_area_threshold(&ctx).unwrap()
}

fn fills_bbox(layer: &Layer) -> BoundingBox {
    let mut bbox = BoundingBox::default();
    for polyline in layer.get_region(0).unwrap().fills.polylines() {
        bbox.merge(&polyline.bounding_box());
    }
    bbox
}

#[test]
fn test_three_layer_square_fill_area() {
    init_logger();
    let h = 0.2;
    let w = width_for_spacing(2.0, h);
    let mut settings = ObjectSettings::single_region(
        PrintRegionConfig::new()
            .perimeters(1)
            .extrusion_width(FloatOrPercent::Absolute(w)),
    );
    settings.regions[0].config.infill_overlap = FloatOrPercent::Absolute(0.0);
    settings.print.first_layer_extrusion_width = FloatOrPercent::Absolute(0.0);

    let mut object = PrintObject::new(settings);
    object.generate_layers(&[h, h, h]);
    object.process(&square).unwrap();

    // One external loop of width w, then one spacing of inset.
    let side = 10.0 - w - 2.0;
    let expected = side * side;

    for layer in object.layers() {
        assert!((threshold(object.settings(), layer) - 4.0).abs() < 1e-9);

        let region = layer.get_region(0).unwrap();
        let area = region.fill_surfaces.total_area_mm2();
        assert!(
            (area - expected).abs() < 0.1,
            "layer {}: fill area {} != {}",
            layer.id(),
            area,
            expected
        );
        assert!(!region.fills.is_empty(), "layer {} island dropped", layer.id());
        assert!(layer.has_extrusions());
    }

    let types = |i: usize| object.get_layer(i).unwrap().get_region(0).unwrap().fill_surfaces.types();
    assert_eq!(types(0), vec![SurfaceType::Bottom]);
    assert_eq!(types(1), vec![SurfaceType::InternalSolid]);
    assert_eq!(types(2), vec![SurfaceType::Top]);
}

#[test]
fn test_merge_slices_idempotent() {
    init_logger();
    let mut settings = ObjectSettings::default();
    settings.add_region(PrintRegion::new("left", PrintRegionConfig::new()));
    settings.add_region(PrintRegion::new("right", PrintRegionConfig::new().perimeters(2)));

    let mut object = PrintObject::new(settings);
    let ids = object.generate_layers(&[0.2]);
    let engine = |region: RegionId, _: CoordF| {
        let x = 5.0 * region.index() as CoordF;
        RawSlice::new(vec![Polygon::rectangle_mm(x, 0.0, x + 8.0, 8.0)])
    };
    object.slice(&engine);

    let layer = object.layer_mut(ids[0]).unwrap();
    let first = layer.slices.clone();
    layer.merge_slices();
    assert_eq!(layer.slices, first);
    assert_eq!(first.len(), 1);
    assert!((total_area_mm2(&first) - 104.0).abs() < 0.01);
}

#[test]
fn test_has_extrusions_follows_stages() {
    init_logger();
    let mut object = PrintObject::new(ObjectSettings::single_region(PrintRegionConfig::new()));
    object.generate_layers(&[0.3, 0.2]);
    object.slice(&square);
    assert!(object.layers().all(|l| !l.has_extrusions()));

    object.make_perimeters().unwrap();
    assert!(object.layers().all(Layer::has_extrusions));
    for layer in object.layers() {
        let region = layer.get_region(0).unwrap();
        assert!(!region.perimeters.is_empty());
        assert!(region.fills.is_empty());
    }
}

#[test]
fn test_threshold_monotonic_in_width() {
    init_logger();
    let thresholds: Vec<CoordF> = [0.45, 0.6, 0.8]
        .iter()
        .map(|&w| {
            let mut object = PrintObject::new(ObjectSettings::single_region(
                PrintRegionConfig::new().extrusion_width(FloatOrPercent::Absolute(w)),
            ));
            object.generate_layers(&[0.2, 0.2]);
            threshold(object.settings(), object.get_layer(1).unwrap())
        })
        .collect();
    assert!(thresholds.windows(2).all(|t| t[0] <= t[1]));
}

#[test]
fn test_threshold_ignores_fill_surfaces() {
    init_logger();
    let mut object = PrintObject::new(ObjectSettings::single_region(PrintRegionConfig::new()));
    let ids = object.generate_layers(&[0.2, 0.2]);
    let before = threshold(object.settings(), object.layer(ids[1]).unwrap());

    object.slice(&square);
    object
        .layer_mut(ids[1])
        .unwrap()
        .regions_mut()[0]
        .fill_surfaces
        .set(vec![ExPolygon::rectangle_mm(0.0, 0.0, 1.0, 1.0)], SurfaceType::Top);
    let after = threshold(object.settings(), object.layer(ids[1]).unwrap());
    assert_eq!(before, after);
}

#[test]
fn test_support_insertion_keeps_stale_links() {
    init_logger();
    let mut object = PrintObject::new(ObjectSettings::single_region(PrintRegionConfig::new()));
    for i in 0..5 {
        let z = 0.2 * (i + 1) as CoordF;
        object.add_support_layer(0.2, z, z - 0.1);
    }
    let old: Vec<_> = object.support_layer_ids().to_vec();

    let inserted = object.insert_support_layer(3, 3, 0.1, 0.7, 0.65);
    assert_eq!(object.support_layer_count(), 6);
    assert_eq!(object.support_layer_ids()[3], inserted);

    let l2 = object.layer(old[2]).unwrap();
    assert_eq!(l2.upper_layer, Some(old[3]));
    let new = object.layer(inserted).unwrap();
    assert_eq!(new.lower_layer, None);
    assert_eq!(new.upper_layer, None);

    // The caller repairs the chain.
    object.link_layers(old[2], inserted).unwrap();
    object.link_layers(inserted, old[3]).unwrap();
    assert_eq!(object.layer(old[2]).unwrap().upper_layer, Some(inserted));
    assert_eq!(object.layer(old[3]).unwrap().lower_layer, Some(inserted));
}

#[test]
fn test_infill_before_perimeters_reaches_boundary() {
    init_logger();
    let settings = ObjectSettings::single_region(PrintRegionConfig::new());

    let mut early = PrintObject::new(settings.clone());
    early.generate_layers(&[0.2]);
    early.slice(&square);
    early.infill().unwrap();
    let bbox = fills_bbox(early.get_layer(0).unwrap());
    let (min_x, min_y) = (bbox.min.to_f64().x, bbox.min.to_f64().y);
    assert!(min_x < 0.2 || min_y < 0.2, "fills start at ({}, {})", min_x, min_y);

    let mut ordered = PrintObject::new(settings);
    ordered.generate_layers(&[0.2]);
    ordered.slice(&square);
    ordered.make_perimeters().unwrap();
    ordered.infill().unwrap();
    let bbox = fills_bbox(ordered.get_layer(0).unwrap());
    assert!(bbox.min.to_f64().x > 0.4 && bbox.min.to_f64().y > 0.4);
}

#[test]
fn test_region_svg_export() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let mut object = PrintObject::new(ObjectSettings::single_region(PrintRegionConfig::new()));
    object.generate_layers(&[0.2]);
    object.process(&square).unwrap();

    let mut ctx = slicer_layers::SvgExportContext::new(dir.path());
    let layer = object.get_layer(0).unwrap();
    let region = layer.get_region(0).unwrap();
    let first = region.export_region_slices_to_svg_debug("a", &mut ctx).unwrap();
    let second = region.export_region_slices_to_svg_debug("a", &mut ctx).unwrap();
    assert!(first.ends_with("LayerRegion-slices-a-0.svg"));
    assert!(second.ends_with("LayerRegion-slices-a-1.svg"));
    let svg = std::fs::read_to_string(&first).unwrap();
    assert!(svg.starts_with("<?xml") || svg.starts_with("<svg"));
}
