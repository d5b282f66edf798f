use eqdraw_core::{
    document::{CENTER, CONTINUOUS, DASHED, Document, Entity, Units},
    geometry::{Bounds2D, Point2},
};
use eqdraw_io::{DocumentLoader, DocumentSaver, DxfFacade, IoError, SerializationError};

fn sample_document() -> Document {
    let mut doc = Document::new();
    doc.declare_layer("COMPONENTS", 7, CONTINUOUS);
    doc.declare_layer("CENTERLINES", 1, CENTER);
    doc.declare_layer("SIGNAL", 6, DASHED);
    doc.initialize(
        Units::Millimeters,
        Bounds2D::new(Point2::new(-100.0, -100.0), Point2::new(480.0, 360.0)),
    );
    doc.add_polyline(
        [
            Point2::new(-40.0, -30.0),
            Point2::new(40.0, -30.0),
            Point2::new(40.0, 30.0),
            Point2::new(-40.0, 30.0),
        ],
        true,
        "COMPONENTS",
    );
    doc.add_polyline(
        [Point2::new(0.0, 0.0), Point2::new(12.5, 7.25), Point2::new(25.0, 0.0)],
        false,
        "COMPONENTS",
    );
    doc.add_line(Point2::new(-60.0, 0.0), Point2::new(60.0, 0.0), "CENTERLINES");
    doc.add_circle(Point2::new(0.123456, -7.654321), 9.75, "COMPONENTS");
    doc.add_text(Point2::new(-40.0, 35.0), "P-101", 5.0, 0.0, "COMPONENTS");
    doc.add_text(Point2::new(10.0, 10.0), "100mm", 2.5, 0.0, "SIGNAL");
    doc.add_solid(
        Point2::new(0.0, 0.0),
        Point2::new(-3.4641, 2.0),
        Point2::new(-3.4641, -2.0),
        "SIGNAL",
    );
    doc
}

#[test]
fn round_trip_preserves_entities_layers_and_coordinates() {
    let facade = DxfFacade::new();
    let original = sample_document();
    let dxf = facade.to_dxf_string(&original).expect("序列化失败");
    let parsed = facade.parse_str(&dxf).expect("回读失败");

    assert_eq!(parsed.entity_count(), original.entity_count());

    let original_layers: Vec<_> = original.layers().cloned().collect();
    let parsed_layers: Vec<_> = parsed.layers().cloned().collect();
    assert_eq!(parsed_layers, original_layers);

    let original_linetypes: Vec<_> = original.linetypes().map(|l| l.name.clone()).collect();
    let parsed_linetypes: Vec<_> = parsed.linetypes().map(|l| l.name.clone()).collect();
    assert_eq!(parsed_linetypes, original_linetypes);

    assert_eq!(parsed.header().units, Units::Millimeters);
    assert_eq!(parsed.header().extents, original.header().extents);

    for ((_, before), (_, after)) in original.entities().zip(parsed.entities()) {
        assert_eq!(before.kind_name(), after.kind_name());
        assert_eq!(before.layer_name(), after.layer_name());
        match (before, after) {
            (Entity::Polyline(a), Entity::Polyline(b)) => {
                assert_eq!(a.is_closed, b.is_closed);
                assert_eq!(a.vertices.len(), b.vertices.len());
                for (p, q) in a.vertices.iter().zip(&b.vertices) {
                    assert!(p.distance(*q) < 1e-6);
                }
            }
            (Entity::Line(a), Entity::Line(b)) => {
                assert!(a.start.distance(b.start) < 1e-6);
                assert!(a.end.distance(b.end) < 1e-6);
            }
            (Entity::Circle(a), Entity::Circle(b)) => {
                assert!(a.center.distance(b.center) < 1e-6);
                assert!((a.radius - b.radius).abs() < 1e-6);
            }
            (Entity::Text(a), Entity::Text(b)) => {
                assert_eq!(a.content, b.content);
                assert!(a.insert.distance(b.insert) < 1e-6);
                assert!((a.height - b.height).abs() < 1e-6);
            }
            (Entity::Solid(a), Entity::Solid(b)) => {
                for (p, q) in a.corners.iter().zip(&b.corners) {
                    assert!(p.distance(*q) < 1e-6);
                }
            }
            (a, b) => panic!("实体类型不一致: {a:?} / {b:?}"),
        }
    }
}

#[test]
fn hidden_layer_round_trips_as_negative_color() {
    let facade = DxfFacade::new();
    let mut doc = sample_document();
    assert!(doc.hide_layer("SIGNAL"));
    let dxf = facade.to_dxf_string(&doc).expect("序列化失败");
    assert!(dxf.contains("  2\nSIGNAL\n 70\n0\n 62\n-6\n"));

    let parsed = facade.parse_str(&dxf).expect("回读失败");
    let signal = parsed.layer("SIGNAL").expect("SIGNAL 图层");
    assert!(!signal.is_visible);
    assert_eq!(signal.color, 6);
}

#[test]
fn save_and_load_through_filesystem() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let path = dir.path().join("drawing.dxf");
    let facade = DxfFacade::new();
    let doc = sample_document();
    facade.save(&doc, &path).expect("写出失败");

    let loaded = facade.load(&path).expect("读取失败");
    assert_eq!(loaded.entity_count(), doc.entity_count());
}

#[test]
fn failed_serialization_leaves_no_file() {
    let dir = tempfile::tempdir().expect("创建临时目录");
    let path = dir.path().join("broken.dxf");
    let mut doc = sample_document();
    doc.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), "NOT_DECLARED");

    let err = DxfFacade::new().save(&doc, &path).expect_err("应当拒绝未声明图层");
    assert!(matches!(
        err,
        IoError::Serialization(SerializationError::UndeclaredLayer { .. })
    ));
    assert!(!path.exists());
}

#[test]
fn precision_controls_decimal_places() {
    let doc = sample_document();
    let coarse = DxfFacade::with_precision(2).to_dxf_string(&doc).expect("序列化");
    assert!(coarse.contains("\n0.12\n"));
    let fine = DxfFacade::new().to_dxf_string(&doc).expect("序列化");
    assert!(fine.contains("\n0.123456\n"));
    assert!(fine.contains("\n-7.654321\n"));
}
