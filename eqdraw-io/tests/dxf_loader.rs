use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;

use eqdraw_core::document::{Entity, Units};
use eqdraw_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_fixture_reads_header_and_tables() {
    let loader = DxfFacade::new();
    let doc = loader.load(&fixture("pump_skid.dxf")).expect("读取 DXF 失败");

    let header = doc.header();
    assert_eq!(header.units, Units::Millimeters);
    let extents = header.extents.expect("缺少范围头变量");
    assert!((extents.min().x() + 40.0).abs() < 1e-9);
    assert!((extents.min().y() + 25.5).abs() < 1e-9);
    assert!((extents.max().x() - 320.0).abs() < 1e-9);
    assert!((extents.max().y() - 180.0).abs() < 1e-9);

    let layers: Vec<_> = doc.layers().map(|layer| layer.name.as_str()).collect();
    assert_eq!(layers, ["0", "EQUIPMENT", "REFERENCE"]);
    let reference = doc.layer("REFERENCE").expect("REFERENCE 图层");
    assert_eq!(reference.color, 8);
    assert_eq!(reference.linetype, "PHANTOM");
    assert!(!reference.is_visible);

    let phantom = doc.linetype("PHANTOM").expect("PHANTOM 线型");
    assert_eq!(phantom.pattern, vec![12.0, -3.0, 2.0, -3.0]);
    assert_eq!(phantom.description, "Phantom ______  __  __");
}

#[test]
fn load_fixture_reads_entities_in_order() {
    let loader = DxfFacade::new();
    let doc = loader.load(&fixture("pump_skid.dxf")).expect("读取 DXF 失败");

    let kinds: Vec<_> = doc.entities().map(|(_, e)| e.kind_name()).collect();
    assert_eq!(kinds, ["LWPOLYLINE", "CIRCLE", "LINE", "TEXT", "SOLID"]);

    for (_, entity) in doc.entities() {
        match entity {
            Entity::Polyline(polyline) => {
                assert!(polyline.is_closed);
                assert_eq!(polyline.vertices.len(), 4);
                assert!((polyline.vertices[2].x() - 280.0).abs() < 1e-9);
                assert!((polyline.vertices[2].y() - 150.0).abs() < 1e-9);
            }
            Entity::Circle(circle) => {
                assert!((circle.radius - 42.5).abs() < 1e-9);
            }
            Entity::Line(line) => {
                assert_eq!(line.layer, "REFERENCE");
                assert!((line.end.x() - 300.0).abs() < 1e-9);
            }
            Entity::Text(text) => {
                assert_eq!(text.content, "P-101");
                assert!((text.height - 5.0).abs() < 1e-9);
                assert!((text.rotation - FRAC_PI_2).abs() < 1e-9);
            }
            Entity::Solid(solid) => {
                assert_eq!(solid.corners[3], solid.corners[2]);
                assert!((solid.corners[1].y() - 1.0).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn missing_file_reports_read_error() {
    let loader = DxfFacade::new();
    let err = loader
        .load(&fixture("does_not_exist.dxf"))
        .expect_err("不存在的文件应报错");
    assert!(matches!(err, IoError::ReadError { .. }));
}

#[test]
fn truncated_input_is_invalid() {
    let facade = DxfFacade::new();
    let err = facade
        .parse_str("  0\nSECTION\n  2\nENTITIES\n  0\nLINE\n  8\n0\n 10\n")
        .expect_err("截断的文件应报错");
    assert!(matches!(err, IoError::InvalidDocument(_)));

    let err = facade
        .parse_str("  0\nSECTION\n  2\nENTITIES\n  0\nENDSEC\n")
        .expect_err("缺少 EOF 应报错");
    assert!(matches!(err, IoError::InvalidDocument(_)));
}

#[test]
fn unknown_entities_are_skipped() {
    let data = concat!(
        "  0\nSECTION\n  2\nENTITIES\n",
        "  0\nARC\n  8\n0\n 10\n5.0\n 20\n5.0\n 40\n2.0\n 50\n0.0\n 51\n90.0\n",
        "  0\nMTEXT\n  8\n0\n 10\n1.0\n 20\n1.0\n  1\nnote\n",
        "  0\nLINE\n  8\nPIPING\n 10\n0.0\n 20\n0.0\n 11\n10.0\n 21\n0.0\n",
        "  0\nENDSEC\n  0\nEOF\n",
    );
    let doc = DxfFacade::new().parse_str(data).expect("未知实体应被跳过");
    assert_eq!(doc.entity_count(), 1);
    match doc.entities().next() {
        Some((_, Entity::Line(line))) => {
            assert_eq!(line.layer, "PIPING");
            assert!((line.end.x() - 10.0).abs() < 1e-9);
        }
        other => panic!("expected the LINE after the skipped entities, got {other:?}"),
    }
}

#[test]
fn bulged_polyline_is_unsupported() {
    let data = concat!(
        "  0\nSECTION\n  2\nENTITIES\n",
        "  0\nLWPOLYLINE\n  8\n0\n 90\n2\n 10\n0.0\n 20\n0.0\n 42\n0.5\n 10\n4.0\n 20\n0.0\n",
        "  0\nENDSEC\n  0\nEOF\n",
    );
    let err = DxfFacade::new().parse_str(data).expect_err("圆弧段不受支持");
    assert!(matches!(err, IoError::UnsupportedFeature(_)));
}

#[test]
fn duplicate_coordinate_is_invalid() {
    let data = "  0\nSECTION\n  2\nENTITIES\n  0\nCIRCLE\n  8\n0\n 10\n1.0\n 10\n2.0\n 20\n0.0\n 40\n1.0\n  0\nENDSEC\n  0\nEOF\n";
    let err = DxfFacade::new().parse_str(data).expect_err("重复组码应报错");
    match err {
        IoError::InvalidDocument(message) => assert!(message.contains("CIRCLE")),
        other => panic!("unexpected error: {other:?}"),
    }
}
