use eqdraw_core::{
    document::{Document, Entity, Units},
    geometry::{Bounds2D, Point2},
};
use thiserror::Error;

pub const DEFAULT_PRECISION: usize = 6;
const MAX_PRECISION: usize = 12;
const ACAD_VERSION: &str = "AC1015";
const TEXT_STYLE: &str = "STANDARD";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializationError {
    #[error("entity #{entity} references undeclared layer {layer:?}")]
    UndeclaredLayer { entity: u64, layer: String },
    #[error("layer {layer:?} references undeclared linetype {linetype:?}")]
    UndeclaredLinetype { layer: String, linetype: String },
    #[error("invalid table name {0:?}")]
    InvalidName(String),
    #[error("entity #{entity} has a non-finite {field}")]
    NonFiniteValue { entity: u64, field: &'static str },
    #[error("entity #{entity} has a non-positive {field}")]
    NonPositiveValue { entity: u64, field: &'static str },
    #[error("polyline #{entity} has {count} vertices (at least 2 required)")]
    DegeneratePolyline { entity: u64, count: usize },
    #[error("text #{entity} contains control characters")]
    InvalidText { entity: u64 },
    #[error("linetype {0:?} has a non-finite dash length")]
    InvalidLinetypePattern(String),
    #[error("document extents are not finite")]
    NonFiniteExtents,
}

/// DXF 文本写出器。写出前先完整校验文档，任何错误都不会产生半截缓冲。
#[derive(Debug, Clone, Copy)]
pub struct DxfWriter {
    precision: usize,
}

impl Default for DxfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DxfWriter {
    pub fn new() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }

    /// 指定实数小数位数（上限 12）。
    pub fn with_precision(precision: usize) -> Self {
        Self {
            precision: precision.min(MAX_PRECISION),
        }
    }

    #[inline]
    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn write_to_string(&self, document: &Document) -> Result<String, SerializationError> {
        validate_document(document)?;

        let mut out = GroupWriter::new(self.precision);
        self.write_header(document, &mut out)?;
        self.write_tables(document, &mut out);
        self.write_entities(document, &mut out);
        out.text(0, "EOF");
        Ok(out.finish())
    }

    fn write_header(
        &self,
        document: &Document,
        out: &mut GroupWriter,
    ) -> Result<(), SerializationError> {
        let header = document.header();
        let extents = header
            .extents
            .or_else(|| document.bounds())
            .unwrap_or_else(|| Bounds2D::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)));
        if !extents.min().is_finite() || !extents.max().is_finite() {
            return Err(SerializationError::NonFiniteExtents);
        }

        out.section("HEADER");
        out.text(9, "$ACADVER");
        out.text(1, ACAD_VERSION);
        out.text(9, "$INSUNITS");
        out.int(70, i64::from(header.units.insunits_code()));
        out.text(9, "$MEASUREMENT");
        out.int(70, i64::from(measurement_flag(header.units)));
        out.text(9, "$EXTMIN");
        out.point3(10, extents.min());
        out.text(9, "$EXTMAX");
        out.point3(10, extents.max());
        out.text(9, "$LIMMIN");
        out.point2(10, extents.min());
        out.text(9, "$LIMMAX");
        out.point2(10, extents.max());
        out.end_section();
        Ok(())
    }

    fn write_tables(&self, document: &Document, out: &mut GroupWriter) {
        out.section("TABLES");

        let linetypes: Vec<_> = document.linetypes().collect();
        out.begin_table("LTYPE", linetypes.len());
        for linetype in linetypes {
            out.text(0, "LTYPE");
            out.text(2, &linetype.name);
            out.int(70, 0);
            out.text(3, &linetype.description);
            out.int(72, 65);
            out.int(73, linetype.pattern.len() as i64);
            out.real(40, linetype.total_length());
            for dash in &linetype.pattern {
                out.real(49, *dash);
            }
        }
        out.text(0, "ENDTAB");

        let layers: Vec<_> = document.layers().collect();
        out.begin_table("LAYER", layers.len());
        for layer in layers {
            out.text(0, "LAYER");
            out.text(2, &layer.name);
            out.int(70, 0);
            // 负颜色号表示图层关闭
            let color = if layer.is_visible {
                layer.color
            } else {
                -layer.color
            };
            out.int(62, i64::from(color));
            out.text(6, &layer.linetype);
        }
        out.text(0, "ENDTAB");

        out.begin_table("STYLE", 1);
        out.text(0, "STYLE");
        out.text(2, TEXT_STYLE);
        out.int(70, 0);
        out.real(40, 0.0);
        out.real(41, 1.0);
        out.real(50, 0.0);
        out.int(71, 0);
        out.real(42, 2.5);
        out.text(3, "txt");
        out.text(0, "ENDTAB");

        out.end_section();
    }

    fn write_entities(&self, document: &Document, out: &mut GroupWriter) {
        out.section("ENTITIES");
        for (_, entity) in document.entities() {
            out.text(0, entity.kind_name());
            out.text(8, entity.layer_name());
            match entity {
                Entity::Line(line) => {
                    out.point3(10, line.start);
                    out.point3(11, line.end);
                }
                Entity::Circle(circle) => {
                    out.point3(10, circle.center);
                    out.real(40, circle.radius);
                }
                Entity::Polyline(polyline) => {
                    out.int(90, polyline.vertices.len() as i64);
                    out.int(70, if polyline.is_closed { 1 } else { 0 });
                    for vertex in &polyline.vertices {
                        out.point2(10, *vertex);
                    }
                }
                Entity::Text(text) => {
                    out.point3(10, text.insert);
                    out.real(40, text.height);
                    out.text(1, &text.content);
                    out.real(50, text.rotation.to_degrees());
                    out.text(7, TEXT_STYLE);
                }
                Entity::Solid(solid) => {
                    for (index, corner) in solid.corners.iter().enumerate() {
                        out.point3(10 + index as i32, *corner);
                    }
                }
            }
        }
        out.end_section();
    }
}

fn measurement_flag(units: Units) -> i16 {
    if units.is_metric() { 1 } else { 0 }
}

fn validate_document(document: &Document) -> Result<(), SerializationError> {
    for linetype in document.linetypes() {
        validate_name(&linetype.name)?;
        if linetype.pattern.iter().any(|dash| !dash.is_finite()) {
            return Err(SerializationError::InvalidLinetypePattern(
                linetype.name.clone(),
            ));
        }
    }

    for layer in document.layers() {
        validate_name(&layer.name)?;
        if document.linetype(&layer.linetype).is_none() {
            return Err(SerializationError::UndeclaredLinetype {
                layer: layer.name.clone(),
                linetype: layer.linetype.clone(),
            });
        }
    }

    if let Some(extents) = document.header().extents {
        if !extents.min().is_finite() || !extents.max().is_finite() {
            return Err(SerializationError::NonFiniteExtents);
        }
    }

    for (id, entity) in document.entities() {
        let entity_id = id.get();
        if document.layer(entity.layer_name()).is_none() {
            return Err(SerializationError::UndeclaredLayer {
                entity: entity_id,
                layer: entity.layer_name().to_string(),
            });
        }
        validate_entity(entity_id, entity)?;
    }
    Ok(())
}

fn validate_entity(entity: u64, value: &Entity) -> Result<(), SerializationError> {
    let finite = |point: Point2, field: &'static str| {
        if point.is_finite() {
            Ok(())
        } else {
            Err(SerializationError::NonFiniteValue { entity, field })
        }
    };
    let positive = |number: f64, field: &'static str| {
        if !number.is_finite() {
            Err(SerializationError::NonFiniteValue { entity, field })
        } else if number <= 0.0 {
            Err(SerializationError::NonPositiveValue { entity, field })
        } else {
            Ok(())
        }
    };

    match value {
        Entity::Line(line) => {
            finite(line.start, "start point")?;
            finite(line.end, "end point")
        }
        Entity::Circle(circle) => {
            finite(circle.center, "center")?;
            positive(circle.radius, "radius")
        }
        Entity::Polyline(polyline) => {
            if polyline.vertices.len() < 2 {
                return Err(SerializationError::DegeneratePolyline {
                    entity,
                    count: polyline.vertices.len(),
                });
            }
            polyline
                .vertices
                .iter()
                .try_for_each(|vertex| finite(*vertex, "vertex"))
        }
        Entity::Text(text) => {
            finite(text.insert, "insertion point")?;
            positive(text.height, "text height")?;
            if !text.rotation.is_finite() {
                return Err(SerializationError::NonFiniteValue {
                    entity,
                    field: "rotation",
                });
            }
            if text.content.chars().any(char::is_control) {
                return Err(SerializationError::InvalidText { entity });
            }
            Ok(())
        }
        Entity::Solid(solid) => solid
            .corners
            .iter()
            .try_for_each(|corner| finite(*corner, "corner")),
    }
}

fn validate_name(name: &str) -> Result<(), SerializationError> {
    if name.trim().is_empty() || name.chars().any(char::is_control) {
        return Err(SerializationError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// 组码/值成对写入的文本缓冲。
struct GroupWriter {
    buffer: String,
    precision: usize,
}

impl GroupWriter {
    fn new(precision: usize) -> Self {
        Self {
            buffer: String::with_capacity(16 * 1024),
            precision,
        }
    }

    fn text(&mut self, code: i32, value: &str) {
        self.buffer.push_str(&format!("{code:>3}\n"));
        self.buffer.push_str(value);
        self.buffer.push('\n');
    }

    fn int(&mut self, code: i32, value: i64) {
        self.text(code, &value.to_string());
    }

    fn real(&mut self, code: i32, value: f64) {
        let formatted = format_real(value, self.precision);
        self.text(code, &formatted);
    }

    fn point2(&mut self, code: i32, point: Point2) {
        self.real(code, point.x());
        self.real(code + 10, point.y());
    }

    fn point3(&mut self, code: i32, point: Point2) {
        self.point2(code, point);
        self.real(code + 20, 0.0);
    }

    fn section(&mut self, name: &str) {
        self.text(0, "SECTION");
        self.text(2, name);
    }

    fn end_section(&mut self) {
        self.text(0, "ENDSEC");
    }

    fn begin_table(&mut self, name: &str, count: usize) {
        self.text(0, "TABLE");
        self.text(2, name);
        self.int(70, count as i64);
    }

    fn finish(self) -> String {
        self.buffer
    }
}

/// 固定小数位格式化；`-0.000` 归一为 `0.000`，保证重复输出逐字节一致。
pub(crate) fn format_real(value: f64, precision: usize) -> String {
    let formatted = format!("{value:.precision$}");
    match formatted.strip_prefix('-') {
        Some(rest) if rest.chars().all(|ch| ch == '0' || ch == '.') => rest.to_string(),
        _ => formatted,
    }
}
