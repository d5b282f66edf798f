//! 渲染流水线：校验 → 初始化文档 → 组件 → 连接 → 注释与标注 → 序列化。

use std::fmt;

use eqdraw_config::DrawingConfig;
use eqdraw_core::document::{Document, Units};
use eqdraw_core::geometry::{Bounds2D, Point2};
use eqdraw_io::{DEFAULT_PRECISION, DxfFacade, SerializationError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::callout::{Callout, CalloutEngine};
use crate::layers::{StandardLayer, declare_standard_layers};
use crate::routing::{ConnectionRouter, RouteError};
use crate::spec::{Annotation, DrawingSpec, Layout};
use crate::symbols::{FallbackReason, SymbolContext, SymbolInterpreter, SymbolLibrary};
use crate::validate::{SpecValidationError, validate};

/// 网格标记数量上限，超过时网格间距加倍。
const MAX_GRID_MARKS: usize = 2_500;
const TITLE_BLOCK_WIDTH: f64 = 180.0;
const TITLE_BLOCK_ROWS: usize = 4;
const FRAME_INSET: f64 = 10.0;
const ANNOTATION_LINE_SPACING: f64 = 1.5;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid drawing spec: {0}")]
    Validation(#[from] SpecValidationError),
    #[error("connection routing failed: {0}")]
    Routing(#[from] RouteError),
    #[error("DXF serialization failed: {0}")]
    Serialization(#[from] SerializationError),
}

/// 非致命问题，随渲染结果一并返回。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "camelCase")]
pub enum RenderWarning {
    UnsupportedComponent { id: String, kind: String },
    SymbolFallback { id: String, reason: String },
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderWarning::UnsupportedComponent { id, kind } => {
                write!(f, "component {id:?}: unsupported type {kind:?}, drawn as generic outline")
            }
            RenderWarning::SymbolFallback { id, reason } => {
                write!(f, "component {id:?}: {reason}, drawn as generic outline")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderReport {
    pub components: usize,
    pub connections: usize,
    pub callouts: usize,
    pub annotations: usize,
    pub entities: usize,
    pub warnings: Vec<RenderWarning>,
}

#[derive(Debug, Clone)]
pub struct RenderedDrawing {
    pub dxf: String,
    pub report: RenderReport,
}

/// 渲染器：持有绘图配置与符号库，可重复、并发调用。
pub struct DrawingPipeline {
    config: DrawingConfig,
    precision: usize,
    library: SymbolLibrary,
}

impl DrawingPipeline {
    pub fn new(config: DrawingConfig) -> Self {
        Self {
            config,
            precision: DEFAULT_PRECISION,
            library: SymbolLibrary::standard(),
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_library(mut self, library: SymbolLibrary) -> Self {
        self.library = library;
        self
    }

    #[inline]
    pub fn config(&self) -> &DrawingConfig {
        &self.config
    }

    #[inline]
    pub fn library(&self) -> &SymbolLibrary {
        &self.library
    }

    pub fn render(&self, spec: &DrawingSpec) -> Result<RenderedDrawing, RenderError> {
        let (document, report) = self.build_document(spec)?;
        let dxf = DxfFacade::with_precision(self.precision).to_dxf_string(&document)?;
        info!(
            project = %spec.project.name,
            components = report.components,
            connections = report.connections,
            entities = report.entities,
            warnings = report.warnings.len(),
            bytes = dxf.len(),
            "图纸渲染完成"
        );
        Ok(RenderedDrawing { dxf, report })
    }

    /// 构建文档但不序列化。
    pub fn build_document(&self, spec: &DrawingSpec) -> Result<(Document, RenderReport), RenderError> {
        let _span = info_span!("render", project = %spec.project.name).entered();
        let validated = validate(spec)?;

        let mut document = Document::new();
        declare_standard_layers(&mut document);
        let mut report = RenderReport::default();

        if self.config.title_block {
            self.draw_title_block(&mut document, spec);
        }
        if self.config.grid {
            draw_grid(&mut document, &spec.layout);
        }

        let interpreter = SymbolInterpreter::new(&self.config);
        let mut callouts = CalloutEngine::new(&self.config);
        for (component, parameters) in validated.components() {
            let context = SymbolContext::new(component, parameters);
            let drawn = self
                .library
                .draw(&context, &interpreter, &mut document, &mut callouts);
            match drawn.fallback {
                Some(FallbackReason::Unsupported) => {
                    report.warnings.push(RenderWarning::UnsupportedComponent {
                        id: component.id.clone(),
                        kind: component.kind.to_string(),
                    });
                }
                Some(FallbackReason::Failed(err)) => {
                    report.warnings.push(RenderWarning::SymbolFallback {
                        id: component.id.clone(),
                        reason: err.to_string(),
                    });
                }
                None => {}
            }
            report.components += 1;
            report.callouts += drawn.stats.callouts;
        }

        let router = ConnectionRouter::new(&self.library, &spec.components, &self.config);
        for connection in &spec.connections {
            router.route(&mut document, connection)?;
            report.connections += 1;
        }

        for annotation in &spec.annotations {
            self.draw_annotation(&mut document, annotation);
            report.annotations += 1;
        }
        for component in &spec.components {
            let origin = component.position;
            for extra in &component.additional_callouts {
                let mut callout = Callout::new(
                    Point2::new(
                        origin.x + extra.target_offset.x,
                        origin.y + extra.target_offset.y,
                    ),
                    Point2::new(origin.x + extra.text_offset.x, origin.y + extra.text_offset.y),
                    extra.text.clone(),
                );
                callout.label = extra.label.clone();
                callouts.draw(&mut document, &callout);
                report.callouts += 1;
            }
        }

        document.initialize(Units::Millimeters, self.extents(spec, &document));
        report.entities = document.entity_count();
        debug!(entities = report.entities, "文档构建完成");
        Ok((document, report))
    }

    /// 组件外包矩形加留白，再并入已绘制内容的范围。
    fn extents(&self, spec: &DrawingSpec, document: &Document) -> Bounds2D {
        let mut extents = Bounds2D::empty();
        for component in &spec.components {
            extents.include_bounds(&Bounds2D::from_center_size(
                component.position.to_point(),
                component.size.width,
                component.size.height,
            ));
        }
        let mut extents = if extents.is_empty() {
            extents
        } else {
            extents.expanded(self.config.margin)
        };
        if let Some(drawn) = document.bounds() {
            extents.include_bounds(&drawn);
        }
        extents
    }

    fn draw_annotation(&self, document: &mut Document, annotation: &Annotation) {
        let height = self.config.caption_text_height;
        let origin = annotation.position.to_point();
        for (index, line) in annotation.text.lines().enumerate() {
            let content: String = line
                .chars()
                .map(|ch| if ch.is_control() { ' ' } else { ch })
                .collect();
            if content.trim().is_empty() {
                continue;
            }
            let at = Point2::new(
                origin.x(),
                origin.y() - index as f64 * height * ANNOTATION_LINE_SPACING,
            );
            document.add_text(at, content, height, 0.0, StandardLayer::Annotations.name());
        }
    }

    /// 图框与右下角标题栏。
    fn draw_title_block(&self, document: &mut Document, spec: &DrawingSpec) {
        let Layout { width, height, .. } = spec.layout;
        let border = StandardLayer::Border.name();
        document.add_polyline(rectangle(0.0, 0.0, width, height), true, border);

        let inset = FRAME_INSET.min(width * 0.05).min(height * 0.05);
        document.add_polyline(
            rectangle(inset, inset, width - inset, height - inset),
            true,
            border,
        );

        let text_height = self.config.caption_text_height;
        let row_height = self.config.label_text_height * 2.2;
        let block_width = TITLE_BLOCK_WIDTH.min((width - 2.0 * inset) * 0.6);
        let block_height = (row_height * TITLE_BLOCK_ROWS as f64).min((height - 2.0 * inset) * 0.5);
        let row_height = block_height / TITLE_BLOCK_ROWS as f64;
        let x0 = width - inset - block_width;
        let y0 = inset;
        document.add_polyline(
            rectangle(x0, y0, x0 + block_width, y0 + block_height),
            true,
            border,
        );
        for row in 1..TITLE_BLOCK_ROWS {
            let y = y0 + row_height * row as f64;
            document.add_line(Point2::new(x0, y), Point2::new(x0 + block_width, y), border);
        }

        let project = &spec.project;
        let system = if project.system_type.trim().is_empty() {
            "-"
        } else {
            project.system_type.trim()
        };
        let description = project.description.lines().next().unwrap_or("").trim();
        let rows = [
            (project.name.clone(), self.config.label_text_height.min(row_height * 0.6)),
            (format!("System: {system}"), text_height.min(row_height * 0.6)),
            ("Units: mm    Scale: NTS".to_string(), text_height.min(row_height * 0.6)),
            (description.to_string(), text_height.min(row_height * 0.6)),
        ];
        let padding = row_height * 0.3;
        for (index, (content, size)) in rows.into_iter().enumerate() {
            let max_chars = ((block_width - 2.0 * padding) / (size * 0.8)).floor().max(1.0) as usize;
            let content: String = content
                .chars()
                .map(|ch| if ch.is_control() { ' ' } else { ch })
                .take(max_chars)
                .collect();
            if content.trim().is_empty() {
                continue;
            }
            let top = y0 + block_height - row_height * index as f64;
            let baseline = top - row_height + (row_height - size) * 0.5;
            document.add_text(
                Point2::new(x0 + padding, baseline),
                content,
                size,
                0.0,
                StandardLayer::Title.name(),
            );
        }
    }
}

/// 图幅内每个网格交点画一个小十字。
fn draw_grid(document: &mut Document, layout: &Layout) {
    let mut spacing = layout.grid_spacing;
    // 在 f64 中计数，极小间距下 usize 乘法会溢出
    let marks = |spacing: f64| {
        ((layout.width / spacing).floor() + 1.0) * ((layout.height / spacing).floor() + 1.0)
    };
    while marks(spacing) > MAX_GRID_MARKS as f64 {
        spacing *= 2.0;
    }
    let arm = spacing * 0.05;
    let columns = (layout.width / spacing).floor() as usize;
    let rows = (layout.height / spacing).floor() as usize;
    let layer = StandardLayer::Grid.name();
    for i in 0..=columns {
        for j in 0..=rows {
            let (x, y) = (i as f64 * spacing, j as f64 * spacing);
            document.add_line(Point2::new(x - arm, y), Point2::new(x + arm, y), layer);
            document.add_line(Point2::new(x, y - arm), Point2::new(x, y + arm), layer);
        }
    }
    debug!(spacing, marks = (columns + 1) * (rows + 1), "网格已绘制");
}

fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> [Point2; 4] {
    [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

/// 以给定配置渲染规格。
pub fn render(spec: &DrawingSpec, config: &DrawingConfig) -> Result<RenderedDrawing, RenderError> {
    DrawingPipeline::new(config.clone()).render(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqdraw_core::document::Entity;

    use crate::spec::{Component, ComponentCallout, EquipmentKind, Position, ProjectInfo, Size};

    fn spec() -> DrawingSpec {
        let mut pump = Component::new(
            "P-1",
            EquipmentKind::Pump,
            Position::new(300.0, 300.0),
            Size::new(200.0, 150.0),
        );
        pump.additional_callouts.push(ComponentCallout {
            label: Some("DRAIN".into()),
            text: "Casing drain".into(),
            target_offset: Position::new(0.0, -40.0),
            text_offset: Position::new(-150.0, -120.0),
        });
        DrawingSpec {
            project: ProjectInfo::new("Pipeline test"),
            components: vec![pump],
            connections: Vec::new(),
            layout: Layout::default(),
            annotations: vec![Annotation {
                text: "NOTE 1\nNOTE 2".into(),
                position: Position::new(20.0, 580.0),
            }],
        }
    }

    fn layer_count(document: &Document, layer: &str) -> usize {
        document
            .entities()
            .filter(|(_, e)| e.layer_name() == layer)
            .count()
    }

    #[test]
    fn title_block_and_grid_follow_config() {
        let config = DrawingConfig {
            grid: true,
            ..DrawingConfig::default()
        };
        let (document, _) = DrawingPipeline::new(config).build_document(&spec()).expect("build");
        assert_eq!(layer_count(&document, "TITLE"), 3);
        assert!(layer_count(&document, "BORDER") >= 3);
        // 841 x 594，间距 50：17 x 12 个交点，每个两条线
        assert_eq!(layer_count(&document, "GRID"), 17 * 12 * 2);

        let config = DrawingConfig {
            title_block: false,
            ..DrawingConfig::default()
        };
        let (document, _) = DrawingPipeline::new(config).build_document(&spec()).expect("build");
        assert_eq!(layer_count(&document, "TITLE"), 0);
        assert_eq!(layer_count(&document, "BORDER"), 0);
        assert_eq!(layer_count(&document, "GRID"), 0);
    }

    #[test]
    fn annotations_and_extra_callouts_are_counted() {
        let (document, report) = DrawingPipeline::new(DrawingConfig::default())
            .build_document(&spec())
            .expect("build");
        assert_eq!(report.components, 1);
        assert_eq!(report.annotations, 1);
        // 泵自带 9 条标注 + 1 条附加标注
        assert_eq!(report.callouts, 10);
        assert_eq!(layer_count(&document, "ANNOTATIONS"), 2);
        assert!(document.entities().any(|(_, e)| matches!(
            e,
            Entity::Text(text) if text.content == "DRAIN: Casing drain"
        )));
        assert_eq!(report.entities, document.entity_count());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn extents_cover_components_with_margin() {
        let (document, _) = DrawingPipeline::new(DrawingConfig::default())
            .build_document(&spec())
            .expect("build");
        let extents = document.header().extents.expect("extents");
        assert!(extents.min().x() <= 300.0 - 100.0 - 100.0);
        assert!(extents.max().y() >= 300.0 + 75.0 + 100.0);
    }

    #[test]
    fn huge_grid_is_thinned() {
        let mut spec = spec();
        spec.layout.grid_spacing = 1.0;
        let config = DrawingConfig {
            grid: true,
            title_block: false,
            ..DrawingConfig::default()
        };
        let (document, _) = DrawingPipeline::new(config).build_document(&spec).expect("build");
        assert!(layer_count(&document, "GRID") <= 2 * MAX_GRID_MARKS);
    }

    #[test]
    fn microscopic_grid_spacing_is_thinned() {
        let mut spec = spec();
        spec.layout.grid_spacing = 1e-9;
        let config = DrawingConfig {
            grid: true,
            title_block: false,
            ..DrawingConfig::default()
        };
        let (document, _) = DrawingPipeline::new(config).build_document(&spec).expect("build");
        let grid = layer_count(&document, "GRID");
        assert!(grid > 0);
        assert!(grid <= 2 * MAX_GRID_MARKS);
    }

    #[test]
    fn warnings_render_readably() {
        let warning = RenderWarning::UnsupportedComponent {
            id: "W-1".into(),
            kind: "widget".into(),
        };
        assert!(warning.to_string().contains("widget"));
        let json = serde_json::to_string(&warning).expect("json");
        assert!(json.contains("\"warning\":\"unsupportedComponent\""));
    }
}
