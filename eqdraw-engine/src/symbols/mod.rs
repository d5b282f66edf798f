//! 设备符号库。
//!
//! 每个符号生成器输出一组以比例因子为单位的 `Primitive`（比例因子取组件宽高中的较大者），
//! 由 `SymbolInterpreter` 统一换算到图纸坐标并写入文档。生成失败或类型未知时回退为
//! 通用矩形符号，组件编号始终会被绘制。

pub mod exchanger;
pub mod generic;
pub mod misc;
pub mod pump;
pub mod rotating;
pub mod valve;
pub mod vessels;

use std::collections::HashMap;
use std::f64::consts::PI;

use eqdraw_config::DrawingConfig;
use eqdraw_core::document::Document;
use eqdraw_core::geometry::Point2;
use glam::DVec2;
use thiserror::Error;
use tracing::{debug, warn};

use crate::callout::{Callout, CalloutEngine};
use crate::layers::StandardLayer;
use crate::parameters::{ComponentParameters, ParameterKey};
use crate::spec::{Component, EquipmentKind};

/// 比例因子单位下的坐标。
pub type Xy = (f64, f64);

#[inline]
fn v((x, y): Xy) -> DVec2 {
    DVec2::new(x, y)
}

/// 文字高度类别，实际高度取自绘图配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Label,
    Caption,
    Callout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line {
        from: DVec2,
        to: DVec2,
        layer: StandardLayer,
    },
    Circle {
        center: DVec2,
        radius: f64,
        layer: StandardLayer,
    },
    Polyline {
        points: Vec<DVec2>,
        closed: bool,
        layer: StandardLayer,
    },
    /// 单行文字，`at` 为基线插入点。
    Text {
        at: DVec2,
        content: String,
        size: TextSize,
        layer: StandardLayer,
    },
    /// 多行文字块，`anchor` 为左上角，行间距按文字高度计算。
    TextBlock {
        anchor: DVec2,
        lines: Vec<String>,
        size: TextSize,
        layer: StandardLayer,
    },
    Callout {
        target: DVec2,
        text_at: DVec2,
        label: Option<String>,
        text: String,
    },
}

/// 以声明方式累积图元。
#[derive(Debug, Default)]
pub struct SymbolBuilder {
    primitives: Vec<Primitive>,
}

impl SymbolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, from: Xy, to: Xy, layer: StandardLayer) -> &mut Self {
        self.primitives.push(Primitive::Line {
            from: v(from),
            to: v(to),
            layer,
        });
        self
    }

    pub fn circle(&mut self, center: Xy, radius: f64, layer: StandardLayer) -> &mut Self {
        self.primitives.push(Primitive::Circle {
            center: v(center),
            radius,
            layer,
        });
        self
    }

    pub fn polyline<I>(&mut self, points: I, closed: bool, layer: StandardLayer) -> &mut Self
    where
        I: IntoIterator<Item = Xy>,
    {
        self.primitives.push(Primitive::Polyline {
            points: points.into_iter().map(v).collect(),
            closed,
            layer,
        });
        self
    }

    /// 以中心点和宽高描述的闭合矩形。
    pub fn rect(&mut self, center: Xy, width: f64, height: f64, layer: StandardLayer) -> &mut Self {
        let (cx, cy) = center;
        let (hw, hh) = (width * 0.5, height * 0.5);
        self.polyline(
            [
                (cx - hw, cy - hh),
                (cx + hw, cy - hh),
                (cx + hw, cy + hh),
                (cx - hw, cy + hh),
            ],
            true,
            layer,
        )
    }

    /// 矩形区域内的 45° 剖面线，`spacing` 为线间垂直距离。
    pub fn hatch_rect(&mut self, center: Xy, width: f64, height: f64, spacing: f64) -> &mut Self {
        let (cx, cy) = center;
        let (x0, x1) = (cx - width * 0.5, cx + width * 0.5);
        let (y0, y1) = (cy - height * 0.5, cy + height * 0.5);
        let step = spacing * std::f64::consts::SQRT_2;
        if step <= 0.0 || !step.is_finite() {
            return self;
        }
        // 直线 y = x - c，c 在 [x0 - y1, x1 - y0] 之间扫描
        let mut c = x0 - y1 + step;
        while c < x1 - y0 {
            let lo = x0.max(y0 + c);
            let hi = x1.min(y1 + c);
            if hi > lo {
                self.line((lo, lo - c), (hi, hi - c), StandardLayer::Hatching);
            }
            c += step;
        }
        self
    }

    /// 接管：`bore` 宽的两条平行管壁，末端带法兰圆。
    pub fn nozzle(&mut self, from: Xy, to: Xy, bore: f64, flange_radius: f64) -> &mut Self {
        let direction = (v(to) - v(from)).normalize_or_zero();
        let normal = direction.perp() * (bore * 0.5);
        for side in [normal, -normal] {
            let start = v(from) + side;
            let end = v(to) + side;
            self.line((start.x, start.y), (end.x, end.y), StandardLayer::Components);
        }
        self.circle(to, flange_radius, StandardLayer::Components)
    }

    /// 椭圆弧折线，角度为弧度，按 `segments` 等分。
    pub fn arc(
        &mut self,
        center: Xy,
        radii: Xy,
        angles: (f64, f64),
        segments: usize,
        layer: StandardLayer,
    ) -> &mut Self {
        self.polyline(arc_points(center, radii, angles, segments), false, layer)
    }

    pub fn text(&mut self, at: Xy, content: impl Into<String>, size: TextSize, layer: StandardLayer) -> &mut Self {
        self.primitives.push(Primitive::Text {
            at: v(at),
            content: content.into(),
            size,
            layer,
        });
        self
    }

    pub fn text_block(
        &mut self,
        anchor: Xy,
        lines: Vec<String>,
        size: TextSize,
        layer: StandardLayer,
    ) -> &mut Self {
        self.primitives.push(Primitive::TextBlock {
            anchor: v(anchor),
            lines,
            size,
            layer,
        });
        self
    }

    pub fn callout(
        &mut self,
        target: Xy,
        text_at: Xy,
        label: &str,
        text: impl Into<String>,
    ) -> &mut Self {
        self.primitives.push(Primitive::Callout {
            target: v(target),
            text_at: v(text_at),
            label: Some(label.to_string()),
            text: text.into(),
        });
        self
    }

    pub fn build(self) -> Vec<Primitive> {
        self.primitives
    }
}

/// 椭圆弧上的点列，含两端点。
pub fn arc_points(center: Xy, radii: Xy, angles: (f64, f64), segments: usize) -> Vec<Xy> {
    let segments = segments.max(1);
    let (start, end) = angles;
    (0..=segments)
        .map(|i| {
            let t = start + (end - start) * i as f64 / segments as f64;
            (center.0 + radii.0 * t.cos(), center.1 + radii.1 * t.sin())
        })
        .collect()
}

#[inline]
pub fn polar(center: Xy, radius: f64, angle: f64) -> Xy {
    (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
}

/// 圆周均分的角度，从 `phase` 开始。
pub fn ring_angles(count: usize, phase: f64) -> impl Iterator<Item = f64> {
    let count = count.max(1);
    (0..count).map(move |i| phase + 2.0 * PI * i as f64 / count as f64)
}

/// 符号在图纸上的放置：原点为组件中心，比例为比例因子。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Point2,
    pub scale: f64,
}

impl Placement {
    pub fn for_component(component: &Component) -> Self {
        Self {
            origin: component.position.to_point(),
            scale: component.size.scale_factor(),
        }
    }

    #[inline]
    pub fn resolve(&self, offset: DVec2) -> Point2 {
        Point2::from_vec(self.origin.as_vec2() + offset * self.scale)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymbolError {
    #[error("symbol geometry contains a non-finite coordinate")]
    NonFiniteGeometry,
    #[error("symbol geometry contains a circle with non-positive radius")]
    InvalidRadius,
    #[error("symbol geometry contains a polyline with {0} vertices")]
    DegeneratePolyline(usize),
    #[error("symbol produced no geometry")]
    Empty,
    #[error("symbol generation failed: {0}")]
    Generator(String),
}

/// 生成器可读取的组件信息。
#[derive(Debug, Clone, Copy)]
pub struct SymbolContext<'a> {
    pub component: &'a Component,
    pub parameters: &'a ComponentParameters,
}

impl<'a> SymbolContext<'a> {
    pub fn new(component: &'a Component, parameters: &'a ComponentParameters) -> Self {
        Self {
            component,
            parameters,
        }
    }

    /// 参数显示文本，缺省时使用 `fallback`。
    pub fn text_or(&self, key: ParameterKey, fallback: &str) -> String {
        self.parameters
            .display(key)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// 以比例因子为单位的组件宽高。
    pub fn unit_size(&self) -> Xy {
        let scale = self.component.size.scale_factor();
        (
            self.component.size.width / scale,
            self.component.size.height / scale,
        )
    }
}

/// 连接线端点位置（比例因子单位）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ports {
    pub inlet: DVec2,
    pub outlet: DVec2,
}

impl Ports {
    pub const CENTER: Ports = Ports {
        inlet: DVec2::ZERO,
        outlet: DVec2::ZERO,
    };

    pub fn new(inlet: Xy, outlet: Xy) -> Self {
        Self {
            inlet: v(inlet),
            outlet: v(outlet),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRole {
    Inlet,
    Outlet,
}

pub trait SymbolGenerator: Send + Sync {
    fn kind(&self) -> EquipmentKind;
    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError>;
    fn ports(&self) -> Ports {
        Ports::CENTER
    }
}

/// 图元解释器：校验并按放置参数写入文档。
#[derive(Debug, Clone, Copy)]
pub struct SymbolInterpreter {
    label_height: f64,
    caption_height: f64,
    callout_height: f64,
}

/// 一次写入的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub entities: usize,
    pub callouts: usize,
}

const TEXT_LINE_SPACING: f64 = 1.5;

impl SymbolInterpreter {
    pub fn new(config: &DrawingConfig) -> Self {
        Self {
            label_height: config.label_text_height,
            caption_height: config.caption_text_height,
            callout_height: config.callout_text_height,
        }
    }

    pub fn text_height(&self, size: TextSize) -> f64 {
        match size {
            TextSize::Label => self.label_height,
            TextSize::Caption => self.caption_height,
            TextSize::Callout => self.callout_height,
        }
    }

    /// 检查图元在给定放置下是否都能生成合法实体。
    pub fn check(primitives: &[Primitive], placement: &Placement) -> Result<(), SymbolError> {
        if primitives.is_empty() {
            return Err(SymbolError::Empty);
        }
        let finite = |offset: &DVec2| {
            if placement.resolve(*offset).is_finite() {
                Ok(())
            } else {
                Err(SymbolError::NonFiniteGeometry)
            }
        };
        for primitive in primitives {
            match primitive {
                Primitive::Line { from, to, .. } => {
                    finite(from)?;
                    finite(to)?;
                }
                Primitive::Circle { center, radius, .. } => {
                    finite(center)?;
                    let scaled = radius * placement.scale;
                    if !scaled.is_finite() || scaled <= 0.0 {
                        return Err(SymbolError::InvalidRadius);
                    }
                }
                Primitive::Polyline { points, .. } => {
                    if points.len() < 2 {
                        return Err(SymbolError::DegeneratePolyline(points.len()));
                    }
                    points.iter().try_for_each(finite)?;
                }
                Primitive::Text { at, .. } => finite(at)?,
                Primitive::TextBlock { anchor, .. } => finite(anchor)?,
                Primitive::Callout {
                    target, text_at, ..
                } => {
                    finite(target)?;
                    finite(text_at)?;
                }
            }
        }
        Ok(())
    }

    pub fn emit(
        &self,
        primitives: &[Primitive],
        placement: &Placement,
        document: &mut Document,
        callouts: &mut CalloutEngine,
    ) -> EmitStats {
        let before = document.entity_count();
        let mut stats = EmitStats::default();
        for primitive in primitives {
            match primitive {
                Primitive::Line { from, to, layer } => {
                    document.add_line(
                        placement.resolve(*from),
                        placement.resolve(*to),
                        layer.name(),
                    );
                }
                Primitive::Circle {
                    center,
                    radius,
                    layer,
                } => {
                    document.add_circle(
                        placement.resolve(*center),
                        radius * placement.scale,
                        layer.name(),
                    );
                }
                Primitive::Polyline {
                    points,
                    closed,
                    layer,
                } => {
                    document.add_polyline(
                        points.iter().map(|point| placement.resolve(*point)),
                        *closed,
                        layer.name(),
                    );
                }
                Primitive::Text {
                    at,
                    content,
                    size,
                    layer,
                } => {
                    let content = single_line(content);
                    if !content.trim().is_empty() {
                        document.add_text(
                            placement.resolve(*at),
                            content,
                            self.text_height(*size),
                            0.0,
                            layer.name(),
                        );
                    }
                }
                Primitive::TextBlock {
                    anchor,
                    lines,
                    size,
                    layer,
                } => {
                    let height = self.text_height(*size);
                    let top = placement.resolve(*anchor);
                    for (index, line) in lines.iter().enumerate() {
                        let content = single_line(line);
                        if content.trim().is_empty() {
                            continue;
                        }
                        let baseline =
                            top.y() - height - index as f64 * height * TEXT_LINE_SPACING;
                        document.add_text(
                            Point2::new(top.x(), baseline),
                            content,
                            height,
                            0.0,
                            layer.name(),
                        );
                    }
                }
                Primitive::Callout {
                    target,
                    text_at,
                    label,
                    text,
                } => {
                    let mut callout = Callout::new(
                        placement.resolve(*target),
                        placement.resolve(*text_at),
                        text.clone(),
                    );
                    callout.label = label.clone();
                    callouts.draw(document, &callout);
                    stats.callouts += 1;
                }
            }
        }
        stats.entities = document.entity_count() - before;
        stats
    }
}

fn single_line(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}

/// 符号回退原因。
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    Unsupported,
    Failed(SymbolError),
}

/// 单个组件的绘制结果。
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnSymbol {
    pub fallback: Option<FallbackReason>,
    pub stats: EmitStats,
}

/// 按设备类型分派的符号生成器注册表。
pub struct SymbolLibrary {
    generators: HashMap<EquipmentKind, Box<dyn SymbolGenerator>>,
}

impl Default for SymbolLibrary {
    fn default() -> Self {
        Self::standard()
    }
}

impl SymbolLibrary {
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// 注册全部内置设备符号。
    pub fn standard() -> Self {
        let mut library = Self::empty();
        library.register(pump::PumpSymbol);
        library.register(exchanger::HeatExchangerSymbol);
        library.register(valve::ValveSymbol);
        library.register(vessels::TankSymbol);
        library.register(vessels::PressureVesselSymbol);
        library.register(vessels::SeparatorSymbol);
        library.register(vessels::ReactorSymbol);
        library.register(rotating::TurbineSymbol);
        library.register(rotating::MotorSymbol);
        library.register(rotating::GeneratorSymbol);
        library.register(misc::FilterSymbol);
        library.register(misc::InstrumentSymbol);
        library
    }

    /// 注册生成器；同类型的旧生成器被替换。
    pub fn register<G: SymbolGenerator + 'static>(&mut self, generator: G) {
        self.generators.insert(generator.kind(), Box::new(generator));
    }

    pub fn supports(&self, kind: &EquipmentKind) -> bool {
        self.generators.contains_key(kind)
    }

    /// 已注册的设备类型，按名称排序。
    pub fn kinds(&self) -> Vec<EquipmentKind> {
        let mut kinds: Vec<_> = self.generators.keys().cloned().collect();
        kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        kinds
    }

    pub fn ports(&self, kind: &EquipmentKind) -> Ports {
        self.generators
            .get(kind)
            .map_or(Ports::CENTER, |generator| generator.ports())
    }

    /// 组件指定端口在图纸上的位置；未注册的类型使用组件中心。
    pub fn anchor(&self, component: &Component, role: PortRole) -> Point2 {
        let ports = self.ports(&component.kind);
        let offset = match role {
            PortRole::Inlet => ports.inlet,
            PortRole::Outlet => ports.outlet,
        };
        let anchor = Placement::for_component(component).resolve(offset);
        if anchor.is_finite() {
            anchor
        } else {
            component.position.to_point()
        }
    }

    /// 绘制组件符号及其编号、参数说明。生成失败不会中断渲染。
    pub fn draw(
        &self,
        context: &SymbolContext<'_>,
        interpreter: &SymbolInterpreter,
        document: &mut Document,
        callouts: &mut CalloutEngine,
    ) -> DrawnSymbol {
        let component = context.component;
        let placement = Placement::for_component(component);
        let (mut primitives, fallback) = match self.generators.get(&component.kind) {
            None => {
                warn!(id = %component.id, kind = %component.kind, "不支持的设备类型，使用通用符号");
                (generic::outline(context), Some(FallbackReason::Unsupported))
            }
            Some(generator) => match generator.generate(context).and_then(|primitives| {
                SymbolInterpreter::check(&primitives, &placement)?;
                Ok(primitives)
            }) {
                Ok(primitives) => (primitives, None),
                Err(err) => {
                    warn!(id = %component.id, kind = %component.kind, error = %err, "符号生成失败，使用通用符号");
                    (generic::outline(context), Some(FallbackReason::Failed(err)))
                }
            },
        };
        primitives.extend(identification(context));

        let stats = interpreter.emit(&primitives, &placement, document, callouts);
        debug!(id = %component.id, entities = stats.entities, "组件已绘制");
        DrawnSymbol { fallback, stats }
    }
}

/// 编号（符号上方）与名称、参数说明（符号下方）。
fn identification(context: &SymbolContext<'_>) -> Vec<Primitive> {
    let component = context.component;
    let mut builder = SymbolBuilder::new();
    builder.text((-0.5, 0.56), component.id.as_str(), TextSize::Label, StandardLayer::Tags);

    let mut lines = Vec::new();
    if component.display_name() != component.id {
        lines.push(component.display_name().to_string());
    }
    lines.extend(context.parameters.caption_lines(&component.kind));
    if !lines.is_empty() {
        builder.text_block((-0.5, -0.56), lines, TextSize::Caption, StandardLayer::Captions);
    }
    builder.build()
}
