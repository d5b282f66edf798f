//! 设备示意图生成引擎：规格模型、符号库、连接路由、引线标注与渲染流水线。

pub mod callout;
pub mod layers;
pub mod parameters;
pub mod pipeline;
pub mod routing;
pub mod spec;
pub mod symbols;
pub mod templates;
pub mod validate;

pub use pipeline::{
    DrawingPipeline, RenderError, RenderReport, RenderWarning, RenderedDrawing, render,
};
pub use spec::{
    Annotation, Component, Connection, ConnectionKind, DrawingSpec, EquipmentKind, Layout,
    Position, ProjectInfo, Size,
};
pub use symbols::SymbolLibrary;
pub use validate::{SpecValidationError, ValidatedSpec, validate};
