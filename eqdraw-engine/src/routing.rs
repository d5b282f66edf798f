use std::collections::HashMap;

use eqdraw_config::DrawingConfig;
use eqdraw_core::document::Document;
use eqdraw_core::geometry::{Point2, Vector2};
use thiserror::Error;
use tracing::debug;

use crate::callout::arrowhead;
use crate::layers::StandardLayer;
use crate::parameters::format_number;
use crate::spec::{Component, Connection, ConnectionEnd, ConnectionKind};
use crate::symbols::{PortRole, SymbolLibrary};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("connection {connection:?}: {end} endpoint references unknown component {component:?}")]
    UnknownEndpoint {
        connection: String,
        end: ConnectionEnd,
        component: String,
    },
}

/// 一条连接线的绘制结果。
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedConnection {
    pub start: Point2,
    pub end: Point2,
    pub layer: StandardLayer,
    pub label: Option<String>,
}

/// 连接线路由：从上游组件出口直线连到下游组件入口。
pub struct ConnectionRouter<'a> {
    library: &'a SymbolLibrary,
    components: HashMap<&'a str, &'a Component>,
    label_height: f64,
    arrow_size: f64,
    flow_arrows: bool,
}

impl<'a> ConnectionRouter<'a> {
    pub fn new(
        library: &'a SymbolLibrary,
        components: &'a [Component],
        config: &DrawingConfig,
    ) -> Self {
        Self {
            library,
            components: components
                .iter()
                .map(|component| (component.id.as_str(), component))
                .collect(),
            label_height: config.caption_text_height,
            arrow_size: config.arrow_size,
            flow_arrows: config.flow_arrows,
        }
    }

    pub fn route(
        &self,
        document: &mut Document,
        connection: &Connection,
    ) -> Result<RoutedConnection, RouteError> {
        let from = self.endpoint(connection, ConnectionEnd::From)?;
        let to = self.endpoint(connection, ConnectionEnd::To)?;
        let start = self.library.anchor(from, PortRole::Outlet);
        let end = self.library.anchor(to, PortRole::Inlet);
        let layer = StandardLayer::for_connection(connection.kind);
        document.add_line(start, end, layer.name());

        let direction = start.vector_to(end);
        if connection.kind == ConnectionKind::Pipe
            && self.flow_arrows
            && direction.length() > 4.0 * self.arrow_size
        {
            let half = direction.scale(0.5 * self.arrow_size / direction.length());
            let tip = start.midpoint(end).translate(half);
            let [tip, left, right] = arrowhead(tip, start, self.arrow_size);
            document.add_solid(tip, left, right, layer.name());
        }

        let label = connection_label(connection);
        if let Some(text) = &label {
            document.add_text(
                label_position(start, end, self.label_height),
                text.as_str(),
                self.label_height,
                0.0,
                StandardLayer::ConnectionLabels.name(),
            );
        }
        debug!(id = %connection.id, from = %connection.from, to = %connection.to, "连接线已绘制");

        Ok(RoutedConnection {
            start,
            end,
            layer,
            label,
        })
    }

    fn endpoint(
        &self,
        connection: &Connection,
        end: ConnectionEnd,
    ) -> Result<&'a Component, RouteError> {
        let id = match end {
            ConnectionEnd::From => &connection.from,
            ConnectionEnd::To => &connection.to,
        };
        self.components
            .get(id.as_str())
            .copied()
            .ok_or_else(|| RouteError::UnknownEndpoint {
                connection: connection.id.clone(),
                end,
                component: id.clone(),
            })
    }
}

/// 管径/材质标注：`"<d>mm"`、`"<material>"` 或 `"<d>mm <material>"`。
pub fn connection_label(connection: &Connection) -> Option<String> {
    let diameter = connection
        .diameter
        .map(|diameter| format!("{}mm", format_number(diameter)));
    let material = connection
        .material
        .as_deref()
        .map(|material| material.trim().replace(char::is_control, " "))
        .filter(|material| !material.is_empty());
    match (diameter, material) {
        (Some(diameter), Some(material)) => Some(format!("{diameter} {material}")),
        (Some(diameter), None) => Some(diameter),
        (None, Some(material)) => Some(material),
        (None, None) => None,
    }
}

/// 中点沿左法向偏移一个文字高度。
fn label_position(start: Point2, end: Point2, text_height: f64) -> Point2 {
    let direction = start.vector_to(end);
    let length = direction.length();
    let normal = if length > f64::EPSILON {
        Vector2::new(-direction.y() / length, direction.x() / length)
    } else {
        Vector2::new(0.0, 1.0)
    };
    start.midpoint(end).translate(normal.scale(text_height))
}
