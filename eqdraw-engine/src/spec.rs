//! 设备图纸规格：由上游（模板或生成步骤）构造，渲染期间只读。

use std::collections::BTreeMap;
use std::fmt;

use eqdraw_core::geometry::Point2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::parameters::ParameterValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingSpec {
    pub project: ProjectInfo,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl DrawingSpec {
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|component| component.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub name: String,
    #[serde(default)]
    pub system_type: String,
    #[serde(default = "ProjectInfo::default_units")]
    pub units: String,
    #[serde(default)]
    pub description: String,
}

impl ProjectInfo {
    fn default_units() -> String {
        "mm".to_string()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_type: String::new(),
            units: Self::default_units(),
            description: String::new(),
        }
    }
}

/// 图幅范围（毫米），默认 A1 横向。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    #[serde(default = "Layout::default_grid_spacing")]
    pub grid_spacing: f64,
}

impl Layout {
    fn default_grid_spacing() -> f64 {
        50.0
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 841.0,
            height: 594.0,
            grid_spacing: Self::default_grid_spacing(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn to_point(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 符号比例因子：宽高中的较大者。
    #[inline]
    pub fn scale_factor(self) -> f64 {
        self.width.max(self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EquipmentKind,
    #[serde(default)]
    pub name: String,
    pub position: Position,
    pub size: Size,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_callouts: Vec<ComponentCallout>,
}

impl Component {
    pub fn new(
        id: impl Into<String>,
        kind: EquipmentKind,
        position: Position,
        size: Size,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: String::new(),
            position,
            size,
            parameters: BTreeMap::new(),
            additional_callouts: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 未填写名称时回退为编号。
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// 组件附带的额外引线标注，偏移量相对组件位置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCallout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub text: String,
    #[serde(default)]
    pub target_offset: Position,
    #[serde(default)]
    pub text_offset: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default)]
    pub kind: ConnectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: ConnectionKind,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            kind,
            diameter: None,
            material: None,
        }
    }

    pub fn with_diameter(mut self, diameter: f64) -> Self {
        self.diameter = Some(diameter);
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Pipe,
    Electrical,
    Signal,
    Structural,
}

/// 连接的端点角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionEnd {
    From,
    To,
}

impl fmt::Display for ConnectionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEnd::From => f.write_str("from"),
            ConnectionEnd::To => f.write_str("to"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    pub position: Position,
}

/// 设备类型。无法识别的类型字符串原样保留在 `Unknown` 中。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EquipmentKind {
    Pump,
    HeatExchanger,
    Valve,
    Tank,
    PressureVessel,
    Turbine,
    Motor,
    Generator,
    Filter,
    Separator,
    Reactor,
    Instrument,
    Unknown(String),
}

impl EquipmentKind {
    pub const SUPPORTED: [EquipmentKind; 12] = [
        EquipmentKind::Pump,
        EquipmentKind::HeatExchanger,
        EquipmentKind::Valve,
        EquipmentKind::Tank,
        EquipmentKind::PressureVessel,
        EquipmentKind::Turbine,
        EquipmentKind::Motor,
        EquipmentKind::Generator,
        EquipmentKind::Filter,
        EquipmentKind::Separator,
        EquipmentKind::Reactor,
        EquipmentKind::Instrument,
    ];

    /// 解析类型字符串，忽略大小写及 `_`、`-`、空格。
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "pump" | "centrifugalpump" => EquipmentKind::Pump,
            "heatexchanger" | "exchanger" | "hx" => EquipmentKind::HeatExchanger,
            "valve" | "controlvalve" => EquipmentKind::Valve,
            "tank" | "storagetank" => EquipmentKind::Tank,
            "pressurevessel" | "vessel" => EquipmentKind::PressureVessel,
            "turbine" => EquipmentKind::Turbine,
            "motor" => EquipmentKind::Motor,
            "generator" => EquipmentKind::Generator,
            "filter" => EquipmentKind::Filter,
            "separator" => EquipmentKind::Separator,
            "reactor" => EquipmentKind::Reactor,
            "instrument" | "transmitter" => EquipmentKind::Instrument,
            _ => EquipmentKind::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EquipmentKind::Pump => "pump",
            EquipmentKind::HeatExchanger => "heat_exchanger",
            EquipmentKind::Valve => "valve",
            EquipmentKind::Tank => "tank",
            EquipmentKind::PressureVessel => "pressure_vessel",
            EquipmentKind::Turbine => "turbine",
            EquipmentKind::Motor => "motor",
            EquipmentKind::Generator => "generator",
            EquipmentKind::Filter => "filter",
            EquipmentKind::Separator => "separator",
            EquipmentKind::Reactor => "reactor",
            EquipmentKind::Instrument => "instrument",
            EquipmentKind::Unknown(raw) => raw,
        }
    }

    #[inline]
    pub fn is_supported(&self) -> bool {
        !matches!(self, EquipmentKind::Unknown(_))
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EquipmentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EquipmentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EquipmentKind::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equipment_kind_parsing_is_lenient() {
        assert_eq!(EquipmentKind::parse("Heat-Exchanger"), EquipmentKind::HeatExchanger);
        assert_eq!(EquipmentKind::parse("pressure_vessel"), EquipmentKind::PressureVessel);
        assert_eq!(EquipmentKind::parse("PUMP"), EquipmentKind::Pump);
        assert_eq!(
            EquipmentKind::parse("widget"),
            EquipmentKind::Unknown("widget".to_string())
        );
        assert!(!EquipmentKind::parse("widget").is_supported());
        for kind in EquipmentKind::SUPPORTED {
            assert_eq!(EquipmentKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn spec_deserializes_from_camel_case_json() {
        let spec = DrawingSpec::from_json(
            r#"{
                "project": {"name": "Cooling loop", "systemType": "cooling"},
                "components": [{
                    "id": "P-101",
                    "type": "pump",
                    "position": {"x": 100, "y": 100},
                    "size": {"width": 280, "height": 200},
                    "parameters": {"flowRate": 150, "material": "SS316"},
                    "additionalCallouts": [{
                        "text": "Drain",
                        "targetOffset": {"x": 10, "y": -20},
                        "textOffset": {"x": 80, "y": -90}
                    }]
                }],
                "connections": [{"id": "C1", "from": "P-101", "to": "T-1", "type": "pipe", "diameter": 100}],
                "layout": {"width": 1189, "height": 841, "gridSpacing": 25}
            }"#,
        )
        .expect("valid json");

        assert_eq!(spec.project.units, "mm");
        assert_eq!(spec.project.system_type, "cooling");
        let pump = spec.component("P-101").expect("pump");
        assert_eq!(pump.kind, EquipmentKind::Pump);
        assert_eq!(pump.display_name(), "P-101");
        assert_eq!(pump.size.scale_factor(), 280.0);
        assert_eq!(pump.additional_callouts.len(), 1);
        assert!(pump.additional_callouts[0].label.is_none());
        assert_eq!(spec.connections[0].kind, ConnectionKind::Pipe);
        assert_eq!(spec.connections[0].diameter, Some(100.0));
        assert_eq!(spec.layout.grid_spacing, 25.0);
        assert!(spec.annotations.is_empty());
    }

    #[test]
    fn unknown_connection_type_is_a_parse_error() {
        let result = DrawingSpec::from_json(
            r#"{"project": {"name": "x"},
                "connections": [{"id": "C1", "from": "a", "to": "b", "type": "hydraulic"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn spec_json_round_trips() {
        let spec = DrawingSpec {
            project: ProjectInfo::new("Demo"),
            components: vec![
                Component::new(
                    "V-1",
                    EquipmentKind::Unknown("widget".into()),
                    Position::new(0.0, 0.0),
                    Size::new(50.0, 40.0),
                )
                .with_parameter("material", "PTFE"),
            ],
            connections: Vec::new(),
            layout: Layout::default(),
            annotations: Vec::new(),
        };
        let json = spec.to_json_pretty().expect("serialize");
        assert!(json.contains("\"type\": \"widget\""));
        let back = DrawingSpec::from_json(&json).expect("parse");
        assert_eq!(back, spec);
    }
}
