//! 内置示例图纸，供命令行 `demo` 使用。

use crate::spec::{
    Annotation, Component, ComponentCallout, Connection, ConnectionKind, DrawingSpec,
    EquipmentKind, Layout, Position, ProjectInfo, Size,
};

/// `(名称, 说明)`，按名称排序。
pub const TEMPLATES: [(&str, &str); 3] = [
    ("control-loop", "Level control loop: tank, transmitter and control valve"),
    ("heat-exchange-loop", "Cooling water loop: pump, shell-and-tube exchanger, filter"),
    ("pump-station", "Two-pump transfer station with motor drive and storage tank"),
];

pub const DEFAULT_TEMPLATE: &str = "pump-station";

pub fn template_names() -> impl Iterator<Item = &'static str> {
    TEMPLATES.iter().map(|(name, _)| *name)
}

/// 按名称取模板，名称不区分大小写，`_` 与 `-` 等价。
pub fn template(name: &str) -> Option<DrawingSpec> {
    let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
    match normalized.as_str() {
        "pump-station" => Some(pump_station()),
        "heat-exchange-loop" => Some(heat_exchange_loop()),
        "control-loop" => Some(control_loop()),
        _ => None,
    }
}

fn project(name: &str, system_type: &str, description: &str) -> ProjectInfo {
    let mut project = ProjectInfo::new(name);
    project.system_type = system_type.to_string();
    project.description = description.to_string();
    project
}

fn pump_station() -> DrawingSpec {
    let mut tank = Component::new(
        "T-101",
        EquipmentKind::Tank,
        Position::new(150.0, 300.0),
        Size::new(160.0, 220.0),
    )
    .with_name("Raw water tank")
    .with_parameter("capacity", 50.0)
    .with_parameter("material", "Carbon steel, epoxy lined");
    tank.additional_callouts.push(ComponentCallout {
        label: Some("MANHOLE".into()),
        text: "DN600 manway".into(),
        target_offset: Position::new(-60.0, 60.0),
        text_offset: Position::new(-120.0, 150.0),
    });

    let components = vec![
        tank,
        Component::new(
            "P-101A",
            EquipmentKind::Pump,
            Position::new(400.0, 380.0),
            Size::new(200.0, 150.0),
        )
        .with_name("Transfer pump A")
        .with_parameter("flowRate", 150.0)
        .with_parameter("head", 45.0)
        .with_parameter("power", 30.0)
        .with_parameter("speed", 2950.0)
        .with_parameter("efficiency", 82.0),
        Component::new(
            "P-101B",
            EquipmentKind::Pump,
            Position::new(400.0, 180.0),
            Size::new(200.0, 150.0),
        )
        .with_name("Transfer pump B (standby)")
        .with_parameter("flowRate", 150.0)
        .with_parameter("head", 45.0)
        .with_parameter("sealType", "Double cartridge seal"),
        Component::new(
            "M-101",
            EquipmentKind::Motor,
            Position::new(620.0, 380.0),
            Size::new(120.0, 100.0),
        )
        .with_name("Drive motor")
        .with_parameter("power", 30.0)
        .with_parameter("voltage", 400.0),
        Component::new(
            "V-101",
            EquipmentKind::Valve,
            Position::new(620.0, 180.0),
            Size::new(80.0, 80.0),
        )
        .with_parameter("valveType", "Gate")
        .with_parameter("diameter", 150.0),
    ];
    let connections = vec![
        Connection::new("L-1", "T-101", "P-101A", ConnectionKind::Pipe)
            .with_diameter(150.0)
            .with_material("CS"),
        Connection::new("L-2", "T-101", "P-101B", ConnectionKind::Pipe).with_diameter(150.0),
        Connection::new("L-3", "P-101B", "V-101", ConnectionKind::Pipe).with_diameter(100.0),
        Connection::new("E-1", "M-101", "P-101A", ConnectionKind::Electrical),
    ];
    DrawingSpec {
        project: project(
            "Pump Station",
            "Water transfer",
            "Duty/standby transfer pumps from raw water storage",
        ),
        components,
        connections,
        layout: Layout::default(),
        annotations: vec![Annotation {
            text: "NOTES:\n1. All dimensions in mm\n2. P-101B is standby".into(),
            position: Position::new(30.0, 570.0),
        }],
    }
}

fn heat_exchange_loop() -> DrawingSpec {
    let components = vec![
        Component::new(
            "P-201",
            EquipmentKind::Pump,
            Position::new(150.0, 250.0),
            Size::new(180.0, 140.0),
        )
        .with_name("Cooling water pump")
        .with_parameter("flowRate", 220.0)
        .with_parameter("head", 30.0),
        Component::new(
            "F-201",
            EquipmentKind::Filter,
            Position::new(360.0, 250.0),
            Size::new(100.0, 140.0),
        )
        .with_name("Strainer")
        .with_parameter("filterRating", 100.0),
        Component::new(
            "E-201",
            EquipmentKind::HeatExchanger,
            Position::new(600.0, 250.0),
            Size::new(260.0, 110.0),
        )
        .with_name("Process cooler")
        .with_parameter("area", 85.0)
        .with_parameter("tubeCount", 248.0)
        .with_parameter("passes", 2.0)
        .with_parameter("foulingFactor", 0.0002),
        Component::new(
            "V-201",
            EquipmentKind::Valve,
            Position::new(600.0, 430.0),
            Size::new(80.0, 80.0),
        )
        .with_parameter("valveType", "Globe")
        .with_parameter("actuator", "Pneumatic"),
    ];
    let connections = vec![
        Connection::new("CW-1", "P-201", "F-201", ConnectionKind::Pipe).with_diameter(200.0),
        Connection::new("CW-2", "F-201", "E-201", ConnectionKind::Pipe)
            .with_diameter(200.0)
            .with_material("SS316"),
        Connection::new("CW-3", "E-201", "V-201", ConnectionKind::Pipe).with_diameter(150.0),
    ];
    DrawingSpec {
        project: project(
            "Heat Exchange Loop",
            "Cooling water",
            "Closed cooling water circuit serving the process cooler",
        ),
        components,
        connections,
        layout: Layout::default(),
        annotations: Vec::new(),
    }
}

fn control_loop() -> DrawingSpec {
    let components = vec![
        Component::new(
            "TK-301",
            EquipmentKind::Tank,
            Position::new(200.0, 280.0),
            Size::new(160.0, 240.0),
        )
        .with_name("Buffer tank")
        .with_parameter("volume", 12.0),
        Component::new(
            "LT-301",
            EquipmentKind::Instrument,
            Position::new(380.0, 420.0),
            Size::new(60.0, 60.0),
        )
        .with_parameter("measuredVariable", "Level")
        .with_parameter("range", "0-3000 mm"),
        Component::new(
            "LV-301",
            EquipmentKind::Valve,
            Position::new(520.0, 200.0),
            Size::new(80.0, 80.0),
        )
        .with_name("Level control valve")
        .with_parameter("actuator", "Pneumatic diaphragm")
        .with_parameter("failPosition", "Closed"),
    ];
    let connections = vec![
        Connection::new("S-1", "TK-301", "LT-301", ConnectionKind::Signal),
        Connection::new("S-2", "LT-301", "LV-301", ConnectionKind::Signal),
        Connection::new("L-301", "TK-301", "LV-301", ConnectionKind::Pipe).with_diameter(80.0),
    ];
    DrawingSpec {
        project: project(
            "Control Loop",
            "Instrumentation",
            "Tank level held by LT-301 acting on LV-301",
        ),
        components,
        connections,
        layout: Layout::default(),
        annotations: vec![Annotation {
            text: "LIC-301 in DCS".into(),
            position: Position::new(380.0, 520.0),
        }],
    }
}
