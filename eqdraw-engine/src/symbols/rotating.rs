//! 旋转机械：汽轮机、电动机、发电机。

use std::f64::consts::TAU;

use crate::layers::StandardLayer::{Centerlines, Components, Hidden};
use crate::parameters::ParameterKey;
use crate::spec::EquipmentKind;

use super::{
    Ports, Primitive, SymbolBuilder, SymbolContext, SymbolError, SymbolGenerator, TextSize, Xy,
};

pub struct TurbineSymbol;

const TURBINE_INLET: Xy = (-0.28, 0.30);
const TURBINE_EXHAUST: Xy = (0.20, -0.42);
const TURBINE_STAGES: [f64; 4] = [-0.22, -0.08, 0.06, 0.20];

/// 汽轮机外壳在 `x` 处的半高：进汽端 0.12，排汽端 0.30。
fn turbine_half_height(x: f64) -> f64 {
    0.12 + (x + 0.35) / 0.65 * 0.18
}

impl SymbolGenerator for TurbineSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Turbine
    }

    fn ports(&self) -> Ports {
        Ports::new(TURBINE_INLET, TURBINE_EXHAUST)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let mut b = SymbolBuilder::new();
        b.polyline(
            [
                (-0.35, -turbine_half_height(-0.35)),
                (-0.35, turbine_half_height(-0.35)),
                (0.30, turbine_half_height(0.30)),
                (0.30, -turbine_half_height(0.30)),
            ],
            true,
            Components,
        );
        b.line((-0.5, 0.0), (0.5, 0.0), Centerlines);
        b.rect((0.015, 0.0), 0.87, 0.04, Components);

        for x in TURBINE_STAGES {
            let h = turbine_half_height(x) - 0.03;
            b.line((x, -h), (x, h), Components);
        }
        for x in [-0.40, 0.36] {
            b.rect((x, 0.0), 0.04, 0.08, Components);
        }

        b.nozzle(
            (TURBINE_INLET.0, turbine_half_height(TURBINE_INLET.0)),
            TURBINE_INLET,
            0.06,
            0.035,
        );
        b.nozzle(
            (TURBINE_EXHAUST.0, -turbine_half_height(TURBINE_EXHAUST.0)),
            TURBINE_EXHAUST,
            0.10,
            0.05,
        );

        b.callout(
            (TURBINE_STAGES[1], 0.10),
            (-0.20, 0.55),
            "ROTOR",
            format!("{} stages, impulse-reaction blading", TURBINE_STAGES.len()),
        );
        b.callout(
            (TURBINE_INLET.0, TURBINE_INLET.1),
            (-0.85, 0.40),
            "STEAM IN",
            context.text_or(ParameterKey::Pressure, "HP steam"),
        );
        b.callout(
            (TURBINE_EXHAUST.0 + 0.05, TURBINE_EXHAUST.1),
            (0.45, -0.50),
            "EXHAUST",
            context.text_or(ParameterKey::Temperature, "To condenser"),
        );
        Ok(b.build())
    }
}

pub struct MotorSymbol;

const MOTOR_TERMINAL: Xy = (-0.05, 0.30);
const MOTOR_SHAFT_END: Xy = (0.40, 0.0);

impl SymbolGenerator for MotorSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Motor
    }

    fn ports(&self) -> Ports {
        Ports::new(MOTOR_TERMINAL, MOTOR_SHAFT_END)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let mut b = SymbolBuilder::new();
        b.rect((-0.025, 0.0), 0.45, 0.40, Components);
        b.line((-0.5, 0.0), (0.5, 0.0), Centerlines);

        // 散热筋
        let mut x = -0.22;
        while x < 0.18 {
            b.line((x, -0.20), (x, -0.23), Components);
            x += 0.05;
        }
        b.rect((-0.30, 0.0), 0.10, 0.32, Components);
        b.line((-0.35, -0.16), (-0.25, 0.16), Hidden);
        b.line((-0.35, 0.16), (-0.25, -0.16), Hidden);

        b.rect((0.30, 0.0), 0.20, 0.05, Components);
        b.rect((-0.05, 0.25), 0.14, 0.10, Components);
        for foot in [-0.18, 0.13] {
            b.rect((foot, -0.26), 0.08, 0.06, Components);
        }
        b.text((-0.06, -0.03), "M", TextSize::Label, Components);

        b.callout(
            (0.02, 0.27),
            (0.25, 0.45),
            "TERMINAL BOX",
            context.text_or(ParameterKey::Voltage, "LV supply"),
        );
        b.callout((-0.35, 0.10), (-0.85, 0.35), "FAN", "TEFC, shaft-mounted fan");
        b.callout(
            (0.38, 0.025),
            (0.50, 0.20),
            "SHAFT",
            context.text_or(ParameterKey::Speed, "Drive end"),
        );
        Ok(b.build())
    }
}

pub struct GeneratorSymbol;

const GENERATOR_SHAFT_END: Xy = (-0.45, 0.0);
const GENERATOR_TERMINAL: Xy = (0.0, 0.40);

impl SymbolGenerator for GeneratorSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Generator
    }

    fn ports(&self) -> Ports {
        Ports::new(GENERATOR_SHAFT_END, GENERATOR_TERMINAL)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let mut b = SymbolBuilder::new();
        b.circle((0.0, 0.0), 0.30, Components);
        b.circle((0.0, 0.0), 0.24, Hidden);
        b.text((-0.04, 0.04), "G", TextSize::Label, Components);

        // 交流波形
        let wave: Vec<Xy> = (0..=16)
            .map(|i| {
                let t = i as f64 / 16.0;
                (-0.15 + 0.30 * t, -0.10 + 0.05 * (t * TAU).sin())
            })
            .collect();
        b.polyline(wave, false, Components);

        b.rect((-0.375, 0.0), 0.15, 0.05, Components);
        b.line((-0.5, 0.0), (-0.30, 0.0), Centerlines);
        for x in [-0.08, 0.0, 0.08] {
            let stator_top = (0.30_f64 * 0.30 - x * x).sqrt();
            b.line((x, stator_top), (x, GENERATOR_TERMINAL.1), Components);
            b.circle((x, GENERATOR_TERMINAL.1), 0.015, Components);
        }
        for side in [-1.0, 1.0] {
            b.line((side * 0.15, -0.26), (side * 0.20, -0.34), Components);
        }
        b.line((-0.25, -0.34), (0.25, -0.34), Components);

        let rating = match (
            context.parameters.display(ParameterKey::Voltage),
            context.parameters.display(ParameterKey::Frequency),
        ) {
            (Some(voltage), Some(frequency)) => format!("{voltage}, {frequency}"),
            (Some(voltage), None) => voltage,
            (None, Some(frequency)) => frequency,
            (None, None) => "3-phase synchronous".to_string(),
        };
        b.callout((0.21, 0.21), (0.45, 0.35), "STATOR", rating);
        b.callout((-0.40, 0.025), (-0.85, 0.25), "SHAFT", "Drive input");
        b.callout(
            (0.08, GENERATOR_TERMINAL.1),
            (0.25, 0.55),
            "TERMINALS",
            context.text_or(ParameterKey::Power, "Main terminals"),
        );
        Ok(b.build())
    }
}
