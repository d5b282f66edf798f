//! 过滤器与仪表。

use crate::layers::StandardLayer::{Components, Hidden, Signal};
use crate::parameters::{ParameterKey, ParameterValue};
use crate::spec::EquipmentKind;

use super::{
    Ports, Primitive, SymbolBuilder, SymbolContext, SymbolError, SymbolGenerator, TextSize, Xy,
};

pub struct FilterSymbol;

const FILTER_INLET: Xy = (-0.30, 0.12);
const FILTER_OUTLET: Xy = (0.30, -0.15);

impl SymbolGenerator for FilterSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Filter
    }

    fn ports(&self) -> Ports {
        Ports::new(FILTER_INLET, FILTER_OUTLET)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let mut b = SymbolBuilder::new();
        b.rect((0.0, -0.02), 0.30, 0.50, Components);
        b.rect((0.0, 0.26), 0.36, 0.06, Components);
        for x in [-0.15, 0.15] {
            b.circle((x, 0.26), 0.01, Components);
        }

        // 滤芯与褶皱
        b.rect((0.0, -0.02), 0.16, 0.38, Hidden);
        let mut pleats: Vec<Xy> = Vec::new();
        let mut y = -0.19;
        let mut left = true;
        while y <= 0.15 + 1e-9 {
            pleats.push((if left { -0.06 } else { 0.06 }, y));
            left = !left;
            y += 0.04;
        }
        b.polyline(pleats, false, Components);

        b.nozzle((-0.15, FILTER_INLET.1), FILTER_INLET, 0.06, 0.035);
        b.nozzle((0.15, FILTER_OUTLET.1), FILTER_OUTLET, 0.06, 0.035);
        b.nozzle((0.0, -0.27), (0.0, -0.36), 0.03, 0.015);

        b.callout(
            (0.06, 0.05),
            (0.40, 0.35),
            "ELEMENT",
            context.text_or(ParameterKey::FilterRating, "Pleated cartridge"),
        );
        b.callout((-0.18, 0.26), (-0.80, 0.45), "COVER", "Bolted quick-opening cover");
        b.callout((0.0, -0.36), (0.40, -0.45), "DRAIN", "Drain connection");
        Ok(b.build())
    }
}

pub struct InstrumentSymbol;

const INSTRUMENT_TAP: Xy = (0.0, -0.40);

impl SymbolGenerator for InstrumentSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Instrument
    }

    fn ports(&self) -> Ports {
        Ports::new(INSTRUMENT_TAP, INSTRUMENT_TAP)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let mut b = SymbolBuilder::new();
        b.circle((0.0, 0.05), 0.25, Components);
        b.line((-0.25, 0.05), (0.25, 0.05), Components);
        b.text(
            (-0.08, 0.10),
            function_letters(context.parameters.get(ParameterKey::MeasuredVariable)),
            TextSize::Label,
            Components,
        );
        b.line((0.0, -0.20), INSTRUMENT_TAP, Signal);

        if let Some(range) = context.parameters.display(ParameterKey::Range) {
            b.callout((0.18, 0.23), (0.40, 0.40), "RANGE", range);
        }
        Ok(b.build())
    }
}

/// ISA 风格功能字母：测量变量首字母 + `T`（变送器）。
fn function_letters(measured: Option<&ParameterValue>) -> String {
    let variable = match measured {
        Some(ParameterValue::Text(text)) => text.trim().to_ascii_lowercase(),
        _ => String::new(),
    };
    let letter = match variable.as_str() {
        "pressure" => 'P',
        "temperature" => 'T',
        "flow" | "flow rate" => 'F',
        "level" => 'L',
        "analysis" | "composition" => 'A',
        "speed" => 'S',
        _ => variable
            .chars()
            .find(char::is_ascii_alphabetic)
            .map_or('X', |ch| ch.to_ascii_uppercase()),
    };
    format!("{letter}T")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_letters_follow_measured_variable() {
        let text = |s: &str| ParameterValue::Text(s.to_string());
        assert_eq!(function_letters(Some(&text("Pressure"))), "PT");
        assert_eq!(function_letters(Some(&text("flow rate"))), "FT");
        assert_eq!(function_letters(Some(&text("vibration"))), "VT");
        assert_eq!(function_letters(None), "XT");
    }
}
