//! 管壳式换热器立面：壳体、管板、换热管、折流板、壳程/管程接管与鞍座。

use crate::layers::StandardLayer::{Centerlines, Components, Hidden};
use crate::parameters::ParameterKey;
use crate::spec::EquipmentKind;

use super::{Ports, Primitive, SymbolBuilder, SymbolContext, SymbolError, SymbolGenerator};

const SHELL_HALF_WIDTH: f64 = 0.40;
const SHELL_HALF_HEIGHT: f64 = 0.18;
const TUBE_SHEET_X: f64 = 0.34;
/// 图面固定绘制的换热管数，实际管数写在说明里。
const DRAWN_TUBES: usize = 6;
const TUBE_INLET: (f64, f64) = (-0.48, 0.08);
const TUBE_OUTLET: (f64, f64) = (0.48, -0.08);

pub struct HeatExchangerSymbol;

impl SymbolGenerator for HeatExchangerSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::HeatExchanger
    }

    fn ports(&self) -> Ports {
        Ports::new(TUBE_INLET, TUBE_OUTLET)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let (hw, hh) = (SHELL_HALF_WIDTH, SHELL_HALF_HEIGHT);
        let mut b = SymbolBuilder::new();

        b.rect((0.0, 0.0), 2.0 * hw, 2.0 * hh, Components);
        b.line((-0.5, 0.0), (0.5, 0.0), Centerlines);
        for x in [-TUBE_SHEET_X, TUBE_SHEET_X] {
            b.line((x, -hh), (x, hh), Components);
        }

        for i in 1..=DRAWN_TUBES {
            let y = -hh + 2.0 * hh * i as f64 / (DRAWN_TUBES + 1) as f64;
            b.line((-TUBE_SHEET_X, y), (TUBE_SHEET_X, y), Hidden);
            b.circle((-TUBE_SHEET_X, y), 0.008, Components);
            b.circle((TUBE_SHEET_X, y), 0.008, Components);
        }

        // 四分点处的弓形折流板，上下交替
        for (k, x) in [-0.2, 0.0, 0.2].into_iter().enumerate() {
            if k % 2 == 0 {
                b.line((x, hh), (x, -hh * 0.5), Components);
            } else {
                b.line((x, -hh), (x, hh * 0.5), Components);
            }
        }

        // 壳程接管在顶/底，管程接管在两端
        b.nozzle((-0.25, hh), (-0.25, 0.28), 0.06, 0.03);
        b.nozzle((0.12, -hh), (0.12, -0.28), 0.06, 0.03);
        b.nozzle((-hw, TUBE_INLET.1), TUBE_INLET, 0.06, 0.035);
        b.nozzle((hw, TUBE_OUTLET.1), TUBE_OUTLET, 0.06, 0.035);

        for x in [-0.30, 0.30] {
            b.rect((x, -hh - 0.03), 0.10, 0.06, Components);
        }

        let tubes = context
            .parameters
            .display(ParameterKey::TubeCount)
            .map_or_else(|| "Straight tube bundle".to_string(), |count| format!("{count} tubes"));
        b.callout((0.0, hh * 0.4), (0.10, 0.42), "BUNDLE", tubes);
        b.callout(
            (-0.25, 0.28),
            (-0.70, 0.40),
            "SHELL IN",
            context.text_or(ParameterKey::Material, "Carbon steel shell"),
        );
        b.callout(
            (TUBE_OUTLET.0, TUBE_OUTLET.1),
            (0.62, -0.30),
            "TUBE OUT",
            context
                .parameters
                .display(ParameterKey::Passes)
                .map_or_else(|| "Single pass".to_string(), |passes| format!("{passes} passes")),
        );
        Ok(b.build())
    }
}
