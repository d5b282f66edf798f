//! 气动控制阀：阀体、阀盖、执行机构、阀杆、阀芯阀座与法兰接管。

use crate::layers::StandardLayer::{Components, Signal};
use crate::parameters::ParameterKey;
use crate::spec::EquipmentKind;

use super::{Ports, Primitive, SymbolBuilder, SymbolContext, SymbolError, SymbolGenerator};

const BODY: (f64, f64) = (0.0, -0.10);
const BODY_HALF_WIDTH: f64 = 0.18;
const BODY_HALF_HEIGHT: f64 = 0.11;
const INLET: (f64, f64) = (-0.32, BODY.1);
const OUTLET: (f64, f64) = (0.32, BODY.1);

pub struct ValveSymbol;

impl SymbolGenerator for ValveSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Valve
    }

    fn ports(&self) -> Ports {
        Ports::new(INLET, OUTLET)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let (bx, by) = BODY;
        let top = by + BODY_HALF_HEIGHT;
        let bottom = by - BODY_HALF_HEIGHT;
        let mut b = SymbolBuilder::new();

        b.rect(BODY, 2.0 * BODY_HALF_WIDTH, 2.0 * BODY_HALF_HEIGHT, Components);
        b.rect((bx, top + 0.06), 0.16, 0.12, Components);
        b.rect((bx, 0.24), 0.30, 0.10, Components);
        for x in [-0.05, 0.05] {
            b.line((x, top + 0.12), (x, 0.19), Components);
        }
        b.line((bx, 0.19), (bx, by + 0.02), Components);

        // 阀芯与阀座
        b.rect((bx, by), 0.10, 0.04, Components);
        b.circle((bx, by - 0.05), 0.025, Components);

        b.nozzle((-BODY_HALF_WIDTH, by), INLET, 0.10, 0.05);
        b.nozzle((BODY_HALF_WIDTH, by), OUTLET, 0.10, 0.05);

        // 阀体法兰螺栓
        for x in [-0.14, -0.07, 0.07, 0.14] {
            b.circle((x, top), 0.008, Components);
            b.circle((x, bottom), 0.008, Components);
        }

        // 控制信号接口
        b.line((0.15, 0.24), (0.26, 0.24), Signal);
        b.circle((0.285, 0.24), 0.025, Components);

        b.callout(
            (0.15, 0.27),
            (0.40, 0.45),
            "ACTUATOR",
            context.text_or(ParameterKey::Actuator, "Pneumatic diaphragm"),
        );
        b.callout(
            (-0.12, by),
            (-0.70, 0.20),
            "BODY",
            context.text_or(ParameterKey::ValveType, "Globe"),
        );
        if let Some(fail) = context.parameters.display(ParameterKey::FailPosition) {
            b.callout((0.285, 0.265), (0.40, 0.30), "FAIL", fail);
        }
        Ok(b.build())
    }
}
