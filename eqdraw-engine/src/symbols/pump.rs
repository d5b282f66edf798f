//! 卧式端吸离心泵剖面：蜗壳、叶轮、阶梯轴、机械密封、轴承箱、联轴器与底座。

use crate::layers::StandardLayer::{Centerlines, Components, Hidden};
use crate::parameters::{ParameterKey, format_number};
use crate::spec::EquipmentKind;

use super::{
    Ports, Primitive, SymbolBuilder, SymbolContext, SymbolError, SymbolGenerator, Xy, polar,
    ring_angles,
};

/// 叶轮中心。
const IMPELLER: Xy = (-0.18, 0.02);
const CASING_HALF: f64 = 0.22;
const CASING_CHAMFER: f64 = 0.06;
/// 内壁相对外壳的偏移：外壳宽度的 8%。
const WALL: f64 = 0.08 * 2.0 * CASING_HALF;
const HUB_RADIUS: f64 = 0.035;
const BLADE_TIP: f64 = 0.10;
const VOLUTE_START: f64 = 0.11;
const VOLUTE_END: f64 = 0.165;
const DEFAULT_BLADES: usize = 6;

const SUCTION_END: Xy = (-0.46, IMPELLER.1);
const DISCHARGE_X: f64 = IMPELLER.0 + VOLUTE_END;
const DISCHARGE_END: Xy = (DISCHARGE_X, 0.40);

pub struct PumpSymbol;

impl SymbolGenerator for PumpSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Pump
    }

    fn ports(&self) -> Ports {
        Ports::new(SUCTION_END, DISCHARGE_END)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let (cx, cy) = IMPELLER;
        let mut b = SymbolBuilder::new();

        // 外壳与内壁
        b.polyline(octagon(IMPELLER, CASING_HALF, CASING_CHAMFER), true, Components);
        b.polyline(
            octagon(IMPELLER, CASING_HALF - WALL, CASING_CHAMFER * 0.6),
            true,
            Components,
        );
        let strip = 0.30;
        b.hatch_rect((cx - CASING_HALF + WALL * 0.5, cy), WALL, strip, 0.012);
        b.hatch_rect((cx + CASING_HALF - WALL * 0.5, cy), WALL, strip, 0.012);
        b.hatch_rect((cx, cy - CASING_HALF + WALL * 0.5), strip, WALL, 0.012);

        // 蜗壳流道：一圈半径渐增的螺线，在右侧切向引出至出口
        let segments = 24;
        let mut volute: Vec<Xy> = (0..=segments)
            .map(|i| {
                let t = i as f64 / segments as f64;
                let angle = t * std::f64::consts::TAU;
                let radius = VOLUTE_START + (VOLUTE_END - VOLUTE_START) * t;
                (cx + radius * angle.cos(), cy + radius * angle.sin())
            })
            .collect();
        volute.push((DISCHARGE_X, cy + CASING_HALF));
        b.polyline(volute, false, Components);

        // 叶轮
        let blades = context
            .parameters
            .count(ParameterKey::BladeCount)
            .unwrap_or(DEFAULT_BLADES)
            .clamp(2, 16);
        b.circle(IMPELLER, HUB_RADIUS, Components);
        b.circle(IMPELLER, BLADE_TIP, Hidden);
        for angle in ring_angles(blades, 0.0) {
            let blade = [(HUB_RADIUS, 0.0), (0.07, 0.25), (BLADE_TIP, 0.55)]
                .map(|(radius, sweep)| polar(IMPELLER, radius, angle + sweep));
            b.polyline(blade, false, Components);
        }

        // 吸入与排出接管
        b.nozzle((cx - CASING_HALF, cy), SUCTION_END, 0.10, 0.055);
        b.nozzle((DISCHARGE_X, cy + CASING_HALF), DISCHARGE_END, 0.08, 0.045);

        // 阶梯轴
        b.rect((0.09, cy), 0.10, 0.05, Components);
        b.rect((0.26, cy), 0.24, 0.036, Components);
        b.rect((0.44, cy), 0.04, 0.036, Components);
        b.line((-0.50, cy), (0.50, cy), Centerlines);

        // 机械密封：压盖与弹簧环
        let seal = (0.09, cy);
        b.rect(seal, 0.09, 0.14, Components);
        for angle in ring_angles(6, 0.0) {
            b.circle(polar(seal, 0.035, angle), 0.007, Components);
        }

        // 轴承箱
        for bearing in [(0.20, cy), (0.32, cy)] {
            b.rect(bearing, 0.06, 0.11, Components);
            b.hatch_rect(bearing, 0.06, 0.11, 0.015);
        }

        // 联轴器与护罩
        b.rect((0.40, cy), 0.04, 0.08, Components);
        b.polyline(
            [
                (0.365, cy - 0.07),
                (0.365, cy + 0.07),
                (0.435, cy + 0.07),
                (0.435, cy - 0.07),
            ],
            false,
            Hidden,
        );

        // 底座、支座与地脚螺栓
        b.rect((0.0, -0.33), 0.96, 0.05, Components);
        b.rect((cx, -0.2525), 0.20, 0.105, Components);
        b.rect((0.26, -0.17), 0.20, 0.27, Components);
        for x in [-0.42, -0.12, 0.12, 0.42] {
            b.circle((x, -0.33), 0.012, Components);
        }

        self.callouts(context, blades, &mut b);
        Ok(b.build())
    }
}

impl PumpSymbol {
    fn callouts(&self, context: &SymbolContext<'_>, blades: usize, b: &mut SymbolBuilder) {
        let (cx, cy) = IMPELLER;
        let scale = context.component.size.scale_factor();
        let impeller_diameter = context
            .parameters
            .display(ParameterKey::ImpellerDiameter)
            .unwrap_or_else(|| format!("{} mm", format_number(2.0 * BLADE_TIP * scale)));

        b.callout(
            (cx - CASING_HALF + 0.01, 0.10),
            (-0.95, 0.45),
            "CASING",
            format!("{}, volute type", context.text_or(ParameterKey::Material, "Cast iron")),
        );
        b.callout(
            (cx + 0.07, cy + 0.05),
            (-0.95, 0.30),
            "IMPELLER",
            format!("Closed, {blades} blades, dia {impeller_diameter}"),
        );
        b.callout(
            (SUCTION_END.0, cy - 0.055),
            (-0.95, -0.15),
            "SUCTION",
            context
                .parameters
                .display(ParameterKey::FlowRate)
                .map_or_else(|| "End suction".to_string(), |flow| format!("Rated flow {flow}")),
        );
        b.callout(
            (DISCHARGE_END.0 + 0.045, DISCHARGE_END.1),
            (0.10, 0.62),
            "DISCHARGE",
            context
                .parameters
                .display(ParameterKey::Head)
                .map_or_else(|| "Top centerline".to_string(), |head| format!("Rated head {head}")),
        );
        b.callout(
            (0.09, cy + 0.07),
            (0.25, 0.50),
            "SEAL",
            context.text_or(ParameterKey::SealType, "Single mechanical seal"),
        );
        b.callout(
            (0.32, cy + 0.055),
            (0.55, 0.35),
            "BEARINGS",
            context.text_or(ParameterKey::BearingType, "Ball bearings, oil bath"),
        );
        b.callout(
            (0.26, cy + 0.018),
            (0.55, 0.20),
            "SHAFT",
            context
                .parameters
                .display(ParameterKey::Speed)
                .map_or_else(|| "Stepped shaft".to_string(), |speed| format!("Stepped shaft, {speed}")),
        );
        b.callout(
            (0.435, cy + 0.03),
            (0.55, 0.05),
            "COUPLING",
            context.text_or(ParameterKey::CouplingType, "Flexible spacer coupling"),
        );
        b.callout(
            (0.46, -0.305),
            (0.55, -0.45),
            "BASEPLATE",
            "Fabricated steel, 4 anchor bolts",
        );
    }
}

/// 切角矩形（正方形外框，四角按 `chamfer` 切去）。
fn octagon(center: Xy, half: f64, chamfer: f64) -> Vec<Xy> {
    let (cx, cy) = center;
    let inner = half - chamfer;
    vec![
        (cx - inner, cy - half),
        (cx + inner, cy - half),
        (cx + half, cy - inner),
        (cx + half, cy + inner),
        (cx + inner, cy + half),
        (cx - inner, cy + half),
        (cx - half, cy + inner),
        (cx - half, cy - inner),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::layers::StandardLayer;
    use crate::parameters::{ComponentParameters, ParameterValue};
    use crate::spec::{Component, Position, Size};

    fn generate(parameters: &[(&str, ParameterValue)]) -> Vec<Primitive> {
        let raw: BTreeMap<String, ParameterValue> = parameters
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let parameters = ComponentParameters::from_raw(&EquipmentKind::Pump, &raw).expect("valid");
        let component = Component::new(
            "P-101",
            EquipmentKind::Pump,
            Position::new(0.0, 0.0),
            Size::new(280.0, 200.0),
        );
        PumpSymbol
            .generate(&SymbolContext::new(&component, &parameters))
            .expect("pump generates")
    }

    fn callout_labels(primitives: &[Primitive]) -> Vec<String> {
        primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Callout { label, .. } => label.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn pump_has_closed_casing_hatching_and_centerline() {
        let primitives = generate(&[]);
        assert!(primitives.iter().any(|p| matches!(
            p,
            Primitive::Polyline { closed: true, layer: StandardLayer::Components, .. }
        )));
        assert!(primitives.iter().any(|p| matches!(
            p,
            Primitive::Line { layer: StandardLayer::Hatching, .. }
        )));
        assert!(primitives.iter().any(|p| matches!(
            p,
            Primitive::Line { layer: StandardLayer::Centerlines, .. }
        )));
    }

    #[test]
    fn pump_callouts_name_each_major_feature() {
        let labels = callout_labels(&generate(&[]));
        for expected in [
            "CASING",
            "IMPELLER",
            "SUCTION",
            "DISCHARGE",
            "SEAL",
            "BEARINGS",
            "SHAFT",
            "COUPLING",
            "BASEPLATE",
        ] {
            assert!(labels.iter().any(|l| l == expected), "missing {expected}");
        }
    }

    #[test]
    fn blade_count_drives_blade_polylines() {
        let blade_polylines = |primitives: &[Primitive]| {
            primitives
                .iter()
                .filter(|p| matches!(p, Primitive::Polyline { points, closed: false, .. } if points.len() == 3))
                .count()
        };
        assert_eq!(blade_polylines(&generate(&[])), DEFAULT_BLADES);
        assert_eq!(blade_polylines(&generate(&[("bladeCount", 9u32.into())])), 9);
    }

    #[test]
    fn parameters_flow_into_callout_text() {
        let primitives = generate(&[
            ("material", "Duplex SS".into()),
            ("head", 45.0.into()),
        ]);
        let texts: Vec<_> = primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Callout { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(texts.contains(&"Duplex SS, volute type"));
        assert!(texts.contains(&"Rated head 45 m"));
        assert!(texts.iter().any(|t| t.starts_with("Closed, 6 blades, dia 56 mm")));
    }
}
