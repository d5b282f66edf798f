//! 容器类设备：常压储罐、立式压力容器、卧式分离器、夹套搅拌反应器。

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::layers::StandardLayer::{Centerlines, Components, Hidden};
use crate::parameters::ParameterKey;
use crate::spec::EquipmentKind;

use super::{
    Ports, Primitive, SymbolBuilder, SymbolContext, SymbolError, SymbolGenerator, Xy, arc_points,
};

/// 立式椭圆封头容器外轮廓：右侧直边 + 上封头 + 左侧直边 + 下封头。
fn vertical_vessel_outline(half_width: f64, tangent: f64, head_depth: f64) -> Vec<Xy> {
    let radii = (half_width, head_depth);
    let mut outline = arc_points((0.0, tangent), radii, (0.0, PI), 12);
    outline.extend(arc_points((0.0, -tangent), radii, (PI, TAU), 12));
    outline
}

pub struct TankSymbol;

const TANK_INLET: Xy = (0.15, 0.48);
const TANK_OUTLET: Xy = (0.40, -0.32);

impl SymbolGenerator for TankSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Tank
    }

    fn ports(&self) -> Ports {
        Ports::new(TANK_INLET, TANK_OUTLET)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let (wall, top, bottom) = (0.30, 0.36, -0.40);
        let mut b = SymbolBuilder::new();

        b.rect((0.0, (top + bottom) * 0.5), 2.0 * wall, top - bottom, Components);
        b.polyline([(-wall, top), (0.0, 0.44), (wall, top)], false, Components);
        b.line((-wall, 0.16), (wall, 0.16), Hidden);

        // 顶部进料与侧下部出料
        b.nozzle((TANK_INLET.0, 0.40), TANK_INLET, 0.06, 0.03);
        b.nozzle((wall, TANK_OUTLET.1), TANK_OUTLET, 0.06, 0.035);

        b.circle((-0.15, -0.20), 0.06, Components);
        b.circle((-0.15, -0.20), 0.045, Components);
        b.rect((0.0, -0.43), 0.70, 0.06, Components);

        // 直梯
        b.line((-0.34, bottom), (-0.34, top), Components);
        b.line((-0.37, bottom), (-0.37, top), Components);
        let mut y = bottom + 0.06;
        while y < top {
            b.line((-0.37, y), (-0.34, y), Components);
            y += 0.08;
        }

        b.callout((0.12, 0.40), (0.35, 0.55), "ROOF", "Self-supporting cone roof");
        b.callout(
            (wall, 0.0),
            (0.50, 0.10),
            "SHELL",
            context.text_or(ParameterKey::Material, "Carbon steel"),
        );
        b.callout((wall * 0.6, 0.16), (0.50, 0.28), "LEVEL", "Normal liquid level");
        b.callout((-0.15, -0.26), (-0.75, -0.35), "MANHOLE", "DN600 manway");
        Ok(b.build())
    }
}

pub struct PressureVesselSymbol;

const VESSEL_INLET: Xy = (-0.30, 0.15);
const VESSEL_OUTLET: Xy = (0.30, -0.15);

impl SymbolGenerator for PressureVesselSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::PressureVessel
    }

    fn ports(&self) -> Ports {
        Ports::new(VESSEL_INLET, VESSEL_OUTLET)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let (half_width, tangent, head) = (0.20, 0.30, 0.10);
        let mut b = SymbolBuilder::new();

        b.polyline(vertical_vessel_outline(half_width, tangent, head), true, Components);
        for y in [-tangent, tangent] {
            b.line((-half_width, y), (half_width, y), Hidden);
        }
        b.line((0.0, -0.5), (0.0, 0.5), Centerlines);

        // 裙座
        for side in [-1.0, 1.0] {
            b.line((side * 0.16, -0.39), (side * 0.18, -0.48), Components);
        }
        b.line((-0.22, -0.48), (0.22, -0.48), Components);

        b.nozzle((-half_width, VESSEL_INLET.1), VESSEL_INLET, 0.06, 0.035);
        b.nozzle((half_width, VESSEL_OUTLET.1), VESSEL_OUTLET, 0.06, 0.035);
        b.nozzle((0.0, tangent + head), (0.0, 0.46), 0.04, 0.02);

        b.callout(
            (0.10, tangent + 0.087),
            (0.35, 0.55),
            "HEAD",
            "2:1 semi-elliptical",
        );
        b.callout((0.0, 0.46), (-0.70, 0.60), "RELIEF", "PSV connection");
        b.callout(
            (half_width, 0.0),
            (0.45, 0.05),
            "SHELL",
            context.text_or(ParameterKey::DesignCode, "ASME VIII Div. 1"),
        );
        b.callout((0.17, -0.435), (0.45, -0.45), "SKIRT", "Skirt support");
        Ok(b.build())
    }
}

pub struct SeparatorSymbol;

const SEPARATOR_INLET: Xy = (-0.25, 0.24);
const SEPARATOR_GAS_OUTLET: Xy = (0.28, 0.24);

impl SymbolGenerator for SeparatorSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Separator
    }

    fn ports(&self) -> Ports {
        Ports::new(SEPARATOR_INLET, SEPARATOR_GAS_OUTLET)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let (tangent, radius, head) = (0.35, 0.15, 0.08);
        let mut b = SymbolBuilder::new();

        let mut outline = arc_points((tangent, 0.0), (head, radius), (FRAC_PI_2, -FRAC_PI_2), 10);
        outline.extend(arc_points(
            (-tangent, 0.0),
            (head, radius),
            (3.0 * FRAC_PI_2, FRAC_PI_2),
            10,
        ));
        b.polyline(outline, true, Components);
        b.line((-0.5, 0.0), (0.5, 0.0), Centerlines);

        // 堰板、液位、除沫器
        b.line((0.15, -radius), (0.15, -0.02), Components);
        b.line((-tangent - head, -0.05), (0.15, -0.05), Hidden);
        b.rect((0.28, 0.07), 0.06, 0.08, Components);
        b.hatch_rect((0.28, 0.07), 0.06, 0.08, 0.012);

        b.nozzle((SEPARATOR_INLET.0, radius), SEPARATOR_INLET, 0.05, 0.03);
        b.nozzle((SEPARATOR_GAS_OUTLET.0, radius), SEPARATOR_GAS_OUTLET, 0.05, 0.03);
        b.nozzle((0.0, -radius), (0.0, -0.24), 0.05, 0.03);

        for x in [-0.25, 0.25] {
            b.polyline(
                [
                    (x - 0.07, -0.28),
                    (x + 0.07, -0.28),
                    (x + 0.04, -radius),
                    (x - 0.04, -radius),
                ],
                true,
                Components,
            );
        }

        b.callout((0.15, -0.06), (0.45, -0.40), "WEIR", "Overflow weir plate");
        b.callout(
            (0.28, 0.11),
            (0.45, 0.42),
            "DEMISTER",
            "Wire mesh mist eliminator",
        );
        b.callout(
            (-0.20, -0.05),
            (-0.75, -0.35),
            "LEVEL",
            context.text_or(ParameterKey::Volume, "Liquid holdup"),
        );
        Ok(b.build())
    }
}

pub struct ReactorSymbol;

const REACTOR_FEED: Xy = (-0.14, 0.40);
const REACTOR_OUTLET: Xy = (0.0, -0.42);

impl SymbolGenerator for ReactorSymbol {
    fn kind(&self) -> EquipmentKind {
        EquipmentKind::Reactor
    }

    fn ports(&self) -> Ports {
        Ports::new(REACTOR_FEED, REACTOR_OUTLET)
    }

    fn generate(&self, context: &SymbolContext<'_>) -> Result<Vec<Primitive>, SymbolError> {
        let (half_width, tangent, head) = (0.22, 0.22, 0.08);
        let mut b = SymbolBuilder::new();

        b.polyline(vertical_vessel_outline(half_width, tangent, head), true, Components);

        // 夹套包覆下部筒体与下封头
        let mut jacket = vec![(-0.25, 0.12)];
        jacket.extend(arc_points((0.0, -tangent), (0.25, head + 0.03), (PI, TAU), 12));
        jacket.push((0.25, 0.12));
        b.polyline(jacket, false, Hidden);

        // 搅拌器
        b.rect((0.0, 0.40), 0.12, 0.08, Components);
        b.line((0.0, 0.36), (0.0, -0.12), Components);
        b.circle((0.0, -0.12), 0.015, Components);
        b.line((-0.10, -0.09), (-0.015, -0.12), Components);
        b.line((0.015, -0.12), (0.10, -0.15), Components);

        for x in [-0.19, 0.19] {
            b.line((x, -0.15), (x, 0.15), Components);
        }
        for side in [-1.0, 1.0] {
            b.line((side * 0.20, -0.25), (side * 0.24, -0.46), Components);
        }

        let head_y = tangent + head * (1.0 - (REACTOR_FEED.0 / half_width).powi(2)).sqrt();
        b.nozzle((REACTOR_FEED.0, head_y), REACTOR_FEED, 0.05, 0.03);
        b.nozzle((0.0, -tangent - head), REACTOR_OUTLET, 0.05, 0.035);

        b.callout((0.06, 0.40), (0.35, 0.58), "DRIVE", "Agitator gear motor");
        b.callout(
            (0.08, -0.137),
            (0.45, -0.05),
            "AGITATOR",
            "Pitched blade turbine",
        );
        b.callout((0.25, 0.0), (0.45, 0.20), "JACKET", "Heating/cooling jacket");
        if let Some(catalyst) = context.parameters.display(ParameterKey::Catalyst) {
            b.callout((-0.10, 0.05), (-0.75, 0.30), "CATALYST", catalyst);
        }
        Ok(b.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_outline_is_symmetric_and_closed_shape() {
        let outline = vertical_vessel_outline(0.2, 0.3, 0.1);
        let first = outline[0];
        let last = *outline.last().expect("points");
        assert!((first.0 - 0.2).abs() < 1e-12 && (first.1 - 0.3).abs() < 1e-12);
        assert!((last.0 - 0.2).abs() < 1e-9 && (last.1 + 0.3).abs() < 1e-9);
        let top = outline.iter().map(|p| p.1).fold(f64::MIN, f64::max);
        let bottom = outline.iter().map(|p| p.1).fold(f64::MAX, f64::min);
        assert!((top - 0.4).abs() < 1e-9);
        assert!((bottom + 0.4).abs() < 1e-9);
    }
}
