use crate::layers::StandardLayer::{Components, Hidden};

use super::{Primitive, SymbolBuilder, SymbolContext, TextSize};

/// 通用符号：按组件声明尺寸绘制的矩形，内注设备类型。
/// 未注册的类型以及生成失败的符号都回退到这里。
pub fn outline(context: &SymbolContext<'_>) -> Vec<Primitive> {
    let (width, height) = context.unit_size();
    let (hw, hh) = (width * 0.5, height * 0.5);
    let mut b = SymbolBuilder::new();
    b.rect((0.0, 0.0), width, height, Components);
    b.line((-hw, -hh), (hw, hh), Hidden);
    b.line((-hw, hh), (hw, -hh), Hidden);
    b.text(
        (-hw + 0.03, 0.02),
        context.component.kind.as_str().to_uppercase(),
        TextSize::Caption,
        Components,
    );
    b.build()
}
