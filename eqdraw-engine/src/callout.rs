//! 引线标注：目标点 → 折点 → 文字位置两段引线，目标端带实心箭头。

use std::f64::consts::PI;

use eqdraw_config::DrawingConfig;
use eqdraw_core::document::Document;
use eqdraw_core::geometry::{Bounds2D, Point2, Vector2};
use tracing::trace;

use crate::layers::StandardLayer;

/// 箭头两侧相对引线方向的半角（30°）。
const ARROW_HALF_ANGLE: f64 = PI / 6.0;
const LINE_SPACING: f64 = 1.5;
/// 估算文字宽度时每个字符占用的文字高度倍数。
pub const CHAR_WIDTH: f64 = 0.8;
const MAX_NUDGES: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct Callout {
    pub target: Point2,
    pub text_position: Point2,
    pub label: Option<String>,
    pub text: String,
}

impl Callout {
    pub fn new(target: Point2, text_position: Point2, text: impl Into<String>) -> Self {
        Self {
            target,
            text_position,
            label: None,
            text: text.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// 按换行拆分文字；标签作为首行前缀，其余控制字符替换为空格。
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .text
            .split('\n')
            .map(|line| sanitize(line.trim_end_matches('\r')))
            .collect();
        if let Some(label) = self.label.as_deref().map(sanitize) {
            if !label.trim().is_empty() {
                match lines.first_mut() {
                    Some(first) if !first.is_empty() => *first = format!("{label}: {first}"),
                    Some(first) => *first = label,
                    None => lines.push(label),
                }
            }
        }
        lines
    }
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}

/// 一次标注的落位结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedCallout {
    pub text_position: Point2,
    pub elbow: Point2,
    pub text_box: Bounds2D,
    /// 为避让已有标注而向下移动的行数。
    pub nudges: usize,
}

/// 标注引擎，记录已占用的文字区域以便后续标注避让。
#[derive(Debug, Clone)]
pub struct CalloutEngine {
    text_height: f64,
    arrow_size: f64,
    avoid_overlap: bool,
    occupied: Vec<Bounds2D>,
}

impl CalloutEngine {
    pub fn new(config: &DrawingConfig) -> Self {
        Self {
            text_height: config.callout_text_height,
            arrow_size: config.arrow_size,
            avoid_overlap: config.avoid_callout_overlap,
            occupied: Vec::new(),
        }
    }

    #[inline]
    pub fn placed_count(&self) -> usize {
        self.occupied.len()
    }

    pub fn draw(&mut self, document: &mut Document, callout: &Callout) -> PlacedCallout {
        let lines = callout.lines();
        let spacing = self.line_spacing();
        let mut text_position = callout.text_position;
        let mut text_box = self.text_box(text_position, &lines);
        let mut nudges = 0;
        if self.avoid_overlap {
            while nudges < MAX_NUDGES
                && self.occupied.iter().any(|taken| taken.overlaps(&text_box))
            {
                text_position = Point2::new(text_position.x(), text_position.y() - spacing);
                text_box = self.text_box(text_position, &lines);
                nudges += 1;
            }
            if nudges > 0 {
                trace!(nudges, "标注文字下移以避让");
            }
        }
        self.occupied.push(text_box);

        let layer = StandardLayer::Callouts.name();
        let elbow = callout.target.midpoint(text_position);
        document.add_line(callout.target, elbow, layer);
        document.add_line(elbow, text_position, layer);
        let [tip, left, right] = arrowhead(callout.target, elbow, self.arrow_size);
        document.add_solid(tip, left, right, layer);

        let insert = self.text_insert(text_position);
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let at = Point2::new(insert.x(), insert.y() - index as f64 * spacing);
            document.add_text(at, line.as_str(), self.text_height, 0.0, layer);
        }

        PlacedCallout {
            text_position,
            elbow,
            text_box,
            nudges,
        }
    }

    #[inline]
    fn line_spacing(&self) -> f64 {
        self.text_height * LINE_SPACING
    }

    fn text_insert(&self, text_position: Point2) -> Point2 {
        let offset = self.text_height * 0.5;
        text_position.translate(Vector2::new(offset, offset))
    }

    fn text_box(&self, text_position: Point2, lines: &[String]) -> Bounds2D {
        let insert = self.text_insert(text_position);
        let widest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        let width = widest as f64 * self.text_height * CHAR_WIDTH;
        let rows = lines.len().max(1) as f64;
        let bottom = insert.y() - (rows - 1.0) * self.line_spacing() - self.text_height * 0.3;
        Bounds2D::new(
            Point2::new(insert.x(), bottom),
            Point2::new(insert.x() + width, insert.y() + self.text_height),
        )
    }
}

/// 以 `tip` 为尖端、沿 `from → tip` 方向的三角箭头顶点。
/// `from` 与 `tip` 重合时按 0° 方向处理。
pub fn arrowhead(tip: Point2, from: Point2, size: f64) -> [Point2; 3] {
    let back = from.vector_to(tip).angle() + PI;
    let left = tip.translate(Vector2::from_angle(back + ARROW_HALF_ANGLE, size));
    let right = tip.translate(Vector2::from_angle(back - ARROW_HALF_ANGLE, size));
    [tip, left, right]
}

#[cfg(test)]
mod tests {
    use super::*;
    use eqdraw_core::document::Entity;

    use crate::layers::declare_standard_layers;

    fn document() -> Document {
        let mut document = Document::new();
        declare_standard_layers(&mut document);
        document
    }

    #[test]
    fn callout_emits_two_leader_segments_arrow_and_text() {
        let mut document = document();
        let mut engine = CalloutEngine::new(&DrawingConfig::default());
        let callout = Callout::new(Point2::new(0.0, 0.0), Point2::new(40.0, 30.0), "SS316 casing")
            .with_label("CASING");
        let placed = engine.draw(&mut document, &callout);

        assert_eq!(placed.nudges, 0);
        assert_eq!(placed.elbow, Point2::new(20.0, 15.0));
        let kinds: Vec<_> = document.entities().map(|(_, e)| e.kind_name()).collect();
        assert_eq!(kinds, ["LINE", "LINE", "SOLID", "TEXT"]);
        for (_, entity) in document.entities() {
            assert_eq!(entity.layer_name(), "CALLOUTS");
        }

        match document.entities().next() {
            Some((_, Entity::Line(first))) => {
                assert_eq!(first.start, Point2::new(0.0, 0.0));
                assert_eq!(first.end, placed.elbow);
            }
            other => panic!("expected a leader line, got {other:?}"),
        }

        let text = document
            .entities()
            .find_map(|(_, e)| match e {
                Entity::Text(text) => Some(text.clone()),
                _ => None,
            })
            .expect("text");
        assert_eq!(text.content, "CASING: SS316 casing");
        assert_eq!(text.insert, Point2::new(41.5, 31.5));
    }

    #[test]
    fn arrowhead_points_at_target() {
        let [tip, left, right] = arrowhead(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 4.0);
        assert_eq!(tip, Point2::new(0.0, 0.0));
        // 从右侧引入，箭头两翼位于尖端右方
        assert!(left.x() > 0.0 && right.x() > 0.0);
        assert!((left.distance(tip) - 4.0).abs() < 1e-9);
        assert!((left.y() + right.y()).abs() < 1e-9);

        let [_, left, right] = arrowhead(Point2::new(5.0, 5.0), Point2::new(5.0, 5.0), 4.0);
        assert!(left.is_finite() && right.is_finite());
    }

    #[test]
    fn multi_line_text_becomes_stacked_text_entities() {
        let mut document = document();
        let mut engine = CalloutEngine::new(&DrawingConfig::default());
        let callout = Callout::new(Point2::new(0.0, 0.0), Point2::new(50.0, 50.0), "line one\r\nline\ttwo\n\nline four");
        engine.draw(&mut document, &callout);

        let texts: Vec<_> = document
            .entities()
            .filter_map(|(_, e)| match e {
                Entity::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect();
        let contents: Vec<_> = texts.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["line one", "line two", "line four"]);
        assert!(texts[0].insert.y() > texts[1].insert.y());
        assert!((texts[1].insert.y() - texts[2].insert.y() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn overlapping_callouts_are_nudged_down() {
        let mut document = document();
        let mut engine = CalloutEngine::new(&DrawingConfig::default());
        let first = engine.draw(
            &mut document,
            &Callout::new(Point2::new(0.0, 0.0), Point2::new(60.0, 40.0), "Mechanical seal"),
        );
        let second = engine.draw(
            &mut document,
            &Callout::new(Point2::new(5.0, 0.0), Point2::new(62.0, 41.0), "Bearing housing"),
        );
        assert!(second.nudges > 0);
        assert!(!first.text_box.overlaps(&second.text_box));
        assert!(second.text_position.y() < 41.0);
        assert_eq!(second.text_position.x(), 62.0);
        assert_eq!(engine.placed_count(), 2);
    }

    #[test]
    fn overlap_avoidance_can_be_disabled() {
        let config = DrawingConfig {
            avoid_callout_overlap: false,
            ..DrawingConfig::default()
        };
        let mut document = document();
        let mut engine = CalloutEngine::new(&config);
        let callout = Callout::new(Point2::new(0.0, 0.0), Point2::new(60.0, 40.0), "Seal");
        engine.draw(&mut document, &callout);
        let second = engine.draw(&mut document, &callout);
        assert_eq!(second.nudges, 0);
        assert_eq!(second.text_position, Point2::new(60.0, 40.0));
    }
}
