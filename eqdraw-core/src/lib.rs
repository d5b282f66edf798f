pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，全部坐标均为文档单位（毫米）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn midpoint(self, other: Point2) -> Point2 {
            Self((self.0 + other.0) * 0.5)
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        /// 由极角（弧度）与长度构造向量。
        #[inline]
        pub fn from_angle(angle: f64, length: f64) -> Self {
            Self(DVec2::new(angle.cos(), angle.sin()) * length)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        /// 极角（弧度），零向量返回 0。
        #[inline]
        pub fn angle(self) -> f64 {
            if self.length_squared() <= f64::EPSILON {
                0.0
            } else {
                self.0.y.atan2(self.0.x)
            }
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算文档/实体范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        /// 以中心点与宽高构造边界框。
        #[inline]
        pub fn from_center_size(center: Point2, width: f64, height: f64) -> Self {
            let half = DVec2::new(width * 0.5, height * 0.5);
            Self {
                min: Point2(center.0 - half),
                max: Point2(center.0 + half),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 四周向外扩展 `margin`，空框保持为空。
        pub fn expanded(&self, margin: f64) -> Bounds2D {
            if self.is_empty() {
                return *self;
            }
            let pad = DVec2::splat(margin);
            Bounds2D {
                min: Point2(self.min.0 - pad),
                max: Point2(self.max.0 + pad),
            }
        }

        /// 判断两个边界框是否有正面积的重叠，仅接触边界不算。
        pub fn overlaps(&self, other: &Bounds2D) -> bool {
            if self.is_empty() || other.is_empty() {
                return false;
            }
            self.min.x() < other.max.x()
                && other.min.x() < self.max.x()
                && self.min.y() < other.max.y()
                && other.min.y() < self.max.y()
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod document {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2};

    pub const DEFAULT_LAYER: &str = "0";
    pub const CONTINUOUS: &str = "CONTINUOUS";
    pub const DASHED: &str = "DASHED";
    pub const CENTER: &str = "CENTER";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 文档线性单位，对应 `$INSUNITS` 头变量。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Units {
        Unitless,
        Inches,
        Feet,
        Millimeters,
        Centimeters,
        Meters,
    }

    impl Units {
        pub fn insunits_code(self) -> i16 {
            match self {
                Units::Unitless => 0,
                Units::Inches => 1,
                Units::Feet => 2,
                Units::Millimeters => 4,
                Units::Centimeters => 5,
                Units::Meters => 6,
            }
        }

        pub fn from_insunits_code(code: i16) -> Option<Self> {
            match code {
                0 => Some(Units::Unitless),
                1 => Some(Units::Inches),
                2 => Some(Units::Feet),
                4 => Some(Units::Millimeters),
                5 => Some(Units::Centimeters),
                6 => Some(Units::Meters),
                _ => None,
            }
        }

        /// `$MEASUREMENT`：0 为英制，1 为公制。
        pub fn is_metric(self) -> bool {
            matches!(
                self,
                Units::Millimeters | Units::Centimeters | Units::Meters
            )
        }

        pub fn abbreviation(self) -> &'static str {
            match self {
                Units::Unitless => "",
                Units::Inches => "in",
                Units::Feet => "ft",
                Units::Millimeters => "mm",
                Units::Centimeters => "cm",
                Units::Meters => "m",
            }
        }
    }

    impl Default for Units {
        fn default() -> Self {
            Units::Millimeters
        }
    }

    /// 文档头部状态：单位与范围。
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct Header {
        pub units: Units,
        pub extents: Option<Bounds2D>,
    }

    /// 线型定义。`pattern` 中正数为实线段长度，负数为空白长度。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LineType {
        pub name: String,
        pub description: String,
        pub pattern: Vec<f64>,
    }

    impl LineType {
        pub fn new(
            name: impl Into<String>,
            description: impl Into<String>,
            pattern: Vec<f64>,
        ) -> Self {
            Self {
                name: name.into(),
                description: description.into(),
                pattern,
            }
        }

        #[inline]
        pub fn total_length(&self) -> f64 {
            self.pattern.iter().map(|dash| dash.abs()).sum()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        /// ACI 颜色号（1..=255）。
        pub color: i16,
        pub linetype: String,
        pub is_visible: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>, color: i16, linetype: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color,
                linetype: linetype.into(),
                is_visible: true,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Polyline(Polyline),
        Text(Text),
        Solid(Solid),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Text(text) => &text.layer,
                Entity::Solid(solid) => &solid.layer,
            }
        }

        /// DXF 实体类型名。
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Polyline(_) => "LWPOLYLINE",
                Entity::Text(_) => "TEXT",
                Entity::Solid(_) => "SOLID",
            }
        }

        /// 计算实体的 2D 轴对齐范围，文本退化为插入点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(*vertex);
                    }
                }
                Entity::Text(text) => {
                    bounds.include_point(text.insert);
                }
                Entity::Solid(solid) => {
                    for corner in &solid.corners {
                        bounds.include_point(*corner);
                    }
                }
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub is_closed: bool,
        pub layer: String,
    }

    /// 单行文字，`rotation` 以弧度储存。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
    }

    /// 填充四边形；三角形时第四点与第三点重合。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Solid {
        pub corners: [Point2; 4],
        pub layer: String,
    }

    /// 图纸文档：头变量、线型表、图层表与按插入顺序排列的实体。
    ///
    /// 所有添加实体的接口都显式接收图层名，文档不维护“当前图层”。
    /// 图层需先通过 [`Document::declare_layer`] 声明，写出时会校验。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Document {
        header: Header,
        linetypes: Vec<LineType>,
        layers: Vec<Layer>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    impl Default for Document {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self {
                header: Header::default(),
                linetypes: Vec::new(),
                layers: Vec::new(),
                entities: Vec::new(),
                next_entity_id: 0,
            };
            doc.declare_linetype(CONTINUOUS, "Solid line", Vec::new());
            doc.declare_linetype(DASHED, "Dashed __ __ __ __", vec![12.0, -6.0]);
            doc.declare_linetype(
                CENTER,
                "Center ____ _ ____ _ ____",
                vec![31.75, -6.35, 6.35, -6.35],
            );
            doc.declare_layer(DEFAULT_LAYER, 7, CONTINUOUS);
            doc
        }

        /// 设置单位与范围头变量。
        pub fn initialize(&mut self, units: Units, extents: Bounds2D) {
            self.header.units = units;
            self.header.extents = if extents.is_empty() {
                None
            } else {
                Some(extents)
            };
        }

        #[inline]
        pub fn header(&self) -> &Header {
            &self.header
        }

        pub fn set_header(&mut self, header: Header) {
            self.header = header;
        }

        /// 声明线型；同名线型会被覆盖。
        pub fn declare_linetype(
            &mut self,
            name: impl Into<String>,
            description: impl Into<String>,
            pattern: Vec<f64>,
        ) {
            let linetype = LineType::new(name, description, pattern);
            match self
                .linetypes
                .iter_mut()
                .find(|existing| existing.name.eq_ignore_ascii_case(&linetype.name))
            {
                Some(existing) => *existing = linetype,
                None => self.linetypes.push(linetype),
            }
        }

        /// 声明图层；同名图层会更新颜色与线型，保留原有顺序。
        pub fn declare_layer(
            &mut self,
            name: impl Into<String>,
            color: i16,
            linetype: impl Into<String>,
        ) {
            let layer = Layer::new(name, color, linetype);
            match self
                .layers
                .iter_mut()
                .find(|existing| existing.name.eq_ignore_ascii_case(&layer.name))
            {
                Some(existing) => *existing = layer,
                None => self.layers.push(layer),
            }
        }

        /// 关闭图层显示，返回图层是否存在。
        pub fn hide_layer(&mut self, name: &str) -> bool {
            match self
                .layers
                .iter_mut()
                .find(|layer| layer.name.eq_ignore_ascii_case(name))
            {
                Some(layer) => {
                    layer.is_visible = false;
                    true
                }
                None => false,
            }
        }

        #[inline]
        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers
                .iter()
                .find(|layer| layer.name.eq_ignore_ascii_case(name))
        }

        #[inline]
        pub fn linetype(&self, name: &str) -> Option<&LineType> {
            self.linetypes
                .iter()
                .find(|linetype| linetype.name.eq_ignore_ascii_case(name))
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Line(Line { start, end, layer }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Circle(Circle {
                center,
                radius,
                layer,
            }))
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            let layer = layer.into();
            let vertices: Vec<Point2> = vertices.into_iter().collect();
            self.push(Entity::Polyline(Polyline {
                vertices,
                is_closed,
                layer,
            }))
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            rotation: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Text(Text {
                insert,
                content: content.into(),
                height,
                rotation,
                layer,
            }))
        }

        /// 添加填充三角形（SOLID 第四点重复第三点）。
        pub fn add_solid(
            &mut self,
            first: Point2,
            second: Point2,
            third: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Solid(Solid {
                corners: [first, second, third, third],
                layer,
            }))
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.push(entity)
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.iter()
        }

        #[inline]
        pub fn linetypes(&self) -> impl Iterator<Item = &LineType> {
            self.linetypes.iter()
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities.iter().find_map(|(entity_id, entity)| {
                if *entity_id == id {
                    Some(entity)
                } else {
                    None
                }
            })
        }

        #[inline]
        pub fn entity_bounds(&self, id: EntityId) -> Option<Bounds2D> {
            self.entity(id).and_then(Entity::bounds)
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for (_, entity) in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }

        fn push(&mut self, entity: Entity) -> EntityId {
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::geometry::{Bounds2D, Point2};
        use std::f64::consts::FRAC_PI_2;

        #[test]
        fn document_stores_entities_in_insertion_order() {
            let mut doc = Document::new();
            doc.declare_layer("GEOM", 3, CONTINUOUS);
            doc.declare_layer("ANNOT", 2, CONTINUOUS);
            let id = doc.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "GEOM");
            let circle_id = doc.add_circle(Point2::new(5.0, 5.0), 2.0, "ANNOT");
            let polyline_id = doc.add_polyline(
                [
                    Point2::new(0.0, 0.0),
                    Point2::new(2.0, 2.0),
                    Point2::new(4.0, 0.0),
                ],
                true,
                "GEOM",
            );
            let text_id = doc.add_text(Point2::new(1.0, 1.0), "Hello", 2.5, FRAC_PI_2, "ANNOT");
            let solid_id = doc.add_solid(
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
                "ANNOT",
            );

            assert_eq!(id.get(), 0);
            assert_eq!(circle_id.get(), 1);
            assert_eq!(polyline_id.get(), 2);
            assert_eq!(text_id.get(), 3);
            assert_eq!(solid_id.get(), 4);
            assert_eq!(doc.entity_count(), 5);

            let kinds: Vec<_> = doc.entities().map(|(_, e)| e.kind_name()).collect();
            assert_eq!(kinds, ["LINE", "CIRCLE", "LWPOLYLINE", "TEXT", "SOLID"]);

            match doc.entity(polyline_id) {
                Some(Entity::Polyline(polyline)) => {
                    assert!(polyline.is_closed);
                    assert_eq!(polyline.vertices.len(), 3);
                    assert_eq!(polyline.layer, "GEOM");
                }
                other => panic!("unexpected entity lookup result: {other:?}"),
            }

            match doc.entity(solid_id) {
                Some(Entity::Solid(solid)) => {
                    assert_eq!(solid.corners[2], solid.corners[3]);
                }
                _ => panic!("expected solid entity"),
            }
        }

        #[test]
        fn new_document_declares_default_tables() {
            let doc = Document::new();
            let linetypes: Vec<_> = doc.linetypes().map(|l| l.name.as_str()).collect();
            assert_eq!(linetypes, [CONTINUOUS, DASHED, CENTER]);
            assert!(doc.layer(DEFAULT_LAYER).is_some());
            assert!(doc.linetype("dashed").is_some());
            let center = doc.linetype(CENTER).expect("CENTER linetype");
            assert!((center.total_length() - 50.8).abs() < 1e-9);
        }

        #[test]
        fn declare_layer_updates_without_reordering() {
            let mut doc = Document::new();
            doc.declare_layer("PIPING", 5, CONTINUOUS);
            doc.declare_layer("SIGNAL", 6, DASHED);
            doc.declare_layer("piping", 4, CENTER);

            let names: Vec<_> = doc.layers().map(|l| l.name.as_str()).collect();
            assert_eq!(names, ["0", "piping", "SIGNAL"]);
            let piping = doc.layer("PIPING").expect("layer");
            assert_eq!(piping.color, 4);
            assert_eq!(piping.linetype, CENTER);
        }

        #[test]
        fn initialize_sets_units_and_extents() {
            let mut doc = Document::new();
            let extents = Bounds2D::new(Point2::new(-10.0, -20.0), Point2::new(300.0, 200.0));
            doc.initialize(Units::Millimeters, extents);
            assert_eq!(doc.header().units.insunits_code(), 4);
            assert_eq!(doc.header().extents, Some(extents));

            doc.initialize(Units::Meters, Bounds2D::empty());
            assert!(doc.header().extents.is_none());
        }

        #[test]
        fn document_bounds_cover_all_entities() {
            let mut doc = Document::new();
            doc.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 5.0), "0");
            doc.add_circle(Point2::new(20.0, 20.0), 5.0, "0");
            doc.add_text(Point2::new(-3.0, 2.0), "label", 2.5, 0.0, "0");

            let bounds = doc.bounds().expect("bounds");
            assert_eq!(bounds.min(), Point2::new(-3.0, 0.0));
            assert_eq!(bounds.max(), Point2::new(25.0, 25.0));
        }
    }
}
