use eqdraw_core::{
    document::{CONTINUOUS, Circle, Document, Entity, Header, Line, Polyline, Solid, Text, Units},
    geometry::{Bounds2D, Point2},
};
use tracing::debug;

#[derive(Debug)]
pub(crate) enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

pub(crate) struct DxfParser<'a> {
    reader: PairReader<'a>,
}

impl<'a> DxfParser<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            reader: PairReader::new(source),
        }
    }

    pub(crate) fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        loop {
            let Some((code, value)) = self.reader.next_pair()? else {
                return Err(DxfError::invalid("文件没有以 EOF 结束"));
            };
            match (code, value.as_str()) {
                (0, "EOF") => return Ok(document),
                (0, "SECTION") => {
                    let (_, name) = self.expect_pair(2, "SECTION 名称")?;
                    match name.as_str() {
                        "HEADER" => self.parse_header(&mut document)?,
                        "TABLES" => self.parse_tables(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        other => {
                            debug!(section = other, "跳过未识别的段");
                            self.skip_section()?;
                        }
                    }
                }
                (code, value) => {
                    return Err(DxfError::invalid(format!(
                        "顶层只允许 SECTION 或 EOF，读到组码 {code} 值 {value:?}"
                    )));
                }
            }
        }
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        while let Some(pair) = self.reader.next_pair()? {
            if pair.0 == 0 && pair.1 == "ENDSEC" {
                return Ok(());
            }
        }
        Err(DxfError::invalid("段没有以 ENDSEC 结束"))
    }

    fn parse_header(&mut self, document: &mut Document) -> Result<(), DxfError> {
        let mut header = Header::default();
        let (mut ext_min, mut ext_max) = (None, None);
        loop {
            let Some((code, value)) = self.reader.next_pair()? else {
                return Err(DxfError::invalid("HEADER 段没有以 ENDSEC 结束"));
            };
            match (code, value.as_str()) {
                (0, "ENDSEC") => break,
                (9, "$INSUNITS") => {
                    let (_, raw) = self.expect_pair(70, "$INSUNITS")?;
                    let code = parse_i16(&raw, "$INSUNITS")?;
                    header.units = Units::from_insunits_code(code)
                        .ok_or_else(|| DxfError::unsupported(format!("单位代码 {code}")))?;
                }
                (9, "$EXTMIN") => ext_min = Some(self.header_point("$EXTMIN")?),
                (9, "$EXTMAX") => ext_max = Some(self.header_point("$EXTMAX")?),
                // 其余头变量的值由下一轮循环略过
                _ => {}
            }
        }
        if let (Some(min), Some(max)) = (ext_min, ext_max) {
            header.extents = Some(Bounds2D::new(min, max));
        }
        document.set_header(header);
        Ok(())
    }

    fn header_point(&mut self, variable: &str) -> Result<Point2, DxfError> {
        let (_, x) = self.expect_pair(10, variable)?;
        let (_, y) = self.expect_pair(20, variable)?;
        let point = Point2::new(parse_f64(&x, variable)?, parse_f64(&y, variable)?);
        if let Some(pair) = self.reader.next_pair()? {
            if pair.0 != 30 {
                self.reader.put_back(pair);
            }
        }
        Ok(point)
    }

    fn expect_pair(&mut self, expected: i32, what: &str) -> Result<(i32, String), DxfError> {
        match self.reader.next_pair()? {
            Some((code, value)) if code == expected => Ok((code, value)),
            Some((code, _)) => Err(DxfError::invalid(format!(
                "{what} 应使用组码 {expected}，读到 {code}"
            ))),
            None => Err(DxfError::invalid(format!("{what} 之后文件意外结束"))),
        }
    }

    fn parse_tables(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let Some((code, value)) = self.reader.next_pair()? else {
                return Err(DxfError::invalid("TABLES 段没有以 ENDSEC 结束"));
            };
            match (code, value.as_str()) {
                (0, "ENDSEC") => return Ok(()),
                (0, "TABLE") => self.parse_table(document)?,
                (0, other) => {
                    return Err(DxfError::invalid(format!(
                        "TABLES 段只允许 TABLE，读到 {other}"
                    )));
                }
                _ => {}
            }
        }
    }

    /// 只读取 LTYPE 与 LAYER 表，其余表的记录整体跳过。
    fn parse_table(&mut self, document: &mut Document) -> Result<(), DxfError> {
        let (_, table) = self.expect_pair(2, "TABLE 名称")?;
        loop {
            let Some((code, value)) = self.reader.next_pair()? else {
                return Err(DxfError::invalid(format!("{table} 表没有以 ENDTAB 结束")));
            };
            if code != 0 {
                // 表头字段（条目数等）
                continue;
            }
            match value.as_str() {
                "ENDTAB" => return Ok(()),
                "LTYPE" if table == "LTYPE" => {
                    let record = self.collect_fields(&value)?;
                    let dashes = record.numbers(49)?;
                    let description = record.single(3)?.unwrap_or_default().to_string();
                    document.declare_linetype(record.name()?, description, dashes);
                }
                "LAYER" if table == "LAYER" => {
                    let record = self.collect_fields(&value)?;
                    let name = record.name()?;
                    let color = match record.single(62)? {
                        Some(raw) => parse_i16(raw, "LAYER 组码 62")?,
                        None => 7,
                    };
                    let linetype = record
                        .single(6)?
                        .map_or_else(|| CONTINUOUS.to_string(), |raw| raw.trim().to_string());
                    document.declare_layer(name.clone(), color.abs(), linetype);
                    // 负颜色号表示图层关闭
                    if color < 0 {
                        document.hide_layer(&name);
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = self
                .reader
                .next_pair()?
                .ok_or_else(|| DxfError::invalid("ENTITIES 段提前结束"))?;
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段中实体须以组码 0 开始，读到 {code}"
                )));
            }
            let build: fn(&EntityFields) -> Result<Entity, DxfError> = match value.as_str() {
                "ENDSEC" => break,
                "LINE" => line_from,
                "CIRCLE" => circle_from,
                "LWPOLYLINE" => polyline_from,
                "TEXT" => text_from,
                "SOLID" => solid_from,
                other => {
                    debug!(kind = other, "跳过不支持的实体");
                    self.skip_entity_body()?;
                    continue;
                }
            };
            let fields = self.collect_fields(&value)?;
            document.add_entity(build(&fields)?);
        }
        Ok(())
    }

    /// 读取一个实体或表记录的全部组码，直到下一个组码 0。
    fn collect_fields(&mut self, kind: &str) -> Result<EntityFields, DxfError> {
        let kind = kind.to_string();
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    return Ok(EntityFields { kind, pairs });
                }
                Some(pair) => pairs.push(pair),
                None => return Err(DxfError::invalid(format!("{kind} 之后文件意外结束"))),
            }
        }
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        while let Some(pair) = self.reader.next_pair()? {
            if pair.0 == 0 {
                self.reader.put_back(pair);
                break;
            }
        }
        Ok(())
    }
}

/// 单个实体或表记录的组码字段，保持文件中的顺序。
struct EntityFields {
    kind: String,
    pairs: Vec<(i32, String)>,
}

impl EntityFields {
    fn layer(&self) -> String {
        self.pairs
            .iter()
            .find(|(code, _)| *code == 8)
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_else(|| "0".to_string())
    }

    /// 某组码至多出现一次；重复视为损坏。
    fn single(&self, code: i32) -> Result<Option<&str>, DxfError> {
        let mut values = self
            .pairs
            .iter()
            .filter(|(c, _)| *c == code)
            .map(|(_, value)| value.as_str());
        let first = values.next();
        if values.next().is_some() {
            return Err(DxfError::invalid(format!(
                "{} 的组码 {code} 出现了不止一次",
                self.kind
            )));
        }
        Ok(first)
    }

    fn name(&self) -> Result<String, DxfError> {
        self.single(2)?
            .map(|raw| raw.trim().to_string())
            .ok_or_else(|| DxfError::invalid(format!("{} 记录缺少名称（组码 2）", self.kind)))
    }

    /// 可重复组码的全部数值，如线型的各段长度。
    fn numbers(&self, code: i32) -> Result<Vec<f64>, DxfError> {
        self.pairs
            .iter()
            .filter(|(c, _)| *c == code)
            .map(|(_, raw)| parse_f64(raw, &format!("{} 组码 {code}", self.kind)))
            .collect()
    }

    fn number(&self, code: i32) -> Result<Option<f64>, DxfError> {
        self.single(code)?
            .map(|raw| parse_f64(raw, &format!("{} 组码 {code}", self.kind)))
            .transpose()
    }

    fn required(&self, code: i32) -> Result<f64, DxfError> {
        self.number(code)?.ok_or_else(|| {
            DxfError::invalid(format!("{} 缺少必需的组码 {code}", self.kind))
        })
    }

    fn point(&self, x_code: i32) -> Result<Point2, DxfError> {
        Ok(Point2::new(self.required(x_code)?, self.required(x_code + 10)?))
    }
}

fn line_from(fields: &EntityFields) -> Result<Entity, DxfError> {
    Ok(Entity::Line(Line {
        start: fields.point(10)?,
        end: fields.point(11)?,
        layer: fields.layer(),
    }))
}

fn circle_from(fields: &EntityFields) -> Result<Entity, DxfError> {
    Ok(Entity::Circle(Circle {
        center: fields.point(10)?,
        radius: fields.required(40)?,
        layer: fields.layer(),
    }))
}

/// 顶点由成对的 10/20 组码给出，按出现顺序配对。
fn polyline_from(fields: &EntityFields) -> Result<Entity, DxfError> {
    if fields.pairs.iter().any(|(code, _)| *code == 42) {
        return Err(DxfError::unsupported("LWPOLYLINE 凸度圆弧段（组码 42）"));
    }
    let flags = fields
        .single(70)?
        .map(|raw| parse_i32(raw, "LWPOLYLINE 组码 70"))
        .transpose()?
        .unwrap_or(0);
    let declared = fields
        .single(90)?
        .map(|raw| parse_i32(raw, "LWPOLYLINE 组码 90"))
        .transpose()?;

    let mut vertices = Vec::new();
    let mut pending: Option<(i32, f64)> = None;
    for (code, raw) in &fields.pairs {
        if !matches!(*code, 10 | 20) {
            continue;
        }
        let value = parse_f64(raw, &format!("LWPOLYLINE 组码 {code}"))?;
        pending = match pending {
            None => Some((*code, value)),
            Some((10, x)) if *code == 20 => {
                vertices.push(Point2::new(x, value));
                None
            }
            Some((20, y)) if *code == 10 => {
                vertices.push(Point2::new(value, y));
                None
            }
            Some((previous, _)) => {
                return Err(DxfError::invalid(format!(
                    "LWPOLYLINE 顶点的组码 {previous} 后缺少配对坐标"
                )));
            }
        };
    }
    if pending.is_some() {
        return Err(DxfError::invalid("LWPOLYLINE 最后一个顶点只有一个坐标"));
    }
    if vertices.is_empty() {
        return Err(DxfError::invalid("LWPOLYLINE 没有顶点"));
    }
    if let Some(count) = declared {
        if usize::try_from(count).ok() != Some(vertices.len()) {
            return Err(DxfError::invalid(format!(
                "LWPOLYLINE 顶点数为 {count}，实际读到 {}",
                vertices.len()
            )));
        }
    }

    Ok(Entity::Polyline(Polyline {
        vertices,
        is_closed: flags & 1 == 1,
        layer: fields.layer(),
    }))
}

fn text_from(fields: &EntityFields) -> Result<Entity, DxfError> {
    let content = fields
        .single(1)?
        .ok_or_else(|| DxfError::invalid("TEXT 缺少必需的组码 1"))?;
    Ok(Entity::Text(Text {
        insert: fields.point(10)?,
        content: content.to_string(),
        height: fields.required(40)?,
        rotation: fields.number(50)?.unwrap_or(0.0).to_radians(),
        layer: fields.layer(),
    }))
}

/// 第四角点缺省时与第三点重合。
fn solid_from(fields: &EntityFields) -> Result<Entity, DxfError> {
    let first = fields.point(10)?;
    let second = fields.point(11)?;
    let third = fields.point(12)?;
    let fourth = match (fields.number(13)?, fields.number(23)?) {
        (Some(x), Some(y)) => Point2::new(x, y),
        _ => third,
    };
    Ok(Entity::Solid(Solid {
        corners: [first, second, third, fourth],
        layer: fields.layer(),
    }))
}

/// 按行读取 (组码, 值) 对，支持回退一对。
struct PairReader<'a> {
    lines: std::str::Lines<'a>,
    pending: Option<(i32, String)>,
    consumed: usize,
}

impl<'a> PairReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            pending: None,
            consumed: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.pending.take() {
            return Ok(Some(pair));
        }
        let Some(code_line) = self.lines.next() else {
            return Ok(None);
        };
        let code_line_number = self.consumed + 1;
        let Some(value_line) = self.lines.next() else {
            return Err(DxfError::invalid(format!(
                "第 {code_line_number} 行的组码没有对应的值行"
            )));
        };
        self.consumed += 2;

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {code_line_number} 行不是整数组码：{:?}",
                code_line.trim()
            ))
        })?;
        Ok(Some((code, value_line.trim_end_matches('\r').to_string())))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.pending.is_none(), "只能回退一对组码");
        self.pending = Some(pair);
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse()
        .map_err(|_| DxfError::invalid(format!("{context} 的值 {raw:?} 不是数字")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse()
        .map_err(|_| DxfError::invalid(format!("{context} 的值 {raw:?} 不是整数")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value).map_err(|_| DxfError::invalid(format!("{context} 的值 {value} 超出范围")))
}
