//! 设备参数：已知键映射为 `ParameterKey`，其余键保留在 `notes` 中原样输出。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spec::EquipmentKind;

/// 参数值：数字、文本或布尔量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl ParameterValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(value) => Some(*value),
            ParameterValue::Text(text) => text.trim().parse().ok(),
            ParameterValue::Flag(_) => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Number(value) => f.write_str(&format_number(*value)),
            ParameterValue::Text(text) => f.write_str(text.trim()),
            ParameterValue::Flag(true) => f.write_str("yes"),
            ParameterValue::Flag(false) => f.write_str("no"),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        ParameterValue::Number(f64::from(value))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Flag(value)
    }
}

/// 数字的紧凑文本形式：整数不带小数，其余最多保留三位小数。
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 参数值的校验类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// 非负物理量；文本形式（如 "150 m3/h"）原样保留。
    Quantity,
    /// 可为负的物理量，如低温或真空。
    Signed,
    /// 正整数。
    Count,
    /// 0 到 100 之间的百分比。
    Percent,
    /// 自由文本。
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ParameterKey {
    Material,
    FlowRate,
    Head,
    Pressure,
    Temperature,
    Power,
    Speed,
    Efficiency,
    Capacity,
    Volume,
    Diameter,
    ImpellerDiameter,
    BladeCount,
    SealType,
    BearingType,
    CouplingType,
    TubeCount,
    Passes,
    Area,
    ValveType,
    Actuator,
    FailPosition,
    Voltage,
    Frequency,
    FilterRating,
    MeasuredVariable,
    Range,
    Catalyst,
    ResidenceTime,
    DesignCode,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 30] = [
        ParameterKey::Material,
        ParameterKey::FlowRate,
        ParameterKey::Head,
        ParameterKey::Pressure,
        ParameterKey::Temperature,
        ParameterKey::Power,
        ParameterKey::Speed,
        ParameterKey::Efficiency,
        ParameterKey::Capacity,
        ParameterKey::Volume,
        ParameterKey::Diameter,
        ParameterKey::ImpellerDiameter,
        ParameterKey::BladeCount,
        ParameterKey::SealType,
        ParameterKey::BearingType,
        ParameterKey::CouplingType,
        ParameterKey::TubeCount,
        ParameterKey::Passes,
        ParameterKey::Area,
        ParameterKey::ValveType,
        ParameterKey::Actuator,
        ParameterKey::FailPosition,
        ParameterKey::Voltage,
        ParameterKey::Frequency,
        ParameterKey::FilterRating,
        ParameterKey::MeasuredVariable,
        ParameterKey::Range,
        ParameterKey::Catalyst,
        ParameterKey::ResidenceTime,
        ParameterKey::DesignCode,
    ];

    /// 规格 JSON 中使用的键名。
    pub fn canonical_name(self) -> &'static str {
        match self {
            ParameterKey::Material => "material",
            ParameterKey::FlowRate => "flowRate",
            ParameterKey::Head => "head",
            ParameterKey::Pressure => "pressure",
            ParameterKey::Temperature => "temperature",
            ParameterKey::Power => "power",
            ParameterKey::Speed => "speed",
            ParameterKey::Efficiency => "efficiency",
            ParameterKey::Capacity => "capacity",
            ParameterKey::Volume => "volume",
            ParameterKey::Diameter => "diameter",
            ParameterKey::ImpellerDiameter => "impellerDiameter",
            ParameterKey::BladeCount => "bladeCount",
            ParameterKey::SealType => "sealType",
            ParameterKey::BearingType => "bearingType",
            ParameterKey::CouplingType => "couplingType",
            ParameterKey::TubeCount => "tubeCount",
            ParameterKey::Passes => "passes",
            ParameterKey::Area => "area",
            ParameterKey::ValveType => "valveType",
            ParameterKey::Actuator => "actuator",
            ParameterKey::FailPosition => "failPosition",
            ParameterKey::Voltage => "voltage",
            ParameterKey::Frequency => "frequency",
            ParameterKey::FilterRating => "filterRating",
            ParameterKey::MeasuredVariable => "measuredVariable",
            ParameterKey::Range => "range",
            ParameterKey::Catalyst => "catalyst",
            ParameterKey::ResidenceTime => "residenceTime",
            ParameterKey::DesignCode => "designCode",
        }
    }

    /// 图面说明文字中的标题。
    pub fn label(self) -> &'static str {
        match self {
            ParameterKey::Material => "Material",
            ParameterKey::FlowRate => "Flow rate",
            ParameterKey::Head => "Head",
            ParameterKey::Pressure => "Design pressure",
            ParameterKey::Temperature => "Design temp",
            ParameterKey::Power => "Power",
            ParameterKey::Speed => "Speed",
            ParameterKey::Efficiency => "Efficiency",
            ParameterKey::Capacity => "Capacity",
            ParameterKey::Volume => "Volume",
            ParameterKey::Diameter => "Diameter",
            ParameterKey::ImpellerDiameter => "Impeller dia",
            ParameterKey::BladeCount => "Blades",
            ParameterKey::SealType => "Seal",
            ParameterKey::BearingType => "Bearings",
            ParameterKey::CouplingType => "Coupling",
            ParameterKey::TubeCount => "Tubes",
            ParameterKey::Passes => "Passes",
            ParameterKey::Area => "Surface area",
            ParameterKey::ValveType => "Valve type",
            ParameterKey::Actuator => "Actuator",
            ParameterKey::FailPosition => "Fail position",
            ParameterKey::Voltage => "Voltage",
            ParameterKey::Frequency => "Frequency",
            ParameterKey::FilterRating => "Rating",
            ParameterKey::MeasuredVariable => "Measures",
            ParameterKey::Range => "Range",
            ParameterKey::Catalyst => "Catalyst",
            ParameterKey::ResidenceTime => "Residence time",
            ParameterKey::DesignCode => "Design code",
        }
    }

    /// 数值参数的显示单位；`%%d` 为 DXF 度数符号。
    pub fn unit(self) -> Option<&'static str> {
        match self {
            ParameterKey::FlowRate => Some("m3/h"),
            ParameterKey::Head => Some("m"),
            ParameterKey::Pressure => Some("bar"),
            ParameterKey::Temperature => Some("%%dC"),
            ParameterKey::Power => Some("kW"),
            ParameterKey::Speed => Some("rpm"),
            ParameterKey::Efficiency => Some("%"),
            ParameterKey::Capacity | ParameterKey::Volume => Some("m3"),
            ParameterKey::Diameter | ParameterKey::ImpellerDiameter => Some("mm"),
            ParameterKey::Area => Some("m2"),
            ParameterKey::Voltage => Some("V"),
            ParameterKey::Frequency => Some("Hz"),
            ParameterKey::FilterRating => Some("micron"),
            ParameterKey::ResidenceTime => Some("min"),
            _ => None,
        }
    }

    pub fn value_kind(self) -> ValueKind {
        match self {
            ParameterKey::BladeCount | ParameterKey::TubeCount | ParameterKey::Passes => {
                ValueKind::Count
            }
            ParameterKey::Efficiency => ValueKind::Percent,
            ParameterKey::Material
            | ParameterKey::SealType
            | ParameterKey::BearingType
            | ParameterKey::CouplingType
            | ParameterKey::ValveType
            | ParameterKey::Actuator
            | ParameterKey::FailPosition
            | ParameterKey::MeasuredVariable
            | ParameterKey::Range
            | ParameterKey::Catalyst
            | ParameterKey::DesignCode => ValueKind::Text,
            ParameterKey::Temperature | ParameterKey::Pressure => ValueKind::Signed,
            _ => ValueKind::Quantity,
        }
    }

    /// 按规范名或常见别名识别键，忽略大小写及 `_`、`-`、空格。
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        let alias = match normalized.as_str() {
            "flow" => Some(ParameterKey::FlowRate),
            "tdh" | "totalhead" => Some(ParameterKey::Head),
            "rpm" => Some(ParameterKey::Speed),
            "designpressure" => Some(ParameterKey::Pressure),
            "designtemperature" => Some(ParameterKey::Temperature),
            "blades" => Some(ParameterKey::BladeCount),
            "tubes" => Some(ParameterKey::TubeCount),
            "seal" => Some(ParameterKey::SealType),
            "coupling" => Some(ParameterKey::CouplingType),
            _ => None,
        };
        alias.or_else(|| {
            Self::ALL
                .into_iter()
                .find(|key| key.canonical_name().eq_ignore_ascii_case(&normalized))
        })
    }

    /// 校验并规整参数值。
    pub fn check(self, value: &ParameterValue) -> Result<ParameterValue, String> {
        match (self.value_kind(), value) {
            (_, ParameterValue::Number(number)) if !number.is_finite() => {
                Err("value must be a finite number".to_string())
            }
            (ValueKind::Text, ParameterValue::Flag(_)) => Ok(value.clone()),
            (_, ParameterValue::Flag(_)) => Err("expected a number, not a boolean".to_string()),
            (ValueKind::Quantity, ParameterValue::Number(number)) if *number < 0.0 => {
                Err(format!("value {} must not be negative", format_number(*number)))
            }
            (ValueKind::Percent, ParameterValue::Number(number))
                if !(0.0..=100.0).contains(number) =>
            {
                Err(format!(
                    "value {} is outside 0..=100",
                    format_number(*number)
                ))
            }
            (ValueKind::Count, _) => {
                let count = value
                    .as_number()
                    .ok_or_else(|| format!("expected a whole number, got {value:?}"))?;
                if count.fract() != 0.0 || !(1.0..=256.0).contains(&count) {
                    return Err(format!(
                        "expected a whole number between 1 and 256, got {}",
                        format_number(count)
                    ));
                }
                Ok(ParameterValue::Number(count))
            }
            (_, ParameterValue::Text(text)) if text.chars().any(char::is_control) => {
                Err("text contains control characters".to_string())
            }
            _ => Ok(value.clone()),
        }
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl EquipmentKind {
    /// 该设备类型在说明文字中展示的参数，按展示顺序排列。
    pub fn parameter_keys(&self) -> &'static [ParameterKey] {
        use ParameterKey::*;
        match self {
            EquipmentKind::Pump => &[
                FlowRate,
                Head,
                Pressure,
                Temperature,
                Power,
                Speed,
                Efficiency,
                ImpellerDiameter,
                BladeCount,
                Material,
                SealType,
                BearingType,
                CouplingType,
                DesignCode,
            ],
            EquipmentKind::HeatExchanger => &[
                Area,
                TubeCount,
                Passes,
                FlowRate,
                Pressure,
                Temperature,
                Material,
                DesignCode,
            ],
            EquipmentKind::Valve => &[
                ValveType,
                Diameter,
                Pressure,
                Temperature,
                Actuator,
                FailPosition,
                Material,
            ],
            EquipmentKind::Tank => &[
                Capacity,
                Volume,
                Diameter,
                Pressure,
                Temperature,
                Material,
                DesignCode,
            ],
            EquipmentKind::PressureVessel => &[
                Volume,
                Diameter,
                Pressure,
                Temperature,
                Material,
                DesignCode,
            ],
            EquipmentKind::Turbine => &[
                Power,
                Speed,
                FlowRate,
                Pressure,
                Temperature,
                Efficiency,
                Material,
            ],
            EquipmentKind::Motor | EquipmentKind::Generator => {
                &[Power, Speed, Voltage, Frequency, Efficiency]
            }
            EquipmentKind::Filter => &[FilterRating, FlowRate, Pressure, Material],
            EquipmentKind::Separator => &[
                Volume,
                FlowRate,
                Pressure,
                Temperature,
                Material,
                DesignCode,
            ],
            EquipmentKind::Reactor => &[
                Volume,
                Pressure,
                Temperature,
                Catalyst,
                ResidenceTime,
                Material,
                DesignCode,
            ],
            EquipmentKind::Instrument => &[MeasuredVariable, Range],
            EquipmentKind::Unknown(_) => &ParameterKey::ALL,
        }
    }
}

/// 参数校验失败的细节。
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterIssue {
    pub key: String,
    pub reason: String,
}

/// 经过类型化的组件参数。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentParameters {
    values: BTreeMap<ParameterKey, ParameterValue>,
    notes: BTreeMap<String, ParameterValue>,
}

impl ComponentParameters {
    /// 按设备类型归类原始参数。已知但与该类型无关的键、未知键进入 `notes`。
    pub fn from_raw(
        kind: &EquipmentKind,
        raw: &BTreeMap<String, ParameterValue>,
    ) -> Result<Self, ParameterIssue> {
        let applicable = kind.parameter_keys();
        let mut parameters = Self::default();
        for (name, value) in raw {
            match ParameterKey::parse(name) {
                Some(key) if applicable.contains(&key) => {
                    let checked = key.check(value).map_err(|reason| ParameterIssue {
                        key: name.clone(),
                        reason,
                    })?;
                    parameters.values.insert(key, checked);
                }
                _ => {
                    if let ParameterValue::Text(text) = value {
                        if text.chars().any(char::is_control) {
                            return Err(ParameterIssue {
                                key: name.clone(),
                                reason: "text contains control characters".to_string(),
                            });
                        }
                    }
                    if let ParameterValue::Number(number) = value {
                        if !number.is_finite() {
                            return Err(ParameterIssue {
                                key: name.clone(),
                                reason: "value must be a finite number".to_string(),
                            });
                        }
                    }
                    parameters.notes.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(parameters)
    }

    pub fn get(&self, key: ParameterKey) -> Option<&ParameterValue> {
        self.values.get(&key)
    }

    pub fn number(&self, key: ParameterKey) -> Option<f64> {
        self.get(key).and_then(ParameterValue::as_number)
    }

    pub fn count(&self, key: ParameterKey) -> Option<usize> {
        self.number(key).map(|value| value as usize)
    }

    /// 带单位的显示文本，例如 `150 m3/h`。
    pub fn display(&self, key: ParameterKey) -> Option<String> {
        let value = self.get(key)?;
        Some(match (value, key.unit()) {
            (ParameterValue::Number(number), Some("%")) => format!("{}%", format_number(*number)),
            (ParameterValue::Number(number), Some(unit)) => {
                format!("{} {unit}", format_number(*number))
            }
            _ => value.to_string(),
        })
    }

    pub fn notes(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.notes.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.notes.is_empty()
    }

    /// 说明文字行：先按设备类型的键顺序，再输出附注。
    pub fn caption_lines(&self, kind: &EquipmentKind) -> Vec<String> {
        let mut lines: Vec<String> = kind
            .parameter_keys()
            .iter()
            .filter_map(|key| {
                self.display(*key)
                    .map(|text| format!("{}: {text}", key.label()))
            })
            .collect();
        lines.extend(
            self.notes
                .iter()
                .map(|(key, value)| format!("{key}: {value}")),
        );
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, ParameterValue)]) -> BTreeMap<String, ParameterValue> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn numbers_format_compactly() {
        assert_eq!(format_number(150.0), "150");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1234), "0.123");
        assert_eq!(format_number(-0.0001), "0");
    }

    #[test]
    fn keys_parse_canonical_names_and_aliases() {
        assert_eq!(ParameterKey::parse("flowRate"), Some(ParameterKey::FlowRate));
        assert_eq!(ParameterKey::parse("flow_rate"), Some(ParameterKey::FlowRate));
        assert_eq!(ParameterKey::parse("TDH"), Some(ParameterKey::Head));
        assert_eq!(ParameterKey::parse("impeller-diameter"), Some(ParameterKey::ImpellerDiameter));
        assert_eq!(ParameterKey::parse("paint"), None);
        for key in ParameterKey::ALL {
            assert_eq!(ParameterKey::parse(key.canonical_name()), Some(key));
        }
    }

    #[test]
    fn pump_parameters_are_typed_and_unknown_keys_become_notes() {
        let params = ComponentParameters::from_raw(
            &EquipmentKind::Pump,
            &raw(&[
                ("flowRate", 150.0.into()),
                ("material", "SS316".into()),
                ("bladeCount", 7u32.into()),
                ("paint", "RAL 5015".into()),
                ("voltage", 400.0.into()),
            ]),
        )
        .expect("valid parameters");

        assert_eq!(params.display(ParameterKey::FlowRate).as_deref(), Some("150 m3/h"));
        assert_eq!(params.count(ParameterKey::BladeCount), Some(7));
        assert!(params.get(ParameterKey::Voltage).is_none());
        let notes: Vec<_> = params.notes().map(|(key, _)| key).collect();
        assert_eq!(notes, ["paint", "voltage"]);

        let lines = params.caption_lines(&EquipmentKind::Pump);
        assert_eq!(
            lines,
            [
                "Flow rate: 150 m3/h",
                "Blades: 7",
                "Material: SS316",
                "paint: RAL 5015",
                "voltage: 400",
            ]
        );
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        let issue = ComponentParameters::from_raw(
            &EquipmentKind::Pump,
            &raw(&[("efficiency", 120.0.into())]),
        )
        .expect_err("efficiency above 100");
        assert_eq!(issue.key, "efficiency");

        let issue = ComponentParameters::from_raw(
            &EquipmentKind::HeatExchanger,
            &raw(&[("tubeCount", 12.5.into())]),
        )
        .expect_err("fractional count");
        assert_eq!(issue.key, "tubeCount");

        let issue = ComponentParameters::from_raw(
            &EquipmentKind::Pump,
            &raw(&[("head", ParameterValue::Flag(true))]),
        )
        .expect_err("boolean quantity");
        assert_eq!(issue.key, "head");

        assert!(
            ComponentParameters::from_raw(
                &EquipmentKind::Pump,
                &raw(&[("head", (-3.0).into())]),
            )
            .is_err()
        );
    }

    #[test]
    fn text_quantities_are_kept_verbatim() {
        let params = ComponentParameters::from_raw(
            &EquipmentKind::Pump,
            &raw(&[("flowRate", "120-150 m3/h".into()), ("temperature", 80.0.into())]),
        )
        .expect("valid");
        assert_eq!(params.display(ParameterKey::FlowRate).as_deref(), Some("120-150 m3/h"));
        assert_eq!(params.display(ParameterKey::Temperature).as_deref(), Some("80 %%dC"));
    }

    #[test]
    fn cryogenic_and_vacuum_values_are_accepted() {
        let params = ComponentParameters::from_raw(
            &EquipmentKind::Tank,
            &raw(&[
                ("temperature", (-40.0).into()),
                ("pressure", (-0.9).into()),
                ("volume", 12.0.into()),
            ]),
        )
        .expect("negative temperature and pressure are valid");
        assert_eq!(params.display(ParameterKey::Temperature).as_deref(), Some("-40 %%dC"));
        assert_eq!(params.display(ParameterKey::Pressure).as_deref(), Some("-0.9 bar"));

        let issue = ComponentParameters::from_raw(
            &EquipmentKind::Tank,
            &raw(&[("volume", (-12.0).into())]),
        )
        .expect_err("negative volume");
        assert_eq!(issue.key, "volume");
        assert!(
            ComponentParameters::from_raw(
                &EquipmentKind::Tank,
                &raw(&[("temperature", f64::NEG_INFINITY.into())]),
            )
            .is_err()
        );
    }

    #[test]
    fn unknown_kinds_accept_every_known_key() {
        let params = ComponentParameters::from_raw(
            &EquipmentKind::Unknown("widget".into()),
            &raw(&[("voltage", 24.0.into()), ("catalyst", "Pt".into())]),
        )
        .expect("valid");
        assert_eq!(params.number(ParameterKey::Voltage), Some(24.0));
        assert_eq!(params.notes().count(), 0);
    }
}
