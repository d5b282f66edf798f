use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 配置文件路径覆盖所用的环境变量。
pub const CONFIG_ENV_VAR: &str = "EQDRAW_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub drawing: DrawingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.drawing.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `EQDRAW_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 绘图参数：文字高度、范围留白、引线箭头与可选的图框/网格。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DrawingConfig {
    /// 组件外包矩形向外扩展的留白，用于 `$EXTMIN/$EXTMAX`。
    pub margin: f64,
    /// 组件编号/名称文字高度。
    pub label_text_height: f64,
    /// 参数说明文字高度。
    pub caption_text_height: f64,
    pub callout_text_height: f64,
    /// 引线箭头边长。
    pub arrow_size: f64,
    pub title_block: bool,
    pub grid: bool,
    pub flow_arrows: bool,
    pub avoid_callout_overlap: bool,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            margin: 100.0,
            label_text_height: 5.0,
            caption_text_height: 3.5,
            callout_text_height: 3.0,
            arrow_size: 4.0,
            title_block: true,
            grid: false,
            flow_arrows: true,
            avoid_callout_overlap: true,
        }
    }
}

impl DrawingConfig {
    /// 校验数值项：留白非负，其余尺寸为正。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("drawing.label_text_height", self.label_text_height),
            ("drawing.caption_text_height", self.caption_text_height),
            ("drawing.callout_text_height", self.callout_text_height),
            ("drawing.arrow_size", self.arrow_size),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: format!("必须为正数（当前值 {value}）"),
                });
            }
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "drawing.margin",
                message: format!("不能为负数（当前值 {}）", self.margin),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// DXF 实数小数位数。
    #[serde(default = "OutputConfig::default_precision")]
    pub precision: usize,
}

impl OutputConfig {
    fn default_precision() -> usize {
        6
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            precision: Self::default_precision(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {key} 不合法：{message}")]
    InvalidValue { key: &'static str, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.drawing, DrawingConfig::default());
        assert!(cfg.drawing.title_block);
        assert!(!cfg.drawing.grid);
        assert_eq!(cfg.output.precision, 6);
        cfg.drawing.validate().expect("defaults validate");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [drawing]
            margin = 40.0
            label_text_height = 7.0
            grid = true
            flow_arrows = false

            [output]
            precision = 3
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.drawing.margin, 40.0);
        assert_eq!(cfg.drawing.label_text_height, 7.0);
        assert!(cfg.drawing.grid);
        assert!(!cfg.drawing.flow_arrows);
        // 未出现的键使用默认值
        assert_eq!(cfg.drawing.arrow_size, 4.0);
        assert!(cfg.drawing.title_block);
        assert_eq!(cfg.output.precision, 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [drawing]
            arrow_size = 0.0
            "#
        )
        .unwrap();

        let err = AppConfig::from_file(file.path()).expect_err("arrow_size 0 is invalid");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "drawing.arrow_size",
                ..
            }
        ));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[drawing\nmargin = ").unwrap();
        let err = AppConfig::from_file(file.path()).expect_err("malformed toml");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
