use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use eqdraw_config::{AppConfig, ConfigError};
use eqdraw_core::document::Document;
use eqdraw_engine::templates::{self, DEFAULT_TEMPLATE, TEMPLATES};
use eqdraw_engine::{DrawingPipeline, DrawingSpec, RenderedDrawing};
use eqdraw_io::{DocumentLoader, DxfFacade};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// eqdraw - 由 JSON 规格生成设备示意图 DXF
#[derive(Parser)]
#[command(name = "eqdraw")]
#[command(about = "Generate annotated equipment schematics as DXF drawings")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// 配置文件路径（默认读取 EQDRAW_CONFIG 或 ./config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a drawing spec (JSON) to DXF
    Render {
        /// Drawing spec file
        spec: PathBuf,

        /// Output DXF file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the render report as JSON on stderr
        #[arg(long)]
        report: bool,
    },

    /// Render one of the built-in demo drawings
    Demo {
        /// Template name, see `eqdraw templates`
        #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
        template: String,

        /// Output DXF file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize the contents of a DXF file
    Inspect {
        /// DXF file to read
        file: PathBuf,
    },

    /// List built-in demo templates
    Templates,
}

fn main() {
    let cli = Cli::parse();
    let config = load_configuration(cli.config.as_deref());
    init_logging(&config);

    if let Err(err) = run(cli.command, &config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Render {
            spec,
            output,
            report,
        } => {
            let data = fs::read_to_string(&spec)
                .with_context(|| format!("failed to read spec {}", spec.display()))?;
            let drawing = DrawingSpec::from_json(&data)
                .with_context(|| format!("failed to parse spec {}", spec.display()))?;
            let rendered = render(&drawing, config)?;
            if report {
                let json = serde_json::to_string_pretty(&rendered.report)?;
                eprintln!("{json}");
            }
            write_output(&rendered, output.as_deref())
        }
        Commands::Demo { template, output } => {
            let drawing = templates::template(&template).ok_or_else(|| {
                anyhow!(
                    "unknown template {template:?} (available: {})",
                    templates::template_names().collect::<Vec<_>>().join(", ")
                )
            })?;
            info!(template = %template, "渲染内置示例");
            let rendered = render(&drawing, config)?;
            write_output(&rendered, output.as_deref())
        }
        Commands::Inspect { file } => {
            let document = DxfFacade::new()
                .load(&file)
                .with_context(|| format!("failed to load {}", file.display()))?;
            print_summary(&file, &document);
            Ok(())
        }
        Commands::Templates => {
            for (name, description) in TEMPLATES {
                println!("{name:<20} {description}");
            }
            Ok(())
        }
    }
}

fn render(spec: &DrawingSpec, config: &AppConfig) -> Result<RenderedDrawing> {
    let rendered = DrawingPipeline::new(config.drawing.clone())
        .with_precision(config.output.precision)
        .render(spec)?;
    for warning in &rendered.report.warnings {
        warn!(%warning, "渲染警告");
    }
    Ok(rendered)
}

fn write_output(rendered: &RenderedDrawing, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, &rendered.dxf)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                path = %path.display(),
                entities = rendered.report.entities,
                "DXF 已写入"
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.dxf.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn print_summary(path: &Path, document: &Document) {
    println!("file:     {}", path.display());
    println!("units:    {:?}", document.header().units);
    match document.header().extents {
        Some(extents) => println!(
            "extents:  ({:.3}, {:.3}) - ({:.3}, {:.3})",
            extents.min().x(),
            extents.min().y(),
            extents.max().x(),
            extents.max().y()
        ),
        None => println!("extents:  -"),
    }
    println!("layers:   {}", document.layers().count());
    println!("entities: {}", document.entity_count());

    let mut per_layer: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for (_, entity) in document.entities() {
        *per_layer
            .entry(entity.layer_name())
            .or_default()
            .entry(entity.kind_name())
            .or_default() += 1;
    }
    for (layer, kinds) in per_layer {
        let kinds: Vec<String> = kinds
            .into_iter()
            .map(|(kind, count)| format!("{kind}={count}"))
            .collect();
        println!("  {layer:<20} {}", kinds.join(" "));
    }
}

fn load_configuration(override_path: Option<&Path>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(path).unwrap_or_else(|err| {
            eprintln!("warning: 加载指定配置 {} 失败，使用默认配置：{err}", path.display());
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        eprintln!(
                            "warning: 加载默认配置 {} 失败，使用内建默认值：{err}",
                            path.display()
                        );
                    }
                    ConfigError::InvalidValue { .. } | ConfigError::Context { .. } => {
                        eprintln!("warning: 加载默认配置失败，使用内建默认值：{err}");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

/// `RUST_LOG` 优先，其次是配置中的日志等级。日志写往 stderr，stdout 留给 DXF。
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
