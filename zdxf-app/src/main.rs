use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zdxf_config::{AppConfig, ConfigError, OutputFormat};
use zdxf_io::{DxfFacade, ParseOptions};

mod outline;

const USAGE: &str = "用法：zdxf <文件.dxf> [--config <路径>] [--json|--outline] [--timeout-ms <毫秒>]";

fn main() {
    let mut args = std::env::args().skip(1);
    let mut input: Option<PathBuf> = None;
    let mut override_format: Option<OutputFormat> = None;
    let mut config_override: Option<PathBuf> = None;
    let mut timeout_override: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => override_format = Some(OutputFormat::Json),
            "--outline" => override_format = Some(OutputFormat::Outline),
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--timeout-ms" => {
                let Some(value) = args.next().and_then(|v| v.parse::<u64>().ok()) else {
                    eprintln!("`--timeout-ms` 需要提供毫秒数");
                    std::process::exit(1);
                };
                timeout_override = Some(value);
            }
            other if other.starts_with("--") => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
            other => {
                if input.is_some() {
                    eprintln!("只能指定一个输入文件：{other}");
                    std::process::exit(1);
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    let Some(input) = input else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let config = load_configuration(config_override);
    init_logging(&config);
    info!(path = %input.display(), "启动 zdxf");

    let mut options = ParseOptions::default().with_max_diagnostics(config.parser.max_diagnostics);
    if let Some(ms) = timeout_override.or(config.parser.timeout_ms) {
        options = options.with_timeout(Duration::from_millis(ms));
    }

    let report = match DxfFacade::with_options(options).load_report(&input) {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "读取 DXF 失败");
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let show_diagnostics = config.output.show_diagnostics;
    match override_format.unwrap_or(config.output.format) {
        OutputFormat::Json => match outline::render_json(&report, show_diagnostics) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                error!(error = %err, "序列化文档失败");
                std::process::exit(1);
            }
        },
        OutputFormat::Outline => {
            print!("{}", outline::render_outline(&report));
            if show_diagnostics {
                print!("{}", outline::render_diagnostics(&report));
            }
        }
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    // 日志写到 stderr，避免混入 JSON 输出
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
