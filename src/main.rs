//! heartrate-windows CLI
//!
//! Finds fixed-cadence windows in heart-rate exports.

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use heartrate_windows::{
    config::{Config, ConfigError},
    core::{AnalysisReport, ReportBuilder, Window, WindowDetector},
    ingest::{Normalizer, SampleStream},
    VERSION,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "heartrate-windows")]
#[command(version = VERSION)]
#[command(about = "Find fixed-cadence windows in heart-rate exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the configured detection settings.
#[derive(Args, Clone)]
struct DetectArgs {
    /// Window span in seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Sample spacing in seconds
    #[arg(long)]
    step_secs: Option<u64>,

    /// IANA timezone for timestamps without an offset
    #[arg(long)]
    timezone: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every valid window in an export (.csv or .json)
    Analyze {
        file: PathBuf,

        #[command(flatten)]
        detect: DetectArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show min/max/mean of the most recent valid window
    Summary {
        file: PathBuf,

        #[command(flatten)]
        detect: DetectArgs,
    },

    /// Write detected windows to a file
    Export {
        file: PathBuf,

        #[command(flatten)]
        detect: DetectArgs,

        /// Output file (defaults to the configured export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export format: json (report) or jsonl (one window with samples per line)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show configuration
    Config,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Serve the upload API
    #[cfg(feature = "server")]
    Serve {
        /// Port to bind (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { file, detect, json } => {
            cmd_analyze(&file, &detect, json);
        }
        Commands::Summary { file, detect } => {
            cmd_summary(&file, &detect);
        }
        Commands::Export {
            file,
            detect,
            output,
            format,
        } => {
            cmd_export(&file, &detect, output, &format);
        }
        Commands::Config => {
            cmd_config();
        }
        Commands::Init { force } => {
            cmd_init(force);
        }
        #[cfg(feature = "server")]
        Commands::Serve { port } => {
            cmd_serve(port);
        }
    }
}

/// Fall back to defaults when the config file cannot be loaded, with a warning.
fn config_or_default(loaded: Result<Config, ConfigError>, fallback: &str) -> Config {
    loaded.unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config ({e}), {fallback}");
        Config::default()
    })
}

/// Load the configuration file and apply command-line overrides.
fn resolve_config(detect: &DetectArgs) -> Config {
    let mut config = config_or_default(Config::load(), "using defaults");

    if detect.duration_secs.is_some() || detect.step_secs.is_some() {
        let duration = detect
            .duration_secs
            .unwrap_or(config.window.duration().num_seconds() as u64);
        let step = detect
            .step_secs
            .unwrap_or(config.window.step().num_seconds() as u64);
        if let Err(e) = config.set_window(duration, step) {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }

    if let Some(ref tz) = detect.timezone {
        config.timezone = tz.clone();
    }

    config
}

/// Read and normalize an input file.
fn load_samples(path: &Path, config: &Config) -> SampleStream {
    let normalizer = match config.normalizer_config() {
        Ok(c) => Normalizer::new(c),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > config.max_upload_bytes as u64 => {
            eprintln!(
                "Error: {} is {} bytes, above the {} byte limit",
                path.display(),
                meta.len(),
                config.max_upload_bytes
            );
            std::process::exit(1);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            std::process::exit(1);
        }
    }

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match normalizer.normalize_file(&filename, &bytes) {
        Ok(samples) => samples,
        Err(e) => {
            eprintln!("Error parsing file: {e}");
            std::process::exit(1);
        }
    }
}

/// Normalize, detect and build a report for one file.
fn analyze(path: &Path, config: &Config) -> (Vec<Window>, AnalysisReport) {
    let samples = load_samples(path, config);
    let windows = WindowDetector::new(config.window).detect(&samples);
    let source = path.file_name().map(|n| n.to_string_lossy().into_owned());
    let report =
        ReportBuilder::new().build(source.as_deref(), samples.len(), &config.window, &windows);
    (windows, report)
}

fn cmd_analyze(path: &Path, detect: &DetectArgs, json: bool) {
    let config = resolve_config(detect);
    let (_, report) = analyze(path, &config);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!(
        "{}: {} samples, {} window(s) of {}s at {}s cadence",
        path.display(),
        report.sample_count,
        report.window_count,
        report.config.duration().num_seconds(),
        report.config.step().num_seconds()
    );

    for entry in &report.windows {
        let stats = match entry.summary {
            Some(s) => format!(
                "min {:.1} | max {:.1} | mean {:.1} | {} without reading",
                s.min, s.max, s.mean, s.absent_count
            ),
            None => "no readings".to_string(),
        };
        println!(
            "  [{}] {} → {} | {} samples | {}",
            entry.index,
            entry.start.format("%Y-%m-%d %H:%M:%S"),
            entry.end.format("%H:%M:%S"),
            entry.sample_count,
            stats
        );
    }
}

fn cmd_summary(path: &Path, detect: &DetectArgs) {
    let config = resolve_config(detect);
    let (_, report) = analyze(path, &config);

    let Some(latest) = report.latest else {
        println!(
            "No valid {}s window found in {}.",
            config.window.duration().num_seconds(),
            path.display()
        );
        return;
    };

    println!(
        "Latest window: {} → {}",
        latest.start.format("%Y-%m-%d %H:%M:%S"),
        latest.end.format("%Y-%m-%d %H:%M:%S")
    );
    match latest.summary {
        Some(s) => {
            println!("  Minimum: {:.1}", s.min);
            println!("  Maximum: {:.1}", s.max);
            println!("  Average: {:.1}", s.mean);
        }
        None => println!("  No readings in this window."),
    }
}

fn cmd_export(path: &Path, detect: &DetectArgs, output: Option<PathBuf>, format: &str) {
    let config = resolve_config(detect);
    let (windows, report) = analyze(path, &config);

    let jsonl = match format {
        "json" => false,
        "jsonl" => true,
        other => {
            eprintln!("Error: unknown export format '{other}' (expected json or jsonl)");
            std::process::exit(2);
        }
    };

    let output_path = output.unwrap_or_else(|| {
        if let Err(e) = config.ensure_directories() {
            eprintln!("Warning: Could not create directories: {e}");
        }
        config.export_path.join(format!(
            "windows_{}.{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            format
        ))
    });

    let content = match export_content(&windows, &report, jsonl) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error serializing: {e}");
            std::process::exit(1);
        }
    };

    match std::fs::write(&output_path, content) {
        Ok(_) => println!(
            "Exported {} window(s) to {output_path:?}",
            report.window_count
        ),
        Err(e) => {
            eprintln!("Error writing export: {e}");
            std::process::exit(1);
        }
    }
}

/// Render an export: the whole report as JSON, or one window per line.
fn export_content(
    windows: &[Window],
    report: &AnalysisReport,
    jsonl: bool,
) -> serde_json::Result<String> {
    if jsonl {
        let lines = windows
            .iter()
            .map(serde_json::to_string)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(lines.join("\n"))
    } else {
        serde_json::to_string_pretty(report)
    }
}

fn cmd_config() {
    let config = config_or_default(Config::load(), "showing defaults");

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_init(force: bool) {
    let path = Config::config_path();
    if path.exists() && !force {
        eprintln!("Config already exists at {path:?} (use --force to overwrite)");
        std::process::exit(1);
    }

    if let Err(e) = Config::default().save() {
        eprintln!("Error saving config: {e}");
        std::process::exit(1);
    }
    println!("Wrote default configuration to {path:?}");
}

#[cfg(feature = "server")]
fn cmd_serve(port: Option<u16>) {
    use heartrate_windows::server::{run, ServerConfig};

    let config = config_or_default(Config::load(), "serving with defaults");
    let mut server_config = match ServerConfig::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    if let Some(port) = port {
        server_config.port = port;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let (addr, shutdown_tx) = match run(server_config).await {
            Ok(server) => server,
            Err(e) => {
                eprintln!("Error starting server: {e}");
                std::process::exit(1);
            }
        };

        println!("heartrate-windows v{VERSION} listening on http://{addr}");
        println!("Press Ctrl+C to stop");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        let _ = shutdown_tx.send(());
        println!("Stopping server...");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use heartrate_windows::{detect_windows, Sample, WindowConfig};

    fn windows() -> Vec<Window> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let samples: Vec<Sample> = (0..12)
            .map(|k| Sample::new(t0 + Duration::minutes(2 * k), Some(60.0 + k as f64)))
            .collect();
        detect_windows(&samples, &WindowConfig::from_secs(600, 120).unwrap())
    }

    #[test]
    fn test_jsonl_export_has_one_line_per_window() {
        let windows = windows();
        let config = WindowConfig::from_secs(600, 120).unwrap();
        let report = ReportBuilder::new().build(Some("hr.csv"), 12, &config, &windows);

        let content = export_content(&windows, &report, true).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), report.window_count);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["samples"].as_array().unwrap().len(), 6);
        }
    }

    #[test]
    fn test_json_export_is_the_report() {
        let windows = windows();
        let config = WindowConfig::from_secs(600, 120).unwrap();
        let report = ReportBuilder::new().build(None, 12, &config, &windows);

        let content = export_content(&windows, &report, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["window_count"], 2);
    }

    #[test]
    fn test_unreadable_config_falls_back_to_defaults() {
        let loaded = Config::from_json("{ not json");
        assert!(loaded.is_err());

        let config = config_or_default(loaded, "using defaults");
        assert_eq!(config.server_port, Config::default().server_port);
        assert_eq!(config.window, Config::default().window);
    }
}
