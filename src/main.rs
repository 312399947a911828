//! CLI entry point for the GTFS subset extractor.
//!
//! Pulls the configured national feed archive, filters it down to the
//! configured city's stops, and writes the six planner tables into the
//! output directory.

use anyhow::Result;
use clap::Parser;
use gtfs_subset::config::ExtractConfig;
use gtfs_subset::fetch::BasicClient;
use gtfs_subset::pipeline;
use gtfs_subset::summary;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_subset")]
#[command(about = "Extracts a city subset from a national GTFS feed", long_about = None)]
struct Cli {
    /// JSON config file; defaults to the built-in Bielefeld setup
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_subset.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_subset.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => ExtractConfig::load(&path)?,
        None => ExtractConfig::default(),
    };

    let client = BasicClient::new();
    let run_summary = match pipeline::run(&client, &config).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Extraction run aborted");
            return Err(e);
        }
    };
    summary::print_json(&run_summary)?;

    info!(output_dir = %config.output_dir.display(), "GTFS subset extraction complete");
    Ok(())
}
