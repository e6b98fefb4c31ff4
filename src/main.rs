//! CLI entry point for the GTFS schedule API.
//!
//! Loads a GTFS data directory into memory and serves read-only JSON queries
//! over it. The `check` subcommand loads the same directory and reports what
//! it found without binding a listener.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gtfs_schedule_api::{
    api,
    bootstrap::{DataDir, ensure_data_dir},
    config::{DataConfig, ServeConfig},
    loader::{LoadError, load_dir, remediation_hints},
    store::GtfsStore,
};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_schedule_api")]
#[command(about = "Serve a GTFS static schedule as a read-only JSON API", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeConfig,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the data directory and serve the API (default)
    Serve(ServeConfig),
    /// Load the data directory, report collection sizes and exit
    Check {
        #[command(flatten)]
        data: DataConfig,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(config)) => serve(config).await?,
        Some(Commands::Check { data }) => check(data).await?,
        None => serve(cli.serve).await?,
    }

    Ok(())
}

/// Colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/gtfs_schedule_api.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_schedule_api.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Loads the feed, then binds and serves. Nothing is bound if loading fails.
async fn serve(config: ServeConfig) -> Result<()> {
    let data_dir = config.data.resolve()?;

    if config.no_bootstrap {
        info!(dir = %data_dir.display(), "Skipping data directory bootstrap");
    } else {
        match ensure_data_dir(&data_dir).await? {
            DataDir::Existing => {}
            DataDir::Seeded { created } => warn!(
                dir = %data_dir.display(),
                created,
                "Serving placeholder GTFS data, replace the seeded files with a real feed"
            ),
        }
    }

    let store = load_or_report(&data_dir).await?;

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    api::serve(listener, Arc::new(store), shutdown_signal()).await?;

    info!("GTFS API stopped");
    Ok(())
}

async fn check(data: DataConfig) -> Result<()> {
    let data_dir = data.resolve()?;
    let store = load_or_report(&data_dir).await?;
    let counts = store.counts();

    info!(
        dir = %data_dir.display(),
        routes = counts.routes,
        stops = counts.stops,
        trips = counts.trips,
        stop_times = counts.stop_times,
        calendars = counts.calendars,
        "Data directory OK"
    );
    println!("{}", serde_json::to_string_pretty(&counts)?);

    Ok(())
}

async fn load_or_report(data_dir: &Path) -> Result<GtfsStore> {
    load_dir(data_dir).await.map_err(|err: LoadError| {
        error!(
            error = %err,
            cause = %err.cause(),
            file = err.file(),
            "Failed to load GTFS data"
        );
        for hint in remediation_hints(data_dir, &err) {
            eprintln!("{hint}");
        }
        err.into()
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
