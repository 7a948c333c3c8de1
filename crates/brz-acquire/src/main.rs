//! BRZ Acquire - Main entry point
//!
//! Runs one acquisition job described by a job-spec JSON file: a list of
//! extraction targets, each pairing a source descriptor with a bronze
//! table. Prints the structured job result and exits non-zero when the job
//! completed with errors.

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use brz_acquire::config::AcquireConfig;
use brz_acquire::destination::PostgresStore;
use brz_acquire::scheduler::FanoutScheduler;
use brz_acquire::task::ExtractionTarget;
use brz_common::logging::{init_logging, LogConfig};

/// Bronze-layer acquisition engine
#[derive(Parser, Debug)]
#[command(name = "brz-acquire", version, about)]
struct Cli {
    /// Path to the job spec: a JSON array of extraction targets
    #[arg(long, value_name = "FILE")]
    job_file: PathBuf,

    /// Print the job result compactly instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("brz-acquire".to_string())
        .filter_directives("brz_acquire=debug,sqlx=warn".to_string())
        .build();
    let log_config = LogConfig::from_env().unwrap_or(log_config);
    init_logging(&log_config)?;

    info!("Starting BRZ acquisition");

    let config = AcquireConfig::from_env()?;
    info!(
        bronze_schema = %config.bronze_schema,
        max_parallel_tasks = config.max_parallel_tasks,
        "Configuration loaded"
    );

    let targets = load_targets(&cli.job_file)?;
    info!(targets = targets.len(), job_file = %cli.job_file.display(), "Job spec loaded");

    let pool = PgPoolOptions::new()
        .max_connections(config.destination.max_connections)
        .acquire_timeout(config.destination.connect_timeout())
        .connect(&config.destination.url)
        .await
        .context("Failed to connect to the destination store")?;

    info!("Destination connection pool established");

    let scheduler = FanoutScheduler::new(Arc::new(PostgresStore::new(pool)), config);
    let result = scheduler.run_job(targets).await?;

    let rendered = if cli.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{}", rendered);

    if !result.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Read and parse the job spec file.
fn load_targets(path: &PathBuf) -> Result<Vec<ExtractionTarget>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file '{}'", path.display()))?;

    let targets: Vec<ExtractionTarget> = serde_json::from_str(&raw)
        .with_context(|| format!("Job file '{}' is not a JSON array of targets", path.display()))?;

    Ok(targets)
}
