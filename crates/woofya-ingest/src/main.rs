//! Woofya Ingest - record collection and cleaning tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use woofya_common::logging::{init_logging, LogConfig, LogLevel};
use woofya_common::store::RecordStore;
use woofya_ingest::config::{load_sources, PipelineConfig};
use woofya_ingest::pipeline::{read_raw_records, write_records, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "woofya-ingest")]
#[command(author, version, about = "Woofya record collection tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect from every configured source and build the canonical dataset
    Run {
        /// Source descriptor file (JSON array)
        #[arg(short, long, env = "INGEST_SOURCES_FILE")]
        sources: PathBuf,

        /// Write canonical records to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Commit records to this store snapshot
        #[arg(long, env = "WOOFYA_STORE_PATH")]
        store: Option<PathBuf>,
    },

    /// Normalize, deduplicate and validate an existing combined JSON file
    Clean {
        /// Combined input file
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Count entries per location in a JSON file
    Count {
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("woofya-ingest")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Run {
            sources,
            output,
            store,
        } => run(sources, output, store).await?,
        Command::Clean { input, output } => clean(input, output).await?,
        Command::Count { input } => count(input).await?,
    }

    Ok(())
}

async fn run(sources: PathBuf, output: Option<PathBuf>, store: Option<PathBuf>) -> Result<()> {
    let config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    let descriptors = load_sources(&sources)?;
    let pipeline = Pipeline::from_config(&config)?;

    let store = match store {
        Some(path) => Some(
            RecordStore::open(&path, config.dedup_policy)
                .await
                .with_context(|| format!("Failed to open store {}", path.display()))?,
        ),
        None => None,
    };

    if output.is_none() && store.is_none() {
        warn!("No --output or --store given, results will only be summarized");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling run");
            on_signal.cancel();
        }
    });

    let result = pipeline
        .run(&descriptors, store.as_ref(), &cancel)
        .await
        .context("Pipeline run failed")?;

    if let Some(path) = output {
        write_records(&path, &result.records).await?;
    }

    let report = &result.report;
    info!(
        collected = report.collected,
        canonical = report.canonical,
        accepted = result.records.len(),
        dropped = report.dropped,
        parse_failures = report.parse_failures,
        failed_pages = report.failed_pages(),
        "Run complete"
    );
    Ok(())
}

async fn clean(input: PathBuf, output: PathBuf) -> Result<()> {
    let config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    let pipeline = Pipeline::from_config(&config)?;

    let source_id = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("input")
        .to_string();
    let (raw, skipped) = read_raw_records(&input, &source_id)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let total = raw.len();

    let (records, dropped) = pipeline.process(raw)?;
    write_records(&output, &records).await?;

    info!(
        input = total,
        skipped,
        dropped,
        output = records.len(),
        "Cleaning complete"
    );
    Ok(())
}

async fn count(input: PathBuf) -> Result<()> {
    let bytes = tokio::fs::read(&input)
        .await
        .with_context(|| format!("File {} not found", input.display()))?;
    let data: serde_json::Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Error reading {}", input.display()))?;
    let entries = data
        .as_array()
        .context("Invalid data format. Expected a list of entries.")?;

    let mut by_location: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries {
        let location = entry
            .get("location")
            .and_then(|l| l.as_str())
            .filter(|l| !l.trim().is_empty())
            .unwrap_or("Unknown Location");
        *by_location.entry(location.to_string()).or_insert(0) += 1;
    }

    println!("Total entries: {}", entries.len());
    println!();
    println!("Location Counts:");
    for (location, count) in &by_location {
        println!("{}: {}", location, count);
    }
    Ok(())
}
