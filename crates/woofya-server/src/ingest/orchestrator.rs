//! Startup ingestion
//!
//! Runs the collection pipeline once in a background task and commits the
//! validated batch to the store the API serves. Cancelling the token (on
//! shutdown) abandons the run without writing anything.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use woofya_common::store::RecordStore;
use woofya_ingest::config::{load_sources, PipelineConfig};
use woofya_ingest::pipeline::{Pipeline, PipelineError, RunReport};

pub struct IngestOrchestrator {
    config: PipelineConfig,
    store: RecordStore,
    cancel: CancellationToken,
}

impl IngestOrchestrator {
    pub fn new(config: PipelineConfig, store: RecordStore, cancel: CancellationToken) -> Self {
        Self {
            config,
            store,
            cancel,
        }
    }

    /// Start the orchestrator in background
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Ingestion orchestrator started");

            match self.run_once().await {
                Ok(Some(report)) => info!(
                    stored_created = report.stored_created,
                    stored_merged = report.stored_merged,
                    dropped = report.dropped,
                    failed_pages = report.failed_pages(),
                    "Ingestion run committed"
                ),
                Ok(None) => warn!("Ingestion run cancelled, store left untouched"),
                Err(e) => error!("Ingestion run failed: {:#}", e),
            }

            info!("Ingestion orchestrator stopped");
        })
    }

    /// Run the pipeline once; `None` when the run was cancelled
    pub async fn run_once(&self) -> Result<Option<RunReport>> {
        let sources_file = self
            .config
            .sources_file
            .as_ref()
            .context("INGEST_SOURCES_FILE is not set")?;
        let sources = load_sources(sources_file)?;
        info!(sources = sources.len(), "Loaded source descriptors");

        let pipeline = Pipeline::from_config(&self.config)?;
        match pipeline.run(&sources, Some(&self.store), &self.cancel).await {
            Ok(output) => Ok(Some(output.report)),
            Err(PipelineError::Cancelled) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
