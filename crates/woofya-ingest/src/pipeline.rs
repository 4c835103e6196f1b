//! End-to-end pipeline run
//!
//! Collect → aggregate → normalize → deduplicate → validate → commit.
//! Only collection is concurrent; the remaining stages run after the
//! collector has drained every source. A run that is cancelled or rejected
//! by validation never writes to the store.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use woofya_common::store::{RecordStore, StoreError};
use woofya_common::types::{CanonicalRecord, RawRecord};

use crate::adapter::{AdapterRegistry, SourceDescriptor};
use crate::adapters::{fields_from_json, HttpJsonAdapter, JsonFileAdapter};
use crate::aggregator;
use crate::collector::{Collector, CollectorError, FetchOutcome, FetchStatus};
use crate::config::PipelineConfig;
use crate::dedup::Deduplicator;
use crate::normalizer::Normalizer;
use crate::validator::{SchemaValidationError, Validator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaValidationError),

    #[error("Pipeline run cancelled")]
    Cancelled,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CollectorError> for PipelineError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Cancelled => PipelineError::Cancelled,
        }
    }
}

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<FetchOutcome>,
    pub collected: usize,
    pub parse_failures: usize,
    pub canonical: usize,
    pub dropped: usize,
    pub stored_created: usize,
    pub stored_merged: usize,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn failed_pages(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == FetchStatus::TerminalFailure)
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Validated canonical records, in first-seen order
    pub records: Vec<CanonicalRecord>,
    pub report: RunReport,
}

/// Adapters available to every run: `json_file` and `http_json`
pub fn default_registry(config: &PipelineConfig) -> Result<AdapterRegistry, PipelineError> {
    let http = HttpJsonAdapter::new(Duration::from_secs(config.page_timeout_secs))
        .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {}", e)))?;

    Ok(AdapterRegistry::new()
        .with("json_file", Arc::new(JsonFileAdapter::new(&config.data_dir)))
        .with("http_json", Arc::new(http)))
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    collector: Collector,
    normalizer: Normalizer,
    dedup: Deduplicator,
    validator: Validator,
    upsert: bool,
}

impl Pipeline {
    pub fn new(
        collector: Collector,
        normalizer: Normalizer,
        dedup: Deduplicator,
        validator: Validator,
    ) -> Self {
        Self {
            collector,
            normalizer,
            dedup,
            validator,
            upsert: true,
        }
    }

    /// Build a pipeline with the bundled adapters
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let registry = default_registry(config)?;
        Self::with_registry(config, registry)
    }

    pub fn with_registry(
        config: &PipelineConfig,
        registry: AdapterRegistry,
    ) -> Result<Self, PipelineError> {
        let aliases = config
            .location_aliases()
            .map_err(|e| PipelineError::Config(format!("{:#}", e)))?;

        Ok(Self::new(
            Collector::new(registry, config.collector_config()),
            Normalizer::new(aliases),
            Deduplicator::new(config.dedup_policy),
            Validator::new(config.max_invalid_fraction),
        )
        .with_upsert(config.upsert))
    }

    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Run every stage and commit to `store` when one is given
    pub async fn run(
        &self,
        sources: &[SourceDescriptor],
        store: Option<&RecordStore>,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, PipelineError> {
        let start = Instant::now();
        info!(sources = sources.len(), "Pipeline run starting");

        let collection = self.collector.collect(sources, cancel).await?;

        let mut report = RunReport {
            collected: collection.records.len(),
            parse_failures: collection.parse_failures,
            outcomes: collection.outcomes,
            ..RunReport::default()
        };

        let (records, dropped) = self.process(collection.records)?;
        report.canonical = records.len() + dropped;
        report.dropped = dropped;

        if cancel.is_cancelled() {
            warn!("Pipeline cancelled before commit");
            return Err(PipelineError::Cancelled);
        }

        if let Some(store) = store {
            let outcomes = store.insert_batch(records.clone(), self.upsert).await?;
            report.stored_created = outcomes.iter().filter(|o| o.created).count();
            report.stored_merged = outcomes.len() - report.stored_created;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            collected = report.collected,
            canonical = report.canonical,
            dropped = report.dropped,
            failed_pages = report.failed_pages(),
            stored_created = report.stored_created,
            stored_merged = report.stored_merged,
            duration_ms = report.duration_ms,
            "Pipeline run complete"
        );

        Ok(RunOutput { records, report })
    }

    /// Aggregate, normalize, deduplicate and validate an already-collected batch
    ///
    /// Returns the accepted records and how many were dropped.
    pub fn process(
        &self,
        raw: Vec<RawRecord>,
    ) -> Result<(Vec<CanonicalRecord>, usize), PipelineError> {
        let shaped = aggregator::aggregate(raw);
        let normalized = self.normalizer.normalize_all(shaped);
        let canonical = self.dedup.deduplicate(normalized);
        let outcome = self.validator.validate(canonical)?;
        Ok((outcome.accepted, outcome.dropped))
    }
}

/// Read a combined JSON file (array of flat objects, or a single object)
///
/// Elements that are not flat objects are skipped; the count of skipped
/// elements is returned alongside the records. `source_id` is used for
/// records that carry no `source_ids` of their own.
pub async fn read_raw_records(
    path: impl AsRef<Path>,
    source_id: &str,
) -> Result<(Vec<RawRecord>, usize), PipelineError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::Config(format!("invalid JSON in {}: {}", path.display(), e)))?;

    let items = match body {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (sequence, item) in items.iter().enumerate() {
        match fields_from_json(item) {
            Ok(fields) => records.push(RawRecord::new(source_id, fields, sequence as u64)),
            Err(e) => {
                warn!(index = sequence, error = %e, "Skipping malformed entry");
                skipped += 1;
            },
        }
    }

    Ok((records, skipped))
}

/// Write records in the interchange format
pub async fn write_records(
    path: impl AsRef<Path>,
    records: &[CanonicalRecord],
) -> Result<(), PipelineError> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(records)
        .map_err(|e| PipelineError::Config(format!("failed to serialize records: {}", e)))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), records = records.len(), "Wrote records");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use woofya_common::types::{FieldValue, RawFields};

    fn raw(source: &str, fields: &[(&str, &str)]) -> RawRecord {
        let fields: RawFields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect();
        RawRecord::new(source, fields, 0)
    }

    fn pipeline(max_invalid_fraction: f64) -> Pipeline {
        let config = PipelineConfig {
            max_invalid_fraction,
            ..PipelineConfig::default()
        };
        Pipeline::with_registry(&config, AdapterRegistry::new()).unwrap()
    }

    #[test]
    fn test_process_runs_every_stage() {
        let (records, dropped) = pipeline(0.0)
            .process(vec![
                raw("a", &[("name", "Dog Day"), ("suburb", "sydney"), ("date", "October 1, 2024")]),
                raw("b", &[("title", "dog day"), ("location", "Sydney"), ("date", "01/10/2024")]),
            ])
            .unwrap();

        assert_eq!(dropped, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Dog Day");
        assert_eq!(records[0].location, "Sydney, NSW");
        assert_eq!(records[0].source_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_process_rejects_untitled_at_zero_threshold() {
        let err = pipeline(0.0)
            .process(vec![raw("a", &[("title", "No title found"), ("location", "Sydney")])])
            .unwrap_err();
        assert!(matches!(err, PipelineError::SchemaValidation(_)));
    }

    #[tokio::test]
    async fn test_read_and_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("combined.json");
        std::fs::write(
            &input,
            r#"[{"title": "Dog Day", "location": "Sydney", "date": "2024-10-01"}, 42]"#,
        )
        .unwrap();

        let (raw, skipped) = read_raw_records(&input, "combined").await.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(skipped, 1);

        let (records, _) = pipeline(0.0).process(raw).unwrap();
        let output = dir.path().join("out").join("clean.json");
        write_records(&output, &records).await.unwrap();

        // Cleaning the cleaned output changes nothing
        let (again, _) = read_raw_records(&output, "other").await.unwrap();
        let (records_again, _) = pipeline(0.0).process(again).unwrap();
        assert_eq!(records, records_again);
    }
}
