//! Pipeline configuration
//!
//! Values come from `INGEST_*` environment variables with the defaults
//! below. Source descriptors and the location alias table live in JSON
//! files referenced from here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use woofya_common::types::IdentityPolicy;

use crate::adapter::SourceDescriptor;
use crate::collector::{
    CollectorConfig, RetryPolicy, DEFAULT_EMPTY_PAGE_LIMIT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_CONCURRENT_SOURCES, DEFAULT_MAX_PAGES,
};
use crate::normalizer::LocationAliases;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

pub const DEFAULT_RETRY_DELAY_MS: u64 = 3_000;

pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Any invalid record rejects the batch.
pub const DEFAULT_MAX_INVALID_FRACTION: f64 = 0.0;

/// Directory the `json_file` adapter reads when a source has no endpoint.
pub const DEFAULT_DATA_DIR: &str = "./data/raw";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run the pipeline when the server starts
    pub enabled: bool,
    pub max_concurrent_sources: usize,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub page_timeout_secs: u64,
    pub max_invalid_fraction: f64,
    pub sources_file: Option<PathBuf>,
    pub location_aliases_file: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub dedup_policy: IdentityPolicy,
    /// Merge into existing store records instead of failing on conflict
    pub upsert: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            max_invalid_fraction: DEFAULT_MAX_INVALID_FRACTION,
            sources_file: None,
            location_aliases_file: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            dedup_policy: IdentityPolicy::default(),
            upsert: true,
        }
    }
}

/// Parse an optional variable; a present but malformed value is an error
fn parse_var<T>(vars: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match vars(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}={:?} is not valid: {}", name, raw, e)),
        None => Ok(None),
    }
}

impl PipelineConfig {
    /// Load configuration from `INGEST_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable lookup
    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            enabled: parse_var(&vars, "INGEST_ENABLED")?.unwrap_or(false),
            max_concurrent_sources: parse_var(&vars, "INGEST_MAX_CONCURRENT_SOURCES")?
                .unwrap_or(DEFAULT_MAX_CONCURRENT_SOURCES),
            max_attempts: parse_var(&vars, "INGEST_MAX_ATTEMPTS")?.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            retry_delay_ms: parse_var(&vars, "INGEST_RETRY_DELAY_MS")?
                .unwrap_or(DEFAULT_RETRY_DELAY_MS),
            page_timeout_secs: parse_var(&vars, "INGEST_PAGE_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_PAGE_TIMEOUT_SECS),
            max_invalid_fraction: parse_var(&vars, "INGEST_MAX_INVALID_FRACTION")?
                .unwrap_or(DEFAULT_MAX_INVALID_FRACTION),
            sources_file: vars("INGEST_SOURCES_FILE").map(PathBuf::from),
            location_aliases_file: vars("INGEST_LOCATION_ALIASES_FILE").map(PathBuf::from),
            data_dir: vars("INGEST_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            dedup_policy: parse_var(&vars, "INGEST_DEDUP_POLICY")?.unwrap_or_default(),
            upsert: parse_var(&vars, "INGEST_UPSERT")?.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_sources == 0 {
            anyhow::bail!("max_concurrent_sources must be greater than 0");
        }

        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        if self.page_timeout_secs == 0 {
            anyhow::bail!("page_timeout_secs must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.max_invalid_fraction) {
            anyhow::bail!(
                "max_invalid_fraction must be between 0.0 and 1.0, got {}",
                self.max_invalid_fraction
            );
        }

        if self.enabled && self.sources_file.is_none() {
            anyhow::bail!("INGEST_SOURCES_FILE is required when ingestion is enabled");
        }

        Ok(())
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            max_concurrent_sources: self.max_concurrent_sources,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                delay: Duration::from_millis(self.retry_delay_ms),
            },
            page_timeout: Duration::from_secs(self.page_timeout_secs),
            empty_page_limit: DEFAULT_EMPTY_PAGE_LIMIT,
            default_max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// The configured alias table, or the built-in one
    pub fn location_aliases(&self) -> Result<LocationAliases> {
        match self.location_aliases_file {
            Some(ref path) => LocationAliases::from_json_file(path),
            None => Ok(LocationAliases::default()),
        }
    }
}

/// Read source descriptors from a JSON array
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<SourceDescriptor>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file {}", path.display()))?;
    let sources: Vec<SourceDescriptor> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid sources file {}", path.display()))?;

    let mut seen = HashSet::new();
    for source in &sources {
        if source.source_id.trim().is_empty() {
            anyhow::bail!("Source with adapter '{}' has an empty source_id", source.adapter);
        }
        if !seen.insert(source.source_id.as_str()) {
            anyhow::bail!("Duplicate source_id '{}' in {}", source.source_id, path.display());
        }
    }

    Ok(sources)
}
