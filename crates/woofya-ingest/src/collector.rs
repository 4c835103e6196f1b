//! Concurrent multi-source collection
//!
//! Every source runs in its own tokio task; at most
//! `max_concurrent_sources` run at once. Pages within a source are fetched
//! one after another. Each task buffers its records locally and sends a
//! single report back over a channel; the collector only returns once every
//! task has finished, so later stages always see a complete batch.
//!
//! Failures are contained per page. A transient error is retried with a
//! fixed delay, a terminal error (or exhausted retries) marks that page
//! failed and pagination moves on to the next page. A source naming an
//! unregistered adapter gets a single terminal outcome and is skipped.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use woofya_common::types::RawRecord;

use crate::adapter::{AdapterError, AdapterRegistry, Page, SourceAdapter, SourceDescriptor};

pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 4;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_EMPTY_PAGE_LIMIT: u32 = 3;
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Fixed-delay retry for transient page failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub max_concurrent_sources: usize,
    pub retry: RetryPolicy,
    /// A fetch still pending after this long counts as a transient failure
    pub page_timeout: Duration,
    /// Stop a source after this many consecutive pages without records
    pub empty_page_limit: u32,
    /// Page cap for descriptors that do not set `max_pages`
    pub default_max_pages: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            retry: RetryPolicy::default(),
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            empty_page_limit: DEFAULT_EMPTY_PAGE_LIMIT,
            default_max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchStatus {
    Success,
    TransientFailure,
    TerminalFailure,
}

/// Result of one fetch attempt (or of a page, for successes and final failures)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub source_id: String,
    pub page_index: u32,
    pub status: FetchStatus,
    pub record_count: usize,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl FetchOutcome {
    fn success(source_id: &str, page_index: u32, record_count: usize, attempts: u32) -> Self {
        Self {
            source_id: source_id.to_string(),
            page_index,
            status: FetchStatus::Success,
            record_count,
            attempts,
            error_detail: None,
        }
    }

    fn failure(
        source_id: &str,
        page_index: u32,
        status: FetchStatus,
        attempts: u32,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.to_string(),
            page_index,
            status,
            record_count: 0,
            attempts,
            error_detail: Some(detail.into()),
        }
    }
}

/// Everything gathered from one collection run
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Ordered by descriptor position, then fetch sequence
    pub records: Vec<RawRecord>,
    pub outcomes: Vec<FetchOutcome>,
    pub parse_failures: usize,
}

impl Collection {
    /// Pages that ended in a terminal failure
    pub fn failed_pages(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == FetchStatus::TerminalFailure)
    }
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Collection cancelled")]
    Cancelled,
}

#[derive(Debug)]
struct SourceReport {
    position: usize,
    records: Vec<RawRecord>,
    outcomes: Vec<FetchOutcome>,
    parse_failures: usize,
}

enum PageAttempt {
    Fetched { page: Page, attempts: u32 },
    Failed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Collector {
    registry: AdapterRegistry,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(registry: AdapterRegistry, config: CollectorConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect every source
    ///
    /// Returns `Cancelled` if the token fires before all sources finish; any
    /// records gathered so far are discarded.
    pub async fn collect(
        &self,
        sources: &[SourceDescriptor],
        cancel: &CancellationToken,
    ) -> Result<Collection, CollectorError> {
        let start = Instant::now();

        let mut jobs = Vec::with_capacity(sources.len());
        let mut unresolved = Vec::new();
        for (position, source) in sources.iter().enumerate() {
            match self.registry.get(&source.adapter) {
                Some(adapter) => jobs.push((position, source.clone(), adapter)),
                None => {
                    error!(
                        source_id = %source.source_id,
                        adapter = %source.adapter,
                        "Unknown adapter, skipping source"
                    );
                    unresolved.push(position);
                },
            }
        }

        let concurrency = self.config.max_concurrent_sources.max(1);
        info!(
            sources = sources.len(),
            concurrency, "Starting collection"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<SourceReport>();

        let joined = stream::iter(jobs)
            .map(|(position, source, adapter)| {
                let tx = tx.clone();
                let config = self.config.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let report = collect_source(position, source, adapter, config, cancel).await;
                    // Receiver lives until every task has joined
                    let _ = tx.send(report);
                })
            })
            .boxed()
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;
        drop(tx);

        for result in joined {
            if let Err(e) = result {
                error!(error = %e, "Source task failed");
            }
        }

        let mut reports = Vec::with_capacity(sources.len());
        while let Some(report) = rx.recv().await {
            reports.push(report);
        }

        if cancel.is_cancelled() {
            warn!("Collection cancelled, discarding partial results");
            return Err(CollectorError::Cancelled);
        }

        reports.sort_by_key(|r| r.position);

        let mut collection = Collection::default();
        let mut reported = reports.iter().map(|r| r.position).peekable();
        for (position, source) in sources.iter().enumerate() {
            if reported.peek() == Some(&position) {
                reported.next();
                continue;
            }
            let detail = if unresolved.contains(&position) {
                format!("unknown adapter '{}'", source.adapter)
            } else {
                "source task aborted".to_string()
            };
            collection.outcomes.push(FetchOutcome::failure(
                &source.source_id,
                0,
                FetchStatus::TerminalFailure,
                0,
                detail,
            ));
        }

        for report in reports {
            collection.records.extend(report.records);
            collection.outcomes.extend(report.outcomes);
            collection.parse_failures += report.parse_failures;
        }

        info!(
            records = collection.records.len(),
            failed_pages = collection.failed_pages().count(),
            parse_failures = collection.parse_failures,
            duration_ms = start.elapsed().as_millis() as u64,
            "Collection complete"
        );

        Ok(collection)
    }
}

async fn collect_source(
    position: usize,
    source: SourceDescriptor,
    adapter: Arc<dyn SourceAdapter>,
    config: CollectorConfig,
    cancel: CancellationToken,
) -> SourceReport {
    let mut report = SourceReport {
        position,
        records: Vec::new(),
        outcomes: Vec::new(),
        parse_failures: 0,
    };

    let max_pages = source.max_pages.unwrap_or(config.default_max_pages);
    let mut sequence = 0u64;
    let mut consecutive_empty = 0u32;

    info!(source_id = %source.source_id, adapter = %source.adapter, max_pages, "Collecting source");

    for page_index in 1..=max_pages {
        if cancel.is_cancelled() {
            break;
        }

        let records_before = report.records.len();
        match fetch_with_retry(&source, adapter.as_ref(), page_index, &config, &cancel, &mut report.outcomes)
            .await
        {
            PageAttempt::Cancelled => break,
            PageAttempt::Failed => consecutive_empty += 1,
            PageAttempt::Fetched { page, attempts } => {
                for item in page.records {
                    match item {
                        Ok(fields) => {
                            report
                                .records
                                .push(RawRecord::new(source.source_id.clone(), fields, sequence));
                            sequence += 1;
                        },
                        Err(e) => {
                            warn!(
                                source_id = %source.source_id,
                                page_index,
                                error = %e,
                                "Skipping malformed record"
                            );
                            report.parse_failures += 1;
                        },
                    }
                }

                let count = report.records.len() - records_before;
                debug!(source_id = %source.source_id, page_index, records = count, attempts, "Page fetched");
                report
                    .outcomes
                    .push(FetchOutcome::success(&source.source_id, page_index, count, attempts));

                if count == 0 {
                    consecutive_empty += 1;
                } else {
                    consecutive_empty = 0;
                }

                if !page.has_more {
                    debug!(source_id = %source.source_id, page_index, "Source reports no more pages");
                    break;
                }
            },
        }

        if consecutive_empty >= config.empty_page_limit {
            info!(
                source_id = %source.source_id,
                page_index,
                "Stopping after {} consecutive empty pages",
                consecutive_empty
            );
            break;
        }
    }

    info!(
        source_id = %source.source_id,
        records = report.records.len(),
        parse_failures = report.parse_failures,
        "Source finished"
    );
    report
}

async fn fetch_with_retry(
    source: &SourceDescriptor,
    adapter: &dyn SourceAdapter,
    page_index: u32,
    config: &CollectorConfig,
    cancel: &CancellationToken,
    outcomes: &mut Vec<FetchOutcome>,
) -> PageAttempt {
    let max_attempts = config.retry.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let result = tokio::select! {
            _ = cancel.cancelled() => return PageAttempt::Cancelled,
            result = tokio::time::timeout(config.page_timeout, adapter.fetch_page(source, page_index)) => result,
        };

        let err = match result {
            Ok(Ok(page)) => return PageAttempt::Fetched { page, attempts: attempt },
            Ok(Err(e)) => e,
            Err(_) => AdapterError::Transient(format!(
                "page fetch timed out after {}s",
                config.page_timeout.as_secs_f64()
            )),
        };

        match err {
            AdapterError::Terminal(detail) => {
                warn!(source_id = %source.source_id, page_index, attempt, error = %detail, "Page failed");
                outcomes.push(FetchOutcome::failure(
                    &source.source_id,
                    page_index,
                    FetchStatus::TerminalFailure,
                    attempt,
                    detail,
                ));
                return PageAttempt::Failed;
            },
            AdapterError::Transient(detail) if attempt >= max_attempts => {
                warn!(
                    source_id = %source.source_id,
                    page_index,
                    attempt,
                    error = %detail,
                    "Page failed after {} attempts",
                    max_attempts
                );
                outcomes.push(FetchOutcome::failure(
                    &source.source_id,
                    page_index,
                    FetchStatus::TerminalFailure,
                    attempt,
                    detail,
                ));
                return PageAttempt::Failed;
            },
            AdapterError::Transient(detail) => {
                warn!(
                    source_id = %source.source_id,
                    page_index,
                    attempt,
                    error = %detail,
                    "Fetch attempt {}/{} failed, retrying",
                    attempt,
                    max_attempts
                );
                outcomes.push(FetchOutcome::failure(
                    &source.source_id,
                    page_index,
                    FetchStatus::TransientFailure,
                    attempt,
                    detail,
                ));

                tokio::select! {
                    _ = cancel.cancelled() => return PageAttempt::Cancelled,
                    _ = tokio::time::sleep(config.retry.delay) => {},
                }
            },
        }
    }

    PageAttempt::Failed
}
