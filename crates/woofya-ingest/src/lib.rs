//! Woofya Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Collects records from many independently-shaped sources and turns them
//! into one canonical, deduplicated dataset.
//!
//! # Stages
//!
//! - **Collector**: concurrent per-source pagination with retry and timeouts
//! - **Aggregator**: one uniformly-shaped batch
//! - **Normalizer**: ISO dates and canonical locations
//! - **Deduplicator**: identity-key merging
//! - **Validator**: required fields and the invalid-record threshold
//!
//! # Example
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use woofya_common::store::RecordStore;
//! use woofya_common::types::IdentityPolicy;
//! use woofya_ingest::config::{load_sources, PipelineConfig};
//! use woofya_ingest::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let sources = load_sources("sources.json")?;
//!     let store = RecordStore::open("data/records.json", IdentityPolicy::default()).await?;
//!
//!     let pipeline = Pipeline::from_config(&config)?;
//!     let output = pipeline.run(&sources, Some(&store), &CancellationToken::new()).await?;
//!     println!("{} records", output.records.len());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod adapters;
pub mod aggregator;
pub mod collector;
pub mod config;
pub mod dedup;
pub mod normalizer;
pub mod pipeline;
pub mod validator;

pub use adapter::{AdapterError, AdapterRegistry, Page, ParseError, SourceAdapter, SourceDescriptor};
pub use collector::{Collection, Collector, CollectorConfig, FetchOutcome, FetchStatus, RetryPolicy};
pub use pipeline::{Pipeline, PipelineError, RunOutput, RunReport};
