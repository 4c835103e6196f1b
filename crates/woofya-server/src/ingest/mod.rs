//! Data ingestion inside the server process
//!
//! When `INGEST_ENABLED=true` the orchestrator runs the collection pipeline
//! once at startup and commits into the store the API serves. Pipeline
//! settings come from `INGEST_*` environment variables.

pub mod orchestrator;

pub use orchestrator::IngestOrchestrator;
pub use woofya_ingest::config::PipelineConfig as IngestConfig;
