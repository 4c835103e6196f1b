//! Woofya Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! HTTP query service over the canonical record store.
//!
//! # Overview
//!
//! - **API Endpoints**: create, read, update, delete and list records
//! - **Store**: shared `RecordStore`, optionally backed by a JSON snapshot
//! - **Ingestion**: optional pipeline run at startup into the same store
//! - **Middleware**: CORS, request tracing, and compression
//!
//! # Architecture
//!
//! Features are vertical slices split into commands (writes) and queries
//! (reads), each with a `handle` function and its own error enum. Route
//! handlers map those errors onto HTTP statuses with `{ "error": ... }`
//! bodies.
//!
//! # Example
//!
//! ```no_run
//! use woofya_common::store::RecordStore;
//! use woofya_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = RecordStore::in_memory(config.store.dedup_policy);
//!     api::serve(&config, api::AppState { store }, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;

// Re-export commonly used types
pub use error::{ServerError, ServerResult};
