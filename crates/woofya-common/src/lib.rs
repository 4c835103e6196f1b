//! Woofya Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, storage, and logging for the Woofya workspace.
//!
//! # Overview
//!
//! This crate provides the pieces used by both the ingestion pipeline and
//! the query server:
//!
//! - **Types**: raw adapter records, canonical records, identity keys
//! - **Store**: the durable keyed collection of canonical records
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use woofya_common::store::RecordStore;
//! use woofya_common::types::{CanonicalRecord, IdentityPolicy};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = RecordStore::open("data/records.json", IdentityPolicy::default()).await?;
//! let mut record = CanonicalRecord::new("Dog Day", "Sydney, NSW");
//! record.add_source("eventbrite");
//! let outcome = store.insert(record, false).await?;
//! println!("stored as {}", outcome.id);
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use store::{RecordStore, StoreError};
pub use types::{CanonicalRecord, FieldValue, IdentityPolicy, RawFields, RawRecord, StoredRecord};
