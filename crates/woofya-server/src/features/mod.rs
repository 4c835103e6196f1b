//! Feature modules implementing the Woofya query API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//! - `commands/` - Write operations (create, update, delete)
//! - `queries/` - Read operations (get, list, stats)
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **records**: CRUD over canonical records plus per-location counts

pub mod records;

use axum::Router;
use woofya_common::store::RecordStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Record store shared with the ingestion orchestrator
    pub store: RecordStore,
}

/// Creates the router with all feature routes mounted
///
/// - `/records` - Record management
/// - `/stats` - Record counts
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/records", records::records_routes().with_state(state.store.clone()))
        .nest("/stats", records::stats_routes().with_state(state.store))
}
