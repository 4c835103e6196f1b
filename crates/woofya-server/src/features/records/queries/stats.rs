//! Record counts, total and per location

use woofya_common::store::{RecordStore, StoreStats};

#[tracing::instrument(skip(store))]
pub async fn handle(store: RecordStore) -> StoreStats {
    store.stats().await
}
