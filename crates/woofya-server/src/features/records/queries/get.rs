use serde::{Deserialize, Serialize};
use uuid::Uuid;
use woofya_common::store::{RecordStore, StoreError};
use woofya_common::types::StoredRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRecordQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetRecordError {
    #[error("Record {0} not found")]
    NotFound(Uuid),
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for GetRecordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(store: RecordStore, query: GetRecordQuery) -> Result<StoredRecord, GetRecordError> {
    Ok(store.get(query.id).await?)
}
