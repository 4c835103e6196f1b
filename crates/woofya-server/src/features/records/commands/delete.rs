//! Delete record command

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use woofya_common::store::{RecordStore, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRecordCommand {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRecordResponse {
    pub id: Uuid,
    pub deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteRecordError {
    #[error("Record {0} not found")]
    NotFound(Uuid),
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DeleteRecordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: RecordStore,
    command: DeleteRecordCommand,
) -> Result<DeleteRecordResponse, DeleteRecordError> {
    store.delete(command.id).await?;
    Ok(DeleteRecordResponse {
        id: command.id,
        deleted: true,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use woofya_common::types::{CanonicalRecord, IdentityPolicy};

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let store = RecordStore::in_memory(IdentityPolicy::default());
        let id = store
            .insert(CanonicalRecord::new("Dog Day", "Sydney, NSW"), false)
            .await
            .unwrap()
            .id;

        let response = handle(store.clone(), DeleteRecordCommand { id }).await.unwrap();
        assert!(response.deleted);
        assert!(store.is_empty().await);

        let err = handle(store, DeleteRecordCommand { id }).await.unwrap_err();
        assert!(matches!(err, DeleteRecordError::NotFound(missing) if missing == id));
    }
}
