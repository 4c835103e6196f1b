//! Update record command
//!
//! Partially updates a stored record. Only the fields present in the patch
//! change; the identity key is recomputed and must stay unique.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use woofya_common::store::{RecordStore, StoreError};
use woofya_common::types::{RecordPatch, StoredRecord};

/// Command to update an existing record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecordCommand {
    pub id: Uuid,
    pub patch: RecordPatch,
}

/// Errors that can occur when updating a record
#[derive(Debug, thiserror::Error)]
pub enum UpdateRecordError {
    /// No fields were provided for update
    #[error("At least one field must be provided for update")]
    NoFieldsToUpdate,
    #[error("Title cannot be empty or only whitespace")]
    TitleEmpty,
    #[error("Location cannot be empty or only whitespace")]
    LocationEmpty,
    #[error("Record {0} not found")]
    NotFound(Uuid),
    #[error("Record with identity '{key}' already exists as {existing}")]
    Conflict { key: String, existing: Uuid },
    #[error("Invalid record: {0}")]
    Invalid(String),
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for UpdateRecordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Conflict { key, existing } => Self::Conflict { key, existing },
            StoreError::Invalid(message) => Self::Invalid(message),
            other => Self::Store(other),
        }
    }
}

impl UpdateRecordCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - `NoFieldsToUpdate` - The patch is empty
    /// - `TitleEmpty` - Title given but blank
    /// - `LocationEmpty` - Location given but blank
    pub fn validate(&self) -> Result<(), UpdateRecordError> {
        if self.patch.is_empty() {
            return Err(UpdateRecordError::NoFieldsToUpdate);
        }
        if matches!(self.patch.title, Some(ref title) if title.trim().is_empty()) {
            return Err(UpdateRecordError::TitleEmpty);
        }
        if matches!(self.patch.location, Some(ref location) if location.trim().is_empty()) {
            return Err(UpdateRecordError::LocationEmpty);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(store, command), fields(id = %command.id))]
pub async fn handle(
    store: RecordStore,
    command: UpdateRecordCommand,
) -> Result<StoredRecord, UpdateRecordError> {
    command.validate()?;
    Ok(store.update(command.id, &command.patch).await?)
}
