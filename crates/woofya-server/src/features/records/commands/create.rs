//! Create record command
//!
//! Inserts a canonical record into the store. With `upsert` set, a record
//! whose identity key is already stored is merged into the existing one
//! (features and source ids unioned) instead of being rejected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use woofya_common::store::{RecordStore, StoreError};
use woofya_common::types::{CanonicalRecord, StoredRecord};

/// Command to create a record
///
/// # Examples
///
/// ```rust,ignore
/// use woofya_common::types::CanonicalRecord;
/// use woofya_server::features::records::commands::CreateRecordCommand;
///
/// let command = CreateRecordCommand {
///     record: CanonicalRecord::new("Dog Day", "Sydney, NSW"),
///     upsert: false,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordCommand {
    pub record: CanonicalRecord,
    #[serde(default)]
    pub upsert: bool,
}

/// Response from creating a record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordResponse {
    pub record: StoredRecord,
    /// False when the record was merged into an existing one
    pub created: bool,
}

/// Errors that can occur when creating a record
#[derive(Debug, thiserror::Error)]
pub enum CreateRecordError {
    #[error("Title is required and cannot be empty")]
    TitleRequired,
    #[error("Location is required and cannot be empty")]
    LocationRequired,
    #[error("Invalid record: {0}")]
    Invalid(String),
    #[error("Record with identity '{key}' already exists as {existing}")]
    Conflict { key: String, existing: Uuid },
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CreateRecordError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { key, existing } => Self::Conflict { key, existing },
            StoreError::Invalid(message) => Self::Invalid(message),
            other => Self::Store(other),
        }
    }
}

impl CreateRecordCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - `TitleRequired` - Title is empty or whitespace-only
    /// - `LocationRequired` - Location is empty or whitespace-only
    pub fn validate(&self) -> Result<(), CreateRecordError> {
        if self.record.title.trim().is_empty() {
            return Err(CreateRecordError::TitleRequired);
        }
        if self.record.location.trim().is_empty() {
            return Err(CreateRecordError::LocationRequired);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(store, command), fields(title = %command.record.title, upsert = command.upsert))]
pub async fn handle(
    store: RecordStore,
    command: CreateRecordCommand,
) -> Result<CreateRecordResponse, CreateRecordError> {
    command.validate()?;

    let mut record = command.record;
    record.title = record.title.trim().to_string();
    record.location = record.location.trim().to_string();

    let outcome = store.insert(record, command.upsert).await?;
    let record = store.get(outcome.id).await?;

    Ok(CreateRecordResponse {
        record,
        created: outcome.created,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use woofya_common::types::IdentityPolicy;

    fn command(title: &str, location: &str, upsert: bool) -> CreateRecordCommand {
        CreateRecordCommand {
            record: CanonicalRecord::new(title, location),
            upsert,
        }
    }

    #[test]
    fn test_validate_requires_title_and_location() {
        assert!(matches!(
            command("  ", "Sydney, NSW", false).validate(),
            Err(CreateRecordError::TitleRequired)
        ));
        assert!(matches!(
            command("Dog Day", "", false).validate(),
            Err(CreateRecordError::LocationRequired)
        ));
        assert!(command("Dog Day", "Sydney, NSW", false).validate().is_ok());
    }

    #[tokio::test]
    async fn test_handle_trims_and_stores() {
        let store = RecordStore::in_memory(IdentityPolicy::default());
        let response = handle(store.clone(), command("  Dog Day ", " Sydney, NSW", false))
            .await
            .unwrap();

        assert!(response.created);
        assert_eq!(response.record.record.title, "Dog Day");
        assert_eq!(response.record.record.location, "Sydney, NSW");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_conflicts_unless_upsert() {
        let store = RecordStore::in_memory(IdentityPolicy::default());
        let first = handle(store.clone(), command("Dog Day", "Sydney, NSW", false))
            .await
            .unwrap();

        let err = handle(store.clone(), command("DOG DAY", "Sydney, NSW", false))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateRecordError::Conflict { existing, .. } if existing == first.record.id));

        let merged = handle(store.clone(), command("dog day", "Sydney, NSW", true))
            .await
            .unwrap();
        assert!(!merged.created);
        assert_eq!(merged.record.id, first.record.id);
        assert_eq!(store.len().await, 1);
    }
}
