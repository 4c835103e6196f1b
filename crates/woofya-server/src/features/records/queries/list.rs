//! List records query
//!
//! Returns stored records in insertion order, optionally filtered by
//! location or by a title substring (both case-insensitive).

use serde::{Deserialize, Serialize};
use woofya_common::store::RecordStore;
use woofya_common::types::StoredRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRecordsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_contains: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRecordsResponse {
    pub items: Vec<StoredRecord>,
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ListRecordsError {
    #[error("Filter '{0}' cannot be empty")]
    EmptyFilter(&'static str),
}

impl ListRecordsQuery {
    pub fn validate(&self) -> Result<(), ListRecordsError> {
        if matches!(self.location, Some(ref l) if l.trim().is_empty()) {
            return Err(ListRecordsError::EmptyFilter("location"));
        }
        if matches!(self.title_contains, Some(ref t) if t.trim().is_empty()) {
            return Err(ListRecordsError::EmptyFilter("title_contains"));
        }
        Ok(())
    }

    fn matches(&self, record: &StoredRecord) -> bool {
        let location_ok = self
            .location
            .as_ref()
            .map_or(true, |l| record.record.location.eq_ignore_ascii_case(l.trim()));
        let title_ok = self.title_contains.as_ref().map_or(true, |t| {
            record
                .record
                .title
                .to_lowercase()
                .contains(&t.trim().to_lowercase())
        });
        location_ok && title_ok
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: RecordStore,
    query: ListRecordsQuery,
) -> Result<ListRecordsResponse, ListRecordsError> {
    query.validate()?;

    let items: Vec<_> = store
        .list()
        .await
        .into_iter()
        .filter(|record| query.matches(record))
        .collect();

    Ok(ListRecordsResponse {
        total: items.len(),
        items,
    })
}
