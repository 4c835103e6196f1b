//! Durable keyed collection of canonical records
//!
//! Records are keyed by a surrogate UUID assigned on first insert. A
//! secondary index maps identity keys to ids so duplicates are caught at
//! write time. All writes go through one `RwLock`; reads share it.
//!
//! When opened with a path, every committed write rewrites a JSON snapshot
//! (temp file then rename). A write whose snapshot cannot be persisted is
//! discarded and the in-memory state is left as it was.

use crate::types::{CanonicalRecord, IdentityPolicy, RecordPatch, StoredRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record with identity '{key}' already exists as {existing}")]
    Conflict { key: String, existing: Uuid },

    #[error("Record {0} not found")]
    NotFound(Uuid),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of a single insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    pub id: Uuid,
    /// False when the record was merged into an existing one
    pub created: bool,
}

/// Summary counts over the stored records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub by_location: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    order: Vec<Uuid>,
    records: HashMap<Uuid, CanonicalRecord>,
    keys: HashMap<String, Uuid>,
}

impl StoreState {
    fn insert(
        &mut self,
        record: CanonicalRecord,
        upsert: bool,
        policy: IdentityPolicy,
    ) -> Result<InsertOutcome, StoreError> {
        let missing = record.missing_required();
        if !missing.is_empty() {
            return Err(StoreError::Invalid(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let key = record.identity_key(policy);
        if let Some(ref key) = key {
            if let Some(&existing) = self.keys.get(key) {
                if !upsert {
                    return Err(StoreError::Conflict {
                        key: key.clone(),
                        existing,
                    });
                }
                if let Some(current) = self.records.get_mut(&existing) {
                    current.absorb(&record);
                }
                return Ok(InsertOutcome {
                    id: existing,
                    created: false,
                });
            }
        }

        let id = Uuid::new_v4();
        let mut record = record;
        record.flagged = false;
        self.order.push(id);
        self.records.insert(id, record);
        if let Some(key) = key {
            self.keys.insert(key, id);
        }

        Ok(InsertOutcome { id, created: true })
    }

    fn update(
        &mut self,
        id: Uuid,
        patch: &RecordPatch,
        policy: IdentityPolicy,
    ) -> Result<StoredRecord, StoreError> {
        let current = self.records.get(&id).ok_or(StoreError::NotFound(id))?;
        let old_key = current.identity_key(policy);

        let mut updated = current.clone();
        updated.apply(patch);

        let missing = updated.missing_required();
        if !missing.is_empty() {
            return Err(StoreError::Invalid(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let new_key = updated.identity_key(policy);
        if let Some(ref key) = new_key {
            if let Some(&existing) = self.keys.get(key) {
                if existing != id {
                    return Err(StoreError::Conflict {
                        key: key.clone(),
                        existing,
                    });
                }
            }
        }

        if let Some(key) = old_key {
            self.keys.remove(&key);
        }
        if let Some(key) = new_key {
            self.keys.insert(key, id);
        }
        self.records.insert(id, updated.clone());

        Ok(StoredRecord { id, record: updated })
    }

    fn delete(&mut self, id: Uuid, policy: IdentityPolicy) -> Result<(), StoreError> {
        let removed = self.records.remove(&id).ok_or(StoreError::NotFound(id))?;
        self.order.retain(|other| *other != id);
        if let Some(key) = removed.identity_key(policy) {
            if self.keys.get(&key) == Some(&id) {
                self.keys.remove(&key);
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<StoredRecord> {
        self.order
            .iter()
            .filter_map(|id| {
                self.records.get(id).map(|record| StoredRecord {
                    id: *id,
                    record: record.clone(),
                })
            })
            .collect()
    }

    fn from_snapshot(
        records: Vec<StoredRecord>,
        policy: IdentityPolicy,
    ) -> Result<Self, StoreError> {
        let mut state = StoreState::default();
        for stored in records {
            if state.records.contains_key(&stored.id) {
                return Err(StoreError::Storage(format!(
                    "duplicate id {} in snapshot",
                    stored.id
                )));
            }
            if let Some(key) = stored.record.identity_key(policy) {
                if let Some(&existing) = state.keys.get(&key) {
                    return Err(StoreError::Conflict { key, existing });
                }
                state.keys.insert(key, stored.id);
            }
            state.order.push(stored.id);
            state.records.insert(stored.id, stored.record);
        }
        Ok(state)
    }
}

/// Shared handle to the record store
///
/// Cloning is cheap; all clones see the same records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    state: Arc<RwLock<StoreState>>,
    path: Option<PathBuf>,
    policy: IdentityPolicy,
}

impl RecordStore {
    /// Empty store with no snapshot file
    pub fn in_memory(policy: IdentityPolicy) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            path: None,
            policy,
        }
    }

    /// Open a snapshot-backed store, loading the file if it exists
    pub async fn open(path: impl AsRef<Path>, policy: IdentityPolicy) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<StoredRecord> = serde_json::from_slice(&bytes)?;
                let state = StoreState::from_snapshot(records, policy)?;
                info!(path = %path.display(), records = state.order.len(), "Loaded store snapshot");
                state
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No snapshot found, starting empty");
                StoreState::default()
            },
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            },
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            path: Some(path),
            policy,
        })
    }

    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert one record; with `upsert` a key collision merges instead of failing
    pub async fn insert(
        &self,
        record: CanonicalRecord,
        upsert: bool,
    ) -> Result<InsertOutcome, StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let outcome = next.insert(record, upsert, self.policy)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(outcome)
    }

    /// Insert every record or none of them
    pub async fn insert_batch(
        &self,
        records: Vec<CanonicalRecord>,
        upsert: bool,
    ) -> Result<Vec<InsertOutcome>, StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            outcomes.push(next.insert(record, upsert, self.policy)?);
        }
        self.persist(&next).await?;
        *guard = next;

        let created = outcomes.iter().filter(|o| o.created).count();
        info!(
            created,
            merged = outcomes.len() - created,
            "Committed record batch"
        );
        Ok(outcomes)
    }

    pub async fn get(&self, id: Uuid) -> Result<StoredRecord, StoreError> {
        let guard = self.state.read().await;
        guard
            .records
            .get(&id)
            .map(|record| StoredRecord {
                id,
                record: record.clone(),
            })
            .ok_or(StoreError::NotFound(id))
    }

    /// All records in insertion order
    pub async fn list(&self) -> Vec<StoredRecord> {
        self.state.read().await.snapshot()
    }

    pub async fn update(&self, id: Uuid, patch: &RecordPatch) -> Result<StoredRecord, StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let updated = next.update(id, patch, self.policy)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        next.delete(id, self.policy)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> StoreStats {
        let guard = self.state.read().await;
        let mut by_location = BTreeMap::new();
        for record in guard.records.values() {
            *by_location.entry(record.location.clone()).or_insert(0) += 1;
        }
        StoreStats {
            total: guard.order.len(),
            by_location,
        }
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(&state.snapshot())?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Err(e) = tokio::fs::write(&tmp, &json).await {
            warn!(path = %tmp.display(), error = %e, "Failed to write snapshot");
            return Err(StoreError::Storage(format!("failed to write {}: {}", tmp.display(), e)));
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            warn!(path = %path.display(), error = %e, "Failed to replace snapshot");
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Storage(format!("failed to replace {}: {}", path.display(), e)));
        }

        debug!(path = %path.display(), records = state.order.len(), "Snapshot written");
        Ok(())
    }
}
