//! Merge records that describe the same entity
//!
//! Records collide when their identity keys match (see [`IdentityPolicy`]).
//! The first record seen keeps its scalar fields; `features` and
//! `source_ids` accumulate across every duplicate in order of first
//! appearance. Untitled records have no key, so they are never merged; each
//! is kept and flagged for the validator.

use std::collections::HashMap;
use tracing::{debug, warn};
use woofya_common::types::{CanonicalRecord, IdentityPolicy, RawRecord};

use crate::normalizer::normalize_date;

#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator {
    policy: IdentityPolicy,
}

impl Deduplicator {
    pub fn new(policy: IdentityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// Build canonical records from normalized raw records and merge duplicates
    pub fn deduplicate(&self, records: Vec<RawRecord>) -> Vec<CanonicalRecord> {
        self.merge(records.iter().map(to_canonical).collect())
    }

    /// Merge already-canonical records
    ///
    /// Running this over its own output returns the same records.
    pub fn merge(&self, records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
        let total = records.len();
        let mut merged: Vec<CanonicalRecord> = Vec::with_capacity(total);
        let mut index: HashMap<String, usize> = HashMap::new();

        for mut record in records {
            match record.identity_key(self.policy) {
                None => {
                    warn!(source_ids = ?record.source_ids, "Record has no title, keeping it unmerged");
                    record.flagged = true;
                    merged.push(record);
                },
                Some(key) => match index.get(&key) {
                    Some(&position) => {
                        debug!(key = %key, "Merging duplicate record");
                        merged[position].absorb(&record);
                    },
                    None => {
                        index.insert(key, merged.len());
                        merged.push(record);
                    },
                },
            }
        }

        debug!(input = total, output = merged.len(), "Deduplication complete");
        merged
    }
}

/// Lift one normalized raw record into canonical shape
pub fn to_canonical(raw: &RawRecord) -> CanonicalRecord {
    let text = |field: &str| raw.text(field).map(str::trim).unwrap_or_default().to_string();

    let mut record = CanonicalRecord::new(text("title"), text("location"));
    record.date = raw.text("date").and_then(normalize_date);
    record.description = text("description");
    record.link = text("link");
    for feature in raw.get("features").values() {
        record.add_feature(feature);
    }

    // Previously merged records carry their provenance with them
    let carried = raw.get("source_ids").values();
    if carried.iter().all(|s| s.trim().is_empty()) {
        record.add_source(&raw.source_id);
    } else {
        for source in carried.into_iter().map(str::trim).filter(|s| !s.is_empty()) {
            record.add_source(source);
        }
    }
    record
}
