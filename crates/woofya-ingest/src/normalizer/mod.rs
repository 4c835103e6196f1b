//! Field normalization
//!
//! Rewrites `date` to `YYYY-MM-DD` (or `Absent` when unparseable) and
//! `location` to its canonical form. Every other field passes through.

pub mod date;
pub mod location;

pub use date::{format_date, normalize_date, DATE_FORMATS};
pub use location::LocationAliases;

use tracing::debug;
use woofya_common::types::{FieldValue, RawRecord};

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    aliases: LocationAliases,
}

impl Normalizer {
    pub fn new(aliases: LocationAliases) -> Self {
        Self { aliases }
    }

    pub fn normalize(&self, mut record: RawRecord) -> RawRecord {
        if let Some(date) = record.fields.get_mut("date") {
            let parsed = date.values().into_iter().find_map(normalize_date);
            if parsed.is_none() && !date.is_blank() {
                debug!(
                    source_id = %record.source_id,
                    value = ?date,
                    "Unrecognized date, treating as absent"
                );
            }
            *date = parsed.map_or(FieldValue::Absent, |d| FieldValue::Text(format_date(d)));
        }

        if let Some(location) = record.fields.get_mut("location") {
            if let Some(text) = location.as_text() {
                let canonical = self.aliases.resolve(text);
                *location = if canonical.is_empty() {
                    FieldValue::Absent
                } else {
                    FieldValue::Text(canonical)
                };
            }
        }

        record
    }

    pub fn normalize_all(&self, records: Vec<RawRecord>) -> Vec<RawRecord> {
        records.into_iter().map(|r| self.normalize(r)).collect()
    }
}
