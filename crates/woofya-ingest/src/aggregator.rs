//! Combine collected records into one uniformly-shaped batch
//!
//! Sources disagree on vocabulary ("name" vs "title", "url" vs "link") and
//! on what they leave out. The aggregator renames known aliases onto the
//! canonical field names, turns scraper placeholders such as "N/A" into
//! `Absent`, and stamps every missing canonical field as `Absent`. It does
//! not drop, merge or validate anything.

use tracing::debug;
use woofya_common::types::{FieldValue, RawRecord, CANONICAL_FIELDS};

/// Source field name to canonical field name
pub const FIELD_ALIASES: [(&str, &str); 6] = [
    ("name", "title"),
    ("location_name", "title"),
    ("date_range", "date"),
    ("url", "link"),
    ("suburb", "location"),
    ("address", "location"),
];

/// Text that scrapers emit in place of a missing value
const PLACEHOLDERS: [&str; 9] = [
    "n/a",
    "na",
    "none",
    "null",
    "no title found",
    "title not found",
    "no location found",
    "location not found",
    "no description found",
];

fn is_placeholder(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    PLACEHOLDERS.contains(&value.as_str())
}

fn clean_value(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Text(text) if is_placeholder(&text) => FieldValue::Absent,
        FieldValue::List(items) => {
            let kept: Vec<String> = items.into_iter().filter(|item| !is_placeholder(item)).collect();
            if kept.is_empty() {
                FieldValue::Absent
            } else {
                FieldValue::List(kept)
            }
        },
        other => other,
    }
}

/// Shape one record
pub fn shape(mut record: RawRecord) -> RawRecord {
    for (alias, canonical) in FIELD_ALIASES {
        let canonical_present = record
            .fields
            .get(canonical)
            .is_some_and(|value| !value.is_blank());
        if canonical_present {
            continue;
        }
        if let Some(value) = record.fields.remove(alias) {
            if !value.is_blank() {
                record.fields.insert(canonical.to_string(), value);
            } else {
                record.fields.insert(alias.to_string(), value);
            }
        }
    }

    record.fields = std::mem::take(&mut record.fields)
        .into_iter()
        .map(|(name, value)| (name, clean_value(value)))
        .collect();

    for field in CANONICAL_FIELDS {
        record
            .fields
            .entry(field.to_string())
            .or_insert(FieldValue::Absent);
    }

    record
}

/// Shape every record, keeping order
pub fn aggregate(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let total = records.len();
    let shaped: Vec<RawRecord> = records.into_iter().map(shape).collect();
    debug!(records = total, "Aggregated records");
    shaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use woofya_common::types::RawFields;

    fn raw(fields: &[(&str, &str)]) -> RawRecord {
        let fields: RawFields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect();
        RawRecord::new("test", fields, 0)
    }

    #[test]
    fn test_missing_fields_are_stamped_absent() {
        let shaped = shape(raw(&[("title", "Dog Day")]));
        for field in CANONICAL_FIELDS {
            assert!(shaped.fields.contains_key(field), "missing {field}");
        }
        assert_eq!(shaped.get("location"), &FieldValue::Absent);
        assert_eq!(shaped.text("title"), Some("Dog Day"));
    }

    #[test]
    fn test_aliases_fill_canonical_names() {
        let shaped = shape(raw(&[
            ("name", "Centennial Park"),
            ("suburb", "Paddington"),
            ("url", "https://example.com/park"),
        ]));
        assert_eq!(shaped.text("title"), Some("Centennial Park"));
        assert_eq!(shaped.text("location"), Some("Paddington"));
        assert_eq!(shaped.text("link"), Some("https://example.com/park"));
        assert!(!shaped.fields.contains_key("name"));
    }

    #[test]
    fn test_canonical_field_wins_over_alias() {
        let shaped = shape(raw(&[("title", "Dog Day"), ("name", "Other")]));
        assert_eq!(shaped.text("title"), Some("Dog Day"));
        assert_eq!(shaped.text("name"), Some("Other"));
    }

    #[test]
    fn test_placeholders_become_absent() {
        let shaped = shape(raw(&[("title", "No title found"), ("location", " N/A ")]));
        assert_eq!(shaped.get("title"), &FieldValue::Absent);
        assert_eq!(shaped.get("location"), &FieldValue::Absent);
    }

    #[test]
    fn test_aggregate_keeps_order() {
        let records = vec![raw(&[("title", "b")]), raw(&[("title", "a")])];
        let shaped = aggregate(records);
        assert_eq!(shaped[0].text("title"), Some("b"));
        assert_eq!(shaped[1].text("title"), Some("a"));
    }
}
