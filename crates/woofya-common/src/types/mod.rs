//! Record types shared by the pipeline and the query server

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field names every aggregated record carries, even when a source omits them.
pub const CANONICAL_FIELDS: [&str; 6] = ["title", "location", "date", "description", "link", "features"];

/// A single adapter-provided field value
///
/// Adapters hand back loosely-shaped data: most fields are plain text,
/// some (features, time slots) are lists, and anything the source did not
/// provide is explicitly `Absent` once the aggregator has stamped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    #[default]
    Absent,
}

impl FieldValue {
    /// Build a value from arbitrary JSON, stringifying scalars.
    ///
    /// Returns `None` for nested objects, which no canonical field can hold.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(FieldValue::Absent),
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            serde_json::Value::Number(n) => Some(FieldValue::Text(n.to_string())),
            serde_json::Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        serde_json::Value::String(s) => out.push(s.clone()),
                        serde_json::Value::Null => {},
                        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
                            out.push(item.to_string())
                        },
                        _ => return None,
                    }
                }
                Some(FieldValue::List(out))
            },
            serde_json::Value::Object(_) => None,
        }
    }

    /// First textual value, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            FieldValue::List(items) => items.first().map(String::as_str),
            FieldValue::Absent => None,
        }
    }

    /// Every textual value in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Text(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().map(String::as_str).collect(),
            FieldValue::Absent => Vec::new(),
        }
    }

    /// True for `Absent`, empty text, and lists with no non-blank entries.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
            FieldValue::Absent => true,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// Field map produced by one adapter for one element
pub type RawFields = BTreeMap<String, FieldValue>;

/// One record as returned by a source adapter
///
/// `fetch_sequence` is assigned by the collector in arrival order within a
/// source. It orders records but never takes part in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source_id: String,
    pub fields: RawFields,
    pub fetch_sequence: u64,
}

impl RawRecord {
    pub fn new(source_id: impl Into<String>, fields: RawFields, fetch_sequence: u64) -> Self {
        Self {
            source_id: source_id.into(),
            fields,
            fetch_sequence,
        }
    }

    /// Text value of a field, `None` when missing or absent
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_text)
    }

    pub fn get(&self, field: &str) -> &FieldValue {
        static ABSENT: FieldValue = FieldValue::Absent;
        self.fields.get(field).unwrap_or(&ABSENT)
    }
}

/// How two records are judged to describe the same real-world entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Case-folded title plus normalized date. Location differences are ignored.
    #[default]
    TitleDate,
    /// Title and date plus the case-folded canonical location.
    TitleDateLocation,
}

impl IdentityPolicy {
    /// Identity key for the given fields, `None` when the title is blank.
    ///
    /// Untitled records never share a key, otherwise every one of them would
    /// collapse into a single entity.
    pub fn key(&self, title: &str, date: Option<NaiveDate>, location: &str) -> Option<String> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let date = date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        let key = match self {
            IdentityPolicy::TitleDate => format!("{}|{}", title.to_lowercase(), date),
            IdentityPolicy::TitleDateLocation => format!(
                "{}|{}|{}",
                title.to_lowercase(),
                date,
                location.trim().to_lowercase()
            ),
        };
        Some(key)
    }
}

impl std::str::FromStr for IdentityPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title_date" | "title-date" => Ok(IdentityPolicy::TitleDate),
            "title_date_location" | "title-date-location" => Ok(IdentityPolicy::TitleDateLocation),
            _ => Err(format!("Invalid identity policy: {}", s)),
        }
    }
}

/// The unit the pipeline produces and the store serves
///
/// Serializes to the interchange format: `title, location, date,
/// description, link, features, source_ids`, with `date` either an ISO
/// `YYYY-MM-DD` string or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CanonicalRecord {
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub source_ids: Vec<String>,
    /// Set by the deduplicator on records that could not be keyed
    #[serde(skip)]
    pub flagged: bool,
}

impl CanonicalRecord {
    pub fn new(title: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn identity_key(&self, policy: IdentityPolicy) -> Option<String> {
        policy.key(&self.title, self.date, &self.location)
    }

    pub fn add_source(&mut self, source_id: &str) {
        push_distinct(&mut self.source_ids, source_id);
    }

    pub fn add_feature(&mut self, feature: &str) {
        let feature = feature.trim();
        if !feature.is_empty() {
            push_distinct(&mut self.features, feature);
        }
    }

    /// Fold a colliding record into this one.
    ///
    /// Scalars keep the values already held (first seen wins); `features`
    /// and `source_ids` take the union in order of first appearance.
    pub fn absorb(&mut self, other: &CanonicalRecord) {
        for feature in &other.features {
            self.add_feature(feature);
        }
        for source in &other.source_ids {
            self.add_source(source);
        }
    }

    /// Missing required fields, empty when the record is storable
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.location.trim().is_empty() {
            missing.push("location");
        }
        missing
    }

    /// Apply a partial update; omitted fields stay as they are
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(ref title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(ref location) = patch.location {
            self.location = location.trim().to_string();
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(ref link) = patch.link {
            self.link = link.clone();
        }
        if let Some(ref features) = patch.features {
            self.features.clear();
            for feature in features {
                self.add_feature(feature);
            }
        }
        if let Some(ref sources) = patch.source_ids {
            self.source_ids.clear();
            for source in sources {
                self.add_source(source);
            }
        }
    }
}

fn push_distinct(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

/// A canonical record with its store-assigned surrogate id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: CanonicalRecord,
}

/// Partial update of a canonical record
///
/// `date` distinguishes "not provided" (`None`) from "set to null"
/// (`Some(None)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<String>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.location.is_none()
            && self.date.is_none()
            && self.description.is_none()
            && self.link.is_none()
            && self.features.is_none()
            && self.source_ids.is_none()
    }
}

fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_from_json() {
        assert_eq!(FieldValue::from_json(&json!("x")), Some(FieldValue::Text("x".into())));
        assert_eq!(FieldValue::from_json(&json!(null)), Some(FieldValue::Absent));
        assert_eq!(FieldValue::from_json(&json!(12)), Some(FieldValue::Text("12".into())));
        assert_eq!(
            FieldValue::from_json(&json!(["a", null, 3])),
            Some(FieldValue::List(vec!["a".into(), "3".into()]))
        );
        assert_eq!(FieldValue::from_json(&json!({"nested": true})), None);
        assert_eq!(FieldValue::from_json(&json!([{"nested": true}])), None);
    }

    #[test]
    fn test_identity_key_ignores_case_and_location() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 1);
        let a = IdentityPolicy::TitleDate.key("  Dog Day ", date, "Sydney, NSW");
        let b = IdentityPolicy::TitleDate.key("dog day", date, "Bondi");
        assert_eq!(a, b);
        assert_eq!(a.as_deref(), Some("dog day|2024-10-01"));
    }

    #[test]
    fn test_identity_key_with_location_policy() {
        let a = IdentityPolicy::TitleDateLocation.key("Dog Day", None, "Sydney, NSW");
        let b = IdentityPolicy::TitleDateLocation.key("Dog Day", None, "Melbourne, VIC");
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_key_blank_title() {
        assert_eq!(IdentityPolicy::TitleDate.key("   ", None, "Sydney"), None);
    }

    #[test]
    fn test_absorb_keeps_first_scalars_and_unions_sets() {
        let mut first = CanonicalRecord::new("Dog Day", "Sydney, NSW");
        first.description = "first".into();
        first.add_feature("off-leash");
        first.add_source("a");

        let mut second = CanonicalRecord::new("dog day", "Sydney");
        second.description = "second".into();
        second.add_feature("water bowls");
        second.add_feature("off-leash");
        second.add_source("b");

        first.absorb(&second);
        assert_eq!(first.title, "Dog Day");
        assert_eq!(first.description, "first");
        assert_eq!(first.features, vec!["off-leash", "water bowls"]);
        assert_eq!(first.source_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_interchange_format() {
        let mut record = CanonicalRecord::new("Dog Day", "Sydney, NSW");
        record.date = NaiveDate::from_ymd_opt(2024, 10, 1);
        record.add_source("eventbrite");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "Dog Day",
                "location": "Sydney, NSW",
                "date": "2024-10-01",
                "description": "",
                "link": "",
                "features": [],
                "source_ids": ["eventbrite"]
            })
        );

        let undated: CanonicalRecord =
            serde_json::from_value(json!({"title": "Walk", "location": "Bondi", "date": null}))
                .unwrap();
        assert_eq!(undated.date, None);
    }

    #[test]
    fn test_patch_distinguishes_null_from_missing() {
        let omitted: RecordPatch = serde_json::from_value(json!({"title": "New"})).unwrap();
        assert_eq!(omitted.date, None);

        let cleared: RecordPatch = serde_json::from_value(json!({"date": null})).unwrap();
        assert_eq!(cleared.date, Some(None));

        let mut record = CanonicalRecord::new("Dog Day", "Sydney, NSW");
        record.date = NaiveDate::from_ymd_opt(2024, 10, 1);
        record.description = "kept".into();
        record.apply(&cleared);
        assert_eq!(record.date, None);
        assert_eq!(record.description, "kept");
    }
}
