//! Bundled source adapters
//!
//! - [`JsonFileAdapter`]: pre-scraped JSON pages on disk
//! - [`HttpJsonAdapter`]: paginated JSON over HTTP

pub mod http_json;
pub mod json_file;

pub use http_json::HttpJsonAdapter;
pub use json_file::JsonFileAdapter;

use crate::adapter::{AdapterError, Page, ParseError};
use serde_json::Value;
use woofya_common::types::{FieldValue, RawFields};

/// Turn one JSON element into a field map
///
/// Only flat objects are accepted; a scalar element or a nested object value
/// is a per-element parse error.
pub fn fields_from_json(value: &Value) -> Result<RawFields, ParseError> {
    let Value::Object(map) = value else {
        return Err(ParseError::new(format!("expected an object, got {}", kind(value))));
    };

    let mut fields = RawFields::new();
    for (name, raw) in map {
        let field = FieldValue::from_json(raw)
            .ok_or_else(|| ParseError::new(format!("field '{}' is not a scalar or list", name)))?;
        fields.insert(name.clone(), field);
    }
    Ok(fields)
}

/// Interpret a page body
///
/// Accepts either a bare array of records or `{"records": [...],
/// "has_more": bool}`. Returns the page plus whether the body carried its
/// own `has_more` flag.
pub(crate) fn page_from_json(body: &Value) -> Result<(Page, Option<bool>), AdapterError> {
    let (items, has_more) = match body {
        Value::Array(items) => (items, None),
        Value::Object(map) => {
            let items = map
                .get("records")
                .and_then(Value::as_array)
                .ok_or_else(|| AdapterError::Terminal("page object has no 'records' array".into()))?;
            (items, map.get("has_more").and_then(Value::as_bool))
        },
        other => {
            return Err(AdapterError::Terminal(format!(
                "expected an array of records, got {}",
                kind(other)
            )))
        },
    };

    let records = items.iter().map(fields_from_json).collect();
    Ok((Page::new(records, has_more.unwrap_or(false)), has_more))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
