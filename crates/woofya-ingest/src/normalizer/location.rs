//! Location canonicalization via an alias table

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Case-folded alias to canonical "City, State" form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationAliases {
    table: HashMap<String, String>,
}

impl Default for LocationAliases {
    fn default() -> Self {
        Self::from_pairs([
            ("sydney", "Sydney, NSW"),
            ("melbourne", "Melbourne, VIC"),
            ("yorke peninsula", "Yorke Peninsula, SA"),
            ("brisbane", "Brisbane, QLD"),
        ])
    }
}

impl LocationAliases {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let table = pairs
            .into_iter()
            .map(|(alias, canonical)| (fold(alias.as_ref()), canonical.into()))
            .collect();
        Self { table }
    }

    /// Load a JSON object of `alias -> canonical`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read location aliases from {}", path.display()))?;
        let pairs: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid location alias file {}", path.display()))?;
        Ok(Self::from_pairs(pairs))
    }

    /// Canonical form of a location; unknown values come back trimmed
    pub fn resolve(&self, location: &str) -> String {
        let trimmed = location.trim();
        self.table
            .get(&fold(trimmed))
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}
