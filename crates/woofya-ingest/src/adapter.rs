//! Source adapter contract
//!
//! An adapter knows how to fetch one page of one source and turn it into
//! loosely-typed field maps. It never retries, never deduplicates and never
//! normalizes; the collector and later stages own all of that.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use woofya_common::types::RawFields;

/// One configured source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub source_id: String,
    /// Registry name of the adapter, e.g. "json_file" or "http_json"
    pub adapter: String,
    /// Adapter-specific base query
    #[serde(default)]
    pub query: String,
    /// Where the adapter should look: a directory, a base URL
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl SourceDescriptor {
    pub fn new(source_id: impl Into<String>, adapter: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            adapter: adapter.into(),
            query: String::new(),
            endpoint: None,
            max_pages: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// A single element the adapter could not turn into fields
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure to fetch a whole page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Worth retrying: timeouts, throttling, server errors
    #[error("transient: {0}")]
    Transient(String),

    /// Retrying will not help: bad request, missing file, malformed page
    #[error("terminal: {0}")]
    Terminal(String),
}

impl AdapterError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AdapterError::Transient(_))
    }
}

/// One fetched page
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Result<RawFields, ParseError>>,
    pub has_more: bool,
}

impl Page {
    pub fn new(records: Vec<Result<RawFields, ParseError>>, has_more: bool) -> Self {
        Self { records, has_more }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Pluggable per-source fetch-and-extract unit
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetch one page of a source
    ///
    /// # Arguments
    /// * `source` - The descriptor being collected
    /// * `page_index` - 1-based page number
    ///
    /// # Returns
    /// The page's elements, each either a field map or a per-element parse
    /// error, plus whether more pages follow.
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        page_index: u32,
    ) -> Result<Page, AdapterError>;
}

/// Adapter name to implementation
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    pub fn with(mut self, name: impl Into<String>, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(name, adapter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Nothing;

    #[async_trait]
    impl SourceAdapter for Nothing {
        async fn fetch_page(&self, _: &SourceDescriptor, _: u32) -> Result<Page, AdapterError> {
            Ok(Page::empty())
        }
    }

    #[test]
    fn test_descriptor_from_json() {
        let source: SourceDescriptor = serde_json::from_str(
            r#"{"source_id": "parks", "adapter": "json_file", "query": "parks"}"#,
        )
        .unwrap();
        assert_eq!(source, SourceDescriptor::new("parks", "json_file").with_query("parks"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AdapterRegistry::new().with("nothing", Arc::new(Nothing));
        assert!(registry.get("nothing").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["nothing"]);
    }
}
