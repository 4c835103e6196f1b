//! Adapter over pre-scraped JSON files
//!
//! Each source is a set of files `<dir>/<query>*.json`; page N is the N-th
//! file in lexical order. Useful for replaying scrapes that were saved to
//! disk and for tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::page_from_json;
use crate::adapter::{AdapterError, Page, SourceAdapter, SourceDescriptor};

#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    root: PathBuf,
}

impl JsonFileAdapter {
    /// Directory used when a descriptor has no `endpoint`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn page_files(&self, dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, AdapterError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| AdapterError::Terminal(format!("cannot read {}: {}", dir.display(), e)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AdapterError::Terminal(format!("cannot list {}: {}", dir.display(), e)))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(prefix) && name.ends_with(".json") {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl SourceAdapter for JsonFileAdapter {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        page_index: u32,
    ) -> Result<Page, AdapterError> {
        let dir = source
            .endpoint
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.root.clone());
        let files = self.page_files(&dir, &source.query).await?;

        let Some(path) = (page_index as usize)
            .checked_sub(1)
            .and_then(|index| files.get(index))
        else {
            return Ok(Page::empty());
        };

        debug!(source_id = %source.source_id, page_index, file = %path.display(), "Reading page file");

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AdapterError::Terminal(format!("cannot read {}: {}", path.display(), e)))?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| AdapterError::Terminal(format!("invalid JSON in {}: {}", path.display(), e)))?;

        let (mut page, _) = page_from_json(&body)?;
        page.has_more = (page_index as usize) < files.len();
        Ok(page)
    }
}
