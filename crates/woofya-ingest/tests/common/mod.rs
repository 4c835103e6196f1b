//! Shared helpers for ingest integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use woofya_common::types::{FieldValue, RawFields};
use woofya_ingest::adapter::{AdapterError, Page, ParseError, SourceAdapter, SourceDescriptor};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("woofya_ingest=debug")
        .with_test_writer()
        .try_init();
}

pub fn fields(pairs: &[(&str, &str)]) -> RawFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
        .collect()
}

/// A page of `count` records titled `<source>-<page>-<n>`
pub fn page_of(source_id: &str, page_index: u32, count: usize, has_more: bool) -> Page {
    let records = (0..count)
        .map(|n| {
            Ok(fields(&[
                ("title", &format!("{}-{}-{}", source_id, page_index, n)),
                ("location", "Sydney"),
            ]))
        })
        .collect();
    Page::new(records, has_more)
}

pub fn parse_error(message: &str) -> Result<RawFields, ParseError> {
    Err(ParseError::new(message))
}

type Script = dyn Fn(&str, u32, usize) -> Result<Page, AdapterError> + Send + Sync;
type Delay = dyn Fn(&str, u32, usize) -> Option<Duration> + Send + Sync;

/// Adapter driven by a closure of `(source_id, page_index, attempt)`
///
/// `attempt` counts calls for the same page starting at 0.
pub struct ScriptedAdapter {
    script: Box<Script>,
    delay: Box<Delay>,
    calls: Mutex<HashMap<(String, u32), usize>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, u32, usize) -> Result<Page, AdapterError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            delay: Box::new(|_, _, _| None),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay<D>(mut self, delay: D) -> Self
    where
        D: Fn(&str, u32, usize) -> Option<Duration> + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn calls(&self, source_id: &str, page_index: u32) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(source_id.to_string(), page_index))
            .copied()
            .unwrap_or(0)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        page_index: u32,
    ) -> Result<Page, AdapterError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let entry = calls.entry((source.source_id.clone(), page_index)).or_insert(0);
            let attempt = *entry;
            *entry += 1;
            attempt
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = (self.delay)(&source.source_id, page_index, attempt) {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.script)(&source.source_id, page_index, attempt)
    }
}
