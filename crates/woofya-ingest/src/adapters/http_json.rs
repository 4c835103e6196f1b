//! Adapter over a paginated JSON HTTP endpoint
//!
//! Requests `GET <endpoint>?<query>&page=<n>`. The response body is either a
//! JSON array (a full page implies more may follow) or an object
//! `{"records": [...], "has_more": bool}`.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

use super::page_from_json;
use crate::adapter::{AdapterError, Page, SourceAdapter, SourceDescriptor};

const USER_AGENT: &str = concat!("woofya-ingest/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpJsonAdapter {
    client: reqwest::Client,
}

impl HttpJsonAdapter {
    /// Build an adapter whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn query_pairs(query: &str) -> Vec<(&str, &str)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}

fn classify(err: reqwest::Error) -> AdapterError {
    if err.is_builder() {
        AdapterError::Terminal(err.to_string())
    } else {
        AdapterError::Transient(err.to_string())
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonAdapter {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        page_index: u32,
    ) -> Result<Page, AdapterError> {
        let endpoint = source.endpoint.as_deref().ok_or_else(|| {
            AdapterError::Terminal(format!("source '{}' has no endpoint", source.source_id))
        })?;

        let page = page_index.to_string();
        let mut params = query_pairs(&source.query);
        params.push(("page", page.as_str()));

        debug!(source_id = %source.source_id, page_index, endpoint, "Fetching page");

        let response = self
            .client
            .get(endpoint)
            .query(&params)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AdapterError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(AdapterError::Terminal(format!("HTTP {}", status)));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                AdapterError::Terminal(format!("invalid JSON body: {}", e))
            } else {
                AdapterError::Transient(e.to_string())
            }
        })?;

        let (mut page, explicit) = page_from_json(&body)?;
        if explicit.is_none() {
            page.has_more = !page.records.is_empty();
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs() {
        assert_eq!(
            query_pairs("?q=dogs&city=sydney"),
            vec![("q", "dogs"), ("city", "sydney")]
        );
        assert_eq!(query_pairs("flag"), vec![("flag", "")]);
        assert!(query_pairs("").is_empty());
    }
}
