//! Web searcher trait for per-asset enrichment lookups.
//!
//! Thin wrapper over an external search provider. The pipeline decides when
//! to spend search budget; implementations only fetch results.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;

use crate::error::FetchError;

/// A discovered URL from web search with metadata.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub url: Url,
    pub title: Option<String>,
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            title: None,
            snippet: None,
        }
    }

    /// Create from a URL string, discarding unparseable input.
    pub fn from_url(url: &str) -> Option<Self> {
        Url::parse(url).ok().map(Self::new)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// Web search for open-world URL discovery.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web, returning ranked results. Failures surface as errors;
    /// callers degrade to an empty result set.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, FetchError>;

    /// Search with a result cap.
    async fn search_with_limit(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, FetchError> {
        let mut results = self.search(query).await?;
        results.truncate(limit);
        Ok(results)
    }
}

/// Mock web searcher for testing.
#[derive(Default)]
pub struct MockWebSearcher {
    results: RwLock<HashMap<String, Vec<SearchResult>>>,
}

impl MockWebSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add results for a query.
    pub fn with_results(self, query: &str, results: Vec<SearchResult>) -> Self {
        self.results
            .write()
            .expect("lock poisoned")
            .insert(query.to_string(), results);
        self
    }

    /// Add URL strings as results.
    pub fn with_urls(self, query: &str, urls: &[&str]) -> Self {
        let results = urls.iter().filter_map(|u| SearchResult::from_url(u)).collect();
        self.with_results(query, results)
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, FetchError> {
        Ok(self
            .results
            .read()
            .expect("lock poisoned")
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

/// DuckDuckGo-backed searcher using the HTML endpoint (no API key).
pub struct DuckDuckGoSearcher {
    client: reqwest::Client,
    max_results: usize,
}

impl Default for DuckDuckGoSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGoSearcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            max_results: 8,
        }
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    fn parse_results(html: &str, cap: usize) -> Vec<SearchResult> {
        let doc = Html::parse_document(html);
        let result_sel = Selector::parse(".result").expect("static selector");
        let link_sel = Selector::parse("a.result__a").expect("static selector");
        let snippet_sel = Selector::parse(".result__snippet").expect("static selector");

        let mut results = Vec::new();
        for item in doc.select(&result_sel) {
            let Some(anchor) = item.select(&link_sel).next() else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(mut result) = SearchResult::from_url(href) else {
                continue;
            };

            let title: String = anchor.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                result = result.with_title(title);
            }
            if let Some(snippet_el) = item.select(&snippet_sel).next() {
                let snippet: String = snippet_el.text().collect::<String>().trim().to_string();
                if !snippet.is_empty() {
                    result = result.with_snippet(snippet);
                }
            }

            results.push(result);
            if results.len() >= cap {
                break;
            }
        }
        results
    }
}

#[async_trait]
impl WebSearcher for DuckDuckGoSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, FetchError> {
        let response = self
            .client
            .post("https://html.duckduckgo.com/html/")
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Http(
                format!("search returned HTTP {}", response.status()).into(),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self::parse_results(&html, self.max_results))
    }
}
