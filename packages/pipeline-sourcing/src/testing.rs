//! Mock implementations for exercising the pipeline without network,
//! browser or LLM calls.
//!
//! Mocks return scripted responses and track their calls for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{ExtractError, ExtractResult, FetchError};
use crate::fetch::render::{RenderedPage, Renderer};
use crate::fetch::{ContentFetcher, HttpTransport};
use crate::traits::llm::{LlmClient, StructuredRequest};
use crate::types::fetch::{FetchMethod, FetchResult};

/// Record of a call made to [`MockLlm`].
#[derive(Debug, Clone)]
pub enum MockLlmCall {
    Structured {
        system: String,
        user: String,
        images: usize,
    },
    Complete {
        system: String,
        user: String,
    },
}

/// A mock LLM returning scripted responses.
///
/// Structured responses are matched by queue first (in order, for retry
/// sequences), then by user-prompt substring (for multi-page scenarios),
/// then a default empty asset list.
#[derive(Default)]
pub struct MockLlm {
    structured_queue: Mutex<VecDeque<String>>,
    keyed_responses: RwLock<Vec<(String, String)>>,
    completion_queue: Mutex<VecDeque<String>>,
    structured_error: RwLock<Option<String>>,
    completion_error: RwLock<Option<String>>,
    calls: Arc<RwLock<Vec<MockLlmCall>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a structured response; queued responses are consumed in order.
    pub fn with_structured_response(self, response: impl Into<String>) -> Self {
        self.structured_queue
            .lock()
            .expect("lock poisoned")
            .push_back(response.into());
        self
    }

    /// Return `response` whenever the user prompt contains `needle`.
    pub fn with_keyed_response(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.keyed_responses
            .write()
            .expect("lock poisoned")
            .push((needle.into(), response.into()));
        self
    }

    /// Queue a free-form completion response.
    pub fn with_completion(self, response: impl Into<String>) -> Self {
        self.completion_queue
            .lock()
            .expect("lock poisoned")
            .push_back(response.into());
        self
    }

    /// Make every structured call fail with a provider error.
    pub fn failing_structured(self, message: impl Into<String>) -> Self {
        *self.structured_error.write().expect("lock poisoned") = Some(message.into());
        self
    }

    /// Make every completion call fail with a provider error.
    pub fn failing_completion(self, message: impl Into<String>) -> Self {
        *self.completion_error.write().expect("lock poisoned") = Some(message.into());
        self
    }

    /// All calls made to this mock.
    pub fn calls(&self) -> Vec<MockLlmCall> {
        self.calls.read().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate_structured(&self, request: &StructuredRequest) -> ExtractResult<String> {
        self.calls
            .write()
            .expect("lock poisoned")
            .push(MockLlmCall::Structured {
                system: request.system.clone(),
                user: request.user.clone(),
                images: request.images.len(),
            });

        if let Some(message) = self.structured_error.read().expect("lock poisoned").clone() {
            return Err(ExtractError::Llm(message.into()));
        }

        if let Some(queued) = self
            .structured_queue
            .lock()
            .expect("lock poisoned")
            .pop_front()
        {
            return Ok(queued);
        }

        for (needle, response) in self.keyed_responses.read().expect("lock poisoned").iter() {
            if request.user.contains(needle) {
                return Ok(response.clone());
            }
        }

        Ok(r#"{"assets":[]}"#.to_string())
    }

    async fn complete(&self, system: &str, user: &str) -> ExtractResult<String> {
        self.calls
            .write()
            .expect("lock poisoned")
            .push(MockLlmCall::Complete {
                system: system.to_string(),
                user: user.to_string(),
            });

        if let Some(message) = self.completion_error.read().expect("lock poisoned").clone() {
            return Err(ExtractError::Llm(message.into()));
        }

        Ok(self
            .completion_queue
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .unwrap_or_else(|| "{}".to_string()))
    }
}

/// A mock fetcher serving predefined results per URL.
///
/// Unknown URLs resolve to `Failed`, matching the real fetcher's
/// never-throws contract.
#[derive(Default)]
pub struct MockFetcher {
    pages: RwLock<HashMap<String, FetchResult>>,
    calls: RwLock<Vec<String>>,
    shutdowns: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a full fetch result for a URL.
    pub fn with_result(self, url: impl Into<String>, result: FetchResult) -> Self {
        self.pages
            .write()
            .expect("lock poisoned")
            .insert(url.into(), result);
        self
    }

    /// Serve a plain text page (method `HttpFetch`, no screenshots).
    pub fn with_text_page(self, url: impl Into<String>, text: &str) -> Self {
        let result = FetchResult {
            text: text.to_string(),
            html: String::new(),
            screenshots: Vec::new(),
            method: FetchMethod::HttpFetch,
            links: Vec::new(),
        };
        self.with_result(url, result)
    }

    /// URLs fetched, in order.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls.read().expect("lock poisoned").clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _use_cache: bool) -> FetchResult {
        self.calls
            .write()
            .expect("lock poisoned")
            .push(url.to_string());
        self.pages
            .read()
            .expect("lock poisoned")
            .get(url)
            .cloned()
            .unwrap_or_else(FetchResult::failed)
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// A mock HTTP transport for fetcher tier tests.
#[derive(Default)]
pub struct MockTransport {
    responses: RwLock<HashMap<String, String>>,
    fail_all: bool,
    call_count: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport where every request fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Serve an HTML body for a URL.
    pub fn with_response(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.responses
            .write()
            .expect("lock poisoned")
            .insert(url.into(), html.into());
        self
    }

    /// Number of GETs issued.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(FetchError::Http("mock connection refused".into()));
        }
        self.responses
            .read()
            .expect("lock poisoned")
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Http(format!("no mock response for {url}").into()))
    }
}

/// A mock renderer for fetcher tier tests.
#[derive(Default)]
pub struct MockRenderer {
    html: RwLock<String>,
    screenshot_count: RwLock<usize>,
    fail_all: bool,
    shutdowns: AtomicUsize,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer where every render fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Serve rendered HTML plus `tiles` placeholder screenshots.
    pub fn with_page(self, html: impl Into<String>, tiles: usize) -> Self {
        *self.html.write().expect("lock poisoned") = html.into();
        *self.screenshot_count.write().expect("lock poisoned") = tiles;
        self
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, FetchError> {
        if self.fail_all {
            return Err(FetchError::Render(format!("mock render failure for {url}")));
        }
        let tiles = *self.screenshot_count.read().expect("lock poisoned");
        Ok(RenderedPage {
            html: self.html.read().expect("lock poisoned").clone(),
            screenshots: vec![vec![0u8; 16]; tiles],
        })
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_llm_queue_then_keyed_then_default() {
        let llm = MockLlm::new()
            .with_structured_response("queued")
            .with_keyed_response("needle", "keyed");

        let request = StructuredRequest::new("sys", "has needle inside", "s", serde_json::json!({}));
        assert_eq!(llm.generate_structured(&request).await.unwrap(), "queued");
        assert_eq!(llm.generate_structured(&request).await.unwrap(), "keyed");

        let other = StructuredRequest::new("sys", "nothing relevant", "s", serde_json::json!({}));
        assert_eq!(
            llm.generate_structured(&other).await.unwrap(),
            r#"{"assets":[]}"#
        );
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn mock_fetcher_unknown_url_fails_gracefully() {
        let fetcher = MockFetcher::new().with_text_page("https://known.example", "text");

        let known = fetcher.fetch("https://known.example", true).await;
        assert_eq!(known.method, FetchMethod::HttpFetch);

        let unknown = fetcher.fetch("https://unknown.example", true).await;
        assert!(unknown.method.is_failed());

        assert_eq!(fetcher.fetched_urls().len(), 2);
    }

    #[tokio::test]
    async fn mock_renderer_failure_and_tiles() {
        let failing = MockRenderer::failing();
        assert!(failing.render("https://x.example").await.is_err());

        let ok = MockRenderer::new().with_page("<html></html>", 4);
        let page = ok.render("https://x.example").await.unwrap();
        assert_eq!(page.screenshots.len(), 4);
    }
}
