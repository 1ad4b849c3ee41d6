//! Tiered content acquisition.
//!
//! The fetcher escalates through acquisition tiers (cache, plain HTTP,
//! headless rendering, vision-pending) until a sufficiency threshold is met
//! or every tier is exhausted. `fetch` never fails: all failure paths
//! resolve to a `Failed` result with empty text, so one bad URL can never
//! abort a run.

pub mod html;
pub mod links;
pub mod rate_limited;
pub mod render;

pub use rate_limited::RateLimitedFetcher;
#[cfg(feature = "render")]
pub use render::HeadlessRenderer;
pub use render::{RenderedPage, Renderer};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{ContentCache, ContentKind};
use crate::error::FetchError;
use crate::security::UrlValidator;
use crate::types::config::SourcingConfig;
use crate::types::fetch::{FetchMethod, FetchResult};
use html::clean_html;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Content acquisition interface consumed by the pipeline.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch page content, escalating through acquisition tiers.
    /// Never fails; exhaustion yields [`FetchMethod::Failed`].
    async fn fetch(&self, url: &str, use_cache: bool) -> FetchResult;

    /// Release any owned acquisition resources (e.g. the headless browser).
    /// Called once at the end of a full run.
    async fn shutdown(&self) {}
}

#[async_trait]
impl<T: ContentFetcher + ?Sized> ContentFetcher for Arc<T> {
    async fn fetch(&self, url: &str, use_cache: bool) -> FetchResult {
        (**self).fetch(url, use_cache).await
    }

    async fn shutdown(&self) {
        (**self).shutdown().await;
    }
}

/// Plain HTTP transport, separated from the tier logic so tests can
/// substitute scripted responses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET a URL, returning the response body on 2xx.
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed transport with a realistic browser user-agent,
/// following redirects under a bounded timeout.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(BROWSER_USER_AGENT)
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(format!("HTTP {status}").into()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))
    }
}

/// The cascading fetcher: cache → HTTP → rendered DOM → vision-pending.
pub struct TieredFetcher {
    transport: Arc<dyn HttpTransport>,
    renderer: Option<Arc<dyn Renderer>>,
    cache: ContentCache,
    validator: UrlValidator,
    text_threshold: usize,
    vision_threshold: usize,
}

impl TieredFetcher {
    pub fn new(config: &SourcingConfig) -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::new(config.http_timeout)),
            renderer: None,
            cache: ContentCache::new(&config.cache_dir, config.cache_ttl),
            validator: UrlValidator::new(),
            text_threshold: config.text_threshold,
            vision_threshold: config.vision_threshold,
        }
    }

    /// Substitute the HTTP transport (tests).
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Attach the rendering tier. Without a renderer, escalation past
    /// plain HTTP exhausts to `Failed`.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    fn store(&self, url: &str, text: &str) {
        if let Err(e) = self.cache.set(url, text, ContentKind::Text) {
            warn!(url, error = %e, "cache write failed");
        }
    }
}

#[async_trait]
impl ContentFetcher for TieredFetcher {
    async fn fetch(&self, url: &str, use_cache: bool) -> FetchResult {
        if let Err(e) = self.validator.validate(url) {
            warn!(url, error = %e, "refusing to fetch");
            return FetchResult::failed();
        }

        if use_cache {
            if let Some(content) = self.cache.get(url) {
                debug!(url, "cache hit");
                return FetchResult::cache_hit(content);
            }
        }

        // Tier 1: plain HTTP.
        match self.transport.get(url).await {
            Ok(page_html) => {
                let cleaned = clean_html(&page_html);
                if cleaned.text.len() >= self.text_threshold {
                    self.store(url, &cleaned.text);
                    info!(url, chars = cleaned.text.len(), "http fetch sufficient");
                    return FetchResult {
                        text: cleaned.text,
                        html: page_html,
                        screenshots: Vec::new(),
                        method: FetchMethod::HttpFetch,
                        links: cleaned.links,
                    };
                }
                debug!(
                    url,
                    chars = cleaned.text.len(),
                    "http text below threshold, escalating"
                );
            }
            Err(e) => debug!(url, error = %e, "http fetch failed, escalating"),
        }

        // Tier 2: headless rendering.
        let Some(renderer) = &self.renderer else {
            warn!(url, "no renderer configured; tiers exhausted");
            return FetchResult::failed();
        };
        let rendered = match renderer.render(url).await {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(url, error = %e, "render failed; tiers exhausted");
                return FetchResult::failed();
            }
        };

        let cleaned = clean_html(&rendered.html);
        if cleaned.text.len() >= self.vision_threshold {
            self.store(url, &cleaned.text);
            info!(
                url,
                chars = cleaned.text.len(),
                tiles = rendered.screenshots.len(),
                "rendered fetch sufficient"
            );
            return FetchResult {
                text: cleaned.text,
                html: rendered.html,
                screenshots: rendered.screenshots,
                method: FetchMethod::RenderedFetch,
                links: cleaned.links,
            };
        }

        // Tier 3: hand thin text plus screenshots to the vision extractor.
        if rendered.screenshots.is_empty() {
            warn!(url, "rendered text thin and no screenshots captured");
            return FetchResult::failed();
        }
        info!(
            url,
            chars = cleaned.text.len(),
            tiles = rendered.screenshots.len(),
            "falling back to vision extraction"
        );
        FetchResult {
            text: cleaned.text,
            html: rendered.html,
            screenshots: rendered.screenshots,
            method: FetchMethod::VisionPending,
            links: cleaned.links,
        }
    }

    async fn shutdown(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRenderer, MockTransport};
    use uuid::Uuid;

    fn test_config() -> SourcingConfig {
        SourcingConfig::default()
            .with_cache_dir(std::env::temp_dir().join(format!("sourcing-fetch-{}", Uuid::new_v4())))
    }

    fn page_of(chars: usize) -> String {
        format!("<html><body><main><p>{}</p></main></body></html>", "a".repeat(chars))
    }

    #[tokio::test]
    async fn http_tier_sufficient_returns_http_fetch() {
        let url = "https://example.com/pipeline";
        let fetcher = TieredFetcher::new(&test_config())
            .with_transport(Arc::new(MockTransport::new().with_response(url, page_of(600))));

        let result = fetcher.fetch(url, false).await;
        assert_eq!(result.method, FetchMethod::HttpFetch);
        assert!(result.text.len() >= 500);
    }

    #[tokio::test]
    async fn thin_http_escalates_to_rendered_fetch() {
        // 100 chars of HTTP text (below 500) and 2000 chars rendered
        // (above 300) must report RenderedFetch, never HttpFetch or
        // VisionPending.
        let url = "https://example.com/pipeline";
        let fetcher = TieredFetcher::new(&test_config())
            .with_transport(Arc::new(MockTransport::new().with_response(url, page_of(100))))
            .with_renderer(Arc::new(MockRenderer::new().with_page(page_of(2000), 2)));

        let result = fetcher.fetch(url, false).await;
        assert_eq!(result.method, FetchMethod::RenderedFetch);
        assert!(result.text.len() >= 2000);
        assert_eq!(result.screenshots.len(), 2);
    }

    #[tokio::test]
    async fn thin_rendered_text_reports_vision_pending() {
        let url = "https://example.com/pipeline";
        let fetcher = TieredFetcher::new(&test_config())
            .with_transport(Arc::new(MockTransport::new().with_response(url, page_of(100))))
            .with_renderer(Arc::new(MockRenderer::new().with_page(page_of(50), 3)));

        let result = fetcher.fetch(url, false).await;
        assert_eq!(result.method, FetchMethod::VisionPending);
        assert_eq!(result.screenshots.len(), 3);
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn total_failure_returns_failed_never_panics() {
        let url = "https://example.com/pipeline";
        let fetcher = TieredFetcher::new(&test_config())
            .with_transport(Arc::new(MockTransport::failing()))
            .with_renderer(Arc::new(MockRenderer::failing()));

        let result = fetcher.fetch(url, false).await;
        assert_eq!(result.method, FetchMethod::Failed);
        assert!(result.text.is_empty());
    }

    #[tokio::test]
    async fn http_failure_alone_still_escalates() {
        let url = "https://example.com/pipeline";
        let fetcher = TieredFetcher::new(&test_config())
            .with_transport(Arc::new(MockTransport::failing()))
            .with_renderer(Arc::new(MockRenderer::new().with_page(page_of(2000), 1)));

        let result = fetcher.fetch(url, false).await;
        assert_eq!(result.method, FetchMethod::RenderedFetch);
    }

    #[tokio::test]
    async fn no_renderer_exhausts_to_failed() {
        let url = "https://example.com/pipeline";
        let fetcher = TieredFetcher::new(&test_config())
            .with_transport(Arc::new(MockTransport::new().with_response(url, page_of(100))));

        let result = fetcher.fetch(url, false).await;
        assert_eq!(result.method, FetchMethod::Failed);
    }

    #[tokio::test]
    async fn cache_hit_short_circuits_network() {
        let url = "https://example.com/pipeline";
        let config = test_config();
        let cache = ContentCache::new(&config.cache_dir, config.cache_ttl);
        cache.set(url, "cached pipeline text", ContentKind::Text).unwrap();

        let transport = Arc::new(MockTransport::failing());
        let fetcher = TieredFetcher::new(&config).with_transport(transport.clone());

        let result = fetcher.fetch(url, true).await;
        assert_eq!(result.method, FetchMethod::CacheHit);
        assert_eq!(result.text, "cached pipeline text");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn use_cache_false_bypasses_cache() {
        let url = "https://example.com/pipeline";
        let config = test_config();
        let cache = ContentCache::new(&config.cache_dir, config.cache_ttl);
        cache.set(url, "stale", ContentKind::Text).unwrap();

        let fetcher = TieredFetcher::new(&config)
            .with_transport(Arc::new(MockTransport::new().with_response(url, page_of(600))));

        let result = fetcher.fetch(url, false).await;
        assert_eq!(result.method, FetchMethod::HttpFetch);
    }

    #[tokio::test]
    async fn successful_fetch_populates_cache() {
        let url = "https://example.com/pipeline";
        let config = test_config();
        let fetcher = TieredFetcher::new(&config)
            .with_transport(Arc::new(MockTransport::new().with_response(url, page_of(600))));

        let first = fetcher.fetch(url, true).await;
        assert_eq!(first.method, FetchMethod::HttpFetch);

        let second = fetcher.fetch(url, true).await;
        assert_eq!(second.method, FetchMethod::CacheHit);
        assert_eq!(second.text, first.text);
    }

    #[tokio::test]
    async fn blocked_url_fails_without_network() {
        let fetcher = TieredFetcher::new(&test_config())
            .with_transport(Arc::new(MockTransport::failing()));

        let result = fetcher.fetch("http://127.0.0.1/admin", false).await;
        assert_eq!(result.method, FetchMethod::Failed);
    }

    #[tokio::test]
    async fn shutdown_reaches_renderer() {
        let renderer = Arc::new(MockRenderer::new().with_page(page_of(2000), 1));
        let fetcher = TieredFetcher::new(&test_config()).with_renderer(renderer.clone());

        fetcher.shutdown().await;
        assert_eq!(renderer.shutdown_count(), 1);
    }
}
