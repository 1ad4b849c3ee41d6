//! Rate-limited fetcher wrapper.
//!
//! Wraps any [`ContentFetcher`] with rate limiting using the governor crate,
//! keeping the sustained request rate against target sites polite.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::fetch::ContentFetcher;
use crate::types::fetch::FetchResult;

type DefaultRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A fetcher wrapper that enforces a sustained request rate.
pub struct RateLimitedFetcher<F> {
    inner: F,
    limiter: Arc<DefaultRateLimiter>,
}

impl<F: ContentFetcher> RateLimitedFetcher<F> {
    /// Limit the wrapped fetcher to `requests_per_second`.
    pub fn new(inner: F, requests_per_second: NonZeroU32) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(requests_per_second))),
        }
    }

    /// Limit with a custom quota (burst support, per-minute rates).
    pub fn with_quota(inner: F, quota: Quota) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<F: ContentFetcher> ContentFetcher for RateLimitedFetcher<F> {
    async fn fetch(&self, url: &str, use_cache: bool) -> FetchResult {
        self.limiter.until_ready().await;
        self.inner.fetch(url, use_cache).await
    }

    async fn shutdown(&self) {
        self.inner.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::types::fetch::FetchMethod;
    use nonzero_ext::nonzero;

    #[tokio::test]
    async fn delegates_to_inner_fetcher() {
        let inner = MockFetcher::new().with_text_page("https://example.com", "content");
        let limited = RateLimitedFetcher::new(inner, nonzero!(100u32));

        let result = limited.fetch("https://example.com", true).await;
        assert_eq!(result.method, FetchMethod::HttpFetch);
        assert_eq!(result.text, "content");
    }

    #[tokio::test]
    async fn spaces_out_requests_beyond_burst() {
        // governor keeps its own clock, so this test runs in real time
        // with a tight quota to stay fast.
        let inner = MockFetcher::new().with_text_page("https://example.com", "content");
        let limited = RateLimitedFetcher::new(inner, nonzero!(4u32));

        let start = std::time::Instant::now();
        limited.fetch("https://example.com", true).await;
        limited.fetch("https://example.com", true).await;
        // The second request must wait out the 4 req/s quota (~250ms).
        assert!(start.elapsed() >= std::time::Duration::from_millis(150));
    }
}
