//! Configuration for the sourcing pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for fetching, extraction, merging and concurrency.
///
/// Defaults match production behavior; tests shrink the time-based values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcingConfig {
    /// Companies processed at once.
    pub max_concurrent_companies: usize,

    /// Simultaneous page fetches within one company.
    pub max_concurrent_fetches: usize,

    /// Simultaneous enrichment lookups.
    pub max_concurrent_enrichments: usize,

    /// Cap on drug-detail pages fetched per company.
    pub max_drug_pages_per_company: usize,

    /// Directory holding cache entries.
    pub cache_dir: PathBuf,

    /// Entries older than this read as misses.
    pub cache_ttl: Duration,

    /// Minimum cleaned-text length for a plain HTTP fetch to be usable.
    pub text_threshold: usize,

    /// Minimum rendered-text length before falling back to vision.
    pub vision_threshold: usize,

    /// Below this much text, extraction goes straight to vision when
    /// screenshots are available.
    pub hybrid_threshold: usize,

    /// Plain HTTP request timeout.
    pub http_timeout: Duration,

    /// Browser navigation timeout.
    pub render_timeout: Duration,

    /// Attempts per extraction before giving up.
    pub max_retries: usize,

    /// Delay before each retry attempt, in order.
    pub retry_backoff: Vec<Duration>,

    /// Pages fetched per asset during enrichment.
    pub max_enrichment_sources: usize,
}

impl Default for SourcingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_companies: 3,
            max_concurrent_fetches: 5,
            max_concurrent_enrichments: 3,
            max_drug_pages_per_company: 50,
            cache_dir: PathBuf::from(".cache"),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            text_threshold: 500,
            vision_threshold: 300,
            hybrid_threshold: 3000,
            http_timeout: Duration::from_secs(30),
            render_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(10),
            ],
            max_enrichment_sources: 3,
        }
    }
}

impl SourcingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the plain-HTTP sufficiency threshold.
    pub fn with_text_threshold(mut self, chars: usize) -> Self {
        self.text_threshold = chars;
        self
    }

    /// Set the rendered-text sufficiency threshold.
    pub fn with_vision_threshold(mut self, chars: usize) -> Self {
        self.vision_threshold = chars;
        self
    }

    /// Set the text-vs-vision extraction threshold.
    pub fn with_hybrid_threshold(mut self, chars: usize) -> Self {
        self.hybrid_threshold = chars;
        self
    }

    /// Set the extraction retry budget.
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the retry backoff schedule.
    pub fn with_retry_backoff(mut self, backoff: Vec<Duration>) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the per-company detail-page cap.
    pub fn with_max_drug_pages(mut self, max: usize) -> Self {
        self.max_drug_pages_per_company = max;
        self
    }

    /// Set the fetch concurrency ceiling.
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }

    /// Set the company concurrency ceiling.
    pub fn with_max_concurrent_companies(mut self, max: usize) -> Self {
        self.max_concurrent_companies = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_tuning() {
        let config = SourcingConfig::default();
        assert_eq!(config.text_threshold, 500);
        assert_eq!(config.vision_threshold, 300);
        assert_eq!(config.hybrid_threshold, 3000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff.len(), 3);
        assert_eq!(config.cache_ttl, Duration::from_secs(86400));
    }

    #[test]
    fn builder_overrides() {
        let config = SourcingConfig::new()
            .with_text_threshold(100)
            .with_max_retries(1)
            .with_cache_dir("/tmp/sourcing-test");
        assert_eq!(config.text_threshold, 100);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/sourcing-test"));
    }
}
