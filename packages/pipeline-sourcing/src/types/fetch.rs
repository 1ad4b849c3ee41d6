//! Fetch result types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Acquisition tier that produced a fetch result.
///
/// The tag drives downstream extraction-mode selection: rendered and cached
/// results prefer text extraction, `VisionPending` signals the extractor to
/// work from screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    /// Served from the content cache, no network cost.
    CacheHit,
    /// Plain HTTP GET produced sufficient text.
    HttpFetch,
    /// Headless rendering produced sufficient text.
    RenderedFetch,
    /// Rendered text was too thin; screenshots carry the content.
    VisionPending,
    /// Every tier was exhausted.
    Failed,
}

impl FetchMethod {
    pub fn is_failed(self) -> bool {
        self == FetchMethod::Failed
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            FetchMethod::CacheHit => "cache_hit",
            FetchMethod::HttpFetch => "http_fetch",
            FetchMethod::RenderedFetch => "rendered_fetch",
            FetchMethod::VisionPending => "vision_pending",
            FetchMethod::Failed => "failed",
        };
        f.write_str(tag)
    }
}

/// Outcome of a tiered fetch.
///
/// Created fresh per fetch call and never mutated after return; ownership
/// passes entirely to the caller.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Cleaned visible text, capped at the extraction input limit.
    pub text: String,

    /// Raw HTML the text was derived from (empty for cache hits).
    pub html: String,

    /// Full-page screenshot tiles, top to bottom (PNG bytes).
    pub screenshots: Vec<Vec<u8>>,

    /// Which acquisition tier produced this result.
    pub method: FetchMethod,

    /// Raw anchor targets discovered on the page (absolute or relative).
    pub links: Vec<String>,
}

impl FetchResult {
    /// The terminal result when every tier is exhausted.
    pub fn failed() -> Self {
        Self {
            text: String::new(),
            html: String::new(),
            screenshots: Vec::new(),
            method: FetchMethod::Failed,
            links: Vec::new(),
        }
    }

    /// A result served straight from the cache.
    pub fn cache_hit(text: String) -> Self {
        Self {
            text,
            html: String::new(),
            screenshots: Vec::new(),
            method: FetchMethod::CacheHit,
            links: Vec::new(),
        }
    }

    pub fn has_screenshots(&self) -> bool {
        !self.screenshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_is_empty() {
        let result = FetchResult::failed();
        assert!(result.method.is_failed());
        assert!(result.text.is_empty());
        assert!(!result.has_screenshots());
    }

    #[test]
    fn method_display_tags() {
        assert_eq!(FetchMethod::RenderedFetch.to_string(), "rendered_fetch");
        assert_eq!(FetchMethod::CacheHit.to_string(), "cache_hit");
    }
}
