//! Pharmaceutical pipeline sourcing library.
//!
//! Discovers, extracts and normalizes drug-development pipeline data from
//! company websites through a cascading content-acquisition strategy
//! (cache → plain HTTP → headless rendering → tiled-screenshot vision)
//! feeding schema-validated LLM extraction, with per-company asset
//! reconciliation across overview and detail pages.
//!
//! # Design
//!
//! - Fetching never fails: every failure path resolves to a `Failed`
//!   result, so one bad URL cannot abort a batch.
//! - Extraction absorbs its failures into empty lists after a bounded
//!   validation-retry loop with corrective feedback.
//! - Overview pages are the authoritative asset roster; detail pages only
//!   enrich, filling fields generic-to-specific.
//! - A partial result always beats no result.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pipeline_sourcing::{
//!     ai::OpenAi, fetch::TieredFetcher, pipeline::{CompanyJob, SourcingPipeline},
//!     types::config::SourcingConfig,
//! };
//!
//! let config = SourcingConfig::default();
//! let fetcher = TieredFetcher::new(&config);
//! let llm = OpenAi::from_env()?;
//! let pipeline = SourcingPipeline::new(fetcher, llm, config);
//!
//! let results = pipeline
//!     .run(vec![CompanyJob::overview("ABL Bio", "https://ablbio.com/pipeline")])
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`fetch`] - tiered content acquisition (HTTP, rendering, screenshots)
//! - [`extract`] - schema-validated LLM extraction with retry
//! - [`merge`] - asset reconciliation by normalized identity
//! - [`enrich`] - per-asset gap filling from web search
//! - [`pipeline`] - per-company orchestration and the run loop
//! - [`cache`] - expiring on-disk content cache
//! - [`testing`] - mocks for exercising the pipeline offline

pub mod ai;
pub mod cache;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod merge;
pub mod pipeline;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{CacheError, ExtractError, FetchError, SecurityError};
pub use types::{
    asset::{ExtractedAsset, ExtractionMethod, LlmAsset, PipelineResponse},
    config::SourcingConfig,
    discovery::{DiscoveredUrl, UrlType},
    fetch::{FetchMethod, FetchResult},
    progress::ProgressEvent,
};

pub use ai::OpenAi;
pub use cache::{ContentCache, ContentKind};
pub use enrich::Enricher;
pub use extract::StructuredExtractor;
pub use fetch::{ContentFetcher, RateLimitedFetcher, TieredFetcher};
pub use merge::{merge_assets, normalize_identity, MergePolicy};
pub use pipeline::{CompanyJob, CompanyResult, SourcingPipeline};
pub use security::{SecretString, UrlValidator};
pub use traits::{
    discovery::{MockDiscovery, UrlDiscovery},
    llm::{LlmClient, StructuredRequest},
    searcher::{DuckDuckGoSearcher, MockWebSearcher, SearchResult, WebSearcher},
};

#[cfg(feature = "render")]
pub use fetch::HeadlessRenderer;
