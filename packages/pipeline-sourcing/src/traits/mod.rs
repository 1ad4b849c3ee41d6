//! Core trait abstractions (LLM client, web search, URL discovery).

pub mod discovery;
pub mod llm;
pub mod searcher;

pub use discovery::{MockDiscovery, UrlDiscovery};
pub use llm::{LlmClient, StructuredRequest};
pub use searcher::{DuckDuckGoSearcher, MockWebSearcher, SearchResult, WebSearcher};
