//! URL discovery contract (external collaborator).
//!
//! Discovery consumes a company name and returns ranked candidate URLs.
//! The search-engine querying and URL classification behind it live outside
//! this library; the pipeline only depends on this contract.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::types::discovery::DiscoveredUrl;

/// Produces ranked candidate pipeline URLs for a company.
#[async_trait]
pub trait UrlDiscovery: Send + Sync {
    /// Candidate URLs ordered best-first. Implementations absorb their own
    /// failures; an empty result means "nothing found".
    async fn discover(&self, company: &str) -> Vec<DiscoveredUrl>;
}

/// Mock discovery for testing and for callers with pre-known URLs.
#[derive(Default)]
pub struct MockDiscovery {
    by_company: RwLock<HashMap<String, Vec<DiscoveredUrl>>>,
}

impl MockDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script discovery output for a company.
    pub fn with_urls(self, company: &str, urls: Vec<DiscoveredUrl>) -> Self {
        self.by_company
            .write()
            .expect("lock poisoned")
            .insert(company.to_string(), urls);
        self
    }
}

#[async_trait]
impl UrlDiscovery for MockDiscovery {
    async fn discover(&self, company: &str) -> Vec<DiscoveredUrl> {
        self.by_company
            .read()
            .expect("lock poisoned")
            .get(company)
            .cloned()
            .unwrap_or_default()
    }
}
