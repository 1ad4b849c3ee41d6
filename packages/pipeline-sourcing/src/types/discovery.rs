//! Types for the URL-discovery collaborator contract.

use serde::{Deserialize, Serialize};

/// Classification assigned to a discovered candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlType {
    /// A page listing multiple pipeline assets at once.
    Overview,
    /// A page describing one specific asset in depth.
    DrugSpecific,
    News,
    Irrelevant,
}

/// A candidate pipeline URL produced by discovery, ranked by score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    pub url_type: UrlType,
    pub score: f32,
}

impl DiscoveredUrl {
    pub fn new(url: impl Into<String>, url_type: UrlType) -> Self {
        Self {
            url: url.into(),
            url_type,
            score: 1.0,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}
