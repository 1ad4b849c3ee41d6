//! Progress events streamed while a run is in flight.
//!
//! Events are facts about what happened, serializable for server-facing
//! consumers and `Display`-able as human-readable status lines for the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::fetch::FetchMethod;

/// Events produced by the sourcing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    RunStarted {
        run_id: Uuid,
        companies: usize,
    },

    CompanyStarted {
        run_id: Uuid,
        company: String,
    },

    OverviewFetched {
        company: String,
        url: String,
        method: FetchMethod,
    },

    PageExtracted {
        company: String,
        url: String,
        method: FetchMethod,
        assets: usize,
    },

    DetailPagesDiscovered {
        company: String,
        count: usize,
    },

    EnrichmentStarted {
        company: String,
        assets: usize,
    },

    EnrichmentCompleted {
        company: String,
        updated: usize,
    },

    CompanyCompleted {
        company: String,
        assets: usize,
    },

    CompanyFailed {
        company: String,
        error: String,
    },

    RunCompleted {
        run_id: Uuid,
        assets: usize,
    },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::RunStarted { companies, .. } => {
                write!(f, "Processing {companies} companies")
            }
            ProgressEvent::CompanyStarted { company, .. } => {
                write!(f, "[{company}] started")
            }
            ProgressEvent::OverviewFetched {
                company,
                url,
                method,
            } => write!(f, "[{company}] overview fetched ({method}): {url}"),
            ProgressEvent::PageExtracted {
                company,
                url,
                method,
                assets,
            } => write!(f, "[{company}] {assets} assets from {url} [{method}]"),
            ProgressEvent::DetailPagesDiscovered { company, count } => {
                write!(f, "[{company}] discovered {count} drug page links")
            }
            ProgressEvent::EnrichmentStarted { company, assets } => {
                write!(f, "[{company}] enriching {assets} assets from drug pages...")
            }
            ProgressEvent::EnrichmentCompleted { company, updated } => {
                write!(f, "[{company}] enriched {updated} assets with new data")
            }
            ProgressEvent::CompanyCompleted { company, assets } => {
                write!(f, "[{company}] done: {assets} assets")
            }
            ProgressEvent::CompanyFailed { company, error } => {
                write!(f, "[{company}] failed: {error}")
            }
            ProgressEvent::RunCompleted { assets, .. } => {
                write!(f, "Run complete: {assets} assets total")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_status_lines() {
        let event = ProgressEvent::PageExtracted {
            company: "Acme Bio".to_string(),
            url: "https://acme.example/pipeline".to_string(),
            method: FetchMethod::HttpFetch,
            assets: 4,
        };
        assert_eq!(
            event.to_string(),
            "[Acme Bio] 4 assets from https://acme.example/pipeline [http_fetch]"
        );
    }

    #[test]
    fn events_serialize_tagged() {
        let event = ProgressEvent::DetailPagesDiscovered {
            company: "Acme Bio".to_string(),
            count: 7,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "detail_pages_discovered");
        assert_eq!(json["count"], 7);
    }
}
