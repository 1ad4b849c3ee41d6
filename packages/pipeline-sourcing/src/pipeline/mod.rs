//! Per-company orchestration and the multi-company run loop.
//!
//! Within one company the overview page is fetched and extracted to
//! completion before any detail page, since detail URLs are discovered from
//! the overview's links. Detail pages then fetch and
//! extract concurrently under an admission gate, and their results are
//! folded into the overview roster as enrichment only. No single bad URL or
//! API hiccup aborts a multi-company batch.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::enrich::{needs_enrichment, Enricher};
use crate::extract::StructuredExtractor;
use crate::fetch::links::filter_pipeline_links;
use crate::fetch::ContentFetcher;
use crate::merge::{merge_assets, MergePolicy};
use crate::traits::discovery::UrlDiscovery;
use crate::traits::llm::LlmClient;
use crate::traits::searcher::WebSearcher;
use crate::types::asset::ExtractedAsset;
use crate::types::config::SourcingConfig;
use crate::types::discovery::{DiscoveredUrl, UrlType};
use crate::types::fetch::FetchMethod;
use crate::types::progress::ProgressEvent;

/// One unit of work for a run: a company and its candidate URLs.
#[derive(Debug, Clone)]
pub struct CompanyJob {
    pub company: String,
    pub urls: Vec<DiscoveredUrl>,
}

impl CompanyJob {
    pub fn new(company: impl Into<String>, urls: Vec<DiscoveredUrl>) -> Self {
        Self {
            company: company.into(),
            urls,
        }
    }

    /// A job with a single known overview URL.
    pub fn overview(company: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(company, vec![DiscoveredUrl::new(url, UrlType::Overview)])
    }
}

/// Per-company outcome of a run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CompanyResult {
    pub company: String,
    pub assets: Vec<ExtractedAsset>,
}

/// The sourcing pipeline: fetch, extract, reconcile, enrich.
pub struct SourcingPipeline<F, L> {
    fetcher: Arc<F>,
    llm: Arc<L>,
    extractor: StructuredExtractor<Arc<L>>,
    searcher: Option<Arc<dyn WebSearcher>>,
    config: SourcingConfig,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    cancel: CancellationToken,
}

impl<F, L> SourcingPipeline<F, L>
where
    F: ContentFetcher + 'static,
    L: LlmClient + 'static,
{
    pub fn new(fetcher: F, llm: L, config: SourcingConfig) -> Self {
        let llm = Arc::new(llm);
        Self {
            fetcher: Arc::new(fetcher),
            extractor: StructuredExtractor::new(llm.clone(), &config),
            llm,
            searcher: None,
            config,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Enable per-asset enrichment through a web searcher.
    pub fn with_searcher(mut self, searcher: Arc<dyn WebSearcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    /// Stream progress events to a channel.
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Install a stop token, consulted between company iterations only.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(event);
        }
    }

    /// Extract one company's pipeline from an overview URL plus optional
    /// pre-discovered detail URLs. Absorbs all failure into an empty or
    /// partial result.
    pub async fn extract_company(
        &self,
        company: &str,
        overview_url: &str,
        drug_urls: Option<Vec<String>>,
    ) -> Vec<ExtractedAsset> {
        // The overview runs to completion first: it is the authoritative
        // roster, and detail URLs come from its links.
        let overview = self.fetcher.fetch(overview_url, true).await;
        self.emit(ProgressEvent::OverviewFetched {
            company: company.to_string(),
            url: overview_url.to_string(),
            method: overview.method,
        });

        if overview.method.is_failed() {
            warn!(company, url = overview_url, "overview fetch failed");
            self.emit(ProgressEvent::CompanyFailed {
                company: company.to_string(),
                error: "overview fetch failed".to_string(),
            });
            return Vec::new();
        }

        let mut assets = self.extractor.extract(&overview, company, overview_url).await;
        self.emit(ProgressEvent::PageExtracted {
            company: company.to_string(),
            url: overview_url.to_string(),
            method: overview.method,
            assets: assets.len(),
        });

        let mut detail_urls = match drug_urls {
            Some(urls) => urls,
            None => filter_pipeline_links(overview_url, &overview.links),
        };
        detail_urls.retain(|url| url != overview_url);
        detail_urls.truncate(self.config.max_drug_pages_per_company);
        self.emit(ProgressEvent::DetailPagesDiscovered {
            company: company.to_string(),
            count: detail_urls.len(),
        });

        if !detail_urls.is_empty() && !assets.is_empty() {
            let gate = Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)));
            let page_results = join_all(detail_urls.iter().map(|url| {
                let gate = gate.clone();
                async move {
                    let Ok(_permit) = gate.acquire_owned().await else {
                        return (url.clone(), FetchMethod::Failed, Vec::new());
                    };
                    let fetched = self.fetcher.fetch(url, true).await;
                    if fetched.method.is_failed() {
                        return (url.clone(), FetchMethod::Failed, Vec::new());
                    }
                    let page_assets = self.extractor.extract(&fetched, company, url).await;
                    (url.clone(), fetched.method, page_assets)
                }
            }))
            .await;

            // Fold detail pages in input order so merges stay deterministic.
            for (url, method, page_assets) in page_results {
                if page_assets.is_empty() {
                    continue;
                }
                self.emit(ProgressEvent::PageExtracted {
                    company: company.to_string(),
                    url,
                    method,
                    assets: page_assets.len(),
                });
                assets = merge_assets(assets, page_assets, MergePolicy::EnrichOnly);
            }
        }

        if let Some(searcher) = &self.searcher {
            if assets.iter().any(needs_enrichment) {
                self.emit(ProgressEvent::EnrichmentStarted {
                    company: company.to_string(),
                    assets: assets.len(),
                });
                let enricher = Enricher::new(
                    self.llm.clone(),
                    searcher.clone(),
                    self.fetcher.clone(),
                    &self.config,
                );
                let before = assets.clone();
                assets = enricher.enrich_all(assets, company, &overview.links).await;
                let updated = before
                    .iter()
                    .zip(assets.iter())
                    .filter(|(old, new)| old != new)
                    .count();
                self.emit(ProgressEvent::EnrichmentCompleted {
                    company: company.to_string(),
                    updated,
                });
            }
        }

        assets
    }

    /// Process one company from discovery output. The best overview
    /// candidate wins; drug-specific candidates seed the detail fetch.
    pub async fn process_company(
        &self,
        company: &str,
        urls: &[DiscoveredUrl],
    ) -> Vec<ExtractedAsset> {
        let overview = urls
            .iter()
            .find(|u| u.url_type == UrlType::Overview)
            .or_else(|| urls.first());
        let Some(overview) = overview else {
            info!(company, "no candidate URLs");
            return Vec::new();
        };

        let drug_urls: Vec<String> = urls
            .iter()
            .filter(|u| u.url_type == UrlType::DrugSpecific)
            .map(|u| u.url.clone())
            .collect();
        let drug_urls = if drug_urls.is_empty() {
            None
        } else {
            Some(drug_urls)
        };

        self.extract_company(company, &overview.url, drug_urls).await
    }

    /// Multi-company run. Companies proceed concurrently under the
    /// configured gate; per-company failures yield empty results and the
    /// run continues. The stop token is consulted between companies only,
    /// and the fetcher's owned resources are released once at the end.
    pub async fn run(&self, jobs: Vec<CompanyJob>) -> Vec<CompanyResult> {
        let run_id = Uuid::new_v4();
        self.emit(ProgressEvent::RunStarted {
            run_id,
            companies: jobs.len(),
        });

        let gate = Arc::new(Semaphore::new(self.config.max_concurrent_companies.max(1)));
        let results = join_all(jobs.into_iter().map(|job| {
            let gate = gate.clone();
            async move {
                if self.cancel.is_cancelled() {
                    return CompanyResult {
                        company: job.company,
                        assets: Vec::new(),
                    };
                }
                let Ok(_permit) = gate.acquire_owned().await else {
                    return CompanyResult {
                        company: job.company,
                        assets: Vec::new(),
                    };
                };
                if self.cancel.is_cancelled() {
                    return CompanyResult {
                        company: job.company,
                        assets: Vec::new(),
                    };
                }

                self.emit(ProgressEvent::CompanyStarted {
                    run_id,
                    company: job.company.clone(),
                });
                let assets = self.process_company(&job.company, &job.urls).await;
                self.emit(ProgressEvent::CompanyCompleted {
                    company: job.company.clone(),
                    assets: assets.len(),
                });
                CompanyResult {
                    company: job.company,
                    assets,
                }
            }
        }))
        .await;

        let total = results.iter().map(|r| r.assets.len()).sum();
        self.emit(ProgressEvent::RunCompleted {
            run_id,
            assets: total,
        });

        self.fetcher.shutdown().await;
        results
    }

    /// Run against companies whose URLs come from a discovery collaborator.
    pub async fn run_with_discovery(
        &self,
        companies: &[String],
        discovery: &dyn UrlDiscovery,
    ) -> Vec<CompanyResult> {
        let jobs = join_all(companies.iter().map(|company| async move {
            CompanyJob::new(company.clone(), discovery.discover(company).await)
        }))
        .await;
        self.run(jobs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFetcher, MockLlm};
    use crate::types::fetch::FetchResult;

    fn overview_result(text: &str, links: &[&str]) -> FetchResult {
        FetchResult {
            text: text.to_string(),
            html: String::new(),
            screenshots: Vec::new(),
            method: FetchMethod::HttpFetch,
            links: links.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn rich(text: &str) -> String {
        format!("{text} {}", "filler ".repeat(500))
    }

    #[tokio::test]
    async fn failed_overview_yields_empty_company() {
        let llm = MockLlm::new();
        let pipeline =
            SourcingPipeline::new(MockFetcher::new(), llm, SourcingConfig::default());

        let assets = pipeline
            .extract_company("Acme", "https://acme.example/pipeline", None)
            .await;
        assert!(assets.is_empty());
    }

    #[tokio::test]
    async fn detail_pages_skipped_when_overview_has_no_assets() {
        let fetcher = MockFetcher::new()
            .with_result(
                "https://acme.example/pipeline",
                overview_result(&rich("empty overview"), &["/abl001"]),
            )
            .with_text_page("https://acme.example/abl001", &rich("detail"));
        let llm = MockLlm::new(); // defaults to zero assets
        let pipeline = SourcingPipeline::new(fetcher, llm, SourcingConfig::default());

        let assets = pipeline
            .extract_company("Acme", "https://acme.example/pipeline", None)
            .await;
        assert!(assets.is_empty());
    }

    #[tokio::test]
    async fn cancelled_run_fetches_nothing() {
        let fetcher = MockFetcher::new()
            .with_text_page("https://acme.example/pipeline", &rich("overview"));
        let llm = MockLlm::new();
        let token = CancellationToken::new();
        token.cancel();
        let pipeline = SourcingPipeline::new(fetcher, llm, SourcingConfig::default())
            .with_cancellation(token);

        let results = pipeline
            .run(vec![CompanyJob::overview("Acme", "https://acme.example/pipeline")])
            .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].assets.is_empty());
    }

    #[tokio::test]
    async fn run_emits_progress_and_shuts_down_fetcher() {
        let fetcher = Arc::new(MockFetcher::new());
        let llm = MockLlm::new();
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let pipeline = SourcingPipeline::new(fetcher.clone(), llm, SourcingConfig::default())
            .with_progress(sender);

        let results = pipeline
            .run(vec![CompanyJob::overview("Acme", "https://acme.example/pipeline")])
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(fetcher.shutdown_count(), 1);

        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(ProgressEvent::RunStarted { .. })));
        assert!(matches!(events.last(), Some(ProgressEvent::RunCompleted { .. })));
    }
}
