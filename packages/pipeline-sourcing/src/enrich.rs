//! Per-asset gap filling from web search and drug pages.
//!
//! Overview extractions often carry umbrella values ("Solid Tumor") or
//! placeholders. Enrichment searches the asset, tries snippet-only filling
//! first (zero fetch cost), then fetches ranked pages and asks the LLM for a
//! gap-filling update applied only into generic fields. Failures degrade to
//! the unenriched asset, never an error.

use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::fetch::ContentFetcher;
use crate::merge::is_placeholder;
use crate::traits::llm::LlmClient;
use crate::traits::searcher::{SearchResult, WebSearcher};
use crate::types::asset::ExtractedAsset;
use crate::types::config::SourcingConfig;

/// Umbrella values too vague to count as real data.
const GENERIC_VALUES: &[&str] = &[
    "solid tumor",
    "solid tumors",
    "solid cancer",
    "cancer",
    "solid & blood tumor",
    "blood cancer",
    "hematologic cancer",
    "various solid tumors",
    "advanced solid tumors",
];

const FILL_SYSTEM_PROMPT: &str =
    "You extract drug development facts from web page text. Return ONLY valid JSON, no explanation.";

const MAX_PAGE_EXCERPT: usize = 8_000;
const MAX_COMBINED_TEXT: usize = 12_000;
const MIN_SNIPPET_TEXT: usize = 80;

/// True when a value carries no real information. Delimited lists are
/// generic only if every part is.
pub fn is_generic(value: &str) -> bool {
    if is_placeholder(value) {
        return true;
    }
    value
        .replace(';', "/")
        .replace(',', "/")
        .split('/')
        .all(|part| {
            let part = part.trim().to_lowercase();
            part.is_empty() || is_placeholder(&part) || GENERIC_VALUES.contains(&part.as_str())
        })
}

/// Whether an asset has any gap worth spending search budget on.
pub fn needs_enrichment(asset: &ExtractedAsset) -> bool {
    is_generic(&asset.indication)
        || is_generic(&asset.description)
        || is_generic(&asset.therapeutic_target)
        || is_placeholder(&asset.phase)
}

/// LLM reply for gap filling: only fields with clear evidence are set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FillUpdate {
    indication: String,
    therapeutic_target: String,
    phase: String,
    modality: String,
    therapeutic_area: String,
    description: String,
}

/// Gap-filling enricher over search, fetch and LLM collaborators.
pub struct Enricher {
    llm: Arc<dyn LlmClient>,
    searcher: Arc<dyn WebSearcher>,
    fetcher: Arc<dyn ContentFetcher>,
    gate: Arc<Semaphore>,
    max_sources: usize,
}

impl Enricher {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        searcher: Arc<dyn WebSearcher>,
        fetcher: Arc<dyn ContentFetcher>,
        config: &SourcingConfig,
    ) -> Self {
        Self {
            llm,
            searcher,
            fetcher,
            gate: Arc::new(Semaphore::new(config.max_concurrent_enrichments.max(1))),
            max_sources: config.max_enrichment_sources,
        }
    }

    /// Enrich every asset concurrently under the admission gate.
    pub async fn enrich_all(
        &self,
        assets: Vec<ExtractedAsset>,
        company: &str,
        overview_links: &[String],
    ) -> Vec<ExtractedAsset> {
        let tasks = assets
            .into_iter()
            .map(|asset| self.enrich_one(asset, company, overview_links));
        join_all(tasks).await
    }

    /// Enrich a single asset: snippets first, then page fetch if gaps remain.
    pub async fn enrich_one(
        &self,
        asset: ExtractedAsset,
        company: &str,
        overview_links: &[String],
    ) -> ExtractedAsset {
        if is_placeholder(&asset.asset_name) || !needs_enrichment(&asset) {
            return asset;
        }

        let Ok(_permit) = self.gate.acquire().await else {
            return asset;
        };

        let name = asset.asset_name.clone();
        let mut results = self
            .searcher
            .search(&format!("\"{name}\" \"{company}\""))
            .await
            .unwrap_or_default();
        if results.is_empty() {
            results = self
                .searcher
                .search(&format!("{name} {company} drug clinical trial"))
                .await
                .unwrap_or_default();
        }

        let matched_links = match_overview_links(&name, overview_links);
        if results.is_empty() && matched_links.is_empty() {
            debug!(asset = %name, "no enrichment sources found");
            return asset;
        }

        let mut working = asset;

        let snippets = collect_snippets(&results);
        if snippets.len() > MIN_SNIPPET_TEXT {
            if let Some(update) = self.request_fill(&snippets, &working, company).await {
                apply_update(&mut working, &update);
                if !needs_enrichment(&working) {
                    // Snippets filled every gap; skip page fetching.
                    return working;
                }
            }
        }

        let mut urls = rank_urls(&results, company, self.max_sources);
        for link in matched_links.into_iter().rev() {
            if !urls.contains(&link) {
                urls.insert(0, link);
            }
        }
        urls.truncate(self.max_sources);
        if urls.is_empty() {
            return working;
        }

        let mut combined = String::new();
        let mut sources = Vec::new();
        for url in &urls {
            let fetched = self.fetcher.fetch(url, true).await;
            if fetched.method.is_failed() || fetched.text.len() < 100 {
                continue;
            }
            let excerpt = excerpt_of(&fetched.text, MAX_PAGE_EXCERPT);
            combined.push_str(&format!("\n--- Source: {url} ---\n{excerpt}\n"));
            sources.push(url.clone());
            if combined.len() > MAX_COMBINED_TEXT {
                break;
            }
        }
        if combined.is_empty() {
            return working;
        }

        if let Some(update) = self.request_fill(&combined, &working, company).await {
            apply_update(&mut working, &update);
        }
        for url in sources {
            if !working.source_urls.contains(&url) {
                working.source_urls.push(url);
            }
        }
        working
    }

    async fn request_fill(
        &self,
        text: &str,
        asset: &ExtractedAsset,
        company: &str,
    ) -> Option<FillUpdate> {
        let prompt = format_fill_prompt(&asset.asset_name, company, asset, text);
        match self.llm.complete(FILL_SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => {
                let update = parse_fill_response(&raw);
                if update.is_none() {
                    debug!(asset = %asset.asset_name, "unparseable enrichment reply");
                }
                update
            }
            Err(e) => {
                warn!(asset = %asset.asset_name, error = %e, "enrichment completion failed");
                None
            }
        }
    }
}

/// Rank search-result URLs: company site first (excluding news/press),
/// then trial registries, then drug databases, then the rest.
fn rank_urls(results: &[SearchResult], company: &str, cap: usize) -> Vec<String> {
    let company_key: String = company
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut company_urls = Vec::new();
    let mut trials = Vec::new();
    let mut databases = Vec::new();
    let mut other = Vec::new();

    for result in results {
        let url = result.url.to_string();
        let url_lower = url.to_lowercase();
        let squashed: String = url_lower
            .chars()
            .filter(|c| *c != '.' && *c != '-')
            .collect();

        if !company_key.is_empty() && squashed.contains(&company_key) {
            if ["/news", "/press", "news_view"]
                .iter()
                .any(|p| url_lower.contains(p))
            {
                other.push(url);
            } else {
                company_urls.push(url);
            }
        } else if url_lower.contains("clinicaltrials.gov") {
            trials.push(url);
        } else if ["drugbank", "adisinsight", "drugs.com"]
            .iter()
            .any(|db| url_lower.contains(db))
        {
            databases.push(url);
        } else {
            other.push(url);
        }
    }

    company_urls
        .into_iter()
        .chain(trials)
        .chain(databases)
        .chain(other)
        .take(cap)
        .collect()
}

/// Overview links whose slug matches the asset name (same-domain detail
/// pages rank above anything search found).
fn match_overview_links(name: &str, links: &[String]) -> Vec<String> {
    let slug: String = name
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if slug.is_empty() {
        return Vec::new();
    }
    links
        .iter()
        .filter(|link| {
            let squashed: String = link
                .to_lowercase()
                .chars()
                .filter(|c| *c != '-' && *c != '_')
                .collect();
            squashed.contains(&slug)
        })
        .cloned()
        .collect()
}

fn collect_snippets(results: &[SearchResult]) -> String {
    results
        .iter()
        .filter_map(|r| {
            r.snippet
                .as_ref()
                .map(|s| format!("- {}: {}\n", r.title.as_deref().unwrap_or(""), s))
        })
        .collect()
}

fn format_fill_prompt(name: &str, company: &str, asset: &ExtractedAsset, text: &str) -> String {
    let known = current_known(asset);
    format!(
        "Extract drug development information from this webpage text.\n\
         \n\
         Drug: {name}\n\
         Company: {company}\n\
         \n\
         Current known data:\n\
         {known}\n\
         \n\
         Webpage text:\n\
         {text}\n\
         \n\
         Return JSON with ONLY fields you can confidently extract from the text:\n\
         {{\n\
           \"indication\": \"the DISEASE(S) being treated, semicolon-separated if multiple\",\n\
           \"therapeutic_target\": \"molecular target(s)\",\n\
           \"phase\": \"Phase 1, Phase 1/2, Phase 2, Phase 3, Preclinical, IND-enabling, etc.\",\n\
           \"modality\": \"e.g., Bispecific Antibody, Small molecule, ADC, CAR-T\",\n\
           \"therapeutic_area\": \"e.g., Oncology, Neurology, Immunology\",\n\
           \"description\": \"1-sentence mechanism of action\"\n\
         }}\n\
         \n\
         Rules:\n\
         - \"indication\" must be a DISEASE or CONDITION (e.g., \"NSCLC\", \"AML\"),\n\
           NOT a treatment/regimen, NOT a target, NOT a modality\n\
         - Be SPECIFIC: \"Non-small cell lung cancer (NSCLC)\" not \"Solid Tumor\"\n\
         - Only fill fields where the text has clear evidence\n\
         - Use \"\" for fields you cannot confidently determine\n\
         - Do NOT repeat existing known data verbatim"
    )
}

fn current_known(asset: &ExtractedAsset) -> String {
    let mut lines = Vec::new();
    for (label, value) in [
        ("asset_name", &asset.asset_name),
        ("therapeutic_area", &asset.therapeutic_area),
        ("modality", &asset.modality),
        ("phase", &asset.phase),
        ("therapeutic_target", &asset.therapeutic_target),
        ("indication", &asset.indication),
        ("description", &asset.description),
    ] {
        if !is_placeholder(value) {
            lines.push(format!("  {label}: {value}"));
        }
    }
    if lines.is_empty() {
        "  (nothing yet)".to_string()
    } else {
        lines.join("\n")
    }
}

/// Apply an update, filling only generic gaps.
fn apply_update(asset: &mut ExtractedAsset, update: &FillUpdate) {
    fill_generic(&mut asset.indication, &update.indication);
    fill_generic(&mut asset.therapeutic_target, &update.therapeutic_target);
    fill_generic(&mut asset.modality, &update.modality);
    fill_generic(&mut asset.therapeutic_area, &update.therapeutic_area);
    fill_generic(&mut asset.description, &update.description);
    if is_placeholder(&asset.phase) && !update.phase.trim().is_empty() {
        asset.phase = update.phase.trim().to_string();
    }
}

fn fill_generic(current: &mut String, incoming: &str) {
    let incoming = incoming.trim();
    if !incoming.is_empty() && is_generic(current) {
        *current = incoming.to_string();
    }
}

fn parse_fill_response(raw: &str) -> Option<FillUpdate> {
    serde_json::from_str(strip_code_fences(raw)).ok()
}

/// Models wrap JSON in markdown fences despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

fn excerpt_of(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
