//! Structured extraction with validation retry.
//!
//! The extractor turns fetched content into candidate assets through a
//! schema-constrained LLM call. Validation failures retry with corrective
//! feedback under a bounded backoff; provider errors abort immediately.
//! Exhausted retries surface as an empty list: failure is absorbed, never
//! propagated, so one page cannot abort a company's run.

pub mod prompts;
pub mod schema;

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::traits::llm::{LlmClient, StructuredRequest};
use crate::types::asset::{ExtractedAsset, ExtractionMethod, PipelineResponse};
use crate::types::config::SourcingConfig;
use crate::types::fetch::{FetchMethod, FetchResult};
use prompts::{
    format_text_prompt, format_vision_prompt, TEXT_SYSTEM_PROMPT, VISION_SYSTEM_PROMPT,
};
use schema::{strict_response_schema, SCHEMA_NAME};

/// Schema-validated extractor over an LLM client.
pub struct StructuredExtractor<L> {
    llm: L,
    response_schema: Value,
    max_retries: usize,
    backoff: Vec<Duration>,
    hybrid_threshold: usize,
}

impl<L: LlmClient> StructuredExtractor<L> {
    pub fn new(llm: L, config: &SourcingConfig) -> Self {
        Self {
            llm,
            response_schema: strict_response_schema(),
            max_retries: config.max_retries,
            backoff: config.retry_backoff.clone(),
            hybrid_threshold: config.hybrid_threshold,
        }
    }

    /// Extract candidate assets from fetched content.
    ///
    /// Mode selection: failed fetches yield nothing; rich text prefers
    /// text-mode with a vision fallback when it comes back empty; thin text
    /// goes straight to vision when screenshots exist.
    pub async fn extract(
        &self,
        content: &FetchResult,
        company: &str,
        url: &str,
    ) -> Vec<ExtractedAsset> {
        if content.method == FetchMethod::Failed {
            return Vec::new();
        }

        if content.text.len() >= self.hybrid_threshold {
            let assets = self
                .attempt_loop(ExtractionMethod::Text, content, company, url)
                .await;
            if !assets.is_empty() || !content.has_screenshots() {
                return assets;
            }
            debug!(url, "text extraction yielded nothing; retrying with vision");
            return self
                .attempt_loop(ExtractionMethod::Vision, content, company, url)
                .await;
        }

        if content.has_screenshots() {
            return self
                .attempt_loop(ExtractionMethod::Vision, content, company, url)
                .await;
        }

        debug!(
            url,
            chars = content.text.len(),
            "content too thin for extraction and no screenshots"
        );
        Vec::new()
    }

    /// Bounded retry as an explicit fold: each attempt either returns a
    /// validated response or the error description the next attempt's
    /// prompt is built from.
    async fn attempt_loop(
        &self,
        mode: ExtractionMethod,
        content: &FetchResult,
        company: &str,
        url: &str,
    ) -> Vec<ExtractedAsset> {
        let mut prior_error: Option<String> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = self
                    .backoff
                    .get(attempt - 1)
                    .copied()
                    .unwrap_or(Duration::from_secs(10));
                tokio::time::sleep(delay).await;
            }

            let request = self.build_request(mode, content, company, url, prior_error.as_deref());
            let raw = match self.llm.generate_structured(&request).await {
                Ok(raw) => raw,
                Err(e) => {
                    // Provider failure is not recoverable by rephrasing;
                    // bail out rather than burn the retry budget.
                    warn!(url, company, error = %e, "extraction aborted");
                    return Vec::new();
                }
            };

            match validate_response(&raw) {
                Ok(response) => {
                    return response
                        .assets
                        .into_iter()
                        .map(|asset| ExtractedAsset::from_llm(asset, company, url, mode))
                        .collect();
                }
                Err(message) => {
                    debug!(url, attempt, error = %message, "response failed validation");
                    prior_error = Some(message);
                }
            }
        }

        warn!(
            url,
            company,
            attempts = self.max_retries,
            "extraction failed validation on every attempt"
        );
        Vec::new()
    }

    fn build_request(
        &self,
        mode: ExtractionMethod,
        content: &FetchResult,
        company: &str,
        url: &str,
        prior_error: Option<&str>,
    ) -> StructuredRequest {
        match mode {
            ExtractionMethod::Text => StructuredRequest::new(
                TEXT_SYSTEM_PROMPT,
                format_text_prompt(company, url, &content.text, prior_error),
                SCHEMA_NAME,
                self.response_schema.clone(),
            ),
            ExtractionMethod::Vision => StructuredRequest::new(
                VISION_SYSTEM_PROMPT,
                format_vision_prompt(company, content.screenshots.len(), prior_error),
                SCHEMA_NAME,
                self.response_schema.clone(),
            )
            .with_images(content.screenshots.clone()),
        }
    }
}

/// Parse and validate a raw response against the extraction schema.
///
/// Returns the validation failure as an error description suitable for
/// feeding back into the next prompt.
fn validate_response(raw: &str) -> Result<PipelineResponse, String> {
    let response: PipelineResponse = serde_json::from_str(raw)
        .map_err(|e| format!("response did not match the schema: {e}"))?;

    for (index, asset) in response.assets.iter().enumerate() {
        if asset.asset_name.trim().is_empty() {
            return Err(format!("assets[{index}].asset_name must be non-empty"));
        }
    }
    Ok(response)
}
