//! Asset types produced by structured extraction.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Extraction mode that produced an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Extracted from cleaned page text.
    #[default]
    Text,
    /// Extracted from rendered screenshot tiles.
    Vision,
}

/// Asset schema for LLM extraction (no provenance fields).
///
/// Every field is required by the strict response schema; the empty string is
/// the universal unknown sentinel since strict mode forbids nullable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct LlmAsset {
    /// e.g. "Oncology", "Neurology", "Dermatology / Fibrosis"
    pub therapeutic_area: String,

    /// Includes delivery route when stated, e.g. "GalNAc-asiRNA (subcutaneous)"
    pub modality: String,

    /// Exact value from the page, e.g. "Phase 1", "IND enabling study"
    pub phase: String,

    /// Drug/compound code or name. The merge key; must be non-empty.
    pub asset_name: String,

    /// Mechanism of action or brief summary
    pub description: String,

    /// Molecular target, e.g. "VEGF/DLL4", "PD-L1/4-1BB"
    pub therapeutic_target: String,

    /// Disease or condition being treated
    pub indication: String,
}

/// Response wrapper for LLM extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct PipelineResponse {
    pub assets: Vec<LlmAsset>,
}

/// Full asset with provenance, the unit the reconciler stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExtractedAsset {
    pub therapeutic_area: String,
    pub modality: String,
    pub phase: String,
    pub asset_name: String,
    pub description: String,
    pub therapeutic_target: String,
    pub indication: String,

    /// Company this asset belongs to.
    pub company: String,

    /// Pages that contributed data, in contribution order.
    pub source_urls: Vec<String>,

    /// How the first contributing page was extracted.
    pub extraction_method: ExtractionMethod,
}

impl ExtractedAsset {
    /// Wrap an LLM-reported asset with provenance metadata.
    pub fn from_llm(
        asset: LlmAsset,
        company: impl Into<String>,
        source_url: impl Into<String>,
        method: ExtractionMethod,
    ) -> Self {
        Self {
            therapeutic_area: asset.therapeutic_area,
            modality: asset.modality,
            phase: asset.phase,
            asset_name: asset.asset_name,
            description: asset.description,
            therapeutic_target: asset.therapeutic_target,
            indication: asset.indication,
            company: company.into(),
            source_urls: vec![source_url.into()],
            extraction_method: method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_llm_carries_fields_and_provenance() {
        let llm = LlmAsset {
            asset_name: "ABL001".to_string(),
            phase: "Phase 1".to_string(),
            indication: "NSCLC".to_string(),
            ..Default::default()
        };

        let asset = ExtractedAsset::from_llm(
            llm,
            "Acme Bio",
            "https://acme.example/pipeline",
            ExtractionMethod::Vision,
        );

        assert_eq!(asset.asset_name, "ABL001");
        assert_eq!(asset.phase, "Phase 1");
        assert_eq!(asset.company, "Acme Bio");
        assert_eq!(asset.source_urls, vec!["https://acme.example/pipeline"]);
        assert_eq!(asset.extraction_method, ExtractionMethod::Vision);
    }
}
