//! Prompt construction for structured extraction.

/// System prompt for text-mode extraction.
pub const TEXT_SYSTEM_PROMPT: &str =
    "You extract pharmaceutical pipeline data. Return valid JSON only.";

/// System prompt for vision-mode extraction.
pub const VISION_SYSTEM_PROMPT: &str =
    "You extract pharmaceutical pipeline data from page screenshots. Return valid JSON only.";

/// Cap on page text embedded in a text-mode prompt.
pub const TEXT_PROMPT_CONTENT_CAP: usize = 40_000;

/// Build the text-mode user prompt.
///
/// `prior_error` carries the previous attempt's validation failure so the
/// model can self-correct.
pub fn format_text_prompt(
    company: &str,
    url: &str,
    content: &str,
    prior_error: Option<&str>,
) -> String {
    let content = truncated(content, TEXT_PROMPT_CONTENT_CAP);
    let mut prompt = format!(
        "Extract all pharmaceutical pipeline assets from this content.\n\
         Company: {company}\n\
         Source: {url}\n\
         \n\
         Content:\n\
         {content}\n\
         \n\
         For each asset, extract these fields:\n\
         - therapeutic_area: e.g., \"Oncology\", \"Neurology\", \"Ophthalmology\", \"Dermatology / Fibrosis\"\n\
         - modality: Include delivery route if stated, e.g., \"Bispecific Antibody\", \"GalNAc-asiRNA (subcutaneous)\"\n\
         - phase: Use the exact value from the page. Valid: Preclinical, Phase 1, Phase 1/2, Phase 2, Phase 2/3, Phase 3, Filed, Approved, IND enabling study, Phase 1 completed, Discovery, Platform\n\
         - asset_name: Drug/compound code (e.g., \"ABL001\", \"OLX10212\") or name\n\
         - description: Mechanism of action or brief summary\n\
         - therapeutic_target: Molecular target (e.g., \"VEGF/DLL4\", \"PD-L1/4-1BB\")\n\
         - indication: Disease/condition\n\
         \n\
         An asset is a drug or compound identifier, never a bare disease, target or modality name.\n\
         If one drug targets multiple indications at the same phase, return one record with the\n\
         indications joined by \"; \". If one drug appears at multiple phases, return a separate\n\
         record per phase.\n\
         \n\
         Return a JSON array of assets. Use empty string for unknown fields."
    );

    if let Some(error) = prior_error {
        prompt.push_str("\n\nPrevious attempt had validation errors - please fix:\n");
        prompt.push_str(error);
    }
    prompt
}

/// Build the vision-mode user prompt for one or more screenshot tiles.
pub fn format_vision_prompt(company: &str, tiles: usize, prior_error: Option<&str>) -> String {
    let mut prompt = format!(
        "Extract all pharmaceutical pipeline assets visible in these {tiles} screenshots.\n\
         Company: {company}\n\
         \n\
         The screenshots may contain:\n\
         - Tables with drug information\n\
         - Visual phase indicators (colored bars showing development stage)\n\
         - Pipeline charts, hexagon or honeycomb diagrams\n\
         \n\
         For visual phase indicators:\n\
         - Solid filled section = completed\n\
         - Partial fill or current marker = ongoing\n\
         - Map to: Preclinical, Phase 1, Phase 1/2, Phase 2, Phase 2/3, Phase 3, Filed, Approved\n\
         \n\
         The screenshots are overlapping tiles of one page, top to bottom. Report each asset\n\
         once, even if it appears in more than one tile.\n\
         \n\
         Extract ALL assets visible. Return JSON matching the schema; use empty string for\n\
         unknown fields."
    );

    if let Some(error) = prior_error {
        prompt.push_str("\n\nPrevious attempt had validation errors - please fix:\n");
        prompt.push_str(error);
    }
    prompt
}

fn truncated(content: &str, max: usize) -> &str {
    if content.len() <= max {
        return content;
    }
    let mut end = max;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_prompt_embeds_company_url_and_content() {
        let prompt = format_text_prompt("ABL Bio", "https://ablbio.com/pipeline", "page text", None);
        assert!(prompt.contains("Company: ABL Bio"));
        assert!(prompt.contains("Source: https://ablbio.com/pipeline"));
        assert!(prompt.contains("page text"));
        assert!(!prompt.contains("Previous attempt"));
    }

    #[test]
    fn prior_error_appended_for_self_correction() {
        let prompt = format_text_prompt(
            "ABL Bio",
            "https://ablbio.com/pipeline",
            "page text",
            Some("assets[0].asset_name must be non-empty"),
        );
        assert!(prompt.contains("Previous attempt had validation errors"));
        assert!(prompt.contains("asset_name must be non-empty"));
    }

    #[test]
    fn text_prompt_caps_content() {
        let long = "x".repeat(TEXT_PROMPT_CONTENT_CAP + 10_000);
        let prompt = format_text_prompt("Acme", "https://a.example", &long, None);
        assert!(prompt.len() < long.len());
    }

    #[test]
    fn vision_prompt_mentions_tile_dedup() {
        let prompt = format_vision_prompt("ABL Bio", 3, None);
        assert!(prompt.contains("3 screenshots"));
        assert!(prompt.contains("Report each asset"));
    }
}
