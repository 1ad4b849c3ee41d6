//! Heuristic classification of outbound links into drug-detail candidates.
//!
//! Overview pages link to per-asset pages under paths like `/pipeline/abl001`
//! or `/product/Tolebrutinib`; news, careers and investor-relations paths are
//! never content.

use regex::Regex;
use url::Url;

const SKIP_SEGMENTS: &[&str] = &[
    "news", "press", "career", "contact", "investor", "about", "team",
    "leadership", "login", "logout", "board", "history", "technology",
    "partner", "media", "procedure", "recruit", "executive", "bod", "sab",
];

const PIPELINE_SEGMENTS: &[&str] = &[
    "pipeline",
    "product",
    "drug",
    "candidate",
    "program",
    "rnd",
    "r-d",
    "research",
    "development",
];

/// Resolve a possibly-relative href against a base page URL.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}

/// Filter raw anchor targets down to likely drug/pipeline detail pages.
///
/// Same-domain only. Keeps pipeline-ish path segments, drug-code slugs
/// ("ABL-001", "ttac0001") and long capitalized name slugs. Preserves
/// first-seen order without duplicates.
pub fn filter_pipeline_links(base_url: &str, links: &[String]) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let Some(base_domain) = base.host_str().map(str::to_owned) else {
        return Vec::new();
    };

    let drug_code = Regex::new(r"(?i)^[A-Z]{2,4}[-_]?\d{2,4}[A-Za-z]?$").expect("static pattern");
    let drug_name = Regex::new(r"^[A-Z][a-z]{4,}$").expect("static pattern");

    let mut out: Vec<String> = Vec::new();
    for href in links {
        let Ok(url) = base.join(href) else { continue };
        if url.host_str() != Some(base_domain.as_str()) {
            continue;
        }

        let path = url.path().to_string();
        let path_lower = path.to_lowercase();
        if SKIP_SEGMENTS.iter().any(|s| path_lower.contains(s)) {
            continue;
        }

        let is_pipeline_page = PIPELINE_SEGMENTS.iter().any(|s| path_lower.contains(s));
        let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
        let is_drug_code = drug_code.is_match(segment);
        let is_drug_name = drug_name.is_match(segment) && segment.len() > 5;

        if is_pipeline_page || is_drug_code || is_drug_name {
            let resolved = url.to_string();
            if !out.contains(&resolved) {
                out.push(resolved);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keeps_drug_code_slugs() {
        let found = filter_pipeline_links(
            "https://ablbio.com/pipeline",
            &links(&["/abl001", "/ABL-202", "/ttac0001"]),
        );
        assert_eq!(
            found,
            vec![
                "https://ablbio.com/abl001",
                "https://ablbio.com/ABL-202",
                "https://ablbio.com/ttac0001",
            ]
        );
    }

    #[test]
    fn keeps_pipeline_path_segments() {
        let found = filter_pipeline_links(
            "https://example.com/",
            &links(&["/pipeline/overview", "/products/x", "/research/area"]),
        );
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn skips_non_content_paths() {
        let found = filter_pipeline_links(
            "https://example.com/pipeline",
            &links(&[
                "/news/press-release",
                "/careers",
                "/investor-relations",
                "/about/leadership",
            ]),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn skips_cross_domain_links() {
        let found = filter_pipeline_links(
            "https://example.com/pipeline",
            &links(&["https://other.com/pipeline/abl001"]),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn keeps_capitalized_drug_names() {
        let found = filter_pipeline_links(
            "https://example.com/",
            &links(&["/Tolebrutinib", "/Abc"]),
        );
        // Long capitalized slug qualifies; a short one does not.
        assert_eq!(found, vec!["https://example.com/Tolebrutinib"]);
    }

    #[test]
    fn dedups_preserving_order() {
        let found = filter_pipeline_links(
            "https://example.com/pipeline",
            &links(&["/abl001", "/abl002", "/abl001"]),
        );
        assert_eq!(
            found,
            vec![
                "https://example.com/abl001",
                "https://example.com/abl002",
            ]
        );
    }

    #[test]
    fn resolves_relative_hrefs() {
        assert_eq!(
            resolve_url("https://example.com/pipeline/", "abl001").as_deref(),
            Some("https://example.com/pipeline/abl001")
        );
        assert_eq!(resolve_url("not a url", "x"), None);
    }
}
