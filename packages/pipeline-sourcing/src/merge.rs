//! Asset reconciliation across pages of one company.
//!
//! The same asset is referenced inconsistently across pages ("ABL001" vs
//! "ABL001 (TTAC-0001)"), so merge identity is a normalized form of the
//! asset name, never the raw string. Placeholder names carry no identity:
//! two "TBD" rows are two assets.

use indexmap::IndexMap;
use tracing::debug;

use crate::types::asset::ExtractedAsset;

/// Values that mean "unknown"; never used to establish identity or to
/// overwrite known data.
const PLACEHOLDER_VALUES: &[&str] = &["", "tbd", "undisclosed", "unknown", "n/a"];

/// Whether a merge may introduce assets absent from the existing roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Detail pages only enrich assets the overview already listed. A
    /// detail page cannot inflate the asset count with partial or
    /// hallucinated extractions.
    #[default]
    EnrichOnly,
    /// New identities are appended (merging peer extraction passes).
    AllowNew,
}

/// True when a value is a placeholder standing in for "unknown".
pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDER_VALUES.contains(&value.trim().to_lowercase().as_str())
}

/// Normalized merge identity: parenthetical suffix stripped, first
/// whitespace-delimited token, uppercased. `None` for placeholder names.
pub fn normalize_identity(name: &str) -> Option<String> {
    let stripped = match name.find('(') {
        Some(index) => &name[..index],
        None => name,
    };
    let token = stripped.split_whitespace().next().unwrap_or("");
    if is_placeholder(token) {
        return None;
    }
    Some(token.to_uppercase())
}

/// Merge new assets into an existing set.
///
/// Pure and deterministic given ordered inputs: existing assets keep their
/// positions, appended assets follow in input order. Descriptive fields are
/// filled generic-to-specific; divergent non-placeholder values concatenate
/// with "; " rather than discarding either.
pub fn merge_assets(
    existing: Vec<ExtractedAsset>,
    new: Vec<ExtractedAsset>,
    policy: MergePolicy,
) -> Vec<ExtractedAsset> {
    let mut merged: Vec<ExtractedAsset> = Vec::new();
    let mut index: IndexMap<String, usize> = IndexMap::new();

    for asset in existing {
        match normalize_identity(&asset.asset_name) {
            Some(key) => {
                if let Some(&position) = index.get(&key) {
                    // Duplicate identity already in the existing set: the
                    // first occurrence keeps its position and precedence.
                    merge_into(&mut merged[position], &asset);
                } else {
                    index.insert(key, merged.len());
                    merged.push(asset);
                }
            }
            None => merged.push(asset),
        }
    }

    for asset in new {
        match normalize_identity(&asset.asset_name) {
            Some(key) => {
                if let Some(&position) = index.get(&key) {
                    merge_into(&mut merged[position], &asset);
                } else if policy == MergePolicy::AllowNew {
                    index.insert(key, merged.len());
                    merged.push(asset);
                } else {
                    debug!(
                        asset = %asset.asset_name,
                        "dropping asset absent from overview roster"
                    );
                }
            }
            None => merged.push(asset),
        }
    }

    merged
}

/// Fold one asset's fields into an established entry.
fn merge_into(current: &mut ExtractedAsset, incoming: &ExtractedAsset) {
    merge_field(&mut current.therapeutic_area, &incoming.therapeutic_area);
    merge_field(&mut current.modality, &incoming.modality);
    merge_field(&mut current.description, &incoming.description);
    merge_field(&mut current.therapeutic_target, &incoming.therapeutic_target);
    merge_field(&mut current.indication, &incoming.indication);

    // Phase fills a gap but is never concatenated or overwritten; the
    // asset name itself never changes.
    if is_placeholder(&current.phase) && !is_placeholder(&incoming.phase) {
        current.phase = incoming.phase.clone();
    }

    for url in &incoming.source_urls {
        if !current.source_urls.contains(url) {
            current.source_urls.push(url.clone());
        }
    }
}

/// Adopt specific over generic; keep both when they genuinely differ.
fn merge_field(current: &mut String, incoming: &str) {
    let incoming = incoming.trim();
    if is_placeholder(incoming) {
        return;
    }
    if is_placeholder(current) {
        *current = incoming.to_string();
        return;
    }
    let already_present = current
        .split(';')
        .any(|part| part.trim().eq_ignore_ascii_case(incoming));
    if !already_present {
        current.push_str("; ");
        current.push_str(incoming);
    }
}
