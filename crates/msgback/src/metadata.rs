//! Title marker and finalized-description formats.
//!
//! A finalized document carries a `_backup` suffix in its title, optionally
//! preceded by a normalized message timestamp, and a JSON description listing
//! the derived documents created for it. Earlier runs of the system used a
//! `backup_` title prefix and a bare JSON array description; both legacy
//! forms are still recognized on read.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

pub const SUFFIX_MARKER: &str = "_backup";
pub const PREFIX_MARKER: &str = "backup_";

/// Matches the normalized timestamp prefix written by `mark_title`.
fn timestamp_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}(:\d{2})? - ").expect("valid regex")
    })
}

/// True when a title carries a finalized marker in either form.
pub fn is_marked(title: &str) -> bool {
    title.ends_with(SUFFIX_MARKER) || title.starts_with(PREFIX_MARKER)
}

/// Builds the finalized title: the `_backup` suffix, preceded by the
/// normalized message timestamp when one is available.
pub fn mark_title(title: &str, timestamp: Option<&str>) -> String {
    match timestamp {
        Some(ts) => format!("{} - {}{}", ts, title, SUFFIX_MARKER),
        None => format!("{}{}", title, SUFFIX_MARKER),
    }
}

/// Recovers the pre-migration title from a finalized one. Strips the suffix
/// marker, the legacy prefix marker, and a normalized timestamp prefix.
pub fn strip_marker(title: &str) -> String {
    let title = title.strip_suffix(SUFFIX_MARKER).unwrap_or(title);
    let title = title.strip_prefix(PREFIX_MARKER).unwrap_or(title);
    timestamp_prefix().replace(title, "").into_owned()
}

/// Canonical description of a finalized document: the ordered derived
/// document ids.
pub fn encode_description(derived_ids: &[String]) -> String {
    serde_json::json!({ "includedFiles": derived_ids }).to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptionFormat {
    Wrapped {
        #[serde(rename = "includedFiles")]
        included_files: Vec<String>,
    },
    Bare(Vec<String>),
}

/// Parses a finalized description. Accepts the canonical
/// `{"includedFiles": [...]}` object and the legacy bare-array form.
pub fn parse_description(description: &str) -> Result<Vec<String>, serde_json::Error> {
    match serde_json::from_str::<DescriptionFormat>(description)? {
        DescriptionFormat::Wrapped { included_files } => Ok(included_files),
        DescriptionFormat::Bare(ids) => Ok(ids),
    }
}
