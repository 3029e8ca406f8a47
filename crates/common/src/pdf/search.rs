//! Case-insensitive phrase search over extracted page text

use regex_lite::{escape, RegexBuilder};
use serde::Serialize;

/// Characters of page text shown in a result preview
pub const PREVIEW_CHARS: usize = 100;

/// A page containing at least one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMatch {
    pub page_number: u32,
    pub match_count: usize,
    pub preview: String,
}

/// Count literal, case-insensitive occurrences of `query` on each page
///
/// The query is trimmed and matched literally. Pages without a match are
/// left out; a blank query matches nothing.
pub fn search_pages(pages: &[(u32, String)], query: &str) -> Vec<PageMatch> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let pattern = match RegexBuilder::new(&escape(query)).case_insensitive(true).build() {
        Ok(pattern) => pattern,
        Err(e) => {
            // Only reachable when the query exceeds the regex size limit
            tracing::warn!(error = %e, "Search pattern failed to compile");
            return Vec::new();
        }
    };

    pages
        .iter()
        .filter_map(|(page_number, text)| {
            let match_count = pattern.find_iter(text).count();
            (match_count > 0).then(|| PageMatch {
                page_number: *page_number,
                match_count,
                preview: preview(text),
            })
        })
        .collect()
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    preview.push_str("...");
    preview
}
