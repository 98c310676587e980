//! Shooting-guidance retrieval from the PDF index.

use crate::index::IndexManager;
use crate::types::GuidePage;

/// Returned in place of guidance when no index has been built.
pub const INDEX_NOT_READY_GUIDANCE: &str =
    "The guidance index is not initialized. Process a PDF first.";

/// Returned when the index holds nothing relevant.
pub const NO_GUIDANCE_FOUND: &str = "No matching guidance was found in the indexed documents.";

const QUERY_PREFIX: &str = "Provide shooting guidelines for a photo like the following: ";

const RESULTS_HEADER: &str = "=== Guidance search results ===";

/// Build the similarity query for an analysis text.
pub fn guidance_query(analysis: &str) -> String {
    format!("{QUERY_PREFIX}{analysis}")
}

/// Render matches as `source (page N): content`, in the order given.
pub fn format_guidance(pages: &[GuidePage]) -> String {
    if pages.is_empty() {
        return NO_GUIDANCE_FOUND.to_string();
    }

    let mut out = String::from(RESULTS_HEADER);
    for page in pages {
        out.push_str(&format!(
            "\n\n{} (page {}): {}",
            page.metadata.source, page.metadata.page, page.content
        ));
    }
    out
}

/// Search the index with the analysis text and format the matches.
/// Never fails: an empty handle or a search error becomes the returned text.
pub async fn retrieve_guidance(index: &IndexManager, analysis: &str, top_k: usize) -> String {
    if !index.is_ready() {
        tracing::warn!("Guidance requested before the index was initialized");
        return INDEX_NOT_READY_GUIDANCE.to_string();
    }

    match index.search(&guidance_query(analysis), top_k).await {
        Ok(pages) => format_guidance(&pages),
        Err(e) => {
            tracing::warn!("Guidance search failed: {e}");
            format!("Guidance search failed: {e}")
        }
    }
}
