use std::fmt::Write;

use crate::retrieve::RetrievalResult;

const UNKNOWN_PAGE: &str = "N/A";

/// Renders hits as numbered blocks carrying source file and page. Chunk text is emitted
/// verbatim.
pub fn format_results(results: &RetrievalResult, query: &str) -> String {
    if results.is_empty() {
        return format!("No relevant documentation found for \"{}\".", query.trim());
    }

    let mut out = String::new();
    let _ = write!(
        out,
        "Found {} relevant passage(s) for \"{}\":",
        results.len(),
        query.trim()
    );
    for (i, hit) in results.hits.iter().enumerate() {
        let citation = hit.citation();
        let page = citation
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| UNKNOWN_PAGE.to_string());
        let _ = write!(
            out,
            "\n\n[{}] Source: {} | Page: {} | Score: {:.3}\n{}",
            i + 1,
            citation.source,
            page,
            hit.score,
            hit.chunk.text
        );
    }
    out
}
