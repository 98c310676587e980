//! Vector similarity search over stored guidance pages.

use crate::types::{SimilarityMatch, StoredPage};

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Find the top-k most similar pages by embedding, best first.
///
/// Ties keep insertion order, so equal scores come back in the order the
/// pages were indexed.
pub fn find_similar(query: &[f32], pages: &[StoredPage], top_k: usize) -> Vec<SimilarityMatch> {
    let mut matches: Vec<SimilarityMatch> = pages
        .iter()
        .filter(|p| !p.embedding.is_empty())
        .map(|p| SimilarityMatch {
            id: p.id,
            similarity: cosine_similarity(query, &p.embedding),
        })
        .collect();

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(top_k);
    matches
}
