use anyhow::{Context, Result};

use crate::llm::client::truncate_chars;
use crate::llm::Embedder;
use crate::models::Paper;

/// Characters of the abstract included in the embedded text. Titles carry
/// most of the signal; a bounded prefix of the abstract adds context without
/// blowing the embedding budget.
const ABSTRACT_PREFIX_CHARS: usize = 500;

/// Rank papers by cosine similarity between the query embedding and each
/// paper's `"{title} {abstract prefix}"` embedding; keep the top `top_k`,
/// descending. Equal similarities keep input order. Empty input returns
/// empty without touching the embedder.
pub async fn rank(
    papers: Vec<Paper>,
    query: &str,
    top_k: usize,
    embedder: &dyn Embedder,
) -> Result<Vec<Paper>> {
    if papers.is_empty() {
        return Ok(papers);
    }

    // One batch: query first, then every document in input order.
    let mut texts = Vec::with_capacity(papers.len() + 1);
    texts.push(query.to_string());
    texts.extend(papers.iter().map(|p| {
        format!(
            "{} {}",
            p.title,
            truncate_chars(&p.abstract_text, ABSTRACT_PREFIX_CHARS)
        )
    }));

    let embeddings = embedder
        .embed(&texts)
        .await
        .context("Embedding failed during semantic ranking")?;

    if embeddings.len() != texts.len() {
        anyhow::bail!(
            "Embedder returned {} vectors for {} texts",
            embeddings.len(),
            texts.len()
        );
    }

    let query_embedding = &embeddings[0];

    let mut indexed: Vec<(usize, f32)> = embeddings[1..]
        .iter()
        .enumerate()
        .map(|(i, doc)| (i, cosine_similarity(query_embedding, doc)))
        .collect();

    // Stable sort: equal similarities keep input order.
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    indexed.truncate(top_k);

    let mut by_index: Vec<Option<Paper>> = papers.into_iter().map(Some).collect();
    Ok(indexed
        .into_iter()
        .filter_map(|(i, _)| by_index[i].take())
        .collect())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
