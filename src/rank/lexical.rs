use std::collections::HashMap;

use crate::models::Paper;

// Okapi BM25 parameters. The epsilon floor replaces negative idf values
// (terms present in more than half the corpus) with a small positive
// fraction of the mean idf, so common terms still contribute.
const K1: f32 = 1.5;
const B: f32 = 0.75;
const EPSILON: f32 = 0.25;

/// Rank papers by BM25 relevance of `"{title} {abstract}"` against the
/// query and keep the top `top_k`, descending. Papers with equal scores
/// retain their input order. Empty input returns empty without building a
/// model.
pub fn rank(papers: Vec<Paper>, query: &str, top_k: usize) -> Vec<Paper> {
    if papers.is_empty() {
        return papers;
    }

    let docs: Vec<Vec<String>> = papers
        .iter()
        .map(|p| tokenize(&format!("{} {}", p.title, p.abstract_text)))
        .collect();

    let model = Bm25Model::fit(&docs);
    let query_tokens = tokenize(query);

    let mut indexed: Vec<(usize, f32)> = (0..papers.len())
        .map(|i| (i, model.score(&query_tokens, i)))
        .collect();

    // Stable sort: equal scores keep input order.
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    indexed.truncate(top_k);

    let mut by_index: Vec<Option<Paper>> = papers.into_iter().map(Some).collect();
    indexed
        .into_iter()
        .filter_map(|(i, _)| by_index[i].take())
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Okapi BM25 over a fixed document collection.
struct Bm25Model {
    term_freqs: Vec<HashMap<String, f32>>,
    doc_lens: Vec<f32>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

impl Bm25Model {
    fn fit(docs: &[Vec<String>]) -> Self {
        let n = docs.len() as f32;

        let mut term_freqs = Vec::with_capacity(docs.len());
        let mut doc_lens = Vec::with_capacity(docs.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in docs {
            let mut freqs: HashMap<String, f32> = HashMap::new();
            for token in doc {
                *freqs.entry(token.clone()).or_insert(0.0) += 1.0;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            doc_lens.push(doc.len() as f32);
            term_freqs.push(freqs);
        }

        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / doc_lens.len() as f32
        };

        let mut idf: HashMap<String, f32> = HashMap::new();
        let mut idf_sum = 0.0f32;
        for (term, df) in &doc_freq {
            let value = ((n - *df as f32 + 0.5) / (*df as f32 + 0.5)).ln();
            idf_sum += value;
            idf.insert(term.clone(), value);
        }

        let floor = if idf.is_empty() {
            0.0
        } else {
            EPSILON * (idf_sum / idf.len() as f32)
        };
        for value in idf.values_mut() {
            if *value < 0.0 {
                *value = floor;
            }
        }

        Self {
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    fn score(&self, query_tokens: &[String], doc: usize) -> f32 {
        let freqs = &self.term_freqs[doc];
        let len_norm = if self.avg_doc_len > 0.0 {
            self.doc_lens[doc] / self.avg_doc_len
        } else {
            0.0
        };

        query_tokens
            .iter()
            .map(|token| {
                let tf = freqs.get(token).copied().unwrap_or(0.0);
                if tf == 0.0 {
                    return 0.0;
                }
                let idf = self.idf.get(token).copied().unwrap_or(0.0);
                idf * tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * len_norm))
            })
            .sum()
    }
}
