use crate::llm::client::truncate_chars;
use crate::llm::Generator;
use crate::models::Paper;

/// Score assigned when the judge's response cannot be parsed as a number or
/// the call itself fails: the paper stays ranked, just neutrally.
const NEUTRAL_SCORE: f32 = 5.0;

const ABSTRACT_PREFIX_CHARS: usize = 500;

/// Rank papers by per-paper judge scores on the closed [0, 10] scale and
/// keep the top `top_k`, descending.
///
/// Skip rule: an input that already fits within `top_k` is returned
/// untouched — no reordering, no scores, zero judge calls. Otherwise at most
/// `call_cap` papers are scored, one sequential call each in input order;
/// papers past the cap are dropped before scoring and can never reach the
/// output. Ties keep input order.
pub async fn rank(
    mut papers: Vec<Paper>,
    query: &str,
    top_k: usize,
    call_cap: usize,
    generator: &dyn Generator,
) -> Vec<Paper> {
    if papers.len() <= top_k {
        return papers;
    }

    papers.truncate(call_cap);

    let mut scored = Vec::with_capacity(papers.len());
    for mut paper in papers {
        let prompt = build_judge_prompt(query, &paper);
        let score = match generator.complete(&prompt).await {
            Ok(response) => parse_score(&response).unwrap_or_else(|| {
                tracing::warn!(
                    "Judge response for '{}' was not numeric, using neutral score",
                    paper.id
                );
                NEUTRAL_SCORE
            }),
            Err(e) => {
                tracing::warn!("Judge call for '{}' failed: {e}, using neutral score", paper.id);
                NEUTRAL_SCORE
            }
        };
        paper.relevance_score = Some(score);
        scored.push(paper);
    }

    // Stable sort: equal scores keep the (sequential) scoring order.
    scored.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

fn build_judge_prompt(query: &str, paper: &Paper) -> String {
    format!(
        "Rate the relevance of this paper to the query on a scale from 0 to 10.\n\n\
         Query: {query}\n\n\
         Title: {}\n\
         Abstract: {}\n\n\
         Answer with ONLY a number from 0 to 10.",
        paper.title,
        truncate_chars(&paper.abstract_text, ABSTRACT_PREFIX_CHARS)
    )
}

/// Parse the judge's reply as a score, clamped into [0, 10]. Returns None
/// when the trimmed reply is not a number.
fn parse_score(response: &str) -> Option<f32> {
    response
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 10.0))
}
