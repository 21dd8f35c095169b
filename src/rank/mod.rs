//! Multi-stage ranking engine.
//!
//! Three progressively narrower passes over the candidate set:
//!
//! 1. [`lexical`] — BM25 over title + abstract, cheap in-process rejection
//!    of the bulk of the candidates.
//! 2. [`semantic`] — embedding cosine similarity, catching paraphrase
//!    relevance lexical matching misses.
//! 3. [`judged`] — per-paper LLM relevance scores on a 0-10 scale, the
//!    expensive precision pass.
//!
//! Every stage is a pure narrowing: it subsets its input, never unions, so
//! the aggregator's dedup invariant survives the whole chain. Ties at every
//! stage keep input order.

pub mod judged;
pub mod lexical;
pub mod semantic;

use anyhow::Result;

use crate::config::RankingConfig;
use crate::llm::{Embedder, Generator};
use crate::models::Paper;

/// Run the full lexical → semantic → judged chain.
pub async fn multi_stage(
    papers: Vec<Paper>,
    query: &str,
    config: &RankingConfig,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
) -> Result<Vec<Paper>> {
    let survivors = lexical::rank(papers, query, config.bm25_top_k);
    let survivors = semantic::rank(survivors, query, config.embedding_top_k, embedder).await?;
    let survivors = judged::rank(
        survivors,
        query,
        config.llm_top_k,
        config.judge_call_cap,
        generator,
    )
    .await;
    Ok(survivors)
}
