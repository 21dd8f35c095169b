use std::collections::HashSet;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::arxiv::PaperSource;
use crate::models::Paper;

/// Issue every query concurrently against the paper source, bounded by
/// `max_concurrent` in-flight calls, and merge the results deduplicated by
/// paper id.
///
/// First writer wins: when two queries return the same id, the record from
/// whichever call completed first is kept and later duplicates are dropped.
/// A failing query is logged and contributes nothing; if every query fails
/// the result is simply empty. The returned order carries no meaning —
/// ranking stages impose the only meaningful order downstream.
pub async fn search_all_queries(
    source: Arc<dyn PaperSource>,
    queries: &[String],
    per_query: usize,
    max_concurrent: usize,
) -> Vec<Paper> {
    if queries.is_empty() {
        return Vec::new();
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut in_flight = FuturesUnordered::new();

    for query in queries {
        let source = source.clone();
        let semaphore = semaphore.clone();
        let query = query.clone();

        in_flight.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await;
            match source.search(&query, per_query).await {
                Ok(papers) => {
                    tracing::debug!("Query '{query}' returned {} papers", papers.len());
                    papers
                }
                Err(e) => {
                    tracing::warn!("Search for '{query}' failed: {e}");
                    Vec::new()
                }
            }
        }));
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<Paper> = Vec::new();

    while let Some(joined) = in_flight.next().await {
        // A panicked search task counts as a failed query.
        let papers = joined.unwrap_or_default();
        for paper in papers {
            if seen.insert(paper.id.clone()) {
                merged.push(paper);
            }
        }
    }

    merged
}
