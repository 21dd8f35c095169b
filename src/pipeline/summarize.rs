use anyhow::{Context, Result};
use futures_util::future::try_join_all;

use crate::llm::client::truncate_chars;
use crate::llm::Generator;
use crate::models::Paper;

const ABSTRACT_SUMMARY_CHARS: usize = 1_500;
const ABSTRACT_FILTER_CHARS: usize = 500;
const AUTHORS_IN_PROMPT: usize = 3;

/// Attach a generated summary to every paper.
///
/// The per-paper calls are independent and run fully concurrently; the
/// output is reassembled in input order regardless of completion order. A
/// failing call fails the stage.
pub async fn summarize_papers(papers: Vec<Paper>, generator: &dyn Generator) -> Result<Vec<Paper>> {
    let futures = papers.into_iter().map(|mut paper| async move {
        let prompt = build_summary_prompt(&paper);
        let summary = generator
            .complete(&prompt)
            .await
            .with_context(|| format!("Summarization failed for '{}'", paper.id))?;
        paper.summary = Some(summary);
        Ok::<Paper, anyhow::Error>(paper)
    });

    try_join_all(futures).await
}

fn build_summary_prompt(paper: &Paper) -> String {
    let authors: Vec<&str> = paper
        .authors
        .iter()
        .take(AUTHORS_IN_PROMPT)
        .map(String::as_str)
        .collect();

    format!(
        "Write a concise summary of this research paper.\n\n\
         Title: {}\n\
         Authors: {}\n\
         Abstract: {}\n\n\
         The summary must cover:\n\
         1. The core problem\n\
         2. The proposed method or approach\n\
         3. The main results\n\
         4. Practical significance\n\n\
         At most 200 words.",
        paper.title,
        authors.join(", "),
        truncate_chars(&paper.abstract_text, ABSTRACT_SUMMARY_CHARS)
    )
}

/// Keep only papers the judge deems relevant to the query.
///
/// One sequential judge call per paper, in input order; a paper survives iff
/// the upper-cased response contains "YES". The judged text is the generated
/// summary when present, else a prefix of the abstract.
pub async fn filter_relevant(
    papers: Vec<Paper>,
    query: &str,
    generator: &dyn Generator,
) -> Result<Vec<Paper>> {
    let mut relevant = Vec::with_capacity(papers.len());

    for paper in papers {
        let prompt = build_filter_prompt(query, &paper);
        let response = generator
            .complete(&prompt)
            .await
            .with_context(|| format!("Relevance filter failed for '{}'", paper.id))?;

        if response.to_uppercase().contains("YES") {
            relevant.push(paper);
        }
    }

    Ok(relevant)
}

fn build_filter_prompt(query: &str, paper: &Paper) -> String {
    let text = paper
        .summary
        .as_deref()
        .unwrap_or_else(|| truncate_chars(&paper.abstract_text, ABSTRACT_FILTER_CHARS));

    format!(
        "Determine whether this paper is relevant to the query.\n\n\
         Query: {query}\n\n\
         Paper summary:\n{text}\n\n\
         Answer: YES or NO"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Generator that echoes a fixed reply and counts calls.
    struct FixedReply {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedReply {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Generator for FixedReply {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    /// Generator answering YES only when the prompt mentions a keyword.
    struct KeywordFilter;

    #[async_trait]
    impl Generator for KeywordFilter {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if prompt.contains("graph") {
                Ok("YES".to_string())
            } else {
                Ok("No, this is unrelated.".to_string())
            }
        }
    }

    fn paper(id: &str, title: &str) -> Paper {
        Paper::new(id, title, "some abstract")
    }

    #[tokio::test]
    async fn test_summaries_attached_in_input_order() {
        let generator = FixedReply::new("A summary.");
        let papers = vec![paper("a", "One"), paper("b", "Two"), paper("c", "Three")];

        let result = summarize_papers(papers, &generator).await.unwrap();

        let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(result.iter().all(|p| p.summary.as_deref() == Some("A summary.")));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_summarize_empty_input() {
        let generator = FixedReply::new("unused");
        let result = summarize_papers(vec![], &generator).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_filter_keeps_only_yes_answers() {
        let papers = vec![
            paper("a", "graph networks"),
            paper("b", "fluid dynamics"),
            paper("c", "graph attention"),
        ];

        // Judged text comes from the summary when present
        let papers: Vec<Paper> = papers
            .into_iter()
            .map(|mut p| {
                p.summary = Some(p.title.clone());
                p
            })
            .collect();

        let result = filter_relevant(papers, "graphs", &KeywordFilter).await.unwrap();
        let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_filter_match_is_case_insensitive() {
        let generator = FixedReply::new("yes, clearly relevant");
        let result = filter_relevant(vec![paper("a", "t")], "q", &generator)
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_uses_abstract_when_no_summary() {
        let mut p = paper("a", "title");
        p.abstract_text = "all about graph learning".to_string();
        let result = filter_relevant(vec![p], "q", &KeywordFilter).await.unwrap();
        assert_eq!(result.len(), 1);
    }

    /// Generator that fails on every call.
    struct AlwaysFails;

    #[async_trait]
    impl Generator for AlwaysFails {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            anyhow::bail!("model down")
        }
    }

    #[tokio::test]
    async fn test_summarize_propagates_call_failure() {
        let result = summarize_papers(vec![paper("a", "t")], &AlwaysFails).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_filter_propagates_call_failure() {
        let result = filter_relevant(vec![paper("a", "t")], "q", &AlwaysFails).await;
        assert!(result.is_err());
    }
}
