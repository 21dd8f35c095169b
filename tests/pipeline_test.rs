//! Integration tests for the research pipeline.
//!
//! These exercise the aggregator, the ranking stages, and the full
//! orchestrator with deterministic fake capabilities — no LLM or network
//! required. The arXiv client itself is tested against a mock HTTP server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use arxiv_research::arxiv::{ArxivClient, PaperSource};
use arxiv_research::config::{Config, RankingConfig, SearchConfig};
use arxiv_research::llm::{Embedder, Generator};
use arxiv_research::models::{Paper, Stage, StageEvent};
use arxiv_research::pipeline::orchestrator::Pipeline;
use arxiv_research::rank;
use arxiv_research::search::fanout::search_all_queries;

// ─── Fake capabilities ───────────────────────────────────

/// Paper source with canned per-query responses; unknown queries fail.
struct CannedSource {
    responses: Vec<(String, Vec<Paper>)>,
}

impl CannedSource {
    fn new(responses: Vec<(&str, Vec<Paper>)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(q, p)| (q.to_string(), p))
                .collect(),
        }
    }
}

#[async_trait]
impl PaperSource for CannedSource {
    async fn search(&self, query: &str, _cap: usize) -> Result<Vec<Paper>> {
        self.responses
            .iter()
            .find(|(q, _)| q == query)
            .map(|(_, p)| p.clone())
            .ok_or_else(|| anyhow::anyhow!("provider error for '{query}'"))
    }
}

/// Generator that drives every pipeline stage deterministically and counts
/// judge calls.
struct ScriptedGenerator {
    arxiv_queries: Vec<String>,
    judge_calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(arxiv_queries: &[&str]) -> Self {
        Self {
            arxiv_queries: arxiv_queries.iter().map(|s| s.to_string()).collect(),
            judge_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("expert in scientific literature search") {
            let queries: Vec<String> = self
                .arxiv_queries
                .iter()
                .map(|q| format!("\"{q}\""))
                .collect();
            Ok(format!(
                "{{\"enhanced_queries\": [{0}], \"arxiv_queries\": [{0}], \"keywords\": []}}",
                queries.join(", ")
            ))
        } else if prompt.contains("Rate the relevance") {
            self.judge_calls.fetch_add(1, Ordering::SeqCst);
            Ok("6".to_string())
        } else if prompt.contains("Answer: YES or NO") {
            Ok("YES".to_string())
        } else {
            Ok("Generated text.".to_string())
        }
    }
}

/// Uniform embedder: every text lands on the same direction, so the
/// semantic stage preserves input order.
struct UniformEmbedder;

#[async_trait]
impl Embedder for UniformEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

fn paper(id: &str, title: &str, abstract_text: &str) -> Paper {
    Paper::new(id, title, abstract_text)
}

async fn collect_events(pipeline: &Pipeline, query: &str) -> Vec<StageEvent> {
    let (tx, mut rx) = mpsc::channel(64);
    pipeline.run(query.to_string(), tx).await;

    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

// ─── Scenario 1: aggregator dedup ────────────────────────

#[tokio::test]
async fn test_overlapping_results_across_queries_deduplicate() {
    // 2 queries returning 3 paper records total, one id overlapping
    let source = Arc::new(CannedSource::new(vec![
        (
            "graph neural networks",
            vec![
                paper("arxiv:1", "GNN Survey", "graphs"),
                paper("arxiv:2", "Message Passing", "graphs"),
            ],
        ),
        ("gnn architectures", vec![paper("arxiv:2", "Message Passing", "graphs")]),
    ]));

    let result = search_all_queries(
        source,
        &[
            "graph neural networks".to_string(),
            "gnn architectures".to_string(),
        ],
        30,
        5,
    )
    .await;

    assert_eq!(result.len(), 2);
    let mut ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["arxiv:1", "arxiv:2"]);
}

// ─── Scenario 2: lexical top-K with distinct scores ──────

#[tokio::test]
async fn test_lexical_stage_returns_exact_top_10() {
    // Term frequency of "ranking" decreases with the index, giving 30
    // strictly distinct scores
    let papers: Vec<Paper> = (0..30)
        .map(|i| {
            paper(
                &format!("p{i}"),
                &format!("Study {i}"),
                &"ranking ".repeat(30 - i),
            )
        })
        .collect();

    let result = rank::lexical::rank(papers, "ranking", 10);

    assert_eq!(result.len(), 10);
    let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
    assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

// ─── Scenario 3: judged skip rule ────────────────────────

#[tokio::test]
async fn test_judged_stage_skips_when_input_fits() {
    let generator = ScriptedGenerator::new(&[]);
    let papers: Vec<Paper> = (0..5).map(|i| paper(&format!("p{i}"), "T", "a")).collect();

    let result = rank::judged::rank(papers, "query", 10, 25, &generator).await;

    assert_eq!(result.len(), 5);
    let ids: Vec<&str> = result.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p0", "p1", "p2", "p3", "p4"]);
    assert!(result.iter().all(|p| p.relevance_score.is_none()));
    assert_eq!(generator.judge_calls.load(Ordering::SeqCst), 0);
}

// ─── Scenario 4: partial search failure ──────────────────

#[tokio::test]
async fn test_one_failing_query_does_not_error_the_run() {
    let source = Arc::new(CannedSource::new(vec![(
        "good query",
        vec![paper("arxiv:ok", "Surviving Paper", "body")],
    )]));
    // "broken query" is unknown to the source and raises
    let generator = Arc::new(ScriptedGenerator::new(&["good query", "broken query"]));

    let pipeline = Pipeline::new(
        Config::default(),
        source,
        generator,
        Arc::new(UniformEmbedder),
    );

    let events = collect_events(&pipeline, "anything").await;

    assert!(events.iter().all(|e| e.stage != Stage::Error));

    let search_complete = events
        .iter()
        .find(|e| e.stage == Stage::Searching && e.status == "Complete")
        .unwrap();
    let data = search_complete.data.as_ref().unwrap();
    assert_eq!(data["count"], 1);
    assert_eq!(data["papers"][0]["id"], "arxiv:ok");

    assert_eq!(events.last().unwrap().stage, Stage::Complete);
}

// ─── Event sequence property ─────────────────────────────

#[tokio::test]
async fn test_completed_run_emits_fixed_stage_sequence() {
    let source = Arc::new(CannedSource::new(vec![(
        "q",
        vec![
            paper("arxiv:1", "First", "alpha"),
            paper("arxiv:2", "Second", "beta"),
        ],
    )]));
    let pipeline = Pipeline::new(
        Config::default(),
        source,
        Arc::new(ScriptedGenerator::new(&["q"])),
        Arc::new(UniformEmbedder),
    );

    let events = collect_events(&pipeline, "test").await;

    let expected = [
        Stage::QueryProcessing,
        Stage::Searching,
        Stage::Ranking,
        Stage::Summarizing,
        Stage::Filtering,
        Stage::Analysis,
        Stage::Formatting,
    ];

    assert_eq!(events.len(), expected.len() * 2 + 1);
    for (i, stage) in expected.iter().enumerate() {
        assert_eq!(events[2 * i].stage, *stage, "in-progress event {i}");
        assert_ne!(events[2 * i].status, "Complete");
        assert_eq!(events[2 * i + 1].stage, *stage, "complete event {i}");
        assert_eq!(events[2 * i + 1].status, "Complete");
    }

    let terminal = events.last().unwrap();
    assert_eq!(terminal.stage, Stage::Complete);
    let data = terminal.data.as_ref().unwrap();
    assert!(data["document"].as_str().unwrap().contains("## References"));
    assert_eq!(data["papers"].as_array().unwrap().len(), 2);
}

// ─── Monotonic narrowing across the full chain ───────────

#[tokio::test]
async fn test_ranking_narrows_progressively() {
    let papers: Vec<Paper> = (0..60)
        .map(|i| {
            paper(
                &format!("p{i}"),
                &format!("Paper about ranking {i}"),
                &"relevant ".repeat(60 - i),
            )
        })
        .collect();

    let generator = ScriptedGenerator::new(&[]);
    let config = RankingConfig::default();

    let result = rank::multi_stage(
        papers,
        "relevant ranking",
        &config,
        &UniformEmbedder,
        &generator,
    )
    .await
    .unwrap();

    // 60 → 50 (lexical) → 25 (semantic) → 10 (judged)
    assert_eq!(result.len(), config.llm_top_k);
    // The judged stage ran: 25 survivors > top 10, capped at 25 calls
    assert_eq!(generator.judge_calls.load(Ordering::SeqCst), 25);
    assert!(result.iter().all(|p| p.relevance_score.is_some()));
}

#[tokio::test]
async fn test_empty_candidate_set_flows_through_all_stages() {
    let generator = ScriptedGenerator::new(&[]);
    let result = rank::multi_stage(
        vec![],
        "query",
        &RankingConfig::default(),
        &UniformEmbedder,
        &generator,
    )
    .await
    .unwrap();

    assert!(result.is_empty());
    assert_eq!(generator.judge_calls.load(Ordering::SeqCst), 0);
}

// ─── arXiv client against a mock HTTP server ─────────────

const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2301.00001v1</id>
    <published>2023-01-01T09:30:00Z</published>
    <updated>2023-01-02T10:00:00Z</updated>
    <title>Graph Neural Networks: A Survey</title>
    <summary>We survey graph neural networks.</summary>
    <author><name>Alice Smith</name></author>
    <link title="pdf" href="http://arxiv.org/pdf/2301.00001v1" rel="related" type="application/pdf"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

#[tokio::test]
async fn test_arxiv_client_parses_mock_feed() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:graph neural networks"))
        .and(query_param("sortBy", "relevance"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SAMPLE_FEED, "application/atom+xml"))
        .mount(&server)
        .await;

    let config = SearchConfig {
        base_url: server.uri(),
        ..SearchConfig::default()
    };
    let client = ArxivClient::new(reqwest::Client::new(), config);

    let papers = client.search("graph neural networks", 10).await.unwrap();

    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].id, "http://arxiv.org/abs/2301.00001v1");
    assert_eq!(papers[0].title, "Graph Neural Networks: A Survey");
    assert_eq!(papers[0].authors, vec!["Alice Smith"]);
    assert_eq!(papers[0].categories, vec!["cs.LG"]);
}

#[tokio::test]
async fn test_arxiv_client_caps_requested_results() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("max_results", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SAMPLE_FEED, "application/atom+xml"))
        .mount(&server)
        .await;

    let config = SearchConfig {
        base_url: server.uri(),
        max_results: 100,
        ..SearchConfig::default()
    };
    let client = ArxivClient::new(reqwest::Client::new(), config);

    // A cap above the configured maximum is clamped down to it
    let papers = client.search("q", 500).await.unwrap();
    assert_eq!(papers.len(), 1);
}

#[tokio::test]
async fn test_arxiv_client_surfaces_server_error() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = SearchConfig {
        base_url: server.uri(),
        ..SearchConfig::default()
    };
    let client = ArxivClient::new(reqwest::Client::new(), config);

    assert!(client.search("q", 10).await.is_err());
}
