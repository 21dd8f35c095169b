use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate research paper as returned by the arXiv API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// Stable arXiv entry id, the dedup key across query variants.
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    pub pdf_url: Option<String>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    /// Attached by the judged ranking stage only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
    /// Attached by the summarization stage only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Paper {
    /// A bare paper with only the fields every stage relies on.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            abstract_text: abstract_text.into(),
            published: None,
            updated: None,
            categories: Vec::new(),
            pdf_url: None,
            doi: None,
            journal_ref: None,
            relevance_score: None,
            summary: None,
        }
    }
}

/// Output of query enhancement: human-readable variants, arXiv query
/// strings, and extracted keywords. Created once per run, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancedQuery {
    pub enhanced_queries: Vec<String>,
    pub arxiv_queries: Vec<String>,
    pub keywords: Vec<String>,
}

impl EnhancedQuery {
    /// Degenerate enhancement used when the model's output fails to parse:
    /// the original query stands in for every variant.
    pub fn fallback(query: &str) -> Self {
        Self {
            enhanced_queries: vec![query.to_string()],
            arxiv_queries: vec![query.to_string()],
            keywords: query.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Plan for the domain analysis, produced by one generator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPlan {
    pub title: String,
    pub sections: Vec<PlanSection>,
    pub conclusion_plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSection {
    pub title: String,
    pub content_plan: String,
    /// 1-based indices into the filtered paper list.
    pub papers_refs: Vec<usize>,
}

/// The accumulator threaded through the pipeline. Earlier fields are never
/// overwritten; each stage appends the field(s) it produces. One state per
/// run, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub user_query: String,
    pub enhanced_query: Option<EnhancedQuery>,
    pub raw_papers: Vec<Paper>,
    pub ranked_papers: Vec<Paper>,
    pub summarized_papers: Vec<Paper>,
    pub filtered_papers: Vec<Paper>,
    pub analysis_plan: Option<AnalysisPlan>,
    pub analysis: Option<String>,
    pub final_document: Option<String>,
    pub status: String,
}

impl PipelineState {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            enhanced_query: None,
            raw_papers: Vec::new(),
            ranked_papers: Vec::new(),
            summarized_papers: Vec::new(),
            filtered_papers: Vec::new(),
            analysis_plan: None,
            analysis: None,
            final_document: None,
            status: "Started".to_string(),
        }
    }
}

/// One unit of the linear pipeline, in wire order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    QueryProcessing,
    Searching,
    Ranking,
    Summarizing,
    Filtering,
    Analysis,
    Formatting,
    Complete,
    Error,
}

/// A progress notification sent to the client. Transient, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: Stage,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StageEvent {
    pub fn in_progress(stage: Stage, status: impl Into<String>) -> Self {
        Self {
            stage,
            status: status.into(),
            data: None,
        }
    }

    pub fn complete(stage: Stage, data: serde_json::Value) -> Self {
        Self {
            stage,
            status: "Complete".to_string(),
            data: Some(data),
        }
    }
}

/// Client → server message: exactly one query per run.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
}
