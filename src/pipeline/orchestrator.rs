use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tokio::sync::mpsc;

use crate::arxiv::PaperSource;
use crate::config::Config;
use crate::document;
use crate::llm::client::truncate_chars;
use crate::llm::{enhance, Embedder, Generator};
use crate::models::{PipelineState, Stage, StageEvent};
use crate::pipeline::{analysis, summarize};
use crate::{rank, search};

/// The fixed, strictly linear stage sequence. No branching, no cycles; the
/// error state is reachable from every stage.
const STAGES: [Stage; 7] = [
    Stage::QueryProcessing,
    Stage::Searching,
    Stage::Ranking,
    Stage::Summarizing,
    Stage::Filtering,
    Stage::Analysis,
    Stage::Formatting,
];

/// Owns the ordered stage sequence and the capabilities the stages consume.
/// Holds no per-run state: each [`run`](Pipeline::run) threads its own
/// [`PipelineState`] through the stages and discards it at the terminal
/// transition.
pub struct Pipeline {
    config: Config,
    source: Arc<dyn PaperSource>,
    generator: Arc<dyn Generator>,
    embedder: Arc<dyn Embedder>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        source: Arc<dyn PaperSource>,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            config,
            source,
            generator,
            embedder,
        }
    }

    /// Run one research pipeline for `user_query`, emitting a progress event
    /// before and after every stage.
    ///
    /// A stage failure emits a single error event and ends the run with no
    /// partial document. A closed event channel means the client is gone:
    /// the run stops at the next stage boundary without emitting anything
    /// further.
    pub async fn run(&self, user_query: String, events: mpsc::Sender<StageEvent>) {
        let mut state = PipelineState::new(user_query);

        for stage in STAGES {
            let entry = StageEvent::in_progress(stage, in_progress_status(stage));
            if events.send(entry).await.is_err() {
                tracing::info!("Client disconnected, abandoning run before {stage:?}");
                return;
            }

            if let Err(e) = self.run_stage(stage, &mut state).await {
                tracing::error!("Stage {stage:?} failed: {e:#}");
                let event = StageEvent {
                    stage: Stage::Error,
                    status: format!("{e:#}"),
                    data: None,
                };
                let _ = events.send(event).await;
                return;
            }

            let exit = StageEvent::complete(stage, stage_projection(stage, &state));
            if events.send(exit).await.is_err() {
                tracing::info!("Client disconnected, abandoning run after {stage:?}");
                return;
            }
        }

        let terminal = StageEvent {
            stage: Stage::Complete,
            status: "Research complete".to_string(),
            data: Some(json!({
                "document": state.final_document,
                "papers": state.filtered_papers,
            })),
        };
        let _ = events.send(terminal).await;
    }

    /// Dispatch one stage against the accumulating state.
    async fn run_stage(&self, stage: Stage, state: &mut PipelineState) -> Result<()> {
        match stage {
            Stage::QueryProcessing => self.process_query(state).await,
            Stage::Searching => self.search_papers(state).await,
            Stage::Ranking => self.rank_papers(state).await,
            Stage::Summarizing => self.summarize_papers(state).await,
            Stage::Filtering => self.filter_papers(state).await,
            Stage::Analysis => self.create_analysis(state).await,
            Stage::Formatting => self.format_document(state).await,
            // Terminal pseudo-stages never reach the dispatcher
            Stage::Complete | Stage::Error => Ok(()),
        }
    }

    async fn process_query(&self, state: &mut PipelineState) -> Result<()> {
        let enhanced = enhance::enhance_query(self.generator.as_ref(), &state.user_query).await?;
        state.enhanced_query = Some(enhanced);
        state.status = "Query processed".to_string();
        Ok(())
    }

    async fn search_papers(&self, state: &mut PipelineState) -> Result<()> {
        let queries = state
            .enhanced_query
            .as_ref()
            .map(|e| e.arxiv_queries.clone())
            .unwrap_or_else(|| vec![state.user_query.clone()]);

        let papers = search::fanout::search_all_queries(
            self.source.clone(),
            &queries,
            self.config.search.per_query_results,
            self.config.search.max_concurrent_searches,
        )
        .await;

        state.status = format!("Found {} papers", papers.len());
        state.raw_papers = papers;
        Ok(())
    }

    async fn rank_papers(&self, state: &mut PipelineState) -> Result<()> {
        let ranked = rank::multi_stage(
            state.raw_papers.clone(),
            &state.user_query,
            &self.config.ranking,
            self.embedder.as_ref(),
            self.generator.as_ref(),
        )
        .await?;

        state.status = format!("Ranked top {} papers", ranked.len());
        state.ranked_papers = ranked;
        Ok(())
    }

    async fn summarize_papers(&self, state: &mut PipelineState) -> Result<()> {
        let summarized =
            summarize::summarize_papers(state.ranked_papers.clone(), self.generator.as_ref())
                .await?;
        state.summarized_papers = summarized;
        state.status = "Papers summarized".to_string();
        Ok(())
    }

    async fn filter_papers(&self, state: &mut PipelineState) -> Result<()> {
        let filtered = summarize::filter_relevant(
            state.summarized_papers.clone(),
            &state.user_query,
            self.generator.as_ref(),
        )
        .await?;

        state.status = format!("Filtered to {} relevant papers", filtered.len());
        state.filtered_papers = filtered;
        Ok(())
    }

    async fn create_analysis(&self, state: &mut PipelineState) -> Result<()> {
        let plan = analysis::create_plan(
            &state.filtered_papers,
            &state.user_query,
            self.generator.as_ref(),
        )
        .await?;

        let text =
            analysis::write_analysis(&plan, &state.filtered_papers, self.generator.as_ref())
                .await?;

        state.analysis_plan = Some(plan);
        state.analysis = Some(text);
        state.status = "Analysis created".to_string();
        Ok(())
    }

    async fn format_document(&self, state: &mut PipelineState) -> Result<()> {
        let document = document::format_document(
            state.analysis.as_deref().unwrap_or_default(),
            &state.filtered_papers,
        );
        state.final_document = Some(document);
        state.status = "Document formatted".to_string();
        Ok(())
    }
}

fn in_progress_status(stage: Stage) -> &'static str {
    match stage {
        Stage::QueryProcessing => "Processing query...",
        Stage::Searching => "Searching ArXiv...",
        Stage::Ranking => "Ranking papers...",
        Stage::Summarizing => "Creating summaries...",
        Stage::Filtering => "Filtering relevant papers...",
        Stage::Analysis => "Creating domain analysis...",
        Stage::Formatting => "Formatting document...",
        Stage::Complete | Stage::Error => "",
    }
}

/// The stage-specific `data` payload of each Complete event: a small
/// projection of the state, never the whole accumulator.
fn stage_projection(stage: Stage, state: &PipelineState) -> serde_json::Value {
    match stage {
        Stage::QueryProcessing => json!(state.enhanced_query),
        Stage::Searching => json!({
            "count": state.raw_papers.len(),
            "papers": state.raw_papers.iter().take(5).collect::<Vec<_>>(),
        }),
        Stage::Ranking => json!({
            "top_papers": state.ranked_papers.iter().take(5).collect::<Vec<_>>(),
        }),
        Stage::Summarizing => json!({
            "summaries": state
                .summarized_papers
                .iter()
                .take(3)
                .map(|p| {
                    json!({
                        "title": p.title,
                        "summary": truncate_chars(p.summary.as_deref().unwrap_or_default(), 200),
                    })
                })
                .collect::<Vec<_>>(),
        }),
        Stage::Filtering => json!({
            "relevant_count": state.filtered_papers.len(),
        }),
        Stage::Analysis => json!({
            "plan": state.analysis_plan,
        }),
        Stage::Formatting => json!({
            "document": state.final_document,
        }),
        Stage::Complete | Stage::Error => serde_json::Value::Null,
    }
}
