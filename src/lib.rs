//! # arxiv-research
//!
//! A streaming research service: a free-text query becomes a ranked,
//! summarized, cited document, with incremental progress pushed to the
//! client over a WebSocket.
//!
//! ## Architecture
//!
//! The pipeline is a strictly linear stage sequence over one accumulating
//! state object:
//!
//! ```text
//!   ┌──────────────┐
//!   │  User Query   │  one query per run, over /ws/research
//!   └──────┬───────┘
//!          ▼
//!   ┌──────────────┐
//!   │ Query Enhance │  LLM expands into 3-5 arXiv query variants
//!   └──────┬───────┘  (JSON parse, else fall back to the raw query)
//!          ▼
//!   ┌──────────────┐
//!   │   Search      │  all variants fanned out concurrently (≤5 in flight),
//!   └──────┬───────┘  merged + deduplicated by arXiv id, first writer wins
//!          ▼
//!   ┌──────────────┐
//!   │   Ranking     │  BM25 top 50 → embedding cosine top 25 →
//!   └──────┬───────┘  LLM judge (≤25 calls, 0-10 scale) top 10
//!          ▼
//!   ┌──────────────┐
//!   │  Summarize    │  per-paper summaries, fully concurrent
//!   └──────┬───────┘
//!          ▼
//!   ┌──────────────┐
//!   │   Filter      │  sequential YES/NO relevance judgments
//!   └──────┬───────┘
//!          ▼
//!   ┌──────────────┐
//!   │   Analysis    │  planned + written section by section
//!   └──────┬───────┘
//!          ▼
//!   ┌──────────────┐
//!   │   Format      │  GOST-style citations + final document
//!   └──────────────┘
//! ```
//!
//! Every stage emits a progress event before it starts and a Complete event
//! with a stage-specific payload after it finishes. A stage failure emits a
//! single error event and ends the run.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, LLM, search, and ranking caps
//! - [`models`] - Shared data types: `Paper`, `PipelineState`, `StageEvent`, request types
//! - [`arxiv`] - The arXiv Atom API client behind the `PaperSource` capability
//! - [`llm`] - `Generator`/`Embedder` capabilities, the Ollama/OpenAI client, query enhancement
//! - [`search`] - Bounded concurrent fan-out with first-writer-wins dedup
//! - [`rank`] - The three-stage ranking engine: lexical, semantic, judged
//! - [`pipeline`] - Stage implementations and the orchestrator state machine
//! - [`document`] - Citation formatting and final document assembly
//! - [`api`] - The axum WebSocket handler
//! - [`state`] - Shared application state holding config and capability handles

pub mod api;
pub mod arxiv;
pub mod config;
pub mod document;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod rank;
pub mod search;
pub mod state;
