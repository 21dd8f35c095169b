//! LLM capability layer.
//!
//! The pipeline consumes two abstract capabilities: a [`Generator`] that
//! completes a text prompt and an [`Embedder`] that maps texts into a shared
//! vector space. Both are injected as trait objects so the ranking and
//! summarization stages can be exercised with deterministic fakes in tests.

pub mod client;
pub mod enhance;

use anyhow::Result;
use async_trait::async_trait;

/// Text-generation capability: prompt in, completion out.
///
/// Implementations make no promise about latency or output shape; all
/// parsing of the returned text is the caller's responsibility.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Text-embedding capability: one fixed-dimension vector per input text,
/// returned in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
