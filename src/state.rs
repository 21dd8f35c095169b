use std::sync::Arc;

use crate::arxiv::ArxivClient;
use crate::config::Config;
use crate::llm::client::LlmClient;
use crate::pipeline::orchestrator::Pipeline;

/// Shared application state. Immutable after startup: every run borrows the
/// same pipeline and capability handles but owns its own state and budget.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let llm = Arc::new(LlmClient::new(http_client.clone(), config.llm.clone()));
        let source = Arc::new(ArxivClient::new(http_client, config.search.clone()));

        let pipeline = Arc::new(Pipeline::new(
            config.clone(),
            source,
            llm.clone(),
            llm,
        ));

        Ok(Self { config, pipeline })
    }
}
