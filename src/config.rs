use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// arXiv search configuration
    pub search: SearchConfig,
    /// Multi-stage ranking caps
    pub ranking: RankingConfig,
    /// Seconds to wait for the next client query before closing the socket
    pub ws_idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for generation (enhancement, judging, summaries, analysis)
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the arXiv API host
    pub base_url: String,
    /// Results requested per query variant
    pub per_query_results: usize,
    /// Hard cap on results from a single provider call
    pub max_results: usize,
    /// Concurrent in-flight provider calls during fan-out
    pub max_concurrent_searches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Survivors of the lexical (BM25) stage
    pub bm25_top_k: usize,
    /// Survivors of the semantic (embedding) stage
    pub embedding_top_k: usize,
    /// Survivors of the judged (LLM) stage — the final ranking size
    pub llm_top_k: usize,
    /// Ceiling on judge invocations per run; papers past it are dropped unscored
    pub judge_call_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            ranking: RankingConfig::default(),
            ws_idle_timeout_secs: 120,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://export.arxiv.org".to_string(),
            per_query_results: 30,
            max_results: 100,
            max_concurrent_searches: 5,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            bm25_top_k: 50,
            embedding_top_k: 25,
            llm_top_k: 10,
            judge_call_cap: 25,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ARXIV_RESEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("ARXIV_BASE_URL") {
            config.search.base_url = url;
        }
        if let Ok(val) = std::env::var("ARXIV_PER_QUERY_RESULTS") {
            if let Ok(v) = val.parse() {
                config.search.per_query_results = v;
            }
        }
        if let Ok(val) = std::env::var("ARXIV_MAX_RESULTS") {
            if let Ok(v) = val.parse() {
                config.search.max_results = v;
            }
        }
        if let Ok(val) = std::env::var("ARXIV_MAX_CONCURRENT_SEARCHES") {
            if let Ok(v) = val.parse::<usize>() {
                config.search.max_concurrent_searches = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("RANKING_BM25_TOP_K") {
            if let Ok(v) = val.parse() {
                config.ranking.bm25_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RANKING_EMBEDDING_TOP_K") {
            if let Ok(v) = val.parse() {
                config.ranking.embedding_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RANKING_LLM_TOP_K") {
            if let Ok(v) = val.parse() {
                config.ranking.llm_top_k = v;
            }
        }
        if let Ok(val) = std::env::var("RANKING_JUDGE_CALL_CAP") {
            if let Ok(v) = val.parse() {
                config.ranking.judge_call_cap = v;
            }
        }
        if let Ok(val) = std::env::var("WS_IDLE_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.ws_idle_timeout_secs = v;
            }
        }

        config
    }
}
