use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL; in-memory storage is used when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL; catalog responses are not cached when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Catalog (TMDB) API key, sent as the `api_key` query parameter
    pub catalog_api_key: String,

    /// Catalog API base URL
    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    /// Locale code sent with every catalog request
    #[serde(default = "default_catalog_language")]
    pub catalog_language: String,

    /// Bearer credential for the sentence-similarity endpoint
    #[serde(default)]
    pub similarity_api_key: Option<String>,

    /// Sentence-similarity endpoint
    #[serde(default = "default_similarity_api_url")]
    pub similarity_api_url: String,

    /// Maximum number of similarity calls in flight per ranking batch
    #[serde(default = "default_similarity_concurrency")]
    pub similarity_concurrency: usize,

    /// Per-call timeout for similarity requests
    #[serde(default = "default_similarity_timeout_ms")]
    pub similarity_timeout_ms: u64,

    /// Candidates whose best similarity falls below this are dropped
    #[serde(default)]
    pub similarity_threshold: f64,

    /// How many AI-ranked candidates are kept before sampling
    #[serde(default = "default_ai_candidate_pool")]
    pub ai_candidate_pool: usize,

    /// Number of recommendations returned per media type
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: usize,

    /// How long a removed watched item can be restored
    #[serde(default = "default_undo_window_secs")]
    pub undo_window_secs: u64,

    /// Fixed seed for recommendation sampling
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_catalog_language() -> String {
    "tr-TR".to_string()
}

fn default_similarity_api_url() -> String {
    "https://api-inference.huggingface.co/models/sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_similarity_concurrency() -> usize {
    8
}

fn default_similarity_timeout_ms() -> u64 {
    10_000
}

fn default_ai_candidate_pool() -> usize {
    500
}

fn default_recommendation_count() -> usize {
    14
}

fn default_undo_window_secs() -> u64 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Load configuration from an explicit set of key/value pairs
    pub fn from_pairs<I>(pairs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(pairs)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
