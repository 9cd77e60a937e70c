use crate::models::{
    IndexSpec, Metric, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_INDEX_NAME, DEFAULT_TOP_K,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_PINECONE_CONTROLLER_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";

/// Everything the pipeline needs, built once at start-up and handed to each
/// component.
#[derive(Debug, Clone, Default)]
pub struct InsightsConfig {
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub top_k: usize,
}

impl InsightsConfig {
    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.index.name.clone(),
            dimension: self.embedding.dimensions,
            metric: self.index.metric,
        }
    }

    pub fn top_k(&self) -> usize {
        if self.top_k == 0 {
            DEFAULT_TOP_K
        } else {
            self.top_k
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Hashing,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexBackend {
    #[default]
    Pinecone,
    Qdrant,
    Memory,
}

#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub name: String,
    pub metric: Metric,
    pub pinecone: PineconeConfig,
    pub qdrant: QdrantConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Pinecone,
            name: DEFAULT_INDEX_NAME.to_string(),
            metric: Metric::Cosine,
            pinecone: PineconeConfig::default(),
            qdrant: QdrantConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: Option<String>,
    /// Serverless region, e.g. `us-east-1`.
    pub environment: Option<String>,
    pub cloud: String,
    pub controller_url: String,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: None,
            cloud: "aws".to_string(),
            controller_url: DEFAULT_PINECONE_CONTROLLER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            api_key: None,
        }
    }
}
