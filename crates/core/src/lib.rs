pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod stores;
pub mod traits;

pub use config::{
    EmbeddingConfig, EmbeddingProvider, IndexBackend, IndexConfig, InsightsConfig, PineconeConfig,
    QdrantConfig,
};
pub use embeddings::{Embedder, HashingEmbedder, OpenAiEmbedder};
pub use error::{ConfigError, EmbedError, IndexError, IngestError, PipelineError};
pub use extractor::{extract_text, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{
    discover_pdf_files, is_pdf_name, store_file, store_folder, IngestionReport, SkippedPdf,
};
pub use models::{
    Document, DocumentMetadata, IndexSpec, Match, Metric, StoreReceipt,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_INDEX_NAME, DEFAULT_TOP_K,
};
pub use pipeline::{build_embedder, InsightsPipeline};
pub use stores::{connect_index, InMemoryIndex, PineconeIndex, QdrantIndex};
pub use traits::VectorIndex;
