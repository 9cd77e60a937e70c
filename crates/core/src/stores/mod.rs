pub mod memory;
pub mod pinecone;
pub mod qdrant;

pub use memory::{cosine_similarity, InMemoryIndex};
pub use pinecone::PineconeIndex;
pub use qdrant::QdrantIndex;

use crate::config::{IndexBackend, IndexConfig};
use crate::traits::VectorIndex;
use crate::{ConfigError, IndexSpec, PipelineError};

/// Opens the configured backend, creating the remote index if needed.
pub async fn connect_index(
    config: &IndexConfig,
    spec: &IndexSpec,
) -> Result<Box<dyn VectorIndex>, PipelineError> {
    match config.backend {
        IndexBackend::Pinecone => {
            let index = PineconeIndex::connect(&config.pinecone, spec).await?;
            Ok(Box::new(index))
        }
        IndexBackend::Qdrant => {
            url::Url::parse(&config.qdrant.url).map_err(|source| ConfigError::InvalidUrl {
                field: "qdrant url",
                source,
            })?;
            Ok(Box::new(QdrantIndex::connect(&config.qdrant, spec).await?))
        }
        IndexBackend::Memory => Ok(Box::new(InMemoryIndex::new(spec.dimension))),
    }
}
