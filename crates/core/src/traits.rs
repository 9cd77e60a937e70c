use crate::{DocumentMetadata, IndexError, Match};
use async_trait::async_trait;

/// A keyed vector store with nearest-neighbour lookup.
///
/// `store` is an upsert: writing an existing key replaces the record.
/// `search` returns at most `top_k` matches, best first, and an empty list
/// when nothing is stored.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Human-readable backend name used in receipts and logs.
    fn backend(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn store(
        &self,
        key: &str,
        vector: &[f32],
        metadata: &DocumentMetadata,
    ) -> Result<(), IndexError>;

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Match>, IndexError>;
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != expected {
        return Err(IndexError::Dimension {
            expected,
            got: vector.len(),
        });
    }
    Ok(())
}
