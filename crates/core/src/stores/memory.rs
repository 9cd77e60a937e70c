use crate::traits::{check_dimension, VectorIndex};
use crate::{DocumentMetadata, IndexError, Match};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Exact cosine search over vectors kept in process memory.
pub struct InMemoryIndex {
    dimension: usize,
    records: RwLock<HashMap<String, (Vec<f32>, DocumentMetadata)>>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let norm_left = left.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_right = right.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }

    dot / (norm_left * norm_right)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn backend(&self) -> &str {
        "memory"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn store(
        &self,
        key: &str,
        vector: &[f32],
        metadata: &DocumentMetadata,
    ) -> Result<(), IndexError> {
        check_dimension(self.dimension, vector)?;

        let mut records = self.records.write().map_err(|_| IndexError::Poisoned)?;
        if records
            .insert(key.to_string(), (vector.to_vec(), metadata.clone()))
            .is_some()
        {
            tracing::debug!(key, "overwrote existing record");
        }
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Match>, IndexError> {
        check_dimension(self.dimension, query_vector)?;

        let records = self.records.read().map_err(|_| IndexError::Poisoned)?;
        let mut matches: Vec<Match> = records
            .iter()
            .map(|(key, (vector, metadata))| Match {
                id: key.clone(),
                score: cosine_similarity(query_vector, vector),
                metadata: metadata.clone(),
            })
            .collect();

        matches.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.id.cmp(&right.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }
}
