use crate::config::{EmbeddingConfig, EmbeddingProvider, InsightsConfig};
use crate::embeddings::{Embedder, HashingEmbedder, OpenAiEmbedder};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::ingest::checksum;
use crate::stores::connect_index;
use crate::traits::VectorIndex;
use crate::{Document, IngestError, Match, PipelineError, StoreReceipt};
use chrono::Utc;
use std::time::Instant;

/// Extract → embed → index, one call chain per user action. Holds no state
/// of its own beyond the handles it was built with.
pub struct InsightsPipeline {
    extractor: Box<dyn PdfExtractor + Send + Sync>,
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    top_k: usize,
}

impl InsightsPipeline {
    pub fn new(embedder: Box<dyn Embedder>, index: Box<dyn VectorIndex>, top_k: usize) -> Self {
        Self {
            extractor: Box::new(LopdfExtractor),
            embedder,
            index,
            top_k,
        }
    }

    /// Builds the embedder and connects the index described by `config`.
    pub async fn from_config(config: &InsightsConfig) -> Result<Self, PipelineError> {
        let embedder = build_embedder(&config.embedding)?;
        let index = connect_index(&config.index, &config.index_spec()).await?;
        Ok(Self::new(embedder, index, config.top_k()))
    }

    pub fn backend(&self) -> &str {
        self.index.backend()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Stores an uploaded PDF under `filename`. An existing record with the
    /// same filename is replaced.
    pub async fn store_pdf(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StoreReceipt, PipelineError> {
        if filename.trim().is_empty() {
            return Err(IngestError::MissingFileName("upload has no file name".to_string()).into());
        }

        let text = self.extractor.extract_text(bytes)?;
        let document = Document::new(filename, text);
        let mut receipt = self.store_document(&document).await?;
        receipt.checksum = checksum(bytes);
        Ok(receipt)
    }

    /// Embeds already-extracted text and stores it under `document.key`.
    pub async fn store_document(&self, document: &Document) -> Result<StoreReceipt, PipelineError> {
        let started = Instant::now();
        let vector = self.embedder.embed(&document.text).await?;
        self.index
            .store(&document.key, &vector, &document.metadata)
            .await?;

        tracing::info!(
            key = %document.key,
            characters = document.text.chars().count(),
            backend = self.index.backend(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stored document"
        );

        Ok(StoreReceipt {
            key: document.key.clone(),
            characters: document.text.chars().count(),
            checksum: checksum(document.text.as_bytes()),
            stored_at: Utc::now(),
            backend: self.index.backend().to_string(),
        })
    }

    /// Returns the nearest stored documents, best first, never more than
    /// the configured `top_k`.
    pub async fn search(&self, query: &str) -> Result<Vec<Match>, PipelineError> {
        let started = Instant::now();
        let vector = self.embedder.embed(query).await?;
        let mut matches = self.index.search(&vector, self.top_k).await?;

        matches.sort_by(|left, right| right.score.total_cmp(&left.score));
        matches.truncate(self.top_k);

        tracing::info!(
            matches = matches.len(),
            top_k = self.top_k,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );

        Ok(matches)
    }
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>, PipelineError> {
    match config.provider {
        EmbeddingProvider::OpenAi => Ok(Box::new(OpenAiEmbedder::from_config(config)?)),
        EmbeddingProvider::Hashing => Ok(Box::new(HashingEmbedder::new(config.dimensions))),
    }
}
