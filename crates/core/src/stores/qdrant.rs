use crate::config::QdrantConfig;
use crate::traits::{check_dimension, VectorIndex};
use crate::{DocumentMetadata, IndexError, IndexSpec, Match, Metric};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

pub struct QdrantIndex {
    endpoint: String,
    api_key: Option<String>,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantIndex {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }

        Self {
            endpoint,
            api_key,
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    /// Builds the client and makes sure the collection exists.
    pub async fn connect(config: &QdrantConfig, spec: &IndexSpec) -> Result<Self, IndexError> {
        let index = Self::new(&config.url, config.api_key.clone(), &spec.name, spec.dimension);
        index.ensure_collection(spec.metric).await?;
        Ok(index)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    pub async fn ensure_collection(&self, metric: Metric) -> Result<(), IndexError> {
        let response = self
            .authorize(self.client.get(self.collection_url()))
            .send()
            .await?;

        if response.status().is_success() {
            let info: Value = response.json().await?;
            return self.check_existing_size(&info);
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response).await);
        }

        tracing::info!(
            collection = %self.collection,
            size = self.vector_size,
            "creating qdrant collection"
        );
        let response = self
            .authorize(self.client.put(self.collection_url()))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": distance_name(metric),
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        Ok(())
    }

    /// Rejects an existing collection built for a different vector size.
    /// Collections with named vectors carry no single size and are accepted.
    fn check_existing_size(&self, info: &Value) -> Result<(), IndexError> {
        let size = info
            .pointer("/result/config/params/vectors/size")
            .and_then(Value::as_u64);

        match size {
            Some(size) if size as usize != self.vector_size => Err(IndexError::Dimension {
                expected: self.vector_size,
                got: size as usize,
            }),
            _ => {
                tracing::debug!(collection = %self.collection, "reusing qdrant collection");
                Ok(())
            }
        }
    }

    /// Qdrant ids must be integers or UUIDs, so keys map to a stable UUIDv5.
    pub fn point_id(key: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes())
    }
}

fn distance_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Cosine => "Cosine",
        Metric::Euclidean => "Euclid",
        Metric::Dotproduct => "Dot",
    }
}

async fn backend_error(response: Response) -> IndexError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    IndexError::BackendResponse {
        backend: "qdrant".to_string(),
        details: format!("{status}: {body}"),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn backend(&self) -> &str {
        "Qdrant"
    }

    fn dimension(&self) -> usize {
        self.vector_size
    }

    async fn store(
        &self,
        key: &str,
        vector: &[f32],
        metadata: &DocumentMetadata,
    ) -> Result<(), IndexError> {
        check_dimension(self.vector_size, vector)?;

        let point = json!({
            "id": Self::point_id(key).to_string(),
            "vector": vector,
            "payload": {
                "key": key,
                "filename": metadata.filename,
            },
        });

        let response = self
            .authorize(
                self.client
                    .put(format!("{}/points?wait=true", self.collection_url())),
            )
            .json(&json!({ "points": [point] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        Ok(())
    }

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Match>, IndexError> {
        check_dimension(self.vector_size, query_vector)?;

        let response = self
            .authorize(
                self.client
                    .post(format!("{}/points/search", self.collection_url())),
            )
            .json(&json!({
                "vector": query_vector,
                "limit": top_k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::with_capacity(hits.len());
        for hit in hits {
            let key = hit
                .pointer("/payload/key")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| hit.pointer("/id").map(id_to_string))
                .unwrap_or_default();
            let filename = hit
                .pointer("/payload/filename")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| key.clone());
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

            result.push(Match {
                id: key,
                score: score as f32,
                metadata: DocumentMetadata::new(filename),
            });
        }

        Ok(result)
    }
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}
