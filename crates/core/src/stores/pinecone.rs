use crate::config::PineconeConfig;
use crate::traits::{check_dimension, VectorIndex};
use crate::{ConfigError, DocumentMetadata, IndexError, IndexSpec, Match, PipelineError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const API_VERSION: &str = "2024-07";
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const READY_POLL_ATTEMPTS: usize = 120;

/// Hosted Pinecone index. The control plane is only used at connect time to
/// create or look up the index; reads and writes go to its data-plane host.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    host: String,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

impl IndexDescription {
    /// Descriptions without a status block are treated as ready.
    fn is_ready(&self) -> bool {
        self.status.as_ref().map_or(true, |status| status.ready)
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a DocumentMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<DocumentMetadata>,
}

impl PineconeIndex {
    /// Connects to the index named by `spec`, creating a serverless index
    /// with the spec's dimension and metric when none exists yet. Returns
    /// once the index reports itself ready.
    pub async fn connect(
        config: &PineconeConfig,
        spec: &IndexSpec,
    ) -> Result<Self, PipelineError> {
        let api_key = non_empty(config.api_key.as_deref())
            .ok_or(ConfigError::MissingCredential("PINECONE_API_KEY"))?;
        let region = non_empty(config.environment.as_deref())
            .ok_or(ConfigError::MissingCredential("PINECONE_ENVIRONMENT"))?;
        url::Url::parse(&config.controller_url).map_err(|source| ConfigError::InvalidUrl {
            field: "pinecone controller url",
            source,
        })?;

        let control = ControlPlane {
            client: Client::new(),
            base_url: config.controller_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            poll_interval: READY_POLL_INTERVAL,
        };

        let existing = control.list().await?;
        let description = match existing.into_iter().find(|index| index.name == spec.name) {
            Some(found) => {
                tracing::debug!(index = %spec.name, "reusing pinecone index");
                found
            }
            None => {
                tracing::info!(
                    index = %spec.name,
                    dimension = spec.dimension,
                    metric = spec.metric.as_str(),
                    "creating pinecone index"
                );
                control.create(spec, &config.cloud, region).await?
            }
        };

        let description = control.wait_until_ready(&spec.name, description).await?;

        if let Some(dimension) = description.dimension {
            if dimension != spec.dimension {
                return Err(IndexError::Dimension {
                    expected: spec.dimension,
                    got: dimension,
                }
                .into());
            }
        }

        let host = match description.host {
            Some(host) if !host.is_empty() => host,
            _ => control
                .describe(&spec.name)
                .await?
                .host
                .ok_or_else(|| IndexError::BackendResponse {
                    backend: "pinecone".to_string(),
                    details: format!("index {} has no host", spec.name),
                })?,
        };

        Ok(Self {
            client: control.client,
            api_key: api_key.to_string(),
            host: data_plane_url(&host),
            dimension: spec.dimension,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

struct ControlPlane {
    client: Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
}

impl ControlPlane {
    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn list(&self) -> Result<Vec<IndexDescription>, IndexError> {
        let response = self
            .request(self.client.get(format!("{}/indexes", self.base_url)))
            .send()
            .await?;
        let list: IndexList = checked(response).await?.json().await?;
        Ok(list.indexes)
    }

    async fn create(
        &self,
        spec: &IndexSpec,
        cloud: &str,
        region: &str,
    ) -> Result<IndexDescription, IndexError> {
        let response = self
            .request(self.client.post(format!("{}/indexes", self.base_url)))
            .json(&json!({
                "name": spec.name,
                "dimension": spec.dimension,
                "metric": spec.metric.as_str(),
                "spec": {
                    "serverless": { "cloud": cloud, "region": region }
                },
            }))
            .send()
            .await?;

        // Another client created it between our list and create calls.
        if response.status() == StatusCode::CONFLICT {
            return self.describe(&spec.name).await;
        }

        Ok(checked(response).await?.json().await?)
    }

    async fn describe(&self, name: &str) -> Result<IndexDescription, IndexError> {
        let response = self
            .request(self.client.get(format!("{}/indexes/{}", self.base_url, name)))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Polls `describe` until a freshly created index can take reads and
    /// writes.
    async fn wait_until_ready(
        &self,
        name: &str,
        mut description: IndexDescription,
    ) -> Result<IndexDescription, IndexError> {
        for attempt in 1..=READY_POLL_ATTEMPTS {
            if description.is_ready() {
                return Ok(description);
            }
            tracing::debug!(index = %name, attempt, "waiting for pinecone index to become ready");
            tokio::time::sleep(self.poll_interval).await;
            description = self.describe(name).await?;
        }

        if description.is_ready() {
            return Ok(description);
        }
        Err(IndexError::BackendResponse {
            backend: "pinecone".to_string(),
            details: format!("index {name} not ready after {READY_POLL_ATTEMPTS} checks"),
        })
    }
}

async fn checked(response: Response) -> Result<Response, IndexError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::BackendResponse {
        backend: "pinecone".to_string(),
        details: format!("{status}: {body}"),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn data_plane_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn backend(&self) -> &str {
        "Pinecone"
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

        let body = UpsertRequest {
            vectors: vec![UpsertVector {
                id: key,
                values: vector,
                metadata,
            }],
        };
        let response = self
            .request(self.client.post(format!("{}/vectors/upsert", self.host)))
            .json(&body)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Match>, IndexError> {
        check_dimension(self.dimension, query_vector)?;

        let body = QueryRequest {
            vector: query_vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };
        let response = self
            .request(self.client.post(format!("{}/query", self.host)))
            .json(&body)
            .send()
            .await?;
        let parsed: QueryResponse = checked(response).await?.json().await?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|hit| {
                let metadata = hit
                    .metadata
                    .unwrap_or_else(|| DocumentMetadata::new(hit.id.clone()));
                Match {
                    id: hit.id,
                    score: hit.score,
                    metadata,
                }
            })
            .collect())
    }
}
