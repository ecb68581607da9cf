use crate::traits::VectorIndex;
use crate::{ChunkMetadata, SearchHit, ServiceError, UpsertBatch};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

pub const DEFAULT_COLLECTION: &str = "research_docs";

/// Chroma collection reached over its REST API.
///
/// The collection is resolved (and created if missing) on first use.
pub struct ChromaStore {
    endpoint: Url,
    collection: String,
    collection_id: OnceCell<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    documents: Option<Vec<Vec<Option<String>>>>,
    metadatas: Option<Vec<Vec<Option<Value>>>>,
    distances: Option<Vec<Vec<f32>>>,
}

impl ChromaStore {
    pub fn new(endpoint: &str, collection: impl Into<String>) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: Url::parse(&format!("{}/", endpoint.trim_end_matches('/')))?,
            collection: collection.into(),
            collection_id: OnceCell::new(),
            client: Client::new(),
        })
    }

    async fn collection_id(&self) -> Result<&str, ServiceError> {
        let id = self
            .collection_id
            .get_or_try_init(|| self.get_or_create_collection())
            .await?;
        Ok(id.as_str())
    }

    async fn get_or_create_collection(&self) -> Result<String, ServiceError> {
        let response = self
            .client
            .post(self.api_url("collections")?)
            .json(&json!({
                "name": self.collection,
                "metadata": { "hnsw:space": "cosine" },
                "get_or_create": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::NotReady(format!(
                "chroma collection {} unavailable: {}",
                self.collection,
                response.status()
            )));
        }

        let info: CollectionInfo = response.json().await?;
        debug!(collection = %self.collection, id = %info.id, "chroma collection ready");
        Ok(info.id)
    }

    async fn collection_url(&self, action: &str) -> Result<Url, ServiceError> {
        let id = self.collection_id().await?;
        self.api_url(&format!("collections/{id}/{action}"))
    }

    /// Resolves `path` under the endpoint, keeping any prefix the endpoint carries.
    fn api_url(&self, path: &str) -> Result<Url, ServiceError> {
        Ok(self.endpoint.join(&format!("api/v1/{path}"))?)
    }
}

#[async_trait]
impl VectorIndex for ChromaStore {
    async fn upsert(&self, batch: &UpsertBatch) -> Result<(), ServiceError> {
        let columns = [
            batch.documents.len(),
            batch.metadatas.len(),
            batch.embeddings.len(),
        ];
        if columns.iter().any(|len| *len != batch.ids.len()) {
            return Err(ServiceError::Request(format!(
                "upsert columns disagree: {} ids, {} documents, {} metadatas, {} embeddings",
                batch.ids.len(),
                columns[0],
                columns[1],
                columns[2]
            )));
        }

        if batch.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.collection_url("upsert").await?)
            .json(&json!({
                "ids": batch.ids,
                "documents": batch.documents,
                "metadatas": batch.metadatas,
                "embeddings": batch.embeddings,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        debug!(collection = %self.collection, count = batch.len(), "upserted vectors");
        Ok(())
    }

    async fn query(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        let response = self
            .client
            .post(self.collection_url("query").await?)
            .json(&json!({
                "query_embeddings": [query_vector],
                "n_results": top_k,
                "include": ["documents", "metadatas", "distances"],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let parsed: QueryResponse = response.json().await?;
        parse_query_response(parsed)
    }
}

fn parse_query_response(parsed: QueryResponse) -> Result<Vec<SearchHit>, ServiceError> {
    let documents = parsed
        .documents
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();
    let metadatas = parsed
        .metadatas
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();
    let distances = parsed
        .distances
        .and_then(|rows| rows.into_iter().next())
        .unwrap_or_default();

    documents
        .into_iter()
        .zip(metadatas)
        .enumerate()
        .map(|(position, (document, metadata))| {
            let metadata: ChunkMetadata = serde_json::from_value(metadata.unwrap_or(Value::Null))
                .map_err(|error| ServiceError::BackendResponse {
                    backend: "chroma".to_string(),
                    details: format!("bad metadata at rank {position}: {error}"),
                })?;

            Ok(SearchHit {
                text: document.unwrap_or_default(),
                metadata,
                distance: distances.get(position).copied(),
            })
        })
        .collect()
}
