use crate::engine::VectorEngine;
use crate::error::{Result, VectorStoreError};
use crate::types::{CollectionInfo, Distance, Filter, Point, PointId, RetrievedPoint, ScoredPoint};
use async_trait::async_trait;
use knowledge_metadata::{flatten, FlatMetadata, Metadata};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for a Qdrant server (REST port).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub host: String,
    pub port: u16,
    pub https: bool,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6333,
            https: false,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl QdrantConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// Qdrant over its HTTP API.
pub struct QdrantEngine {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Serialize)]
struct CreateCollectionBody {
    vectors: VectorParams,
}

#[derive(Serialize, Deserialize)]
struct VectorParams {
    size: usize,
    distance: Distance,
}

#[derive(Deserialize)]
struct CollectionDescription {
    config: CollectionConfigDescription,
}

#[derive(Deserialize)]
struct CollectionConfigDescription {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Deserialize)]
struct CollectionList {
    collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    points: &'a [Point],
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a [f32],
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Filter>,
    with_payload: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    points: Vec<ScoredPointBody>,
}

#[derive(Deserialize)]
struct ScoredPointBody {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<Metadata>,
}

#[derive(Serialize)]
struct RetrieveBody<'a> {
    ids: &'a [PointId],
    with_payload: bool,
    with_vector: bool,
}

#[derive(Deserialize)]
struct RetrievedPointBody {
    id: PointId,
    #[serde(default)]
    payload: Option<Metadata>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    filter: &'a Filter,
}

// Payloads written by other clients may be nested; the store only deals in flat ones.
fn flat_payload(payload: Option<Metadata>) -> FlatMetadata {
    payload.as_ref().map(flatten).unwrap_or_default()
}

impl QdrantEngine {
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(format!("HTTP client: {e}")))?;
        log::debug!("Qdrant engine at {}", config.base_url());
        Ok(Self {
            client,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, collection: &str) -> Result<T> {
        let response = self.authorize(request).send().await?;
        parse_response(response, collection).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response, collection: &str) -> Result<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND && !collection.is_empty() {
        return Err(VectorStoreError::CollectionNotFound(collection.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VectorStoreError::QueryError(format!("{status}: {body}")));
    }
    let envelope: Envelope<T> = response.json().await?;
    Ok(envelope.result)
}

#[async_trait]
impl VectorEngine for QdrantEngine {
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let request = self.client.get(self.url(&format!("/collections/{name}")));
        match self.send::<CollectionDescription>(request, name).await {
            Ok(desc) => Ok(Some(CollectionInfo {
                vector_size: desc.config.params.vectors.size,
                distance: desc.config.params.vectors.distance,
            })),
            Err(VectorStoreError::CollectionNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<()> {
        let body = CreateCollectionBody {
            vectors: VectorParams {
                size: vector_size,
                distance,
            },
        };
        let request = self
            .client
            .put(self.url(&format!("/collections/{name}")))
            .json(&body);
        self.send::<IgnoredAny>(request, "").await?;
        log::info!("Created collection {name} (size {vector_size}, {distance:?})");
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let request = self.client.get(self.url("/collections"));
        let list: CollectionList = self.send(request, "").await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("/collections/{collection}/points?wait=true")))
            .json(&UpsertBody { points: &points });
        self.send::<IgnoredAny>(request, collection).await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let body = QueryBody {
            query: vector,
            limit,
            filter,
            with_payload: true,
        };
        let request = self
            .client
            .post(self.url(&format!("/collections/{collection}/points/query")))
            .json(&body);
        let response: QueryResponse = self.send(request, collection).await?;
        Ok(response
            .points
            .into_iter()
            .map(|p| ScoredPoint {
                id: p.id,
                score: p.score,
                payload: flat_payload(p.payload),
            })
            .collect())
    }

    async fn retrieve(&self, collection: &str, ids: &[PointId]) -> Result<Vec<RetrievedPoint>> {
        let body = RetrieveBody {
            ids,
            with_payload: true,
            with_vector: false,
        };
        let request = self
            .client
            .post(self.url(&format!("/collections/{collection}/points")))
            .json(&body);
        let points: Vec<RetrievedPointBody> = self.send(request, collection).await?;
        Ok(points
            .into_iter()
            .map(|p| RetrievedPoint {
                id: p.id,
                payload: flat_payload(p.payload),
            })
            .collect())
    }

    async fn delete_by_filter(&self, collection: &str, filter: &Filter) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!(
                "/collections/{collection}/points/delete?wait=true"
            )))
            .json(&DeleteBody { filter });
        self.send::<IgnoredAny>(request, collection).await?;
        Ok(())
    }
}
