use crate::collections::{build_payload, Collection, CONFIG_ID_KEY};
use crate::config::{StoreConfig, DEFAULT_SAMPLE_COUNT};
use crate::error::{Result, StoreError};
use crate::types::{ConnectReport, HealthStatus};
use knowledge_metadata::Metadata;
use knowledge_vector_store::{
    Distance, Embedder, Filter, Point, PointId, VectorEngine, VectorStoreError,
};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

const SIZING_TEXT: &str = "some text";

/// Adapter over one vector engine and one embedder.
///
/// Owns the engine handle for its whole lifetime; create one per process and share it
/// behind an `Arc`. All four collections share the vector size measured by [`connect`].
///
/// [`connect`]: KnowledgeStore::connect
pub struct KnowledgeStore {
    pub(crate) engine: Arc<dyn VectorEngine>,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) sample_count: usize,
    dimension: OnceLock<usize>,
}

impl KnowledgeStore {
    pub fn new(engine: Arc<dyn VectorEngine>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            engine,
            embedder,
            sample_count: DEFAULT_SAMPLE_COUNT,
            dimension: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count.max(1);
        self
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let store = Self::new(config.build_engine()?, config.build_embedder()?)
            .with_sample_count(config.sample_count);
        Ok(store)
    }

    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Vector size measured by the last successful `connect`.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    /// Measure the embedding size and make sure every collection exists with it.
    ///
    /// Safe to call repeatedly. A collection that already exists with a different
    /// vector size is an [`VectorStoreError::InvalidDimension`] error.
    pub async fn connect(&self) -> Result<ConnectReport> {
        let dimension = self.embedder.embed(SIZING_TEXT).await?.len();
        if dimension == 0 {
            return Err(VectorStoreError::EmbeddingError(
                "Embedder returned an empty vector".to_string(),
            )
            .into());
        }
        if let Some(hint) = self.embedder.dimension_hint() {
            if hint != dimension {
                return Err(VectorStoreError::EmbeddingError(format!(
                    "Embedder advertises dimension {hint} but produced {dimension}"
                ))
                .into());
            }
        }

        let mut report = ConnectReport {
            dimension,
            created: Vec::new(),
            existing: Vec::new(),
        };
        for collection in Collection::ALL {
            let name = collection.name();
            if let Some(info) = self.engine.collection_info(name).await? {
                if info.vector_size != dimension {
                    return Err(VectorStoreError::InvalidDimension {
                        expected: dimension,
                        actual: info.vector_size,
                    }
                    .into());
                }
                report.existing.push(collection);
                continue;
            }

            match self
                .engine
                .create_collection(name, dimension, Distance::Cosine)
                .await
            {
                Ok(()) => report.created.push(collection),
                // Someone else may have created it between the check and the create.
                Err(err) => {
                    if self.engine.collection_exists(name).await? {
                        report.existing.push(collection);
                    } else {
                        return Err(err.into());
                    }
                }
            }
        }

        let _ = self.dimension.set(dimension);
        log::info!(
            "Connected to vector store (dimension {dimension}, created {}, existing {})",
            report.created.len(),
            report.existing.len()
        );
        Ok(report)
    }

    pub async fn health_check(&self) -> HealthStatus {
        match self.engine.list_collections().await {
            Ok(collections) => HealthStatus::Ready { collections },
            Err(err) => {
                log::error!("Vector store health check failed: {err}");
                HealthStatus::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Delete every record tagged with `config_id` from all four collections.
    ///
    /// Every collection is attempted; the first failure is returned.
    pub async fn clear_collection(&self, config_id: &str) -> Result<()> {
        let filter = Filter::must_match(CONFIG_ID_KEY, config_id);
        let mut first_error: Option<StoreError> = None;
        for collection in Collection::ALL {
            match self
                .engine
                .delete_by_filter(collection.name(), &filter)
                .await
            {
                Ok(()) | Err(VectorStoreError::CollectionNotFound(_)) => {}
                Err(err) => {
                    log::warn!("Failed to clear {config_id} from {collection}: {err}");
                    first_error.get_or_insert(err.into());
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => {
                log::info!("Cleared config {config_id} from all collections");
                Ok(())
            }
        }
    }

    /// Embed `document` and create-or-replace the record at `(collection, id)`.
    pub async fn add_to_store(
        &self,
        collection: Collection,
        document: &str,
        metadata: &Metadata,
        id: PointId,
    ) -> Result<()> {
        let vector = self.embedder.embed(document).await?;
        self.upsert_record(collection, id, vector, document, metadata)
            .await
    }

    /// Write a sample record; `id` defaults to the current time in milliseconds.
    pub async fn update_store(
        &self,
        id: Option<PointId>,
        metadata: &Metadata,
        document: &str,
    ) -> Result<PointId> {
        let id = id.unwrap_or_else(timestamp_id);
        self.add_to_store(Collection::Samples, document, metadata, id.clone())
            .await?;
        Ok(id)
    }

    pub(crate) async fn upsert_record(
        &self,
        collection: Collection,
        id: PointId,
        vector: Vec<f32>,
        document: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        let point = Point {
            id,
            vector,
            payload: build_payload(document, metadata),
        };
        log::debug!("Upserting point {} into {collection}", point.id);
        self.engine.upsert(collection.name(), vec![point]).await?;
        Ok(())
    }
}

pub(crate) fn timestamp_id() -> PointId {
    PointId::Num(current_unix_ms())
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}
