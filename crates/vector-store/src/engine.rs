use crate::error::Result;
use crate::types::{CollectionInfo, Distance, Filter, Point, PointId, RetrievedPoint, ScoredPoint};
use async_trait::async_trait;

/// Contract of the vector-similarity engine behind the store.
///
/// Collections are named; every operation addresses one collection. `query` returns hits
/// ordered from closest to farthest.
#[async_trait]
pub trait VectorEngine: Send + Sync {
    /// `None` when the collection does not exist.
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>>;

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collection_info(name).await?.is_some())
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<()>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Create-or-replace by id.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()>;

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>>;

    async fn retrieve(&self, collection: &str, ids: &[PointId]) -> Result<Vec<RetrievedPoint>>;

    async fn delete_by_filter(&self, collection: &str, filter: &Filter) -> Result<()>;
}
