use crate::collections::{Collection, DATASOURCE_KEY, DOCUMENT_KEY};
use crate::error::{Result, StoreError};
use crate::store::KnowledgeStore;
use crate::types::SearchResult;
use knowledge_metadata::{unflatten, FlatMetadata};
use knowledge_vector_store::{Filter, PointId};

fn shape(id: PointId, payload: &FlatMetadata, score: Option<f32>) -> SearchResult {
    SearchResult {
        document: payload
            .get(DOCUMENT_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        id,
        metadatas: unflatten(payload),
        score,
    }
}

impl KnowledgeStore {
    /// Nearest neighbours of `query` in `collection`, restricted to one tenant.
    ///
    /// Only the first entry of `datasource` is used as the tenant filter. An empty list is
    /// an [`StoreError::InvalidQuery`].
    pub async fn try_find_similar(
        &self,
        datasource: &[String],
        query: &str,
        collection: Collection,
        sample_count: usize,
    ) -> Result<Vec<SearchResult>> {
        let Some(tenant) = datasource.first() else {
            return Err(StoreError::InvalidQuery(
                "datasource list is empty".to_string(),
            ));
        };
        if datasource.len() > 1 {
            log::debug!(
                "Filtering on datasource {tenant}; {} other entries ignored",
                datasource.len() - 1
            );
        }
        if sample_count == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let filter = Filter::must_match(DATASOURCE_KEY, tenant.as_str());
        let hits = self
            .engine
            .query(collection.name(), &vector, sample_count, Some(&filter))
            .await?;
        log::debug!("{} hit(s) in {collection} for {tenant}", hits.len());
        Ok(hits
            .into_iter()
            .map(|hit| shape(hit.id, &hit.payload, Some(hit.score)))
            .collect())
    }

    /// [`try_find_similar`](Self::try_find_similar) with failures logged and turned
    /// into an empty result.
    pub async fn find_similar(
        &self,
        datasource: &[String],
        query: &str,
        collection: Collection,
        sample_count: usize,
    ) -> Vec<SearchResult> {
        match self
            .try_find_similar(datasource, query, collection, sample_count)
            .await
        {
            Ok(results) => results,
            Err(StoreError::InvalidQuery(reason)) => {
                log::warn!("Refusing similarity query on {collection}: {reason}");
                Vec::new()
            }
            Err(err) => {
                log::error!("Similarity query on {collection} failed: {err}");
                Vec::new()
            }
        }
    }

    pub async fn find_similar_documentation(
        &self,
        datasource: &[String],
        query: &str,
        count: usize,
    ) -> Vec<SearchResult> {
        self.find_similar(datasource, query, Collection::Documentation, count)
            .await
    }

    pub async fn find_similar_schema(
        &self,
        datasource: &[String],
        query: &str,
        count: usize,
    ) -> Vec<SearchResult> {
        self.find_similar(datasource, query, Collection::Schema, count)
            .await
    }

    /// Cache lookups read `samples_store`, where reinforced weights live.
    pub async fn find_similar_cache(
        &self,
        datasource: &[String],
        query: &str,
        count: usize,
    ) -> Vec<SearchResult> {
        self.find_similar(datasource, query, Collection::Samples, count)
            .await
    }

    /// Exact-id lookup without side effects.
    pub async fn try_lookup_by_id(
        &self,
        id: &PointId,
        collection: Collection,
    ) -> Result<Vec<SearchResult>> {
        let points = self
            .engine
            .retrieve(collection.name(), std::slice::from_ref(id))
            .await?;
        Ok(points
            .into_iter()
            .map(|point| shape(point.id, &point.payload, None))
            .collect())
    }

    pub async fn lookup_by_id(&self, id: &PointId, collection: Collection) -> Vec<SearchResult> {
        self.try_lookup_by_id(id, collection)
            .await
            .unwrap_or_else(|err| {
                log::error!("Lookup of {id} in {collection} failed: {err}");
                Vec::new()
            })
    }

    /// Lookup by id; the first hit counts as a cache hit and is returned reinforced.
    pub async fn find_by_id(&self, id: &PointId, collection: Collection) -> Vec<SearchResult> {
        let mut results = self.lookup_by_id(id, collection).await;
        if let Some(first) = results.first_mut() {
            if let Err(err) = self.record_cache_hit(first).await {
                log::warn!("Failed to reinforce {id}: {err}");
            }
        }
        results
    }

    pub async fn find_samples_by_id(&self, id: &PointId) -> Vec<SearchResult> {
        self.find_by_id(id, Collection::Samples).await
    }
}
