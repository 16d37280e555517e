use crate::engine::VectorEngine;
use crate::error::{Result, VectorStoreError};
use crate::types::{CollectionInfo, Distance, Filter, Point, PointId, RetrievedPoint, ScoredPoint};
use async_trait::async_trait;
use knowledge_metadata::FlatMetadata;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct StoredPoint {
    vector: Vec<f32>,
    payload: FlatMetadata,
}

struct MemoryCollection {
    info: CollectionInfo,
    points: BTreeMap<PointId, StoredPoint>,
}

/// In-process engine with brute-force search. Used for tests and offline runs.
#[derive(Default)]
pub struct MemoryEngine {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    offline: AtomicBool,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable engine: every call fails with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of points in a collection (0 when absent).
    pub fn len(&self, collection: &str) -> usize {
        self.read()
            .ok()
            .and_then(|guard| guard.get(collection).map(|c| c.points.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(VectorStoreError::ConnectionError(
                "memory engine is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemoryCollection>>> {
        self.ensure_online()?;
        self.collections
            .read()
            .map_err(|_| VectorStoreError::Other("memory engine lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemoryCollection>>> {
        self.ensure_online()?;
        self.collections
            .write()
            .map_err(|_| VectorStoreError::Other("memory engine lock poisoned".to_string()))
    }
}

fn missing(name: &str) -> VectorStoreError {
    VectorStoreError::CollectionNotFound(name.to_string())
}

const fn check_dimension(info: &CollectionInfo, vector: &[f32]) -> Result<()> {
    if vector.len() != info.vector_size {
        return Err(VectorStoreError::InvalidDimension {
            expected: info.vector_size,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorEngine for MemoryEngine {
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.read()?.get(name).map(|c| c.info))
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<()> {
        let mut guard = self.write()?;
        if guard.contains_key(name) {
            return Err(VectorStoreError::QueryError(format!(
                "Collection `{name}` already exists"
            )));
        }
        guard.insert(
            name.to_string(),
            MemoryCollection {
                info: CollectionInfo {
                    vector_size,
                    distance,
                },
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let mut guard = self.write()?;
        let target = guard.get_mut(collection).ok_or_else(|| missing(collection))?;
        for point in &points {
            check_dimension(&target.info, &point.vector)?;
        }
        for point in points {
            target.points.insert(
                point.id,
                StoredPoint {
                    vector: point.vector,
                    payload: point.payload,
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let guard = self.read()?;
        let target = guard.get(collection).ok_or_else(|| missing(collection))?;
        check_dimension(&target.info, vector)?;

        let distance = target.info.distance;
        let mut scored: Vec<ScoredPoint> = target
            .points
            .iter()
            .filter(|(_, point)| filter.map_or(true, |f| f.matches(&point.payload)))
            .map(|(id, point)| ScoredPoint {
                id: id.clone(),
                payload: point.payload.clone(),
                score: distance.score(vector, &point.vector),
            })
            .collect();

        // Stable sort keeps id order among equal scores.
        scored.sort_by(|a, b| {
            let ord = b
                .score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal);
            if distance.higher_is_closer() {
                ord
            } else {
                ord.reverse()
            }
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn retrieve(&self, collection: &str, ids: &[PointId]) -> Result<Vec<RetrievedPoint>> {
        let guard = self.read()?;
        let target = guard.get(collection).ok_or_else(|| missing(collection))?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                target.points.get(id).map(|point| RetrievedPoint {
                    id: id.clone(),
                    payload: point.payload.clone(),
                })
            })
            .collect())
    }

    async fn delete_by_filter(&self, collection: &str, filter: &Filter) -> Result<()> {
        let mut guard = self.write()?;
        let target = guard.get_mut(collection).ok_or_else(|| missing(collection))?;
        target.points.retain(|_, point| !filter.matches(&point.payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_metadata::Scalar;
    use pretty_assertions::assert_eq;

    fn point(id: u64, vector: &[f32], tenant: &str) -> Point {
        let mut payload = FlatMetadata::new();
        payload.insert("datasource".into(), Scalar::from(tenant));
        Point {
            id: PointId::Num(id),
            vector: vector.to_vec(),
            payload,
        }
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_similarity() {
        let engine = MemoryEngine::new();
        engine
            .create_collection("docs", 3, Distance::Cosine)
            .await
            .unwrap();
        engine
            .upsert(
                "docs",
                vec![
                    point(0, &[1.0, 0.0, 0.0], "a"),
                    point(1, &[0.9, 0.1, 0.0], "a"),
                    point(2, &[0.0, 1.0, 0.0], "a"),
                ],
            )
            .await
            .unwrap();

        let hits = engine
            .query("docs", &[1.0, 0.0, 0.0], 2, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, PointId::Num(0));
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].id, PointId::Num(1));
        assert!(hits[1].score > 0.9);
    }

    #[tokio::test]
    async fn query_applies_payload_filter() {
        let engine = MemoryEngine::new();
        engine
            .create_collection("docs", 2, Distance::Cosine)
            .await
            .unwrap();
        engine
            .upsert(
                "docs",
                vec![point(0, &[1.0, 0.0], "a"), point(1, &[1.0, 0.0], "b")],
            )
            .await
            .unwrap();

        let filter = Filter::must_match("datasource", "b");
        let hits = engine
            .query("docs", &[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, PointId::Num(1));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let engine = MemoryEngine::new();
        engine
            .create_collection("docs", 3, Distance::Cosine)
            .await
            .unwrap();
        let result = engine.upsert("docs", vec![point(0, &[1.0, 0.0], "a")]).await;
        assert!(matches!(
            result,
            Err(VectorStoreError::InvalidDimension {
                expected: 3,
                actual: 2
            })
        ));
        let result = engine.query("docs", &[1.0], 1, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_filters() {
        let engine = MemoryEngine::new();
        engine
            .create_collection("docs", 2, Distance::Dot)
            .await
            .unwrap();
        engine
            .upsert("docs", vec![point(0, &[1.0, 0.0], "a")])
            .await
            .unwrap();
        engine
            .upsert("docs", vec![point(0, &[0.0, 1.0], "b"), point(1, &[1.0, 1.0], "a")])
            .await
            .unwrap();
        assert_eq!(engine.len("docs"), 2);

        let got = engine
            .retrieve("docs", &[PointId::Num(0), PointId::Num(9)])
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].payload["datasource"], Scalar::from("b"));

        engine
            .delete_by_filter("docs", &Filter::must_match("datasource", "a"))
            .await
            .unwrap();
        assert_eq!(engine.len("docs"), 1);
    }

    #[tokio::test]
    async fn offline_engine_reports_connection_errors() {
        let engine = MemoryEngine::new();
        engine.set_offline(true);
        let err = engine.list_collections().await.unwrap_err();
        assert!(matches!(err, VectorStoreError::ConnectionError(_)));
        engine.set_offline(false);
        assert!(engine.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_collection_is_reported() {
        let engine = MemoryEngine::new();
        assert!(!engine.collection_exists("nope").await.unwrap());
        let err = engine.retrieve("nope", &[]).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn manhattan_collection_ranks_nearest_first() {
        let engine = MemoryEngine::new();
        engine
            .create_collection("docs", 2, Distance::Manhattan)
            .await
            .unwrap();
        engine
            .upsert(
                "docs",
                vec![point(0, &[5.0, 5.0], "a"), point(1, &[1.0, 0.5], "a")],
            )
            .await
            .unwrap();
        let hits = engine.query("docs", &[1.0, 1.0], 2, None).await.unwrap();
        assert_eq!(hits[0].id, PointId::Num(1));
        assert!((hits[0].score - 0.5).abs() < 1e-6);
        assert_eq!(hits[1].id, PointId::Num(0));
    }
}
