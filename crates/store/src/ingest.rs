use crate::collections::{tag_metadata, Collection};
use crate::error::Result;
use crate::stats::IngestStats;
use crate::store::{timestamp_id, KnowledgeStore};
use crate::types::{Document, Sample};
use knowledge_metadata::Metadata;
use knowledge_vector_store::PointId;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Instant;

/// Read a YAML list (documents, schemas, samples or a batch descriptor).
pub async fn read_batch<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let raw = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(serde_yaml::from_str(&raw)?)
}

impl KnowledgeStore {
    /// Bulk-load one ingestion run for `datasource`.
    ///
    /// Records are tagged with `datasource` and `config_id` and keyed by their position.
    /// Samples are written to both `samples_store` and `cache_store`. A failing item is
    /// recorded in the returned stats and the pass continues.
    pub async fn prepare_data(
        &self,
        datasource: &str,
        documents: &[Document],
        schemas: &[Document],
        samples: &[Sample],
        config_id: &str,
    ) -> IngestStats {
        log::info!("Inserting into vector store (datasource {datasource}, config {config_id})");
        let started = Instant::now();
        let mut stats = IngestStats::default();

        for (collection, batch) in [
            (Collection::Documentation, documents),
            (Collection::Schema, schemas),
        ] {
            for (index, doc) in batch.iter().enumerate() {
                let metadata = tag_metadata(&doc.metadata, datasource, config_id);
                match self
                    .add_to_store(collection, &doc.content, &metadata, PointId::from_index(index))
                    .await
                {
                    Ok(()) => stats.record_written(collection),
                    Err(err) => stats.record_failure(collection, index, err.to_string()),
                }
            }
        }

        for (index, sample) in samples.iter().enumerate() {
            let metadata = tag_metadata(&sample.metadata, datasource, config_id);
            self.write_sample(index, sample, &metadata, &mut stats).await;
        }

        stats.time_ms = elapsed_ms(started);
        log::info!(
            "Vector store insertion for source docs took {} ms ({} written, {} failed)",
            stats.time_ms,
            stats.total_written(),
            stats.failures.len()
        );
        stats
    }

    // One embedding per sample, shared by both target collections.
    async fn write_sample(
        &self,
        index: usize,
        sample: &Sample,
        metadata: &Metadata,
        stats: &mut IngestStats,
    ) {
        let vector = match self.embedder.embed(&sample.description).await {
            Ok(vector) => vector,
            Err(err) => {
                for collection in [Collection::Samples, Collection::Cache] {
                    stats.record_failure(collection, index, err.to_string());
                }
                return;
            }
        };
        for collection in [Collection::Samples, Collection::Cache] {
            match self
                .upsert_record(
                    collection,
                    PointId::from_index(index),
                    vector.clone(),
                    &sample.description,
                    metadata,
                )
                .await
            {
                Ok(()) => stats.record_written(collection),
                Err(err) => stats.record_failure(collection, index, err.to_string()),
            }
        }
    }

    /// Load a YAML list of `{description, metadata}` into `documentation_store`.
    pub async fn load_from_batch_descriptor(&self, path: impl AsRef<Path>) -> Result<IngestStats> {
        let path = path.as_ref();
        let entries: Vec<Sample> = read_batch(path).await?;
        let started = Instant::now();
        let mut stats = IngestStats::default();

        for (index, entry) in entries.iter().enumerate() {
            match self
                .add_to_store(
                    Collection::Documentation,
                    &entry.description,
                    &entry.metadata,
                    PointId::from_index(index),
                )
                .await
            {
                Ok(()) => stats.record_written(Collection::Documentation),
                Err(err) => {
                    stats.record_failure(Collection::Documentation, index, err.to_string());
                }
            }
        }

        stats.time_ms = elapsed_ms(started);
        log::info!(
            "Vector store insertion for {} took {} ms",
            path.display(),
            stats.time_ms
        );
        Ok(stats)
    }

    /// Record a fresh cache entry keyed by the current time.
    ///
    /// Failures are logged and reported as `None`; they never reach the caller as errors.
    pub async fn update_cache(&self, document: &str, metadata: &Metadata) -> Option<PointId> {
        let id = timestamp_id();
        match self
            .add_to_store(Collection::Cache, document, metadata, id.clone())
            .await
        {
            Ok(()) => {
                log::info!("Cache updated ({id})");
                Some(id)
            }
            Err(err) => {
                log::warn!("Error updating cache: {err}");
                None
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
