use crate::{IngestArgs, SearchArgs, SearchTarget};
use anyhow::{bail, Context as AnyhowContext, Result};
use knowledge_store::{
    read_batch, Collection, Document, HealthStatus, KnowledgeStore, Sample,
};
use knowledge_vector_store::PointId;
use serde::Serialize;
use std::path::Path;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

async fn ensure_connected(store: &KnowledgeStore) -> Result<()> {
    store
        .connect()
        .await
        .context("Vector store is not ready")?;
    Ok(())
}

async fn optional_batch<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    match path {
        Some(path) => read_batch(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => Ok(Vec::new()),
    }
}

pub async fn health(store: &KnowledgeStore) -> Result<()> {
    let status = store.health_check().await;
    print_json(&status)?;
    if let HealthStatus::Unavailable { .. } = status {
        bail!("Vector engine is unavailable");
    }
    Ok(())
}

pub async fn connect(store: &KnowledgeStore) -> Result<()> {
    let report = store.connect().await.context("Vector store is not ready")?;
    print_json(&report)
}

pub async fn ingest(store: &KnowledgeStore, args: IngestArgs) -> Result<()> {
    if args.documents.is_none() && args.schemas.is_none() && args.samples.is_none() {
        bail!("Nothing to ingest: pass --documents, --schemas or --samples");
    }
    let documents: Vec<Document> = optional_batch(args.documents.as_deref()).await?;
    let schemas: Vec<Document> = optional_batch(args.schemas.as_deref()).await?;
    let samples: Vec<Sample> = optional_batch(args.samples.as_deref()).await?;

    ensure_connected(store).await?;
    let stats = store
        .prepare_data(
            &args.datasource,
            &documents,
            &schemas,
            &samples,
            &args.config_id,
        )
        .await;
    print_json(&stats)
}

pub async fn load(store: &KnowledgeStore, path: &Path) -> Result<()> {
    ensure_connected(store).await?;
    let stats = store
        .load_from_batch_descriptor(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?;
    print_json(&stats)
}

pub async fn search(store: &KnowledgeStore, args: SearchArgs) -> Result<()> {
    ensure_connected(store).await?;
    let collection = match args.target {
        SearchTarget::Documentation => Collection::Documentation,
        SearchTarget::Schema => Collection::Schema,
        // Cache hits are served from the reinforced samples.
        SearchTarget::Cache => Collection::Samples,
    };
    let count = args.count.unwrap_or_else(|| store.sample_count());
    let results = store
        .try_find_similar(&args.datasource, &args.query, collection, count)
        .await
        .with_context(|| format!("Search in {collection} failed"))?;
    print_json(&results)
}

pub async fn sample(store: &KnowledgeStore, id: &PointId, reinforce: bool) -> Result<()> {
    ensure_connected(store).await?;
    let results = if reinforce {
        store.find_samples_by_id(id).await
    } else {
        store
            .try_lookup_by_id(id, Collection::Samples)
            .await
            .with_context(|| format!("Lookup of sample {id} failed"))?
    };
    print_json(&results)
}

pub async fn clear(store: &KnowledgeStore, config_id: &str) -> Result<()> {
    store
        .clear_collection(config_id)
        .await
        .with_context(|| format!("Failed to clear config {config_id}"))?;
    print_json(&serde_json::json!({ "cleared": config_id }))
}
