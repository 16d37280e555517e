//! # Knowledge Store
//!
//! Domain layer over a vector-similarity engine: four fixed collections, per-tenant
//! filtering on `datasource`, flattened metadata payloads, and a weighted cache that
//! reinforces samples each time they are hit.
//!
//! ## Data flow
//!
//! ```text
//! ingestion ──> prepare_data / load_from_batch_descriptor
//!                 └─> embed ─> flatten(metadata) + document ─> upsert
//!
//! query ──> find_similar_{documentation,schema,cache}
//!             └─> embed ─> query(filter: datasource) ─> unflatten ─> SearchResult
//!
//! cache hit ──> find_samples_by_id ─> update_weights ─> update_store (samples_store)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use knowledge_store::{Document, KnowledgeStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> knowledge_store::Result<()> {
//!     let store = KnowledgeStore::from_config(&StoreConfig::resolve(None)?)?;
//!     store.connect().await?;
//!
//!     let docs = vec![Document::new("orders: one row per order", Default::default())];
//!     store.prepare_data("sales", &docs, &[], &[], "run1").await;
//!
//!     let hits = store
//!         .find_similar_documentation(&["sales".to_string()], "orders", 3)
//!         .await;
//!     println!("{hits:?}");
//!     Ok(())
//! }
//! ```

mod cache;
mod collections;
mod config;
mod error;
mod ingest;
mod query;
mod stats;
mod store;
mod types;

pub use cache::DEFAULT_WEIGHT_INCREMENT;
pub use collections::{
    build_payload, tag_metadata, Collection, CONFIG_ID_KEY, DATASOURCE_KEY, DOCUMENT_KEY,
    WEIGHTS_KEY,
};
pub use config::{EmbeddingConfig, EngineKind, StoreConfig, DEFAULT_SAMPLE_COUNT};
pub use error::{Result, StoreError};
pub use ingest::read_batch;
pub use stats::{IngestFailure, IngestStats};
pub use store::KnowledgeStore;
pub use types::{ConnectReport, Document, HealthStatus, Sample, SearchResult};
