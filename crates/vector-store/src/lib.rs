//! # Knowledge Vector Store
//!
//! Engine and embedding boundaries for the knowledge store.
//!
//! ## Architecture
//!
//! ```text
//! text ──> Embedder (stub | TEI)
//!             └─> Vec<f32>
//!
//! Point { id, vector, flat payload }
//!     │
//!     └──> VectorEngine (memory | Qdrant REST)
//!            ├─> upsert / retrieve / delete_by_filter
//!            └─> query (filtered, best match first)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use knowledge_vector_store::{Distance, Embedder, MemoryEngine, StubEmbedder, VectorEngine};
//!
//! #[tokio::main]
//! async fn main() -> knowledge_vector_store::Result<()> {
//!     let engine = MemoryEngine::new();
//!     let embedder = StubEmbedder::new(64);
//!     engine.create_collection("documentation_store", 64, Distance::Cosine).await?;
//!
//!     let vector = embedder.embed("monthly revenue by region").await?;
//!     let hits = engine.query("documentation_store", &vector, 3, None).await?;
//!     println!("{} hits", hits.len());
//!     Ok(())
//! }
//! ```

mod embeddings;
mod engine;
mod error;
mod memory;
mod qdrant;
mod types;

pub use embeddings::{
    Embedder, EmbeddingMode, StubEmbedder, TeiConfig, TeiEmbedder, DEFAULT_STUB_DIMENSION,
};
pub use engine::VectorEngine;
pub use error::{Result, VectorStoreError};
pub use memory::MemoryEngine;
pub use qdrant::{QdrantConfig, QdrantEngine};
pub use types::{
    cosine_similarity, CollectionInfo, Distance, FieldCondition, Filter, MatchValue, Point,
    PointId, RetrievedPoint, ScoredPoint,
};
