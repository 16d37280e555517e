use crate::collections::Collection;
use knowledge_metadata::Metadata;
use knowledge_vector_store::PointId;
use serde::{Deserialize, Serialize};

/// A chunk of documentation or schema text with its metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(alias = "page_content", alias = "description")]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Example query with its metadata, as found in batch descriptors and sample sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub description: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Sample {
    pub fn new(description: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            description: description.into(),
            metadata,
        }
    }
}

/// One hit, shaped for callers: payload unflattened back into nested metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: String,
    pub id: PointId,
    pub metadatas: Metadata,
    /// Similarity score; absent for lookups by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectReport {
    pub dimension: usize,
    pub created: Vec<Collection>,
    pub existing: Vec<Collection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    Ready { collections: Vec<String> },
    Unavailable { reason: String },
}

impl HealthStatus {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}
