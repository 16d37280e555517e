use knowledge_metadata::{flatten, FlatMetadata, Metadata, Scalar, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DOCUMENT_KEY: &str = "document";
pub const DATASOURCE_KEY: &str = "datasource";
pub const CONFIG_ID_KEY: &str = "config_id";
pub const WEIGHTS_KEY: &str = "weights";

/// The four fixed collections, one per entity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Schema,
    Documentation,
    Samples,
    Cache,
}

impl Collection {
    pub const ALL: [Self; 4] = [Self::Schema, Self::Documentation, Self::Samples, Self::Cache];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Schema => "schema_store",
            Self::Documentation => "documentation_store",
            Self::Samples => "samples_store",
            Self::Cache => "cache_store",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Copy of `metadata` carrying the tenant and ingestion-run tags.
#[must_use]
pub fn tag_metadata(metadata: &Metadata, datasource: &str, config_id: &str) -> Metadata {
    let mut tagged = metadata.clone();
    tagged.insert(DATASOURCE_KEY.to_string(), Value::text(datasource));
    tagged.insert(CONFIG_ID_KEY.to_string(), Value::text(config_id));
    tagged
}

/// Flat payload for a record: flattened metadata plus the source text.
#[must_use]
pub fn build_payload(document: &str, metadata: &Metadata) -> FlatMetadata {
    let mut payload = flatten(metadata);
    payload.insert(DOCUMENT_KEY.to_string(), Scalar::from(document));
    payload
}
