use crate::collections::Collection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An item that could not be written during a bulk pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub collection: Collection,
    pub index: usize,
    pub reason: String,
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub written: BTreeMap<Collection, usize>,
    pub failures: Vec<IngestFailure>,
    pub time_ms: u64,
}

impl IngestStats {
    pub(crate) fn record_written(&mut self, collection: Collection) {
        *self.written.entry(collection).or_insert(0) += 1;
    }

    pub(crate) fn record_failure(&mut self, collection: Collection, index: usize, reason: String) {
        log::warn!("Failed to write item {index} into {collection}: {reason}");
        self.failures.push(IngestFailure {
            collection,
            index,
            reason,
        });
    }

    #[must_use]
    pub fn written_to(&self, collection: Collection) -> usize {
        self.written.get(&collection).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_written(&self) -> usize {
        self.written.values().sum()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
