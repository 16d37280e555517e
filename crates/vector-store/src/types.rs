use knowledge_metadata::{FlatMetadata, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Point identifier: the engine accepts unsigned integers or UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl PointId {
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::Num(index as u64)
    }
}

impl From<u64> for PointId {
    fn from(value: u64) -> Self {
        Self::Num(value)
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Uuid(s) => f.write_str(s),
        }
    }
}

impl FromStr for PointId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(s.parse::<u64>()
            .map_or_else(|_| Self::Uuid(s.to_string()), Self::Num))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: FlatMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: PointId,
    pub payload: FlatMetadata,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPoint {
    pub id: PointId,
    pub payload: FlatMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
    Manhattan,
}

impl Distance {
    /// Raw score between two vectors; see [`Distance::higher_is_closer`] for ordering.
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Self::Euclid => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            Self::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }

    #[must_use]
    pub const fn higher_is_closer(self) -> bool {
        !matches!(self, Self::Euclid | Self::Manhattan)
    }
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionInfo {
    pub vector_size: usize,
    pub distance: Distance,
}

/// Conjunction of exact-match payload conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<FieldCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub matches: MatchValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchValue {
    pub value: Scalar,
}

impl Filter {
    #[must_use]
    pub fn must_match(key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::default().and_match(key, value)
    }

    #[must_use]
    pub fn and_match(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.must.push(FieldCondition {
            key: key.into(),
            matches: MatchValue {
                value: value.into(),
            },
        });
        self
    }

    #[must_use]
    pub fn matches(&self, payload: &FlatMetadata) -> bool {
        self.must
            .iter()
            .all(|cond| payload.get(&cond.key) == Some(&cond.matches.value))
    }
}
