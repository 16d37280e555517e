use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const DEFAULT_STUB_DIMENSION: usize = 384;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    Stub,
    Tei,
}

impl EmbeddingMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "tei" => Ok(Self::Tei),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported embedding mode '{other}' (expected 'stub' or 'tei')"
            ))),
        }
    }

    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Tei => "tei",
        }
    }
}

/// Text → vector function. Output dimension is fixed for the lifetime of an instance.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }

    /// Known output dimension, if the embedder can tell without a round-trip.
    fn dimension_hint(&self) -> Option<usize> {
        None
    }
}

/// Deterministic hash-based vectors; no model required.
#[derive(Debug)]
pub struct StubEmbedder {
    dimension: usize,
    batch_calls: AtomicUsize,
}

impl StubEmbedder {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            batch_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }

    fn dimension_hint(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Settings for a Text Embeddings Inference server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeiConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub normalize: bool,
    pub truncate: bool,
}

impl Default for TeiConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            normalize: true,
            truncate: false,
        }
    }
}

#[derive(Serialize)]
struct TeiEmbedRequest<'a> {
    inputs: &'a [String],
    normalize: bool,
    truncate: bool,
}

/// Embedder backed by a TEI `/embed` endpoint.
pub struct TeiEmbedder {
    client: Client,
    url: String,
    config: TeiConfig,
}

impl TeiEmbedder {
    pub fn new(config: TeiConfig) -> Result<Self> {
        let url = format!("{}/embed", config.url.trim_end_matches('/'));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VectorStoreError::EmbeddingError(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            url,
            config,
        })
    }
}

#[async_trait]
impl Embedder for TeiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        log::debug!("Embedding {} text(s) via {}", texts.len(), self.url);
        let body = TeiEmbedRequest {
            inputs: texts,
            normalize: self.config.normalize,
            truncate: self.config.truncate,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(format!("TEI request failed: {e}")))?
            .error_for_status()
            .map_err(|e| VectorStoreError::EmbeddingError(format!("TEI request failed: {e}")))?;
        let embeddings: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            VectorStoreError::EmbeddingError(format!("TEI response parse error: {e}"))
        })?;

        if embeddings.len() != texts.len() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "TEI returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }
}
