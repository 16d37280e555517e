use crate::error::{Result, StoreError};
use knowledge_vector_store::{
    Embedder, EmbeddingMode, MemoryEngine, QdrantConfig, QdrantEngine, StubEmbedder, TeiConfig,
    TeiEmbedder, VectorEngine, DEFAULT_STUB_DIMENSION,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_SAMPLE_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Qdrant,
    Memory,
}

impl EngineKind {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(StoreError::ConfigError(format!(
                "Unsupported engine '{other}' (expected 'qdrant' or 'memory')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    /// Output size of the stub embedder; TEI reports its own.
    pub dimension: usize,
    pub tei: TeiConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::Tei,
            dimension: DEFAULT_STUB_DIMENSION,
            tei: TeiConfig::default(),
        }
    }
}

/// Store settings: TOML file first, then `KNOWLEDGE_*` environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub engine: EngineKind,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub sample_count: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            qdrant: QdrantConfig::default(),
            embedding: EmbeddingConfig::default(),
            sample_count: DEFAULT_SAMPLE_COUNT,
        }
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| StoreError::ConfigError(format!("{var} must be a number, got '{raw}'")))
}

fn parse_flag(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StoreError::ConfigError(format!(
            "{var} must be a boolean, got '{raw}'"
        ))),
    }
}

impl StoreConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// File (when given) or defaults, with the process environment applied on top.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("KNOWLEDGE_ENGINE") {
            self.engine = EngineKind::parse(&raw)?;
        }
        if let Some(raw) = get("KNOWLEDGE_QDRANT_HOST") {
            self.qdrant.host = raw.trim().to_string();
        }
        if let Some(raw) = get("KNOWLEDGE_QDRANT_PORT") {
            self.qdrant.port = parse_number("KNOWLEDGE_QDRANT_PORT", &raw)?;
        }
        if let Some(raw) = get("KNOWLEDGE_QDRANT_API_KEY") {
            self.qdrant.api_key = Some(raw);
        }
        if let Some(raw) = get("KNOWLEDGE_QDRANT_HTTPS") {
            self.qdrant.https = parse_flag("KNOWLEDGE_QDRANT_HTTPS", &raw)?;
        }
        if let Some(raw) = get("KNOWLEDGE_EMBEDDING_MODE") {
            self.embedding.mode = EmbeddingMode::parse(&raw)
                .map_err(|e| StoreError::ConfigError(e.to_string()))?;
        }
        if let Some(raw) = get("KNOWLEDGE_EMBEDDING_URL") {
            self.embedding.tei.url = raw.trim().to_string();
        }
        if let Some(raw) = get("KNOWLEDGE_EMBEDDING_DIMENSION") {
            self.embedding.dimension = parse_number("KNOWLEDGE_EMBEDDING_DIMENSION", &raw)?;
        }
        if let Some(raw) = get("KNOWLEDGE_SAMPLE_COUNT") {
            self.sample_count = parse_number("KNOWLEDGE_SAMPLE_COUNT", &raw)?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.embedding.mode == EmbeddingMode::Stub && self.embedding.dimension == 0 {
            return Err(StoreError::ConfigError(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        if self.sample_count == 0 {
            return Err(StoreError::ConfigError(
                "sample_count must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build_engine(&self) -> Result<Arc<dyn VectorEngine>> {
        Ok(match self.engine {
            EngineKind::Qdrant => Arc::new(QdrantEngine::new(&self.qdrant)?),
            EngineKind::Memory => Arc::new(MemoryEngine::new()),
        })
    }

    pub fn build_embedder(&self) -> Result<Arc<dyn Embedder>> {
        Ok(match self.embedding.mode {
            EmbeddingMode::Stub => Arc::new(StubEmbedder::new(self.embedding.dimension)),
            EmbeddingMode::Tei => Arc::new(TeiEmbedder::new(self.embedding.tei.clone())?),
        })
    }
}
