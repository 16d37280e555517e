use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] knowledge_vector_store::VectorStoreError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Batch descriptor error: {0}")]
    BatchDescriptorError(#[from] serde_yaml::Error),

    #[error("Config parse error: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    ConfigError(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid weight: {0} has a non-numeric weights value")]
    InvalidWeight(String),
}
