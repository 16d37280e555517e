use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed list literal at byte {position} ({reason}): {input}")]
    MalformedList {
        input: String,
        position: usize,
        reason: String,
    },

    #[error("Key conflict: '{key}' is produced by more than one path")]
    KeyConflict { key: String },
}
