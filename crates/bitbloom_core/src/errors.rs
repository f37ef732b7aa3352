use thiserror::Error;

#[derive(Debug, Error)]
pub enum BloomError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Incompatible filters: m={left_bits},k={left_hashes} vs m={right_bits},k={right_hashes}")]
    IncompatibleFilters {
        left_bits: u64,
        left_hashes: u64,
        right_bits: u64,
        right_hashes: u64,
    },

    #[error("Digest mismatch")]
    Integrity,

    #[error("Truncated input: {0}")]
    Truncated(&'static str),

    #[error("Malformed input: {0}")]
    Malformed(String),

    /// Write failure reported by the caller's sink.
    #[error("Sink: {0}")]
    Sink(#[source] std::io::Error),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BloomError>;
