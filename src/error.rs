/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed JSON response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no IDs returned from NCBI search")]
    NoIds,
    #[error("sequence is empty")]
    EmptySequence,
    #[error("sequence length {len} outside {min}..={max}")]
    OutOfRangeLength { len: usize, min: usize, max: usize },
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
