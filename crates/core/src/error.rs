use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalogue is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalogue must be a sequence of records, found {0}")]
    NotASequence(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch at position {position}: expected {expected}, got {got}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        got: usize,
    },

    #[error("vector at position {0} has zero norm")]
    DegenerateVector(usize),

    #[error("query dimension {got} != index dimension {expected}")]
    QueryDimensionMismatch { expected: usize, got: usize },

    #[error("query vector has zero norm")]
    DegenerateQuery,

    #[error("item count {items} doesn't match vector count {vectors}")]
    CountMismatch { items: usize, vectors: usize },
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("invalid response from {backend}: {details}")]
    InvalidResponse { backend: String, details: String },

    #[error("embedding dimension {got} != {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("provider returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("catalogue snapshot not built yet")]
    NotReady,

    #[error("query is empty")]
    EmptyQuery,

    #[error("embedding provider failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("query embedding timed out after {0:?}")]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = RetrievalError> = std::result::Result<T, E>;
