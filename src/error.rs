//! Error taxonomy for the ranking engine and catalog write paths.
//!
//! Every variant aborts the request that raised it. Nothing here is retried
//! inside the engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The embedding model failed upstream.
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    #[error("embedding call exceeded its deadline of {after_ms} ms")]
    EmbeddingTimeout { after_ms: u64 },

    /// The provider returned a different number of vectors than texts sent.
    #[error("embedding batch size mismatch: sent {expected} texts, received {actual} vectors")]
    BatchSizeMismatch { expected: usize, actual: usize },

    /// Annotation counts and similarity scores disagree. Indicates a bug in the caller.
    #[error("alignment error: {annotations} annotations but {scores} similarity scores")]
    Alignment { annotations: usize, scores: usize },

    #[error("hotel {hotel_id} has no annotations and cannot be scored")]
    EmptyAnnotationSet { hotel_id: i64 },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("storage call exceeded its deadline of {after_ms} ms")]
    StorageTimeout { after_ms: u64 },

    #[error("no hotel found with id {0}")]
    HotelNotFound(i64),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Stored vectors came from a different model than the configured provider.
    #[error("stored vectors come from {stored}, provider is {configured}; run enrol")]
    ModelMismatch { stored: String, configured: String },
}

impl From<rusqlite::Error> for SearchError {
    fn from(err: rusqlite::Error) -> Self {
        SearchError::Storage(err.to_string())
    }
}

impl SearchError {
    /// True for deadline failures, which callers may choose to retry with a fresh attempt.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SearchError::EmbeddingTimeout { .. } | SearchError::StorageTimeout { .. }
        )
    }
}
