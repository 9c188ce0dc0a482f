//! Error types for verdikt-index.

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading corpus files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Vector store backend error.
    #[error("vector store error: {0}")]
    VectorStore(#[from] crate::vector_store::VectorStoreError),

    /// LLM provider error (embedding).
    #[error("LLM error: {0}")]
    Llm(#[from] verdikt_llm::LlmError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
