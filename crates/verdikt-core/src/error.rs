//! Error taxonomy for the query pipeline.
//!
//! Empty evidence is deliberately not represented here: it is a normal
//! terminal state handled by the stages, not a failure.

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A completion or embedding collaborator failed.
    #[error("LLM error: {0}")]
    Llm(#[from] verdikt_llm::LlmError),

    /// The vector index failed.
    #[error("index error: {0}")]
    Index(#[from] verdikt_index::IndexError),

    /// A structured-output stage produced data that violates its contract.
    /// Fatal for the current question, never coerced.
    #[error("schema validation failed in {stage} stage: {reason}")]
    SchemaValidation {
        stage: &'static str,
        reason: String,
    },

    /// A collaborator call exceeded the configured stage timeout.
    #[error("{stage} stage timed out")]
    StageTimeout { stage: &'static str },

    /// The pipeline was cancelled between stages.
    #[error("pipeline cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
