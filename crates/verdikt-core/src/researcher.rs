//! Researcher stage: a structured, cited draft answer derived only from the
//! retrieved evidence.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use verdikt_llm::LlmError;
use verdikt_llm::provider::{LlmProvider, Message};

use crate::error::{PipelineError, Result};
use crate::evidence::{EvidenceBundle, NO_EVIDENCE};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Citation {
    /// File identifier of the cited source document.
    pub document_id: String,
    /// Page locator within the document.
    pub page: String,
    /// Verbatim excerpt supporting the claim.
    pub excerpt: String,
}

/// The draft produced once per question and consumed exactly once by the
/// critic stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchResult {
    pub user_prompt: String,
    pub generated_answer: String,
    pub citations: Vec<Citation>,
    pub confidence: f32,
}

/// Schema the model fills in; `user_prompt` is attached by the stage rather
/// than echoed through the model.
#[derive(Debug, Deserialize, JsonSchema)]
struct ResearcherDraft {
    generated_answer: String,
    citations: Vec<Citation>,
    confidence: f32,
}

const STAGE: &str = "researcher";

fn instructions() -> Message {
    Message::system(
        "You are a research assistant answering questions about a private \
         document corpus. Answer strictly and only from the evidence provided \
         by the user; never use background knowledge. Cite every factual \
         statement with the document id and page it comes from, quoting a \
         short supporting excerpt. Answer in the language of the question.",
    )
}

fn render_task(question: &str, evidence: &EvidenceBundle) -> Message {
    Message::user(format!(
        "Question: {question}\n\nEvidence:\n{}",
        evidence.render()
    ))
}

/// Run the researcher stage. The retrieval result is a required input, not
/// an optional tool the stage may skip. Empty evidence short-circuits to a
/// fixed insufficient-evidence draft without a model call.
///
/// # Errors
///
/// Returns [`PipelineError::SchemaValidation`] if the model output violates
/// the draft contract, or [`PipelineError::Llm`] on collaborator failure.
pub async fn run<P: LlmProvider>(
    provider: &P,
    question: &str,
    evidence: &EvidenceBundle,
) -> Result<ResearchResult> {
    if evidence.is_empty() {
        tracing::info!("no evidence retrieved, answering with insufficient-evidence draft");
        return Ok(ResearchResult {
            user_prompt: question.to_owned(),
            generated_answer: NO_EVIDENCE.to_owned(),
            citations: Vec::new(),
            confidence: 1.0,
        });
    }

    let messages = [instructions(), render_task(question, evidence)];
    let draft: ResearcherDraft = provider.chat_typed(&messages).await.map_err(map_llm)?;

    let result = ResearchResult {
        user_prompt: question.to_owned(),
        generated_answer: draft.generated_answer,
        citations: draft.citations,
        confidence: draft.confidence,
    };
    validate(&result, evidence)?;
    Ok(result)
}

/// Structural contract checks the type system cannot express.
fn validate(result: &ResearchResult, evidence: &EvidenceBundle) -> Result<()> {
    if !(0.0..=1.0).contains(&result.confidence) {
        return Err(PipelineError::SchemaValidation {
            stage: STAGE,
            reason: format!("confidence {} outside [0.0, 1.0]", result.confidence),
        });
    }
    if result.citations.is_empty() && !evidence.is_empty() {
        return Err(PipelineError::SchemaValidation {
            stage: STAGE,
            reason: "answer over non-empty evidence carries no citations".into(),
        });
    }
    Ok(())
}

fn map_llm(e: LlmError) -> PipelineError {
    match e {
        LlmError::StructuredParse(reason) => PipelineError::SchemaValidation {
            stage: STAGE,
            reason,
        },
        other => PipelineError::Llm(other),
    }
}
