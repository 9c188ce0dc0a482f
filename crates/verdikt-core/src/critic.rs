//! Critic stage: independent re-verification of every claim in the draft
//! against the evidence the researcher actually saw. Terminal stage of a
//! query; its [`AuditResult`] is the system's externally visible output.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use verdikt_llm::LlmError;
use verdikt_llm::provider::{LlmProvider, Message};

use crate::error::{PipelineError, Result};
use crate::evidence::EvidenceBundle;
use crate::researcher::ResearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Every claim is directly supported; the draft stands as-is.
    Confirmed,
    /// At least one claim lacked support; the answer was rewritten.
    Corrected,
}

/// Terminal artifact of one query cycle.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AuditResult {
    /// Free-text audit trail; on correction it names the unsupported detail.
    pub reasoning: String,
    /// Identifiers of the evidence sources the audit relied on.
    pub sources_used: BTreeSet<String>,
    pub decision: Decision,
    pub confidence: f32,
    pub verified_answer: String,
}

const STAGE: &str = "critic";

fn instructions() -> Message {
    Message::system(
        "You are a fact-checking auditor. You receive a draft answer with \
         citations and the complete evidence it was based on. Check every \
         factual claim in the draft against that evidence only; do not use \
         outside knowledge and do not search for new sources. If every claim \
         is directly supported, set decision to \"confirmed\" and repeat the \
         draft answer unchanged as verified_answer. If any claim lacks direct \
         support, set decision to \"corrected\", name the unsupported detail \
         in your reasoning, and write a verified_answer derived strictly from \
         the evidence, omitting the unsupported content.",
    )
}

fn render_task(research: &ResearchResult, evidence: &EvidenceBundle) -> Result<Message> {
    let draft = serde_json::to_string_pretty(research)
        .map_err(|e| PipelineError::Llm(LlmError::Json(e)))?;
    Ok(Message::user(format!(
        "Draft to audit:\n{draft}\n\nEvidence the draft was based on:\n{}",
        evidence.render()
    )))
}

/// Run the critic stage. Empty-sentinel evidence is trivially confirmed
/// without a model call.
///
/// # Errors
///
/// Returns [`PipelineError::SchemaValidation`] if the verdict violates its
/// contract, or [`PipelineError::Llm`] on collaborator failure.
pub async fn run<P: LlmProvider>(
    provider: &P,
    research: &ResearchResult,
    evidence: &EvidenceBundle,
) -> Result<AuditResult> {
    if evidence.is_empty() {
        return Ok(AuditResult {
            reasoning: "No evidence was retrieved; the draft correctly reports that no \
                        information was found."
                .into(),
            sources_used: BTreeSet::new(),
            decision: Decision::Confirmed,
            confidence: 1.0,
            verified_answer: research.generated_answer.clone(),
        });
    }

    let messages = [instructions(), render_task(research, evidence)?];
    let mut audit: AuditResult = provider.chat_typed(&messages).await.map_err(map_llm)?;

    validate(&audit)?;

    // Contract: a confirmed verdict carries the draft answer byte-identical,
    // regardless of how the model phrased its repetition.
    if audit.decision == Decision::Confirmed {
        audit.verified_answer = research.generated_answer.clone();
    }
    Ok(audit)
}

fn validate(audit: &AuditResult) -> Result<()> {
    if !(0.0..=1.0).contains(&audit.confidence) {
        return Err(PipelineError::SchemaValidation {
            stage: STAGE,
            reason: format!("confidence {} outside [0.0, 1.0]", audit.confidence),
        });
    }
    if audit.decision == Decision::Corrected && audit.verified_answer.trim().is_empty() {
        return Err(PipelineError::SchemaValidation {
            stage: STAGE,
            reason: "corrected verdict with empty verified_answer".into(),
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
