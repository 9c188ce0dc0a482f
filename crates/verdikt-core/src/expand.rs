//! Query expansion: one question becomes several diversified search probes.

use verdikt_llm::provider::{LlmProvider, Message};

/// Number of generated probes; the verbatim question is always appended as
/// an extra probe, guaranteeing recall even when expansion degrades.
pub const GENERATED_PROBES: usize = 3;

fn expansion_prompt(question: &str) -> String {
    format!(
        "Generate exactly {GENERATED_PROBES} short search terms for the following \
         question, in the same language as the question. Respond with the terms \
         only, separated by commas, no numbering and no explanations.\n\n\
         Question: {question}"
    )
}

/// Expand a question into search probes. The last probe is always the
/// verbatim question. On collaborator failure or empty output the expansion
/// degrades to the question alone; it never propagates an error.
pub async fn expand<P: LlmProvider>(provider: &P, question: &str) -> Vec<String> {
    let mut probes = match provider
        .chat(&[Message::user(expansion_prompt(question))])
        .await
    {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .take(GENERATED_PROBES)
            .map(ToOwned::to_owned)
            .collect(),
        Err(e) => {
            tracing::warn!("query expansion failed, falling back to original question: {e}");
            Vec::new()
        }
    };

    probes.push(question.to_owned());
    tracing::debug!(count = probes.len(), "expanded question into probes");
    probes
}
