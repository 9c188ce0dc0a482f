//! Query pipeline: expansion → retrieval → researcher → critic, with a
//! hard-coded control-flow graph and explicit stage handoff.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use verdikt_index::CorpusIndex;
use verdikt_llm::provider::LlmProvider;

use crate::critic::{self, AuditResult};
use crate::error::{PipelineError, Result};
use crate::evidence::EvidenceBundle;
use crate::expand;
use crate::researcher::{self, ResearchResult};
use crate::retrieve::{RetrievalConfig, RetrievalEngine};

/// Pipeline states for one question. `Researching → Auditing` only happens
/// after a schema-valid [`ResearchResult`] exists (the handoff); `Done` only
/// after a schema-valid [`AuditResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Researching,
    Auditing,
    Done,
}

/// Full trace of one answered question, for diagnosis and tests.
#[derive(Debug, Clone)]
pub struct QueryReport {
    pub probes: Vec<String>,
    pub evidence: EvidenceBundle,
    pub research: ResearchResult,
    pub audit: AuditResult,
}

/// One pipeline instance per deployment; questions run as independent,
/// sequential stage chains sharing only read-only index access.
pub struct Pipeline<P: LlmProvider> {
    provider: Arc<P>,
    index: CorpusIndex<P>,
    retrieval: RetrievalConfig,
    stage_timeout: Duration,
    cancel: CancellationToken,
}

impl<P: LlmProvider> Pipeline<P> {
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        index: CorpusIndex<P>,
        retrieval: RetrievalConfig,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            index,
            retrieval,
            stage_timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed between stages; cancelling it aborts the current
    /// question at the next stage boundary without corrupting shared state.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Answer a question. Synchronous from the caller's perspective: the
    /// future resolves to the terminal [`AuditResult`].
    ///
    /// # Errors
    ///
    /// Returns a typed error on collaborator failure, stage timeout, schema
    /// violation, or cancellation. A failed question leaves the index and
    /// the pipeline usable for subsequent questions.
    pub async fn answer(&self, question: &str) -> Result<AuditResult> {
        self.run(question).await.map(|report| report.audit)
    }

    /// Like [`Pipeline::answer`], but returns the full per-stage trace.
    ///
    /// # Errors
    ///
    /// Same contract as [`Pipeline::answer`].
    pub async fn run(&self, question: &str) -> Result<QueryReport> {
        self.checkpoint(Stage::Idle)?;
        self.checkpoint(Stage::Researching)?;

        // Expansion degrades rather than fails: on timeout the verbatim
        // question is the only probe.
        let probes =
            match tokio::time::timeout(self.stage_timeout, expand::expand(&*self.provider, question))
                .await
            {
                Ok(probes) => probes,
                Err(_) => {
                    tracing::warn!("query expansion timed out, using original question only");
                    vec![question.to_owned()]
                }
            };

        let engine = RetrievalEngine::new(&self.index, self.retrieval);
        let evidence = self
            .bounded("retrieval", engine.retrieve(&probes))
            .await?;

        let research = self
            .bounded(
                "researcher",
                researcher::run(&*self.provider, question, &evidence),
            )
            .await?;

        // Handoff: the researcher produced a complete structured draft.
        self.checkpoint(Stage::Auditing)?;
        tracing::info!(
            citations = research.citations.len(),
            confidence = research.confidence,
            "handing off draft to critic"
        );

        let audit = self
            .bounded("critic", critic::run(&*self.provider, &research, &evidence))
            .await?;

        self.checkpoint(Stage::Done)?;
        tracing::info!(decision = ?audit.decision, "query complete");

        Ok(QueryReport {
            probes,
            evidence,
            research,
            audit,
        })
    }

    fn checkpoint(&self, stage: Stage) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::info!(?stage, "pipeline cancelled between stages");
            return Err(PipelineError::Cancelled);
        }
        tracing::debug!(?stage, "pipeline stage");
        Ok(())
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.stage_timeout, fut)
            .await
            .map_err(|_| PipelineError::StageTimeout { stage })?
    }
}
