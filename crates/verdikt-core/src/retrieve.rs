//! Two-tier "small-to-big" retrieval plus the flat single-tier fallback.

use std::collections::BTreeSet;

use serde::Deserialize;
use verdikt_index::CorpusIndex;
use verdikt_llm::provider::LlmProvider;

use crate::error::Result;
use crate::evidence::{EvidenceBundle, EvidenceEntry};

/// How probes are resolved against the corpus. A fixed deployment choice,
/// never inferred from corpus shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalMode {
    /// Probe the proposition collection, widen matches to their chunks.
    SmallToBig,
    /// Probe a single flat chunk collection directly.
    Flat,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub mode: RetrievalMode,
    /// Top-K propositions per probe in small-to-big mode.
    pub proposition_top_k: u64,
    /// Top-K chunks per probe in flat mode.
    pub flat_top_k: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            mode: RetrievalMode::SmallToBig,
            proposition_top_k: 3,
            flat_top_k: 2,
        }
    }
}

/// Read-only retrieval over a shared [`CorpusIndex`]. The query path never
/// mutates the index.
pub struct RetrievalEngine<'a, P: LlmProvider> {
    index: &'a CorpusIndex<P>,
    config: RetrievalConfig,
}

impl<'a, P: LlmProvider> RetrievalEngine<'a, P> {
    #[must_use]
    pub fn new(index: &'a CorpusIndex<P>, config: RetrievalConfig) -> Self {
        Self { index, config }
    }

    /// Resolve probes into one evidence bundle. An empty bundle is a valid
    /// outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the index search fails.
    pub async fn retrieve(&self, probes: &[String]) -> Result<EvidenceBundle> {
        match self.config.mode {
            RetrievalMode::SmallToBig => self.retrieve_small_to_big(probes).await,
            RetrievalMode::Flat => self.retrieve_flat(probes).await,
        }
    }

    /// Propositions first for precision, then their containing chunks for
    /// context. Chunk ids are deduplicated into an ordered set, so output
    /// order is stable for a fixed retrieval even though fine-grained
    /// proposition rank is lost in the reassembly.
    async fn retrieve_small_to_big(&self, probes: &[String]) -> Result<EvidenceBundle> {
        let per_probe = self
            .index
            .query_propositions(probes, self.config.proposition_top_k)
            .await?;

        let chunk_ids: BTreeSet<String> = per_probe
            .iter()
            .flatten()
            .map(|hit| hit.proposition.chunk_id.clone())
            .filter(|id| !id.is_empty())
            .collect();

        if chunk_ids.is_empty() {
            tracing::debug!("no propositions matched, returning empty evidence");
            return Ok(EvidenceBundle::empty());
        }

        let ids: Vec<String> = chunk_ids.into_iter().collect();
        let chunks = self.index.fetch_chunks(&ids).await?;

        tracing::debug!(
            probes = probes.len(),
            chunks = chunks.len(),
            "assembled evidence bundle"
        );
        Ok(EvidenceBundle {
            entries: chunks.into_iter().map(EvidenceEntry::from).collect(),
        })
    }

    /// Legacy single-tier variant for corpora without proposition
    /// extraction. Deduplicates by rendered-entry equality.
    async fn retrieve_flat(&self, probes: &[String]) -> Result<EvidenceBundle> {
        let per_probe = self
            .index
            .query_chunks(probes, self.config.flat_top_k)
            .await?;

        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for hit in per_probe.into_iter().flatten() {
            let entry = EvidenceEntry::from(hit.chunk);
            if seen.insert(entry.render()) {
                entries.push(entry);
            }
        }

        Ok(EvidenceBundle { entries })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use verdikt_index::corpus::{Chunk, Proposition, proposition_id};
    use verdikt_index::in_memory_store::InMemoryVectorStore;
    use verdikt_llm::mock::MockProvider;

    fn index() -> CorpusIndex<MockProvider> {
        CorpusIndex::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(MockProvider::default()),
            "chunks",
            "propositions",
        )
    }

    fn chunk(id: &str, content: &str) -> Chunk {
        Chunk {
            id: id.into(),
            doc_id: "skr04".into(),
            title: "Kontenrahmen".into(),
            content: content.into(),
            source_pages: vec![12],
        }
    }

    fn proposition(chunk_id: &str, text: &str) -> Proposition {
        Proposition {
            id: proposition_id(chunk_id, 0),
            text: text.into(),
            chunk_id: chunk_id.into(),
            doc_id: "skr04".into(),
            title: "Kontenrahmen".into(),
        }
    }

    async fn seeded_index() -> CorpusIndex<MockProvider> {
        let idx = index();
        idx.ensure_collections(64).await.unwrap();
        idx.upsert_chunks(vec![chunk(
            "skr04_c0",
            "Fremdleistungen werden auf Konto 6300 im SKR04 gebucht.",
        )])
        .await
        .unwrap();
        idx.upsert_propositions(vec![proposition(
            "skr04_c0",
            "Konto 6300 SKR04 Fremdleistungen",
        )])
        .await
        .unwrap();
        idx
    }

    #[tokio::test]
    async fn small_to_big_widens_to_chunk_content() {
        let idx = seeded_index().await;
        let engine = RetrievalEngine::new(&idx, RetrievalConfig::default());

        let probes = vec!["konto skr04 fremdleistungen".to_owned()];
        let bundle = engine.retrieve(&probes).await.unwrap();

        assert!(!bundle.is_empty());
        assert!(bundle.render().contains("Konto 6300"));
        assert_eq!(bundle.doc_ids(), vec!["skr04"]);
    }

    #[tokio::test]
    async fn duplicate_chunk_references_are_deduplicated() {
        let idx = seeded_index().await;
        // Second proposition pointing at the same chunk.
        idx.upsert_propositions(vec![Proposition {
            id: proposition_id("skr04_c0", 1),
            text: "Fremdleistungen Konto 6300".into(),
            chunk_id: "skr04_c0".into(),
            doc_id: "skr04".into(),
            title: "Kontenrahmen".into(),
        }])
        .await
        .unwrap();

        let engine = RetrievalEngine::new(&idx, RetrievalConfig::default());
        let probes = vec!["fremdleistungen konto".to_owned(), "skr04".to_owned()];
        let bundle = engine.retrieve(&probes).await.unwrap();
        assert_eq!(bundle.entries.len(), 1);
    }

    #[tokio::test]
    async fn empty_corpus_yields_empty_bundle() {
        let idx = index();
        idx.ensure_collections(64).await.unwrap();
        let engine = RetrievalEngine::new(&idx, RetrievalConfig::default());

        let bundle = engine.retrieve(&["anything".to_owned()]).await.unwrap();
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn dangling_chunk_reference_is_skipped() {
        let idx = index();
        idx.ensure_collections(64).await.unwrap();
        // Proposition whose chunk was never ingested.
        idx.upsert_propositions(vec![proposition("ghost_c9", "orphaned statement")])
            .await
            .unwrap();

        let engine = RetrievalEngine::new(&idx, RetrievalConfig::default());
        let bundle = engine.retrieve(&["orphaned statement".to_owned()]).await.unwrap();
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn flat_mode_searches_chunks_directly() {
        let idx = index();
        idx.ensure_collections(64).await.unwrap();
        idx.upsert_chunks(vec![chunk(
            "skr04_c0",
            "Fremdleistungen werden auf Konto 6300 im SKR04 gebucht.",
        )])
        .await
        .unwrap();

        let config = RetrievalConfig {
            mode: RetrievalMode::Flat,
            ..RetrievalConfig::default()
        };
        let engine = RetrievalEngine::new(&idx, config);
        let probes = vec![
            "fremdleistungen konto".to_owned(),
            "skr04 buchung".to_owned(),
        ];
        let bundle = engine.retrieve(&probes).await.unwrap();

        // Both probes hit the same chunk; rendered-entry dedup keeps one.
        assert_eq!(bundle.entries.len(), 1);
        assert!(bundle.render().contains("6300"));
    }

    #[test]
    fn mode_deserializes_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: RetrievalMode,
        }
        let w: Wrapper = toml::from_str("mode = \"small-to-big\"").unwrap();
        assert_eq!(w.mode, RetrievalMode::SmallToBig);
        let w: Wrapper = toml::from_str("mode = \"flat\"").unwrap();
        assert_eq!(w.mode, RetrievalMode::Flat);
    }
}
