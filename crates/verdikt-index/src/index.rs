//! Embedding-aware façade over the two corpus collections.

use std::sync::Arc;

use verdikt_llm::provider::LlmProvider;

use crate::corpus::{Chunk, Proposition};
use crate::error::Result;
use crate::vector_store::VectorStore;

/// Upsert batch size, matching the ingestion batching of the corpus tooling.
const BATCH_SIZE: usize = 50;

/// A proposition returned by a nearest-neighbor probe.
#[derive(Debug, Clone)]
pub struct PropositionHit {
    pub proposition: Proposition,
    pub score: f32,
}

/// A chunk returned by a flat-mode probe.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Two collections plus an embedder. Opened once at startup and shared
/// read-only across query pipelines; only ingestion writes.
pub struct CorpusIndex<P: LlmProvider> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    chunk_collection: String,
    proposition_collection: String,
}

impl<P: LlmProvider> std::fmt::Debug for CorpusIndex<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusIndex")
            .field("chunk_collection", &self.chunk_collection)
            .field("proposition_collection", &self.proposition_collection)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider> CorpusIndex<P> {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<P>,
        chunk_collection: impl Into<String>,
        proposition_collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            chunk_collection: chunk_collection.into(),
            proposition_collection: proposition_collection.into(),
        }
    }

    /// Create both collections if absent. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot create a collection.
    pub async fn ensure_collections(&self, vector_size: u64) -> Result<()> {
        self.store
            .ensure_collection(&self.chunk_collection, vector_size)
            .await?;
        self.store
            .ensure_collection(&self.proposition_collection, vector_size)
            .await?;
        Ok(())
    }

    /// Whether both collections already exist in the store. Lets callers
    /// distinguish a never-ingested deployment from an empty query result.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails.
    pub async fn collections_exist(&self) -> Result<bool> {
        Ok(self.store.collection_exists(&self.chunk_collection).await?
            && self
                .store
                .collection_exists(&self.proposition_collection)
                .await?)
    }

    /// Embed and upsert chunks in batches.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the store upsert fails.
    pub async fn upsert_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        for chunk in chunks {
            let vector = self.provider.embed(&chunk.content).await?;
            batch.push(chunk.into_point(vector));
            if batch.len() == BATCH_SIZE {
                self.store
                    .upsert(&self.chunk_collection, std::mem::take(&mut batch))
                    .await?;
            }
        }
        if !batch.is_empty() {
            self.store.upsert(&self.chunk_collection, batch).await?;
        }
        Ok(())
    }

    /// Embed and upsert propositions in batches.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the store upsert fails.
    pub async fn upsert_propositions(&self, propositions: Vec<Proposition>) -> Result<()> {
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        for prop in propositions {
            let vector = self.provider.embed(&prop.text).await?;
            batch.push(prop.into_point(vector));
            if batch.len() == BATCH_SIZE {
                self.store
                    .upsert(&self.proposition_collection, std::mem::take(&mut batch))
                    .await?;
            }
        }
        if !batch.is_empty() {
            self.store.upsert(&self.proposition_collection, batch).await?;
        }
        Ok(())
    }

    /// Run all probes against the proposition collection as one batched
    /// nearest-neighbor call, top-K per probe. Results are parallel to the
    /// input probes.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the search fails.
    pub async fn query_propositions(
        &self,
        probes: &[String],
        top_k: u64,
    ) -> Result<Vec<Vec<PropositionHit>>> {
        let vectors = self.embed_probes(probes).await?;
        let per_probe = self
            .store
            .search_batch(&self.proposition_collection, vectors, top_k)
            .await?;
        Ok(per_probe
            .into_iter()
            .map(|hits| {
                hits.into_iter()
                    .map(|h| PropositionHit {
                        proposition: Proposition::from_payload(h.id, &h.payload),
                        score: h.score,
                    })
                    .collect()
            })
            .collect())
    }

    /// Run all probes directly against the chunk collection as one batched
    /// call (flat mode).
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the search fails.
    pub async fn query_chunks(&self, probes: &[String], top_k: u64) -> Result<Vec<Vec<ChunkHit>>> {
        let vectors = self.embed_probes(probes).await?;
        let per_probe = self
            .store
            .search_batch(&self.chunk_collection, vectors, top_k)
            .await?;
        Ok(per_probe
            .into_iter()
            .map(|hits| {
                hits.into_iter()
                    .map(|h| ChunkHit {
                        chunk: Chunk::from_payload(h.id, &h.payload),
                        score: h.score,
                    })
                    .collect()
            })
            .collect())
    }

    async fn embed_probes(&self, probes: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(probes.len());
        for probe in probes {
            vectors.push(self.provider.embed(probe).await?);
        }
        Ok(vectors)
    }

    /// Batch-fetch chunks by id, in input order. A proposition referencing a
    /// chunk absent from the store (partial ingestion) is skipped with a
    /// warning rather than failing the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fetch itself fails.
    pub async fn fetch_chunks(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let fetched = self
            .store
            .fetch(&self.chunk_collection, ids.to_vec())
            .await?;

        let mut chunks = Vec::with_capacity(fetched.len());
        for (id, point) in ids.iter().zip(fetched) {
            match point {
                Some(p) => chunks.push(Chunk::from_payload(p.id, &p.payload)),
                None => {
                    tracing::warn!(chunk_id = %id, "proposition references missing chunk, skipping");
                }
            }
        }
        Ok(chunks)
    }

    /// # Errors
    ///
    /// Returns an error if the store count fails.
    pub async fn chunk_count(&self) -> Result<u64> {
        Ok(self.store.count(&self.chunk_collection).await?)
    }

    /// # Errors
    ///
    /// Returns an error if the store count fails.
    pub async fn proposition_count(&self) -> Result<u64> {
        Ok(self.store.count(&self.proposition_collection).await?)
    }
}
