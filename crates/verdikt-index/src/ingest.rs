//! JSON corpus ingestion.
//!
//! Two on-disk formats are supported:
//!
//! - the transformed corpus format: documents carrying chunks with extracted
//!   propositions, loaded into both collections for small-to-big retrieval;
//! - the flat format: one record per source file, loaded into the chunk
//!   collection only, for corpora without proposition extraction.

use std::path::Path;

use serde::Deserialize;

use crate::corpus::{Chunk, Proposition, proposition_id};
use crate::error::Result;
use crate::index::CorpusIndex;
use verdikt_llm::provider::LlmProvider;

#[derive(Debug, Deserialize)]
pub struct CorpusDocument {
    pub doc_id: String,
    #[serde(default)]
    pub chunks: Vec<CorpusChunk>,
}

#[derive(Debug, Deserialize)]
pub struct CorpusChunk {
    pub chunk_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub source_pages: Vec<u32>,
    #[serde(default)]
    pub propositions: Vec<String>,
}

/// One record of the flat corpus format. `content` may be a plain string or a
/// structured object whose string fields are joined into one passage.
#[derive(Debug, Deserialize)]
pub struct FlatRecord {
    pub filename: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    pub propositions: usize,
}

/// # Errors
///
/// Returns an error if the file cannot be read or is not valid corpus JSON.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusDocument>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// # Errors
///
/// Returns an error if the file cannot be read or is not valid flat JSON.
pub fn load_flat(path: &Path) -> Result<Vec<FlatRecord>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Ingest transformed corpus documents into both collections.
///
/// Upserts are idempotent: re-ingesting a document replaces its chunks and
/// propositions without duplicating them.
///
/// # Errors
///
/// Returns an error if embedding or a store upsert fails.
pub async fn ingest_corpus<P: LlmProvider>(
    index: &CorpusIndex<P>,
    documents: Vec<CorpusDocument>,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    for doc in documents {
        let mut chunks = Vec::with_capacity(doc.chunks.len());
        let mut propositions = Vec::new();

        for chunk in doc.chunks {
            for (i, text) in chunk.propositions.iter().enumerate() {
                propositions.push(Proposition {
                    id: proposition_id(&chunk.chunk_id, i),
                    text: text.clone(),
                    chunk_id: chunk.chunk_id.clone(),
                    doc_id: doc.doc_id.clone(),
                    title: chunk.title.clone(),
                });
            }
            chunks.push(Chunk {
                id: chunk.chunk_id,
                doc_id: doc.doc_id.clone(),
                title: chunk.title,
                content: chunk.content,
                source_pages: chunk.source_pages,
            });
        }

        tracing::info!(
            doc_id = %doc.doc_id,
            chunks = chunks.len(),
            propositions = propositions.len(),
            "ingesting document"
        );
        report.chunks += chunks.len();
        report.propositions += propositions.len();

        index.upsert_chunks(chunks).await?;
        index.upsert_propositions(propositions).await?;
    }

    Ok(report)
}

/// Ingest flat records into the chunk collection only. Records with no
/// usable text are skipped.
///
/// # Errors
///
/// Returns an error if embedding or a store upsert fails.
pub async fn ingest_flat<P: LlmProvider>(
    index: &CorpusIndex<P>,
    records: Vec<FlatRecord>,
) -> Result<IngestReport> {
    let mut chunks = Vec::new();
    for record in records {
        let text = flatten_content(&record.content);
        if text.trim().is_empty() {
            tracing::warn!(filename = %record.filename, "flat record has no text, skipping");
            continue;
        }
        chunks.push(Chunk {
            id: record.filename.clone(),
            doc_id: record.filename,
            title: String::new(),
            content: text,
            source_pages: Vec::new(),
        });
    }

    let report = IngestReport {
        chunks: chunks.len(),
        propositions: 0,
    };
    index.upsert_chunks(chunks).await?;
    Ok(report)
}

/// Extract passage text from a flat record's content. Strings are taken
/// verbatim; structured objects are rendered as `key: value` lines so image
/// metadata records stay searchable.
fn flatten_content(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => {
            let mut lines = Vec::with_capacity(map.len());
            for (key, value) in map {
                if let serde_json::Value::String(s) = value
                    && !s.trim().is_empty()
                {
                    lines.push(format!("{key}: {s}"));
                }
            }
            lines.join("\n")
        }
        _ => String::new(),
    }
}
