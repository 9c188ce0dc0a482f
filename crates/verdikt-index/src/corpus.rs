//! Corpus data model: chunks, propositions, and their storage payloads.

use std::collections::HashMap;

use serde_json::Value;

use crate::vector_store::VectorPoint;

/// A passage of a source document providing full context around one or more
/// propositions. Created or replaced idempotently at ingestion time, read-only
/// at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub doc_id: String,
    pub title: String,
    pub content: String,
    /// Page locators, kept typed in memory and serialized to a display string
    /// only at the storage boundary.
    pub source_pages: Vec<u32>,
}

/// An atomic factual statement extracted from a chunk. Every proposition
/// references exactly one chunk by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposition {
    pub id: String,
    pub text: String,
    pub chunk_id: String,
    pub doc_id: String,
    pub title: String,
}

/// Proposition id format: `{chunk_id}_p{index}`.
#[must_use]
pub fn proposition_id(chunk_id: &str, index: usize) -> String {
    format!("{chunk_id}_p{index}")
}

/// Render page locators in their stored display form, e.g. `[1, 2]`.
#[must_use]
pub fn format_pages(pages: &[u32]) -> String {
    let inner = pages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{inner}]")
}

/// Parse the stored display form back into page numbers. Unparseable
/// fragments are dropped.
#[must_use]
pub fn parse_pages(raw: &str) -> Vec<u32> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

impl Chunk {
    #[must_use]
    pub fn payload(&self) -> HashMap<String, Value> {
        HashMap::from([
            ("doc_id".into(), Value::String(self.doc_id.clone())),
            ("title".into(), Value::String(self.title.clone())),
            ("content".into(), Value::String(self.content.clone())),
            (
                "source_pages".into(),
                Value::String(format_pages(&self.source_pages)),
            ),
        ])
    }

    #[must_use]
    pub fn from_payload(id: String, payload: &HashMap<String, Value>) -> Self {
        Self {
            id,
            doc_id: payload_str(payload, "doc_id"),
            title: payload_str(payload, "title"),
            content: payload_str(payload, "content"),
            source_pages: parse_pages(&payload_str(payload, "source_pages")),
        }
    }

    #[must_use]
    pub fn into_point(self, vector: Vec<f32>) -> VectorPoint {
        let payload = self.payload();
        VectorPoint {
            id: self.id,
            vector,
            payload,
        }
    }
}

impl Proposition {
    #[must_use]
    pub fn payload(&self) -> HashMap<String, Value> {
        HashMap::from([
            ("text".into(), Value::String(self.text.clone())),
            ("chunk_id".into(), Value::String(self.chunk_id.clone())),
            ("doc_id".into(), Value::String(self.doc_id.clone())),
            ("title".into(), Value::String(self.title.clone())),
        ])
    }

    #[must_use]
    pub fn from_payload(id: String, payload: &HashMap<String, Value>) -> Self {
        Self {
            id,
            text: payload_str(payload, "text"),
            chunk_id: payload_str(payload, "chunk_id"),
            doc_id: payload_str(payload, "doc_id"),
            title: payload_str(payload, "title"),
        }
    }

    #[must_use]
    pub fn into_point(self, vector: Vec<f32>) -> VectorPoint {
        let payload = self.payload();
        VectorPoint {
            id: self.id,
            vector,
            payload,
        }
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk() -> Chunk {
        Chunk {
            id: "doc1_c0".into(),
            doc_id: "doc1".into(),
            title: "Kontenrahmen".into(),
            content: "Fremdleistungen werden auf Konto 6300 im SKR04 gebucht.".into(),
            source_pages: vec![12, 14],
        }
    }

    #[test]
    fn proposition_id_format() {
        assert_eq!(proposition_id("doc1_c0", 2), "doc1_c0_p2");
    }

    #[test]
    fn pages_round_trip_through_display_form() {
        assert_eq!(format_pages(&[12, 14]), "[12, 14]");
        assert_eq!(parse_pages("[12, 14]"), vec![12, 14]);
        assert_eq!(format_pages(&[]), "[]");
        assert_eq!(parse_pages("[]"), Vec::<u32>::new());
    }

    #[test]
    fn parse_pages_drops_garbage() {
        assert_eq!(parse_pages("[1, x, 3]"), vec![1, 3]);
    }

    #[test]
    fn chunk_payload_round_trip() {
        let c = chunk();
        let restored = Chunk::from_payload(c.id.clone(), &c.payload());
        assert_eq!(restored, c);
    }

    #[test]
    fn proposition_payload_round_trip() {
        let p = Proposition {
            id: proposition_id("doc1_c0", 0),
            text: "Konto 6300 SKR04 Fremdleistungen".into(),
            chunk_id: "doc1_c0".into(),
            doc_id: "doc1".into(),
            title: "Kontenrahmen".into(),
        };
        let restored = Proposition::from_payload(p.id.clone(), &p.payload());
        assert_eq!(restored, p);
    }

    #[test]
    fn missing_payload_fields_default_to_empty() {
        let c = Chunk::from_payload("x".into(), &HashMap::new());
        assert_eq!(c.doc_id, "");
        assert!(c.source_pages.is_empty());
    }
}
