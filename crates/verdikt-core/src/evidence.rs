//! Evidence bundle: the formatted, deduplicated set of passages handed to
//! the generation stages. Request-scoped; dropped once the answer exists.

use verdikt_index::corpus::{Chunk, format_pages};

/// Sentinel rendered when retrieval found nothing. Not an error.
pub const NO_EVIDENCE: &str = "No relevant information was found in the document corpus.";

/// Separator between rendered entries, distinct enough for a language model
/// to segment evidence unambiguously.
const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceEntry {
    pub doc_id: String,
    pub title: String,
    pub source_pages: Vec<u32>,
    pub content: String,
}

impl From<Chunk> for EvidenceEntry {
    fn from(chunk: Chunk) -> Self {
        Self {
            doc_id: chunk.doc_id,
            title: chunk.title,
            source_pages: chunk.source_pages,
            content: chunk.content,
        }
    }
}

impl EvidenceEntry {
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[Source: {} | {} | Pages: {}]\n{}",
            self.doc_id,
            self.title,
            format_pages(&self.source_pages),
            self.content
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceBundle {
    pub entries: Vec<EvidenceEntry>,
}

impl EvidenceBundle {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the bundle for language-model consumption. An empty bundle
    /// renders as the [`NO_EVIDENCE`] sentinel.
    #[must_use]
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return NO_EVIDENCE.to_owned();
        }
        self.entries
            .iter()
            .map(EvidenceEntry::render)
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR)
    }

    /// Document ids appearing in the bundle, in entry order.
    #[must_use]
    pub fn doc_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.doc_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(doc_id: &str) -> EvidenceEntry {
        EvidenceEntry {
            doc_id: doc_id.into(),
            title: "Kontenrahmen".into(),
            source_pages: vec![12],
            content: "Fremdleistungen werden auf Konto 6300 im SKR04 gebucht.".into(),
        }
    }

    #[test]
    fn empty_bundle_renders_sentinel() {
        assert_eq!(EvidenceBundle::empty().render(), NO_EVIDENCE);
    }

    #[test]
    fn entry_render_carries_provenance() {
        let rendered = entry("skr04").render();
        assert!(rendered.contains("skr04"));
        assert!(rendered.contains("Kontenrahmen"));
        assert!(rendered.contains("[12]"));
        assert!(rendered.contains("Konto 6300"));
    }

    #[test]
    fn entries_joined_with_separator() {
        let bundle = EvidenceBundle {
            entries: vec![entry("a"), entry("b")],
        };
        let rendered = bundle.render();
        assert!(rendered.contains("\n\n---\n\n"));
        assert_eq!(bundle.doc_ids(), vec!["a", "b"]);
    }
}
