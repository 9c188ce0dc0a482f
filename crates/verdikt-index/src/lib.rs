//! Two-tier corpus index: fine-grained propositions for precision, chunks for context.
//!
//! Propositions and chunks live in separate vector collections. Queries hit the
//! proposition collection first, then matches are widened to their containing
//! chunk before generation (small-to-big retrieval).

pub mod corpus;
pub mod error;
pub mod in_memory_store;
pub mod index;
pub mod ingest;
pub mod qdrant;
pub mod vector_store;

pub use corpus::{Chunk, Proposition};
pub use error::{IndexError, Result};
pub use index::CorpusIndex;
