//! Retrieval-and-verification core: a question is expanded into search
//! probes, probes hit the two-tier corpus index, and the assembled evidence
//! flows through a researcher stage (cited draft) and a critic stage
//! (independent audit) before the answer leaves the system.

pub mod config;
pub mod critic;
pub mod error;
pub mod evidence;
pub mod expand;
pub mod pipeline;
pub mod researcher;
pub mod retrieve;

pub use critic::{AuditResult, Decision};
pub use error::{PipelineError, Result};
pub use evidence::EvidenceBundle;
pub use pipeline::Pipeline;
pub use researcher::ResearchResult;
