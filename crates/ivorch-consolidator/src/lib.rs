//! Log Consolidator & Scorer: on session end, assembles the canonical
//! `InterviewOutcome` document from the recorded Conversation/Lie
//! streams and the Knowledge Base (spec.md §4.8).

pub mod consolidate;
pub mod scoring;
pub mod writer;

pub use consolidate::{consolidate, ConsolidationInputs};
pub use writer::OutcomeWriter;
