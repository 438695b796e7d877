//! Session Controller: owns one interview's lifecycle (spec.md §4.1),
//! spawning the Conversation Loop and Code Monitor and wiring the
//! Lie-Detection Engine's nudges back into the conversation.

pub mod controller;
pub mod store;
pub mod transcript;

pub use controller::{
    render_knowledge_context, SessionController, SessionDeps, SessionOutcome, SessionStatusView,
};
pub use ivorch_consolidator::{consolidate, ConsolidationInputs, OutcomeWriter};
pub use store::SessionStore;
pub use transcript::TranscriptWriter;
