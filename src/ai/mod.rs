// file: src/ai/mod.rs
// description: AI collaborators for identity extraction and checklist evaluation
// reference: internal module structure

pub mod checklist;
pub mod client;
pub mod identity;

pub use checklist::{ChecklistEvaluator, LlmChecklistEvaluator};
pub use client::AiClient;
pub use identity::{IdentityExtractor, LlmIdentityExtractor};
