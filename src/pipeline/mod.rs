// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

pub mod checklist;
pub mod events;
pub mod identity;
pub mod indexer;
pub mod orchestrator;
pub mod pages;
pub mod progress;
pub mod report;
pub mod state;

pub use events::{PipelineEvent, ProgressSender, ProgressStream, StreamItem, progress_channel};
pub use orchestrator::{
    CleanupFailure, CleanupReport, Collaborators, PipelineOrchestrator, RunSummary,
};
pub use progress::{ProgressTracker, RunStats};
pub use state::{CompanyOrigin, Flow, Stage, Transition, advance};
