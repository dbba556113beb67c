// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns

pub mod ai;
pub mod config;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod index;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use ai::{AiClient, ChecklistEvaluator, IdentityExtractor};
pub use config::Config;
pub use error::{PipelineError, Result};
pub use exporter::{ExportManifest, ReportExporter};
pub use extractor::{DocumentExtractor, PdfExtractor};
pub use index::{LanceIndex, VectorIndex};
pub use models::{ChecklistDefinition, Company, CompanySummary};
pub use parser::ChecklistParser;
pub use pipeline::{
    PipelineEvent, PipelineOrchestrator, ProgressStream, ProgressTracker, RunSummary, Stage,
};
pub use store::{FsStore, RecordStore};
pub use utils::Validator;
