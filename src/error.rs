// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required environment: {0}")]
    Environment(String),

    #[error("Identity extraction failed: {0}")]
    IdentityExtraction(String),

    #[error("Page persistence failed: {0}")]
    PagePersist(String),

    #[error("Indexing failed: {0}")]
    Indexing(String),

    #[error("Checklist evaluation failed: {0}")]
    ChecklistEvaluation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Company with identifier {0} already exists")]
    DuplicateIdentifier(String),

    #[error("Document extraction failed for {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("AI service error: {0}")]
    Ai(String),

    #[error("Checklist definition error in {file}: {message}")]
    ChecklistParse { file: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cleanup incomplete: {0}")]
    Cleanup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn company_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Company",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
