// file: src/extractor/mod.rs
// description: document extraction contract and scratch artifact handling
// reference: internal module structure

pub mod patterns;
pub mod pdf;

pub use pdf::PdfExtractor;

use crate::error::{PipelineError, Result};
use crate::models::PageMap;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Intermediate file written by an extractor. The orchestrator owns its removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchArtifact {
    path: PathBuf,
}

impl ScratchArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the artifact. Returns `false` when it was already gone.
    pub async fn remove(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed scratch artifact {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PipelineError::Cleanup(format!(
                "failed to remove scratch artifact {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub pages: PageMap,
    pub artifact: ScratchArtifact,
}

/// Turns a raw document into page-keyed text.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, document_path: &Path) -> Result<Extraction>;
}
