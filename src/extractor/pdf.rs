// file: src/extractor/pdf.rs
// description: per-page PDF text extraction writing a JSON page-map artifact to scratch storage
// reference: https://docs.rs/lopdf

use crate::error::{PipelineError, Result};
use crate::extractor::patterns::detect_printed_page_number;
use crate::extractor::{DocumentExtractor, Extraction, ScratchArtifact};
use crate::models::{PageContent, PageMap};
use crate::utils::Validator;
use async_trait::async_trait;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub struct PdfExtractor {
    scratch_dir: PathBuf,
}

impl PdfExtractor {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    fn extract_pages_blocking(path: &Path) -> Result<Vec<(u32, String)>> {
        let document = Document::load(path).map_err(|e| PipelineError::Extraction {
            path: path.to_path_buf(),
            message: format!("failed to load PDF: {}", e),
        })?;

        if document.is_encrypted() {
            return Err(PipelineError::Extraction {
                path: path.to_path_buf(),
                message: "PDF is encrypted".to_string(),
            });
        }

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(PipelineError::Extraction {
                path: path.to_path_buf(),
                message: "PDF has no pages".to_string(),
            });
        }

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_number in page_numbers {
            let text = match document.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        "Text extraction failed for page {} of {}: {}",
                        page_number,
                        path.display(),
                        e
                    );
                    String::new()
                }
            };
            pages.push((page_number, text));
        }

        Ok(pages)
    }

    async fn write_artifact(&self, source: &Path, pages: &PageMap) -> Result<ScratchArtifact> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let path = self
            .scratch_dir
            .join(format!("{}-{}.json", stem, Uuid::new_v4().simple()));

        let mut payload = serde_json::Map::new();
        payload.insert(stem, serde_json::to_value(pages)?);
        tokio::fs::write(&path, serde_json::to_vec(&payload)?).await?;

        Ok(ScratchArtifact::new(path))
    }
}

/// Keys each page by its 1-based number and records the detected printed page number.
pub fn build_page_map(pages: Vec<(u32, String)>) -> PageMap {
    pages
        .into_iter()
        .map(|(number, text)| {
            let printed = detect_printed_page_number(&text);
            (number.to_string(), PageContent::new(text, printed))
        })
        .collect()
}

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    async fn extract(&self, document_path: &Path) -> Result<Extraction> {
        let path = document_path.to_path_buf();
        let raw_pages = tokio::task::spawn_blocking(move || {
            Validator::validate_pdf_extension(&path)?;
            Validator::validate_file_path(&path)?;
            Self::extract_pages_blocking(&path)
        })
            .await
            .map_err(|e| PipelineError::Extraction {
                path: document_path.to_path_buf(),
                message: format!("extraction task failed: {}", e),
            })??;

        let pages = build_page_map(raw_pages);
        let artifact = self.write_artifact(document_path, &pages).await?;

        info!(
            "Extracted {} pages from {} (artifact {})",
            pages.len(),
            document_path.display(),
            artifact.path().display()
        );

        Ok(Extraction { pages, artifact })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_build_page_map_detects_printed_numbers() {
        let pages = build_page_map(vec![
            (1, "COVER PAGE\nAcme Ltd".to_string()),
            (2, "Definitions\n\n1".to_string()),
            (12, "Risk factors\niv".to_string()),
        ]);

        assert_eq!(pages.len(), 3);
        assert_eq!(pages["1"].page_number_printed, "");
        assert_eq!(pages["2"].page_number_printed, "1");
        assert_eq!(pages["12"].page_number_printed, "iv");
        assert!(pages["1"].content.contains("Acme Ltd"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_an_extraction_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let extractor = PdfExtractor::new(dir.path().join("scratch"));
        let result = extractor.extract(&path).await;

        assert!(matches!(result, Err(PipelineError::Extraction { .. })));
        assert!(!dir.path().join("scratch").exists());
    }

    #[tokio::test]
    async fn test_non_pdf_extension_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"text").unwrap();

        let extractor = PdfExtractor::new(dir.path().join("scratch"));
        assert!(matches!(
            extractor.extract(&path).await,
            Err(PipelineError::Validation(_))
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_missing_document_is_validation_error() {
        let dir = tempdir().unwrap();
        let extractor = PdfExtractor::new(dir.path().join("scratch"));

        let result = extractor.extract(&dir.path().join("absent.pdf")).await;
        assert!(matches!(result, Err(PipelineError::Validation(_))));
        assert!(!dir.path().join("scratch").exists());
    }

    #[tokio::test]
    async fn test_artifact_keyed_by_document_stem() {
        let dir = tempdir().unwrap();
        let extractor = PdfExtractor::new(dir.path());
        let pages = build_page_map(vec![(1, "hello".to_string())]);

        let artifact = extractor
            .write_artifact(Path::new("/uploads/acme.pdf"), &pages)
            .await
            .unwrap();

        let raw = std::fs::read_to_string(artifact.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["acme"]["1"]["content"], "hello");
        assert!(artifact.remove().await.unwrap());
    }
}
