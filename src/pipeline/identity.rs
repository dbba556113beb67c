// file: src/pipeline/identity.rs
// description: resolves a document into a canonical company identity and its page map
// reference: internal pipeline stage

use crate::ai::IdentityExtractor;
use crate::error::{PipelineError, Result};
use crate::extractor::patterns::looks_like_cin;
use crate::extractor::{DocumentExtractor, ScratchArtifact};
use crate::models::{CompanyIdentity, PageMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub identity: CompanyIdentity,
    pub pages: PageMap,
    pub artifact: ScratchArtifact,
}

pub struct IdentityResolver {
    extractor: Arc<dyn DocumentExtractor>,
    identity_extractor: Arc<dyn IdentityExtractor>,
    window_pages: usize,
}

impl IdentityResolver {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        identity_extractor: Arc<dyn IdentityExtractor>,
        window_pages: usize,
    ) -> Self {
        Self {
            extractor,
            identity_extractor,
            window_pages,
        }
    }

    /// Extracts the document once and identifies the issuer from its leading pages.
    /// On identity failure the scratch artifact is removed before returning.
    pub async fn resolve(&self, document_path: &Path) -> Result<ResolvedDocument> {
        let extraction = self.extractor.extract(document_path).await?;
        let leading = leading_text(&extraction.pages, self.window_pages);

        match self.identify(&leading).await {
            Ok(identity) => {
                info!(
                    "Resolved {} as {} ({})",
                    document_path.display(),
                    identity.name,
                    identity.corporate_identity_number
                );
                Ok(ResolvedDocument {
                    identity,
                    pages: extraction.pages,
                    artifact: extraction.artifact,
                })
            }
            Err(e) => {
                if let Err(cleanup) = extraction.artifact.remove().await {
                    warn!("{}", cleanup);
                }
                Err(e)
            }
        }
    }

    async fn identify(&self, leading: &str) -> Result<CompanyIdentity> {
        let candidate = self
            .identity_extractor
            .extract_identity(leading)
            .await
            .map_err(|e| PipelineError::IdentityExtraction(e.to_string()))?;

        let identity = candidate.into_identity().ok_or_else(|| {
            PipelineError::IdentityExtraction(
                "company name or unique identifier missing from leading pages".to_string(),
            )
        })?;

        if !looks_like_cin(&identity.corporate_identity_number) {
            warn!(
                "Identifier {:?} for {} is not a well-formed CIN",
                identity.corporate_identity_number, identity.name
            );
        }
        Ok(identity)
    }
}

/// Newline-joined text of pages "1" through `window`; missing pages contribute nothing.
pub fn leading_text(pages: &PageMap, window: usize) -> String {
    (1..=window)
        .map(|n| {
            pages
                .get(&n.to_string())
                .map(|p| p.content.as_str())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
