// file: src/pipeline/indexer.rs
// description: builds the per-company semantic index from stored pages
// reference: internal pipeline stage

use crate::error::{PipelineError, Result};
use crate::index::{IndexItem, IndexMetadata, VectorIndex};
use crate::models::{Company, Page, PageMap, numbered_pages};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

pub struct Indexer {
    index: Arc<dyn VectorIndex>,
}

impl Indexer {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Upserts every numbered page. Returns `false` when the index already existed.
    pub async fn index(&self, company: &Company, pages: &PageMap, index_name: &str) -> Result<bool> {
        if self.index.exists(index_name).await.map_err(as_indexing)? {
            info!("Index {} already exists, skipping", index_name);
            return Ok(false);
        }

        let items = build_items(company, pages);
        let count = items.len();
        self.index
            .upsert(index_name, items)
            .await
            .map_err(as_indexing)?;

        info!("Indexed {} pages of {} into {}", count, company.name, index_name);
        Ok(true)
    }
}

fn as_indexing(error: PipelineError) -> PipelineError {
    match error {
        PipelineError::Indexing(_) => error,
        other => PipelineError::Indexing(other.to_string()),
    }
}

/// Stable item id for one page of one company.
pub fn item_id(company_id: &str, page_number_pdf: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company_id.as_bytes());
    hasher.update(b":");
    hasher.update(page_number_pdf.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn build_items(company: &Company, pages: &PageMap) -> Vec<IndexItem> {
    numbered_pages(pages)
        .into_iter()
        .map(|(number, content)| IndexItem {
            id: item_id(&company.id, number),
            text: content.content.clone(),
            metadata: IndexMetadata {
                company_id: company.id.clone(),
                company_name: company.name.clone(),
                page_number_pdf: number,
                page_number_printed: Page::parse_printed_number(&content.page_number_printed),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyIdentity, PageContent};
    use crate::testing::MemoryIndex;
    use pretty_assertions::assert_eq;

    fn company() -> Company {
        Company::new(
            &CompanyIdentity {
                name: "Acme".to_string(),
                corporate_identity_number: "U1".to_string(),
                website: None,
            },
            "acme.pdf",
        )
    }

    #[test]
    fn test_item_ids_are_deterministic_and_distinct() {
        assert_eq!(item_id("c1", 1), item_id("c1", 1));
        assert_ne!(item_id("c1", 1), item_id("c1", 2));
        assert_ne!(item_id("c1", 1), item_id("c2", 1));
        assert_eq!(item_id("c1", 1).len(), 64);
    }

    #[tokio::test]
    async fn test_index_once_then_skip() {
        let index = Arc::new(MemoryIndex::default());
        let indexer = Indexer::new(index.clone());
        let company = company();

        let mut pages = PageMap::new();
        pages.insert("1".to_string(), PageContent::new("cover", ""));
        pages.insert("2".to_string(), PageContent::new("business", "ii"));
        pages.insert("metadata".to_string(), PageContent::new("{}", ""));

        assert!(indexer.index(&company, &pages, "drhp_notes_ACME").await.unwrap());
        assert!(!indexer.index(&company, &pages, "drhp_notes_ACME").await.unwrap());

        let items = index.items("drhp_notes_ACME");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].metadata.page_number_printed, None);
        assert_eq!(index.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_an_indexing_error() {
        let index = Arc::new(MemoryIndex::failing_upserts());
        let indexer = Indexer::new(index);
        let result = indexer.index(&company(), &PageMap::new(), "idx").await;
        assert!(matches!(result, Err(PipelineError::Indexing(_))));
    }
}
