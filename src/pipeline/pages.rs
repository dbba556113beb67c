// file: src/pipeline/pages.rs
// description: bounded-concurrency persistence of extracted pages
// reference: https://docs.rs/futures/latest/futures/stream/trait.StreamExt.html#method.buffer_unordered

use crate::error::{PipelineError, Result};
use crate::models::{Company, Page, PageMap, numbered_pages};
use crate::store::RecordStore;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PagePersister {
    store: Arc<dyn RecordStore>,
    writers: usize,
}

impl PagePersister {
    pub fn new(store: Arc<dyn RecordStore>, writers: usize) -> Self {
        Self {
            store,
            writers: writers.max(1),
        }
    }

    /// Stores every numbered page. Returns 0 without writing if the company already has pages.
    ///
    /// All writes run to completion before a failure is reported, so a rollback
    /// afterwards sees every page that made it to the store.
    pub async fn persist(&self, company: &Company, pages: &PageMap) -> Result<usize> {
        if self.store.count_pages(&company.id).await? > 0 {
            info!("Pages for {} already stored, skipping", company.name);
            return Ok(0);
        }

        let records: Vec<Page> = numbered_pages(pages)
            .into_iter()
            .map(|(number, content)| Page::from_content(&company.id, number, content))
            .collect();
        let total = records.len();

        let outcomes: Vec<(u32, Result<()>)> = stream::iter(records)
            .map(|page| {
                let store = self.store.clone();
                async move {
                    let result = store.insert_page(&page).await;
                    debug!("Stored page {} for {}", page.page_number_pdf, page.company_id);
                    (page.page_number_pdf, result)
                }
            })
            .buffer_unordered(self.writers)
            .collect()
            .await;

        let mut failures: Vec<(u32, PipelineError)> = outcomes
            .into_iter()
            .filter_map(|(number, result)| result.err().map(|e| (number, e)))
            .collect();

        if !failures.is_empty() {
            failures.sort_by_key(|(number, _)| *number);
            for (number, error) in &failures {
                warn!("Page {} of {} failed to persist: {}", number, company.name, error);
            }
            let (first_page, first_error) = &failures[0];
            return Err(PipelineError::PagePersist(format!(
                "{} of {} page writes failed (first: page {}: {})",
                failures.len(),
                total,
                first_page,
                first_error
            )));
        }

        info!("Stored {} pages for {}", total, company.name);
        Ok(total)
    }
}
