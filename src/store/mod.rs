// file: src/store/mod.rs
// description: persistent record store contract for companies, pages, checklist rows, and reports
// reference: internal module structure

pub mod fs;

pub use fs::FsStore;

use crate::error::Result;
use crate::models::{ChecklistRow, Company, Page, Report};
use async_trait::async_trait;

/// CRUD over the four record collections the pipeline writes.
///
/// Implementations must reject a second company with an existing
/// `corporate_identity_number` with `PipelineError::DuplicateIdentifier`,
/// return checklist rows ordered by `row_index`, and replace a report in a
/// single write. Deleting records that do not exist is not an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_company(&self, company: &Company) -> Result<()>;
    async fn get_company(&self, id: &str) -> Result<Option<Company>>;
    async fn find_company_by_identifier(&self, identifier: &str) -> Result<Option<Company>>;
    async fn list_companies(&self) -> Result<Vec<Company>>;
    async fn delete_company(&self, id: &str) -> Result<bool>;

    async fn insert_page(&self, page: &Page) -> Result<()>;
    async fn count_pages(&self, company_id: &str) -> Result<usize>;
    async fn list_pages(&self, company_id: &str) -> Result<Vec<Page>>;
    async fn delete_pages(&self, company_id: &str) -> Result<usize>;

    async fn upsert_checklist_row(&self, row: &ChecklistRow) -> Result<()>;
    async fn count_checklist_rows(&self, company_id: &str, checklist_name: &str) -> Result<usize>;
    async fn list_checklist_rows(&self, company_id: &str) -> Result<Vec<ChecklistRow>>;
    async fn delete_checklist_rows(&self, company_id: &str) -> Result<usize>;

    async fn upsert_report(&self, report: &Report) -> Result<()>;
    async fn get_report(&self, company_id: &str) -> Result<Option<Report>>;
    async fn delete_report(&self, company_id: &str) -> Result<bool>;
}
