// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod checklist;
pub mod company;
pub mod page;
pub mod report;
pub mod search_result;

pub use checklist::{ChecklistAnswer, ChecklistDefinition, ChecklistItem, ChecklistRow};
pub use company::{CandidateIdentity, Company, CompanyIdentity, CompanyStatus, CompanySummary};
pub use page::{Page, PageContent, PageMap, numbered_pages};
pub use report::Report;
pub use search_result::IndexHit;
