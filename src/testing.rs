// file: src/testing.rs
// description: in-memory collaborators for pipeline tests
// reference: internal test support

use crate::ai::{ChecklistEvaluator, IdentityExtractor};
use crate::error::{PipelineError, Result};
use crate::extractor::{DocumentExtractor, Extraction, ScratchArtifact};
use crate::index::{IndexItem, VectorIndex};
use crate::models::{
    CandidateIdentity, ChecklistAnswer, ChecklistDefinition, ChecklistItem, ChecklistRow, Company,
    IndexHit, Page, PageContent, PageMap, Report,
};
use crate::store::RecordStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

pub fn checklist_of(rows: usize) -> ChecklistDefinition {
    ChecklistDefinition {
        name: "ipo_notes".to_string(),
        rows: (0..rows)
            .map(|i| ChecklistItem {
                topic: format!("Topic {}", i),
                section: "General".to_string(),
                prompt: format!("Question {}?", i),
            })
            .collect(),
    }
}

pub fn sample_pages(count: u32) -> PageMap {
    let mut pages: PageMap = (1..=count)
        .map(|n| {
            let printed = if n <= 2 { String::new() } else { (n - 2).to_string() };
            (n.to_string(), PageContent::new(format!("Page {} text", n), printed))
        })
        .collect();
    pages.insert("metadata".to_string(), PageContent::new("{}", ""));
    pages
}

/// Serves a fixed page map and writes a real artifact file per call.
pub struct FakeExtractor {
    scratch_dir: PathBuf,
    pages: PageMap,
    calls: AtomicUsize,
    last_artifact: Mutex<Option<PathBuf>>,
}

impl FakeExtractor {
    pub fn new(scratch_dir: &Path, pages: PageMap) -> Self {
        Self {
            scratch_dir: scratch_dir.to_path_buf(),
            pages,
            calls: AtomicUsize::new(0),
            last_artifact: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_artifact(&self) -> Option<PathBuf> {
        self.last_artifact.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentExtractor for FakeExtractor {
    async fn extract(&self, _document_path: &Path) -> Result<Extraction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let path = self.scratch_dir.join(format!("{}.json", Uuid::new_v4().simple()));
        tokio::fs::write(&path, serde_json::to_vec(&self.pages)?).await?;
        *self.last_artifact.lock().unwrap() = Some(path.clone());

        Ok(Extraction {
            pages: self.pages.clone(),
            artifact: ScratchArtifact::new(path),
        })
    }
}

pub struct FakeIdentityExtractor {
    candidate: CandidateIdentity,
}

impl FakeIdentityExtractor {
    pub fn acme() -> Self {
        Self::returning(Some("Acme Fintech Limited"), Some("U72900MH2010PLC123456"))
    }

    pub fn returning(name: Option<&str>, identifier: Option<&str>) -> Self {
        Self {
            candidate: CandidateIdentity {
                name: name.map(str::to_string),
                corporate_identity_number: identifier.map(str::to_string),
                website: Some("https://acme.example".to_string()),
            },
        }
    }
}

#[async_trait]
impl IdentityExtractor for FakeIdentityExtractor {
    async fn extract_identity(&self, _leading_text: &str) -> Result<CandidateIdentity> {
        Ok(self.candidate.clone())
    }
}

#[derive(Default)]
pub struct MemoryIndex {
    indexes: Mutex<HashMap<String, Vec<IndexItem>>>,
    upserts: AtomicUsize,
    fail_upserts: bool,
}

impl MemoryIndex {
    pub fn failing_upserts() -> Self {
        Self {
            fail_upserts: true,
            ..Self::default()
        }
    }

    pub fn items(&self, index_name: &str) -> Vec<IndexItem> {
        self.indexes
            .lock()
            .unwrap()
            .get(index_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.indexes.lock().unwrap().keys().cloned().collect()
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn exists(&self, index_name: &str) -> Result<bool> {
        Ok(self.indexes.lock().unwrap().contains_key(index_name))
    }

    async fn upsert(&self, index_name: &str, items: Vec<IndexItem>) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts {
            return Err(PipelineError::Ai("embedding service unavailable".to_string()));
        }
        let mut indexes = self.indexes.lock().unwrap();
        let entry = indexes.entry(index_name.to_string()).or_default();
        entry.retain(|existing| !items.iter().any(|item| item.id == existing.id));
        entry.extend(items);
        Ok(())
    }

    async fn search(
        &self,
        index_name: &str,
        query: &str,
        company_id: &str,
        limit: usize,
    ) -> Result<Vec<IndexHit>> {
        let indexes = self.indexes.lock().unwrap();
        let items = indexes.get(index_name).ok_or_else(|| {
            PipelineError::Indexing(format!("Index {} does not exist", index_name))
        })?;

        let query = query.to_lowercase();
        Ok(items
            .iter()
            .filter(|item| item.metadata.company_id == company_id)
            .map(|item| IndexHit {
                id: item.id.clone(),
                company_id: item.metadata.company_id.clone(),
                page_number_pdf: item.metadata.page_number_pdf,
                page_number_printed: item.metadata.page_number_printed,
                text: item.text.clone(),
                score: if item.text.to_lowercase().contains(&query) { 1.0 } else { 0.0 },
                distance: None,
            })
            .take(limit)
            .collect())
    }

    async fn delete(&self, index_name: &str) -> Result<bool> {
        Ok(self.indexes.lock().unwrap().remove(index_name).is_some())
    }
}

enum EvaluatorMode {
    AnswerAll,
    Slow(Duration),
    Fixed(Vec<ChecklistAnswer>),
    Fail,
}

pub struct FakeEvaluator {
    mode: EvaluatorMode,
    calls: AtomicUsize,
}

impl FakeEvaluator {
    /// Answers every row of whatever checklist it is given.
    pub fn answering() -> Self {
        Self {
            mode: EvaluatorMode::AnswerAll,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_answers(answers: Vec<ChecklistAnswer>) -> Self {
        Self {
            mode: EvaluatorMode::Fixed(answers),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answers every row after a delay.
    pub fn slow(delay: Duration) -> Self {
        Self {
            mode: EvaluatorMode::Slow(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: EvaluatorMode::Fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChecklistEvaluator for FakeEvaluator {
    async fn evaluate(
        &self,
        checklist: &ChecklistDefinition,
        _index_name: &str,
        _company_id: &str,
    ) -> Result<Vec<ChecklistAnswer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            EvaluatorMode::AnswerAll => Ok(answer_all(checklist)),
            EvaluatorMode::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(answer_all(checklist))
            }
            EvaluatorMode::Fixed(answers) => Ok(answers.clone()),
            EvaluatorMode::Fail => Err(PipelineError::Ai("model unavailable".to_string())),
        }
    }
}

fn answer_all(checklist: &ChecklistDefinition) -> Vec<ChecklistAnswer> {
    (0..checklist.len() as u32)
        .map(|i| ChecklistAnswer {
            row_index: i,
            answer: format!("Answer {}", i),
            citations: vec![format!("PDF page {}", i + 1)],
            commentary: String::new(),
        })
        .collect()
}

/// Record store kept in memory, with optional injected page write failures.
#[derive(Default)]
pub struct MemoryStore {
    companies: Mutex<BTreeMap<String, Company>>,
    pages: Mutex<BTreeMap<(String, u32), Page>>,
    rows: Mutex<BTreeMap<(String, String, u32), ChecklistRow>>,
    reports: Mutex<BTreeMap<String, Report>>,
    failing_pages: HashSet<u32>,
    page_attempts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_pages(pages: &[u32]) -> Self {
        Self {
            failing_pages: pages.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn page_attempts(&self) -> usize {
        self.page_attempts.load(Ordering::SeqCst)
    }

    pub fn total_pages(&self) -> usize {
        self.pages.lock().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_company(&self, company: &Company) -> Result<()> {
        let mut companies = self.companies.lock().unwrap();
        if companies
            .values()
            .any(|c| c.corporate_identity_number == company.corporate_identity_number)
        {
            return Err(PipelineError::DuplicateIdentifier(
                company.corporate_identity_number.clone(),
            ));
        }
        companies.insert(company.id.clone(), company.clone());
        Ok(())
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        Ok(self.companies.lock().unwrap().get(id).cloned())
    }

    async fn find_company_by_identifier(&self, identifier: &str) -> Result<Option<Company>> {
        Ok(self
            .companies
            .lock()
            .unwrap()
            .values()
            .find(|c| c.corporate_identity_number == identifier)
            .cloned())
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let mut companies: Vec<Company> =
            self.companies.lock().unwrap().values().cloned().collect();
        companies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(companies)
    }

    async fn delete_company(&self, id: &str) -> Result<bool> {
        Ok(self.companies.lock().unwrap().remove(id).is_some())
    }

    async fn insert_page(&self, page: &Page) -> Result<()> {
        self.page_attempts.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.failing_pages.contains(&page.page_number_pdf) {
            return Err(PipelineError::Store(format!(
                "disk full writing page {}",
                page.page_number_pdf
            )));
        }
        self.pages.lock().unwrap().insert(
            (page.company_id.clone(), page.page_number_pdf),
            page.clone(),
        );
        Ok(())
    }

    async fn count_pages(&self, company_id: &str) -> Result<usize> {
        Ok(self
            .pages
            .lock()
            .unwrap()
            .keys()
            .filter(|(cid, _)| cid == company_id)
            .count())
    }

    async fn list_pages(&self, company_id: &str) -> Result<Vec<Page>> {
        Ok(self
            .pages
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn delete_pages(&self, company_id: &str) -> Result<usize> {
        let mut pages = self.pages.lock().unwrap();
        let before = pages.len();
        pages.retain(|(cid, _), _| cid != company_id);
        Ok(before - pages.len())
    }

    async fn upsert_checklist_row(&self, row: &ChecklistRow) -> Result<()> {
        self.rows.lock().unwrap().insert(
            (row.company_id.clone(), row.checklist_name.clone(), row.row_index),
            row.clone(),
        );
        Ok(())
    }

    async fn count_checklist_rows(&self, company_id: &str, checklist_name: &str) -> Result<usize> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(cid, name, _)| cid == company_id && name == checklist_name)
            .count())
    }

    async fn list_checklist_rows(&self, company_id: &str) -> Result<Vec<ChecklistRow>> {
        let mut rows: Vec<ChecklistRow> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.company_id == company_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.row_index);
        Ok(rows)
    }

    async fn delete_checklist_rows(&self, company_id: &str) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(cid, _, _), _| cid != company_id);
        Ok(before - rows.len())
    }

    async fn upsert_report(&self, report: &Report) -> Result<()> {
        self.reports
            .lock()
            .unwrap()
            .insert(report.company_id.clone(), report.clone());
        Ok(())
    }

    async fn get_report(&self, company_id: &str) -> Result<Option<Report>> {
        Ok(self.reports.lock().unwrap().get(company_id).cloned())
    }

    async fn delete_report(&self, company_id: &str) -> Result<bool> {
        Ok(self.reports.lock().unwrap().remove(company_id).is_some())
    }
}
