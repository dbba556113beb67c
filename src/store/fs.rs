// file: src/store/fs.rs
// description: filesystem record store keeping one JSON document per record
// reference: Production-grade metadata persistence

use crate::error::{PipelineError, Result};
use crate::models::{ChecklistRow, Company, Page, Report};
use crate::store::RecordStore;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPANIES: &str = "companies";
const PAGES: &str = "pages";
const CHECKLIST_ROWS: &str = "checklist_rows";
const REPORTS: &str = "reports";
const IDENTIFIER_CLAIMS: &str = "identifier_claims";

/// A claim whose company record never appeared is treated as abandoned after this long.
const STALE_CLAIM_AFTER: Duration = Duration::from_secs(60);

/// Record store laid out as collection directories under `root`:
///
/// ```text
/// companies/<company_id>.json
/// pages/<company_id>/<page_number_pdf>.json
/// checklist_rows/<company_id>/<checklist>/<row_index>.json
/// reports/<company_id>.json
/// identifier_claims/<sha256 of identifier>.claim
/// ```
///
/// Every write goes to a temporary file first and is renamed into place.
/// A company is only written after its identifier claim file has been
/// created exclusively, so stores in separate processes sharing one root
/// still reject duplicate identifiers.
pub struct FsStore {
    root: PathBuf,
    company_lock: Mutex<()>,
    stale_claim_after: Duration,
}

impl FsStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        for collection in [COMPANIES, PAGES, CHECKLIST_ROWS, REPORTS, IDENTIFIER_CLAIMS] {
            fs::create_dir_all(root.join(collection)).await.map_err(|e| {
                PipelineError::Store(format!(
                    "Failed to create collection directory {}: {}",
                    root.join(collection).display(),
                    e
                ))
            })?;
        }

        info!("Opened record store at {}", root.display());
        Ok(Self {
            root,
            company_lock: Mutex::new(()),
            stale_claim_after: STALE_CLAIM_AFTER,
        })
    }

    fn company_path(&self, id: &str) -> PathBuf {
        self.root.join(COMPANIES).join(format!("{}.json", id))
    }

    fn pages_dir(&self, company_id: &str) -> PathBuf {
        self.root.join(PAGES).join(company_id)
    }

    fn rows_dir(&self, company_id: &str) -> PathBuf {
        self.root.join(CHECKLIST_ROWS).join(company_id)
    }

    fn report_path(&self, company_id: &str) -> PathBuf {
        self.root.join(REPORTS).join(format!("{}.json", company_id))
    }

    fn claim_path(&self, identifier: &str) -> PathBuf {
        let digest = Sha256::digest(identifier.as_bytes());
        self.root
            .join(IDENTIFIER_CLAIMS)
            .join(format!("{:x}.claim", digest))
    }

    /// Exclusively creates the claim file for `identifier`, recording the owning company id.
    async fn claim_identifier(&self, identifier: &str, company_id: &str) -> Result<()> {
        let path = self.claim_path(identifier);

        for _ in 0..2 {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(company_id.as_bytes()).await {
                        let _ = fs::remove_file(&path).await;
                        return Err(PipelineError::Store(format!(
                            "Failed to write claim {}: {}",
                            path.display(),
                            e
                        )));
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !self.release_stale_claim(&path).await? {
                        break;
                    }
                }
                Err(e) => {
                    return Err(PipelineError::Store(format!(
                        "Failed to claim identifier {}: {}",
                        identifier, e
                    )));
                }
            }
        }

        Err(PipelineError::DuplicateIdentifier(identifier.to_string()))
    }

    /// Removes a claim whose company record is missing and which is older than
    /// `stale_claim_after`. Returns `true` when the claim was removed.
    async fn release_stale_claim(&self, path: &Path) -> Result<bool> {
        let owner = match fs::read_to_string(path).await {
            Ok(owner) => owner,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => {
                return Err(PipelineError::Store(format!(
                    "Failed to read claim {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let owner = owner.trim();
        if is_valid_key(owner) && fs::try_exists(self.company_path(owner)).await.unwrap_or(true) {
            return Ok(false);
        }

        let age = match fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified.elapsed().unwrap_or_default(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(_) => return Ok(false),
        };
        if age < self.stale_claim_after {
            return Ok(false);
        }

        warn!("Releasing abandoned identifier claim {}", path.display());
        remove_file_if_exists(path).await?;
        Ok(true)
    }

    /// Drops the claim for `identifier` when it belongs to `company_id`.
    async fn release_claim(&self, identifier: &str, company_id: &str) -> Result<()> {
        let path = self.claim_path(identifier);
        match fs::read_to_string(&path).await {
            Ok(owner) if owner.trim() == company_id => {
                remove_file_if_exists(&path).await?;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::Store(format!(
                "Failed to read claim {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Record keys become path components, so only a conservative alphabet is accepted.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn require_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(PipelineError::Validation(format!(
            "Invalid record key: {:?}",
            key
        )))
    }
}

fn checklist_dir_name(checklist_name: &str) -> String {
    checklist_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            PipelineError::Store(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    let contents = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));

    fs::write(&tmp, contents)
        .await
        .map_err(|e| PipelineError::Store(format!("Failed to write {}: {}", tmp.display(), e)))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(PipelineError::Store(format!(
            "Failed to replace {}: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PipelineError::Store(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Lists `*.json` record files directly under `dir`; a missing directory is empty.
async fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PipelineError::Store(format!(
                "Failed to list {}: {}",
                dir.display(),
                e
            )));
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::Store(format!("Failed to list {}: {}", dir.display(), e)))?
    {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(PipelineError::Store(format!(
                "Failed to list {}: {}",
                dir.display(),
                e
            )));
        }
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::Store(format!("Failed to list {}: {}", dir.display(), e)))?
    {
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

async fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PipelineError::Store(format!(
            "Failed to delete {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn remove_dir_counting(dir: &Path) -> Result<usize> {
    let mut removed = json_files(dir).await?.len();
    for sub in subdirectories(dir).await? {
        removed += json_files(&sub).await?.len();
    }

    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(removed),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(PipelineError::Store(format!(
            "Failed to delete {}: {}",
            dir.display(),
            e
        ))),
    }
}

#[async_trait]
impl RecordStore for FsStore {
    async fn create_company(&self, company: &Company) -> Result<()> {
        require_key(&company.id)?;

        let identifier = &company.corporate_identity_number;
        let _guard = self.company_lock.lock().await;

        if self.find_company_by_identifier(identifier).await?.is_some() {
            return Err(PipelineError::DuplicateIdentifier(identifier.clone()));
        }

        self.claim_identifier(identifier, &company.id).await?;

        if let Err(e) = write_json(&self.company_path(&company.id), company).await {
            let _ = self.release_claim(identifier, &company.id).await;
            return Err(e);
        }
        info!(
            "Created company {} ({})",
            company.name, company.corporate_identity_number
        );
        Ok(())
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        if !is_valid_key(id) {
            return Ok(None);
        }
        read_json(&self.company_path(id)).await
    }

    async fn find_company_by_identifier(&self, identifier: &str) -> Result<Option<Company>> {
        for path in json_files(&self.root.join(COMPANIES)).await? {
            if let Some(company) = read_json::<Company>(&path).await?
                && company.corporate_identity_number == identifier
            {
                return Ok(Some(company));
            }
        }
        Ok(None)
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let mut companies = Vec::new();
        for path in json_files(&self.root.join(COMPANIES)).await? {
            if let Some(company) = read_json::<Company>(&path).await? {
                companies.push(company);
            }
        }
        companies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(companies)
    }

    async fn delete_company(&self, id: &str) -> Result<bool> {
        if !is_valid_key(id) {
            return Ok(false);
        }

        let _guard = self.company_lock.lock().await;
        let path = self.company_path(id);
        let existing = read_json::<Company>(&path).await?;
        let removed = remove_file_if_exists(&path).await?;

        if let Some(company) = existing {
            self.release_claim(&company.corporate_identity_number, id)
                .await?;
        }
        Ok(removed)
    }

    async fn insert_page(&self, page: &Page) -> Result<()> {
        require_key(&page.company_id)?;
        let path = self
            .pages_dir(&page.company_id)
            .join(format!("{}.json", page.page_number_pdf));
        write_json(&path, page).await?;
        debug!(
            "Stored page {} for company {}",
            page.page_number_pdf, page.company_id
        );
        Ok(())
    }

    async fn count_pages(&self, company_id: &str) -> Result<usize> {
        if !is_valid_key(company_id) {
            return Ok(0);
        }
        Ok(json_files(&self.pages_dir(company_id)).await?.len())
    }

    async fn list_pages(&self, company_id: &str) -> Result<Vec<Page>> {
        if !is_valid_key(company_id) {
            return Ok(Vec::new());
        }
        let mut pages = Vec::new();
        for path in json_files(&self.pages_dir(company_id)).await? {
            if let Some(page) = read_json::<Page>(&path).await? {
                pages.push(page);
            }
        }
        pages.sort_by_key(|p| p.page_number_pdf);
        Ok(pages)
    }

    async fn delete_pages(&self, company_id: &str) -> Result<usize> {
        if !is_valid_key(company_id) {
            return Ok(0);
        }
        remove_dir_counting(&self.pages_dir(company_id)).await
    }

    async fn upsert_checklist_row(&self, row: &ChecklistRow) -> Result<()> {
        require_key(&row.company_id)?;
        let path = self
            .rows_dir(&row.company_id)
            .join(checklist_dir_name(&row.checklist_name))
            .join(format!("{}.json", row.row_index));
        write_json(&path, row).await
    }

    async fn count_checklist_rows(&self, company_id: &str, checklist_name: &str) -> Result<usize> {
        if !is_valid_key(company_id) {
            return Ok(0);
        }
        let dir = self
            .rows_dir(company_id)
            .join(checklist_dir_name(checklist_name));
        Ok(json_files(&dir).await?.len())
    }

    async fn list_checklist_rows(&self, company_id: &str) -> Result<Vec<ChecklistRow>> {
        if !is_valid_key(company_id) {
            return Ok(Vec::new());
        }
        let mut rows = Vec::new();
        for dir in subdirectories(&self.rows_dir(company_id)).await? {
            for path in json_files(&dir).await? {
                if let Some(row) = read_json::<ChecklistRow>(&path).await? {
                    rows.push(row);
                }
            }
        }
        rows.sort_by_key(|r| r.row_index);
        Ok(rows)
    }

    async fn delete_checklist_rows(&self, company_id: &str) -> Result<usize> {
        if !is_valid_key(company_id) {
            return Ok(0);
        }
        remove_dir_counting(&self.rows_dir(company_id)).await
    }

    async fn upsert_report(&self, report: &Report) -> Result<()> {
        require_key(&report.company_id)?;
        write_json(&self.report_path(&report.company_id), report).await?;
        debug!("Stored report for company {}", report.company_id);
        Ok(())
    }

    async fn get_report(&self, company_id: &str) -> Result<Option<Report>> {
        if !is_valid_key(company_id) {
            return Ok(None);
        }
        read_json(&self.report_path(company_id)).await
    }

    async fn delete_report(&self, company_id: &str) -> Result<bool> {
        if !is_valid_key(company_id) {
            return Ok(false);
        }
        remove_file_if_exists(&self.report_path(company_id)).await
    }
}
