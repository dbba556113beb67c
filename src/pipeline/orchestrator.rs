// file: src/pipeline/orchestrator.rs
// description: sequences ingestion and regeneration runs with progress, rollback and cleanup
// reference: orchestrates asynchronous ingestion workflow

use crate::ai::{
    AiClient, ChecklistEvaluator, IdentityExtractor, LlmChecklistEvaluator, LlmIdentityExtractor,
};
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::extractor::{DocumentExtractor, PdfExtractor, ScratchArtifact};
use crate::index::{LanceIndex, VectorIndex};
use crate::models::{ChecklistDefinition, Company, CompanySummary, PageMap};
use crate::parser::ChecklistParser;
use crate::pipeline::checklist::ChecklistRunner;
use crate::pipeline::events::{PipelineEvent, ProgressSender, ProgressStream, progress_channel};
use crate::pipeline::identity::{IdentityResolver, ResolvedDocument};
use crate::pipeline::indexer::Indexer;
use crate::pipeline::pages::PagePersister;
use crate::pipeline::report::ReportSynthesizer;
use crate::pipeline::state::{CompanyOrigin, Flow, Stage, advance};
use crate::store::{FsStore, RecordStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub const COMPANY_NOT_FOUND_MESSAGE: &str = "Company not found.";

/// External collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn DocumentExtractor>,
    pub identity_extractor: Arc<dyn IdentityExtractor>,
    pub index: Arc<dyn VectorIndex>,
    pub evaluator: Arc<dyn ChecklistEvaluator>,
    pub store: Arc<dyn RecordStore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub target: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record<T>(&mut self, target: impl Into<String>, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let failure = CleanupFailure {
                    target: target.into(),
                    message: e.to_string(),
                };
                warn!("Cleanup of {} failed: {}", failure.target, failure.message);
                self.failures.push(failure);
                None
            }
        }
    }
}

/// How a run ended, for callers that await the task rather than the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub final_stage: Stage,
    pub company_id: Option<String>,
    pub cleanup: CleanupReport,
}

struct RunContext {
    flow: Flow,
    stage: Stage,
    origin: CompanyOrigin,
    company: Option<Company>,
    pages: PageMap,
    artifact: Option<ScratchArtifact>,
    markdown: Option<String>,
    owns_index: bool,
}

impl RunContext {
    fn new(flow: Flow) -> Self {
        Self {
            flow,
            stage: Stage::Idle,
            origin: CompanyOrigin::Existing,
            company: None,
            pages: PageMap::new(),
            artifact: None,
            markdown: None,
            owns_index: false,
        }
    }

    fn company(&self) -> Result<&Company> {
        self.company.as_ref().ok_or_else(|| {
            PipelineError::Validation(format!("no company resolved before {}", self.stage))
        })
    }

    /// The company this run created, which a failure must roll back.
    fn created_company(&self) -> Option<&Company> {
        match (self.flow, self.origin) {
            (Flow::FullIngestion, CompanyOrigin::Created) => self.company.as_ref(),
            _ => None,
        }
    }
}

struct Completion {
    company_id: String,
    markdown: String,
    message: &'static str,
}

pub struct PipelineOrchestrator {
    store: Arc<dyn RecordStore>,
    index: Arc<dyn VectorIndex>,
    resolver: IdentityResolver,
    page_persister: PagePersister,
    indexer: Indexer,
    checklist_runner: ChecklistRunner,
    synthesizer: ReportSynthesizer,
    checklist: ChecklistDefinition,
    index_prefix: String,
    consumer_timeout: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        config: &Config,
        collaborators: Collaborators,
        checklist: ChecklistDefinition,
    ) -> Self {
        let Collaborators {
            extractor,
            identity_extractor,
            index,
            evaluator,
            store,
        } = collaborators;

        Self {
            resolver: IdentityResolver::new(
                extractor,
                identity_extractor,
                config.pipeline.identity_window_pages,
            ),
            page_persister: PagePersister::new(store.clone(), config.pipeline.page_writers),
            indexer: Indexer::new(index.clone()),
            checklist_runner: ChecklistRunner::new(store.clone(), evaluator),
            synthesizer: ReportSynthesizer::new(store.clone()),
            store,
            index,
            checklist,
            index_prefix: config.index.name_prefix.clone(),
            consumer_timeout: config.consumer_timeout(),
        }
    }

    /// Wires the shipped PDF, OpenAI-compatible, LanceDB and filesystem implementations.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate_environment()?;

        let ai = AiClient::new(&config.ai)?;
        let index: Arc<dyn VectorIndex> =
            Arc::new(LanceIndex::connect(&config.index, ai.clone()).await?);
        let store: Arc<dyn RecordStore> = Arc::new(FsStore::open(config.store.root.clone()).await?);
        let checklist = ChecklistParser::new().load(&config.checklist.path)?;

        let collaborators = Collaborators {
            extractor: Arc::new(PdfExtractor::new(config.pipeline.scratch_dir.clone())),
            identity_extractor: Arc::new(LlmIdentityExtractor::new(ai.clone())),
            evaluator: Arc::new(LlmChecklistEvaluator::new(
                ai,
                index.clone(),
                config.pipeline.retrieval_top_k,
            )),
            index,
            store,
        };

        Ok(Self::new(config, collaborators, checklist))
    }

    /// Runs a full ingestion in a background task and returns its progress stream.
    pub fn spawn_full_pipeline(
        self: &Arc<Self>,
        document_path: PathBuf,
    ) -> (ProgressStream, JoinHandle<RunSummary>) {
        let (sender, stream) = progress_channel(self.consumer_timeout);
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move {
            orchestrator
                .run_full_pipeline(&document_path, &sender)
                .await
        });
        (stream, task)
    }

    /// Runs a regeneration in a background task and returns its progress stream.
    pub fn spawn_rerun_pipeline(
        self: &Arc<Self>,
        company_id: String,
    ) -> (ProgressStream, JoinHandle<RunSummary>) {
        let (sender, stream) = progress_channel(self.consumer_timeout);
        let orchestrator = Arc::clone(self);
        let task =
            tokio::spawn(async move { orchestrator.rerun_pipeline(&company_id, &sender).await });
        (stream, task)
    }

    pub async fn run_full_pipeline(
        &self,
        document_path: &Path,
        progress: &ProgressSender,
    ) -> RunSummary {
        info!("Starting ingestion of {}", document_path.display());
        let mut ctx = RunContext::new(Flow::FullIngestion);
        ctx.origin = CompanyOrigin::Created;

        let outcome = self.drive(&mut ctx, Some(document_path), progress).await;
        self.finish(ctx, outcome, progress).await
    }

    pub async fn rerun_pipeline(&self, company_id: &str, progress: &ProgressSender) -> RunSummary {
        info!("Starting regeneration for company {}", company_id);
        let mut ctx = RunContext::new(Flow::Regeneration);

        let outcome = match self.store.get_company(company_id).await {
            Ok(Some(company)) => {
                ctx.company = Some(company);
                self.drive(&mut ctx, None, progress).await
            }
            Ok(None) => Err(PipelineError::company_not_found(company_id)),
            Err(e) => Err(e),
        };
        self.finish(ctx, outcome, progress).await
    }

    /// Steps the state machine until a terminal stage, doing each stage's work after its event.
    async fn drive(
        &self,
        ctx: &mut RunContext,
        document_path: Option<&Path>,
        progress: &ProgressSender,
    ) -> Result<Completion> {
        loop {
            let transition = advance(ctx.flow, ctx.stage, ctx.origin);
            ctx.stage = transition.next;
            if let Some(update) = transition.update {
                progress.stage(update);
            }

            match ctx.stage {
                Stage::Extracting => {
                    let path = document_path.ok_or_else(|| {
                        PipelineError::Validation("no document to extract".to_string())
                    })?;
                    let resolved = self.resolver.resolve(path).await?;
                    ctx.artifact = Some(resolved.artifact.clone());
                    let (company, origin) = self.get_or_create_company(&resolved, path).await?;
                    ctx.origin = origin;
                    ctx.company = Some(company);
                    ctx.pages = resolved.pages;
                }
                Stage::PersistingPages => {
                    self.page_persister
                        .persist(ctx.company()?, &ctx.pages)
                        .await?;
                }
                Stage::Indexing => {
                    let company = ctx.company()?;
                    let index_name = company.index_name(&self.index_prefix);
                    let outcome = self.indexer.index(company, &ctx.pages, &index_name).await;
                    // An index found already in place belongs to whoever built it.
                    ctx.owns_index = !matches!(outcome, Ok(false));
                    outcome?;
                }
                Stage::EvaluatingChecklist => {
                    let company = ctx.company()?;
                    if ctx.flow == Flow::Regeneration {
                        let removed = self.store.delete_checklist_rows(&company.id).await?;
                        info!("Deleted {} existing checklist rows for {}", removed, company.name);
                    }
                    let index_name = company.index_name(&self.index_prefix);
                    self.checklist_runner
                        .run(company, &index_name, &self.checklist)
                        .await?;
                }
                Stage::Synthesizing => {
                    ctx.markdown = Some(self.synthesizer.synthesize(ctx.company()?).await?);
                }
                Stage::Completed => {
                    let message = transition.update.map(|u| u.message).unwrap_or_default();
                    return Ok(Completion {
                        company_id: ctx.company()?.id.clone(),
                        markdown: ctx.markdown.take().unwrap_or_default(),
                        message,
                    });
                }
                Stage::Idle | Stage::Failed => {
                    return Err(PipelineError::Validation(format!(
                        "pipeline cannot continue from {}",
                        ctx.stage
                    )));
                }
            }
        }
    }

    async fn get_or_create_company(
        &self,
        resolved: &ResolvedDocument,
        document_path: &Path,
    ) -> Result<(Company, CompanyOrigin)> {
        let identifier = &resolved.identity.corporate_identity_number;
        if let Some(existing) = self.store.find_company_by_identifier(identifier).await? {
            info!(
                "Company {} already exists, skipping to report synthesis",
                existing.name
            );
            return Ok((existing, CompanyOrigin::Existing));
        }

        let company = Company::new(&resolved.identity, document_path.display().to_string());
        self.store.create_company(&company).await?;
        info!("New company created: {}", company.name);
        Ok((company, CompanyOrigin::Created))
    }

    /// Emits the terminal event, compensates on failure, removes the artifact, then ends the stream.
    async fn finish(
        &self,
        mut ctx: RunContext,
        outcome: Result<Completion>,
        progress: &ProgressSender,
    ) -> RunSummary {
        let mut cleanup = CleanupReport::default();

        match outcome {
            Ok(completion) => {
                info!("Pipeline completed for company {}", completion.company_id);
                progress.send(PipelineEvent::Completed {
                    progress: 100,
                    message: completion.message.to_string(),
                    company_id: completion.company_id,
                    markdown: completion.markdown,
                });
            }
            Err(e) => {
                error!("Pipeline failed during {}: {}", ctx.stage, e);
                ctx.stage = ctx.stage.fail();

                if let Some(company) = ctx.created_company() {
                    warn!("Rolling back records created for {}", company.name);
                    cleanup = self.purge_company(company, ctx.owns_index).await;
                }

                let message = if ctx.flow == Flow::Regeneration && e.is_not_found() {
                    COMPANY_NOT_FOUND_MESSAGE.to_string()
                } else {
                    e.to_string()
                };
                progress.send(PipelineEvent::error(message));
            }
        }

        if let Some(artifact) = &ctx.artifact {
            let target = format!("artifact {}", artifact.path().display());
            cleanup.record(target, artifact.remove().await);
        }

        progress.end();

        let company_id = match ctx.created_company() {
            Some(_) if ctx.stage == Stage::Failed => None,
            _ => ctx.company.as_ref().map(|c| c.id.clone()),
        };

        RunSummary {
            final_stage: ctx.stage,
            company_id,
            cleanup,
        }
    }

    /// Removes every record for a company. Absent records count as removed.
    ///
    /// The index is dropped only when `drop_index` is set and no other company
    /// resolves to the same index name.
    async fn purge_company(&self, company: &Company, drop_index: bool) -> CleanupReport {
        let mut report = CleanupReport::default();
        let id = &company.id;
        let index_name = company.index_name(&self.index_prefix);
        let index_target = format!("index {}", index_name);

        report.record("pages", self.store.delete_pages(id).await);
        report.record("checklist rows", self.store.delete_checklist_rows(id).await);
        report.record("report", self.store.delete_report(id).await);

        if drop_index {
            match self.index_shared_with_others(company, &index_name).await {
                Ok(true) => info!("Keeping index {} still used by another company", index_name),
                Ok(false) => {
                    report.record(index_target, self.index.delete(&index_name).await);
                }
                Err(e) => {
                    report.record(index_target, Err::<(), _>(e));
                }
            }
        }

        report.record("company", self.store.delete_company(id).await);

        report
    }

    async fn index_shared_with_others(&self, company: &Company, index_name: &str) -> Result<bool> {
        Ok(self
            .store
            .list_companies()
            .await?
            .iter()
            .any(|other| other.id != company.id && other.index_name(&self.index_prefix) == index_name))
    }

    pub async fn get_company(&self, company_id: &str) -> Result<Option<Company>> {
        self.store.get_company(company_id).await
    }

    pub async fn list_companies_with_status(&self) -> Result<Vec<CompanySummary>> {
        let companies = self.store.list_companies().await?;
        let mut summaries = Vec::with_capacity(companies.len());
        for company in &companies {
            let has_markdown = self.store.get_report(&company.id).await?.is_some();
            summaries.push(CompanySummary::from_company(company, has_markdown));
        }
        Ok(summaries)
    }

    pub async fn get_final_markdown(&self, company_id: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get_report(company_id)
            .await?
            .map(|report| report.markdown))
    }

    /// Deletes a company with all of its data. Returns `false` when it does not exist.
    ///
    /// A failure to drop the index is logged and tolerated; any record deletion
    /// failure is returned as `PipelineError::Cleanup`.
    pub async fn delete_company_and_all_data(&self, company_id: &str) -> Result<bool> {
        let Some(company) = self.store.get_company(company_id).await? else {
            warn!("Attempted to delete non-existent company {}", company_id);
            return Ok(false);
        };

        let report = self.purge_company(&company, true).await;
        let record_failures: Vec<String> = report
            .failures
            .iter()
            .filter(|f| !f.target.starts_with("index "))
            .map(|f| format!("{}: {}", f.target, f.message))
            .collect();

        if !record_failures.is_empty() {
            return Err(PipelineError::Cleanup(record_failures.join("; ")));
        }

        info!("Deleted company {} and all related data", company_id);
        Ok(true)
    }
}
