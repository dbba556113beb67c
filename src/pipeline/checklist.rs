// file: src/pipeline/checklist.rs
// description: runs the checklist evaluator and stores one row per checklist entry
// reference: internal pipeline stage

use crate::ai::ChecklistEvaluator;
use crate::error::{PipelineError, Result};
use crate::models::{ChecklistDefinition, ChecklistRow, Company};
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ChecklistRunner {
    store: Arc<dyn RecordStore>,
    evaluator: Arc<dyn ChecklistEvaluator>,
}

impl ChecklistRunner {
    pub fn new(store: Arc<dyn RecordStore>, evaluator: Arc<dyn ChecklistEvaluator>) -> Self {
        Self { store, evaluator }
    }

    /// Returns the number of rows written, or 0 when rows for this checklist already exist.
    pub async fn run(
        &self,
        company: &Company,
        index_name: &str,
        checklist: &ChecklistDefinition,
    ) -> Result<usize> {
        let existing = self
            .store
            .count_checklist_rows(&company.id, &checklist.name)
            .await?;
        if existing > 0 {
            info!(
                "{} already has {} {} rows, skipping evaluation",
                company.name, existing, checklist.name
            );
            return Ok(0);
        }

        let answers = self
            .evaluator
            .evaluate(checklist, index_name, &company.id)
            .await
            .map_err(|e| match e {
                PipelineError::ChecklistEvaluation(_) => e,
                other => PipelineError::ChecklistEvaluation(other.to_string()),
            })?;

        if answers.is_empty() && !checklist.is_empty() {
            return Err(PipelineError::ChecklistEvaluation(format!(
                "evaluator returned no answers for {} rows",
                checklist.len()
            )));
        }

        let mut written = 0;
        for answer in answers {
            let item = checklist.rows.get(answer.row_index as usize).ok_or_else(|| {
                PipelineError::ChecklistEvaluation(format!(
                    "answer ordinal {} outside checklist of {} rows",
                    answer.row_index,
                    checklist.len()
                ))
            })?;

            let row = ChecklistRow::from_answer(&company.id, &checklist.name, item, answer);
            self.store.upsert_checklist_row(&row).await?;
            debug!("Stored checklist row {} for {}", row.row_index, company.name);
            written += 1;
        }

        info!("Stored {} checklist rows for {}", written, company.name);
        Ok(written)
    }
}
