// file: src/pipeline/report.rs
// description: assembles checklist rows into the final markdown note
// reference: internal pipeline stage

use crate::error::Result;
use crate::models::{ChecklistRow, Company, Report};
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::info;

pub struct ReportSynthesizer {
    store: Arc<dyn RecordStore>,
}

impl ReportSynthesizer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Renders the company's rows and replaces its stored report.
    pub async fn synthesize(&self, company: &Company) -> Result<String> {
        let rows = self.store.list_checklist_rows(&company.id).await?;
        let markdown = render_markdown(&company.name, &rows);

        self.store
            .upsert_report(&Report::new(&company.id, &company.name, markdown.clone()))
            .await?;

        info!(
            "Saved report for {} ({} rows, {} bytes)",
            company.name,
            rows.len(),
            markdown.len()
        );
        Ok(markdown)
    }
}

/// Rows are rendered in `row_index` order regardless of input order.
pub fn render_markdown(company_name: &str, rows: &[ChecklistRow]) -> String {
    let mut ordered: Vec<&ChecklistRow> = rows.iter().collect();
    ordered.sort_by_key(|row| row.row_index);

    let mut markdown = format!("# IPO Investment Note: {}\n\n", company_name);
    for row in ordered {
        let heading = if row.topic.trim().is_empty() {
            String::new()
        } else {
            format!("**{}**", row.topic)
        };
        let commentary = if row.commentary.trim().is_empty() {
            String::new()
        } else {
            format!(
                "<span style=\"font-size:10px;\"><i>AI Commentary : {}</i></span>",
                row.commentary
            )
        };
        markdown.push_str(&format!(
            "{}\n\n{}\n\n{}\n\n---\n\n",
            heading, row.answer, commentary
        ));
    }
    markdown
}
