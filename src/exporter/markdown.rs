// file: src/exporter/markdown.rs
// description: writes stored reports to markdown files with an export manifest

use crate::error::{PipelineError, Result};
use crate::models::Company;
use crate::utils::Validator;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MANIFEST_FILE: &str = "export-manifest.json";

#[derive(Debug, Clone)]
pub struct ReportExporter {
    output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub exported_at: String,
    pub company_id: String,
    pub company_name: String,
    pub files: Vec<String>,
}

impl ReportExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `<company-name>.md` and replaces the manifest in the output directory.
    pub async fn export(&self, company: &Company, markdown: &str) -> Result<ExportManifest> {
        Validator::validate_content_not_empty(markdown).map_err(|_| {
            PipelineError::Validation(format!("report for {} is empty", company.name))
        })?;

        let file_name = format!("{}.md", Validator::sanitize_file_name(&company.name));
        let report_path = self.output_dir.join(&file_name);
        tokio::fs::write(&report_path, markdown).await?;

        let manifest = ExportManifest {
            exported_at: Utc::now().to_rfc3339(),
            company_id: company.id.clone(),
            company_name: company.name.clone(),
            files: vec![file_name],
        };
        tokio::fs::write(
            self.output_dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .await?;

        info!(
            "Exported report for {} to {}",
            company.name,
            report_path.display()
        );
        Ok(manifest)
    }
}
