// file: src/parser/checklist.rs
// description: YAML checklist definition loading
// reference: https://docs.rs/yaml-rust

use crate::error::{PipelineError, Result};
use crate::models::{ChecklistDefinition, ChecklistItem};
use std::path::Path;
use tracing::info;
use yaml_rust::{Yaml, YamlLoader};

pub struct ChecklistParser;

impl ChecklistParser {
    pub fn new() -> Self {
        Self
    }

    /// Loads a definition file. The checklist name defaults to the file stem.
    pub fn load(&self, path: &Path) -> Result<ChecklistDefinition> {
        let file = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::ChecklistParse {
            file: file.clone(),
            message: e.to_string(),
        })?;

        let default_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "checklist".to_string());

        let definition = self.parse(&content, &file, &default_name)?;
        info!(
            "Loaded checklist {} with {} rows from {}",
            definition.name,
            definition.len(),
            file
        );
        Ok(definition)
    }

    pub fn parse(&self, content: &str, file: &str, default_name: &str) -> Result<ChecklistDefinition> {
        let parse_error = |message: String| PipelineError::ChecklistParse {
            file: file.to_string(),
            message,
        };

        let docs = YamlLoader::load_from_str(content)
            .map_err(|e| parse_error(format!("YAML parse error: {}", e)))?;
        let root = docs
            .first()
            .ok_or_else(|| parse_error("document is empty".to_string()))?;

        let name = match &root["name"] {
            Yaml::String(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => default_name.to_string(),
        };

        let entries = root["rows"]
            .as_vec()
            .ok_or_else(|| parse_error("missing 'rows' list".to_string()))?;

        let mut rows = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let field = |key: &str| scalar(&entry[key]);

            let prompt = field("prompt")
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| parse_error(format!("row {} has no prompt", index)))?;

            rows.push(ChecklistItem {
                topic: field("topic").unwrap_or_default(),
                section: field("section").unwrap_or_default(),
                prompt,
            });
        }

        Ok(ChecklistDefinition { name, rows })
    }
}

impl Default for ChecklistParser {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.trim().to_string()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Real(r) => Some(r.clone()),
        Yaml::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}
