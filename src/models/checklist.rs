// file: src/models/checklist.rs
// description: checklist definitions, evaluator answers, and persisted checklist rows
// reference: internal data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub topic: String,
    pub section: String,
    pub prompt: String,
}

/// Ordered list of topics; `name` identifies the checklist in persisted rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistDefinition {
    pub name: String,
    pub rows: Vec<ChecklistItem>,
}

impl ChecklistDefinition {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistAnswer {
    pub row_index: u32,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub commentary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistRow {
    pub company_id: String,
    pub checklist_name: String,
    pub row_index: u32,
    pub topic: String,
    pub section: String,
    pub prompt: String,
    pub answer: String,
    pub citations: Vec<String>,
    pub commentary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChecklistRow {
    pub fn from_answer(
        company_id: &str,
        checklist_name: &str,
        item: &ChecklistItem,
        answer: ChecklistAnswer,
    ) -> Self {
        let now = Utc::now();
        Self {
            company_id: company_id.to_string(),
            checklist_name: checklist_name.to_string(),
            row_index: answer.row_index,
            topic: item.topic.clone(),
            section: item.section.clone(),
            prompt: item.prompt.clone(),
            answer: answer.answer,
            citations: answer.citations,
            commentary: answer.commentary,
            created_at: now,
            updated_at: now,
        }
    }
}
